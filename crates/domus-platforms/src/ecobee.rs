// SPDX-FileCopyrightText: 2026 Domus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! ecobee thermostat adapter.
//!
//! The API reports temperatures in tenths of a degree Fahrenheit and signals
//! some failures (such as an expired token) in a `status.code` field of an
//! HTTP 200 body.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use domus_auth::Operation;
use domus_config::model::{OAuthConfig, OAuthPlatformConfig};
use domus_core::{
    Action, Command, Credentials, DeviceId, DeviceStatus, DeviceType, GatewayError, Platform,
    PlatformAdapter, PlatformDevice, WebAuthSession, WireCommand,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::http::{no_mapping, PlatformHttp};
use crate::oauth::{OAuthBinding, ProviderDefaults};

pub const DEFAULT_BASE_URL: &str = "https://api.ecobee.com/1";

const PROVIDER: ProviderDefaults = ProviderDefaults {
    authorize_url: "https://api.ecobee.com/authorize",
    token_url: "https://api.ecobee.com/token",
    scopes: &["smartWrite"],
    extra_params: &[],
};

/// Status codes for authentication problems.
const AUTH_CODES: &[i64] = &[1, 14, 16];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThermostatResponse {
    #[serde(default)]
    thermostat_list: Vec<Thermostat>,
    #[serde(default)]
    status: Option<ApiStatus>,
}

#[derive(Debug, Deserialize)]
struct ApiStatus {
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Thermostat {
    identifier: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    runtime: Option<Runtime>,
    #[serde(default)]
    settings: Option<Settings>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Runtime {
    #[serde(default)]
    connected: bool,
    #[serde(default)]
    actual_temperature: Option<f64>,
    #[serde(default)]
    actual_humidity: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Settings {
    #[serde(default)]
    hvac_mode: Option<String>,
}

impl Thermostat {
    fn mode(&self) -> Option<&str> {
        self.settings.as_ref().and_then(|s| s.hvac_mode.as_deref())
    }

    fn connected(&self) -> bool {
        self.runtime.as_ref().is_some_and(|r| r.connected)
    }
}

/// Tenths of a degree Fahrenheit to Celsius, rounded to one decimal.
fn tenths_f_to_celsius(tenths: f64) -> f64 {
    let celsius = (tenths / 10.0 - 32.0) * 5.0 / 9.0;
    (celsius * 10.0).round() / 10.0
}

fn celsius_to_tenths_f(celsius: f64) -> i64 {
    ((celsius * 9.0 / 5.0 + 32.0) * 10.0).round() as i64
}

fn selection(match_ids: &str) -> Value {
    json!({
        "selectionType": if match_ids.is_empty() { "registered" } else { "thermostats" },
        "selectionMatch": match_ids,
        "includeRuntime": true,
        "includeSettings": true,
    })
}

/// Controls ecobee thermostats.
pub struct EcobeeAdapter {
    http: PlatformHttp,
    base_url: String,
    oauth: OAuthBinding,
}

impl EcobeeAdapter {
    pub fn new(
        client: reqwest::Client,
        section: &OAuthPlatformConfig,
        oauth: &OAuthConfig,
        session: Arc<dyn WebAuthSession>,
    ) -> Self {
        Self {
            http: PlatformHttp::new(Platform::Ecobee, client.clone()),
            base_url: section
                .base_url
                .as_deref()
                .unwrap_or(DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            oauth: OAuthBinding::new(Platform::Ecobee, client, section, oauth, PROVIDER, session),
        }
    }

    async fn thermostats(
        &self,
        credentials: &Credentials,
        ids: &str,
        operation: Operation,
    ) -> Result<Vec<Thermostat>, GatewayError> {
        let token = self.http.bearer(credentials)?;
        let query = json!({ "selection": selection(ids) }).to_string();
        let request = self
            .http
            .client()
            .get(format!("{}/thermostat", self.base_url))
            .query(&[("format", "json"), ("json", query.as_str())])
            .bearer_auth(token);
        let device = (!ids.is_empty()).then_some(ids);
        let response: ThermostatResponse = self.http.json(request, operation, device).await?;
        check_status(response.status.as_ref(), operation)?;
        Ok(response.thermostat_list)
    }
}

fn check_status(status: Option<&ApiStatus>, operation: Operation) -> Result<(), GatewayError> {
    match status {
        Some(s) if s.code == 0 => Ok(()),
        Some(s) if AUTH_CODES.contains(&s.code) => Err(GatewayError::InvalidCredentials {
            platform: Platform::Ecobee,
        }),
        Some(s) => Err(operation.failure(format!("ecobee status {}: {}", s.code, s.message))),
        None => Ok(()),
    }
}

#[async_trait]
impl PlatformAdapter for EcobeeAdapter {
    fn platform(&self) -> Platform {
        Platform::Ecobee
    }

    fn supports(&self, action: Action) -> bool {
        matches!(action, Action::SetTemperature | Action::SetMode | Action::TurnOff)
    }

    fn translate(&self, command: &Command, device: &PlatformDevice) -> Option<WireCommand> {
        let selection = json!({
            "selectionType": "thermostats",
            "selectionMatch": device.native_id,
        });
        let body = match command {
            Command::SetTemperature { celsius } => {
                let hold = celsius_to_tenths_f(*celsius);
                json!({
                    "selection": selection,
                    "functions": [{
                        "type": "setHold",
                        "params": {
                            "holdType": "nextTransition",
                            "heatHoldTemp": hold,
                            "coolHoldTemp": hold,
                        }
                    }]
                })
            }
            Command::SetMode { mode } => json!({
                "selection": selection,
                "thermostat": { "settings": { "hvacMode": mode.to_ascii_lowercase() } }
            }),
            Command::TurnOff => json!({
                "selection": selection,
                "thermostat": { "settings": { "hvacMode": "off" } }
            }),
            _ => return no_mapping(Platform::Ecobee, command),
        };
        Some(WireCommand::post("/thermostat?format=json", body))
    }

    async fn authenticate(&self) -> Result<Credentials, GatewayError> {
        self.oauth.authenticate().await
    }

    async fn refresh(&self, credentials: &Credentials) -> Result<Credentials, GatewayError> {
        self.oauth.refresh(credentials).await
    }

    async fn discover(&self, credentials: &Credentials) -> Result<Vec<PlatformDevice>, GatewayError> {
        let list = self.thermostats(credentials, "", Operation::Discover).await?;
        Ok(list
            .into_iter()
            .map(|t| {
                let name = if t.name.is_empty() { t.identifier.clone() } else { t.name.clone() };
                let mut device = PlatformDevice::new(&t.identifier, name, DeviceType::Thermostat);
                device.is_online = t.connected();
                device.is_on = t.mode().is_some_and(|m| m != "off");
                if let Some(mode) = t.mode() {
                    device.properties.insert("mode".into(), mode.to_string());
                }
                device
            })
            .collect())
    }

    async fn execute(
        &self,
        command: &Command,
        device: &PlatformDevice,
        credentials: &Credentials,
    ) -> Result<(), GatewayError> {
        let wire = self
            .translate(command, device)
            .ok_or_else(|| self.http.unsupported(command))?;
        let token = self.http.bearer(credentials)?;
        let request = self.http.wire(&self.base_url, &wire).bearer_auth(token);
        let response: ThermostatResponse = self
            .http
            .json(request, Operation::Execute, Some(&device.native_id))
            .await?;
        check_status(response.status.as_ref(), Operation::Execute)
    }

    async fn fetch_status(
        &self,
        device: &PlatformDevice,
        credentials: &Credentials,
    ) -> Result<DeviceStatus, GatewayError> {
        let thermostat = self
            .thermostats(credentials, &device.native_id, Operation::Status)
            .await?
            .into_iter()
            .find(|t| t.identifier == device.native_id)
            .ok_or_else(|| GatewayError::DeviceNotFound {
                id: DeviceId::for_platform(Platform::Ecobee, &device.native_id),
            })?;

        let mut status = DeviceStatus::empty(Utc::now());
        status.is_online = thermostat.connected();
        status.mode = thermostat.mode().map(str::to_string);
        status.is_on = thermostat.mode().is_some_and(|m| m != "off");
        if let Some(runtime) = &thermostat.runtime {
            status.temperature = runtime.actual_temperature.map(tenths_f_to_celsius);
            status.humidity = runtime.actual_humidity;
        }
        Ok(status)
    }
}
