// SPDX-FileCopyrightText: 2026 Domus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Google Nest adapter (Smart Device Management API).
//!
//! Devices are addressed by their full resource name
//! (`enterprises/{project}/devices/{id}`), which is kept as the native id.

use std::collections::BTreeMap;
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

use crate::http::{no_mapping, resource_path, PlatformHttp};
use crate::oauth::{OAuthBinding, ProviderDefaults};

pub const DEFAULT_BASE_URL: &str = "https://smartdevicemanagement.googleapis.com/v1";

const PROVIDER: ProviderDefaults = ProviderDefaults {
    authorize_url: "https://nestservices.google.com/partnerconnections/auth",
    token_url: "https://www.googleapis.com/oauth2/v4/token",
    scopes: &["https://www.googleapis.com/auth/sdm.service"],
    extra_params: &[("access_type", "offline"), ("prompt", "consent")],
};

const TRAIT_INFO: &str = "sdm.devices.traits.Info";
const TRAIT_CONNECTIVITY: &str = "sdm.devices.traits.Connectivity";
const TRAIT_MODE: &str = "sdm.devices.traits.ThermostatMode";
const TRAIT_TEMPERATURE: &str = "sdm.devices.traits.Temperature";
const TRAIT_HUMIDITY: &str = "sdm.devices.traits.Humidity";
const TRAIT_SETPOINT: &str = "sdm.devices.traits.ThermostatTemperatureSetpoint";

#[derive(Debug, Deserialize)]
struct DeviceList {
    #[serde(default)]
    devices: Vec<SdmDevice>,
}

#[derive(Debug, Deserialize)]
struct SdmDevice {
    name: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    traits: BTreeMap<String, Value>,
    #[serde(default, rename = "parentRelations")]
    parent_relations: Vec<Value>,
}

impl SdmDevice {
    fn device_type(&self) -> Option<DeviceType> {
        match self.kind.rsplit('.').next()? {
            "THERMOSTAT" => Some(DeviceType::Thermostat),
            "CAMERA" | "DOORBELL" | "DISPLAY" => Some(DeviceType::Camera),
            _ => None,
        }
    }

    fn trait_field(&self, name: &str, field: &str) -> Option<&Value> {
        self.traits.get(name).and_then(|t| t.get(field))
    }

    fn is_online(&self) -> bool {
        self.trait_field(TRAIT_CONNECTIVITY, "status")
            .and_then(Value::as_str)
            .is_none_or(|s| s == "ONLINE")
    }

    fn mode(&self) -> Option<&str> {
        self.trait_field(TRAIT_MODE, "mode").and_then(Value::as_str)
    }

    fn display_name(&self) -> String {
        self.trait_field(TRAIT_INFO, "customName")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .or_else(|| {
                self.parent_relations
                    .first()
                    .and_then(|p| p.get("displayName"))
                    .and_then(Value::as_str)
            })
            .map(str::to_string)
            .unwrap_or_else(|| self.name.rsplit('/').next().unwrap_or(&self.name).to_string())
    }
}

/// Controls Nest thermostats through Google's Smart Device Management API.
pub struct NestAdapter {
    http: PlatformHttp,
    base_url: String,
    project_id: Option<String>,
    oauth: OAuthBinding,
}

impl NestAdapter {
    pub fn new(
        client: reqwest::Client,
        section: &OAuthPlatformConfig,
        oauth: &OAuthConfig,
        session: Arc<dyn WebAuthSession>,
    ) -> Self {
        let mut section = section.clone();
        if section.authorize_url.is_none() {
            if let Some(project) = &section.project_id {
                section.authorize_url = Some(format!(
                    "https://nestservices.google.com/partnerconnections/{project}/auth"
                ));
            }
        }
        Self {
            http: PlatformHttp::new(Platform::Nest, client.clone()),
            base_url: section
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            project_id: section.project_id.clone(),
            oauth: OAuthBinding::new(Platform::Nest, client, &section, oauth, PROVIDER, session),
        }
    }

    /// A device resource name (`enterprises/{project}/devices/{id}`), encoded.
    fn resource(name: &str) -> Result<String, GatewayError> {
        resource_path(name).ok_or_else(|| GatewayError::DeviceNotFound {
            id: DeviceId::for_platform(Platform::Nest, name),
        })
    }

    fn command(name: &str, params: Value) -> Value {
        json!({ "command": format!("sdm.devices.commands.{name}"), "params": params })
    }
}

#[async_trait]
impl PlatformAdapter for NestAdapter {
    fn platform(&self) -> Platform {
        Platform::Nest
    }

    fn supports(&self, action: Action) -> bool {
        matches!(action, Action::SetTemperature | Action::SetMode | Action::TurnOff)
    }

    fn translate(&self, command: &Command, device: &PlatformDevice) -> Option<WireCommand> {
        let body = match command {
            Command::SetTemperature { celsius } => match device.property("mode") {
                Some("COOL") => Self::command(
                    "ThermostatTemperatureSetpoint.SetCool",
                    json!({ "coolCelsius": celsius }),
                ),
                _ => Self::command(
                    "ThermostatTemperatureSetpoint.SetHeat",
                    json!({ "heatCelsius": celsius }),
                ),
            },
            Command::SetMode { mode } => Self::command(
                "ThermostatMode.SetMode",
                json!({ "mode": mode.to_ascii_uppercase() }),
            ),
            Command::TurnOff => Self::command("ThermostatMode.SetMode", json!({ "mode": "OFF" })),
            _ => return no_mapping(Platform::Nest, command),
        };
        Some(WireCommand::post(
            format!("/{}:executeCommand", resource_path(&device.native_id)?),
            body,
        ))
    }

    async fn authenticate(&self) -> Result<Credentials, GatewayError> {
        self.oauth.authenticate().await
    }

    async fn refresh(&self, credentials: &Credentials) -> Result<Credentials, GatewayError> {
        self.oauth.refresh(credentials).await
    }

    async fn discover(&self, credentials: &Credentials) -> Result<Vec<PlatformDevice>, GatewayError> {
        let token = self.http.bearer(credentials)?;
        let project = self
            .project_id
            .as_deref()
            .ok_or_else(|| GatewayError::Config("nest.project_id is not configured".into()))?;
        let request = self
            .http
            .client()
            .get(format!("{}/enterprises/{project}/devices", self.base_url))
            .bearer_auth(token);
        let list: DeviceList = self.http.json(request, Operation::Discover, None).await?;

        Ok(list
            .devices
            .into_iter()
            .filter_map(|d| {
                let device_type = d.device_type()?;
                let mut device = PlatformDevice::new(&d.name, d.display_name(), device_type);
                device.is_online = d.is_online();
                device.is_on = d.mode().is_some_and(|m| m != "OFF");
                device.capabilities = d.traits.keys().cloned().collect();
                if let Some(mode) = d.mode() {
                    device.properties.insert("mode".into(), mode.to_string());
                }
                Some(device)
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
        self.http
            .send(request, Operation::Execute, Some(&device.native_id))
            .await?;
        Ok(())
    }

    async fn fetch_status(
        &self,
        device: &PlatformDevice,
        credentials: &Credentials,
    ) -> Result<DeviceStatus, GatewayError> {
        let token = self.http.bearer(credentials)?;
        let request = self
            .http
            .client()
            .get(format!("{}/{}", self.base_url, Self::resource(&device.native_id)?))
            .bearer_auth(token);
        let sdm: SdmDevice = self
            .http
            .json(request, Operation::Status, Some(&device.native_id))
            .await?;

        let mut status = DeviceStatus::empty(Utc::now());
        status.is_online = sdm.is_online();
        status.mode = sdm.mode().map(str::to_string);
        status.is_on = sdm.mode().is_some_and(|m| m != "OFF");
        status.temperature = sdm
            .trait_field(TRAIT_TEMPERATURE, "ambientTemperatureCelsius")
            .and_then(Value::as_f64);
        status.humidity = sdm
            .trait_field(TRAIT_HUMIDITY, "ambientHumidityPercent")
            .and_then(Value::as_f64);
        if status.temperature.is_none() {
            status.temperature = sdm
                .trait_field(TRAIT_SETPOINT, "heatCelsius")
                .and_then(Value::as_f64);
        }
        Ok(status)
    }
}
