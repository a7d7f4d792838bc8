// SPDX-FileCopyrightText: 2026 Domus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Samsung SmartThings adapter.
//!
//! Every command is a capability invocation on the device's `main` component;
//! the device type is inferred from the capabilities it reports.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use domus_auth::Operation;
use domus_config::model::{OAuthConfig, OAuthPlatformConfig};
use domus_core::{
    Action, Command, Credentials, DeviceStatus, DeviceType, GatewayError, Platform,
    PlatformAdapter, PlatformDevice, WebAuthSession, WireCommand,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::http::{hex_to_hsv, no_mapping, segment, PlatformHttp};
use crate::oauth::{OAuthBinding, ProviderDefaults};

pub const DEFAULT_BASE_URL: &str = "https://api.smartthings.com/v1";

const PROVIDER: ProviderDefaults = ProviderDefaults {
    authorize_url: "https://api.smartthings.com/oauth/authorize",
    token_url: "https://auth-global.api.smartthings.com/oauth/token",
    scopes: &["r:devices:*", "x:devices:*"],
    extra_params: &[],
};

#[derive(Debug, Deserialize)]
struct DeviceList {
    #[serde(default)]
    items: Vec<StDevice>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StDevice {
    device_id: String,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    components: Vec<Component>,
}

#[derive(Debug, Deserialize)]
struct Component {
    id: String,
    #[serde(default)]
    capabilities: Vec<CapabilityRef>,
}

#[derive(Debug, Deserialize)]
struct CapabilityRef {
    id: String,
}

/// Infers the gateway device type from SmartThings capability ids.
fn device_type_for(capabilities: &[String]) -> DeviceType {
    let has = |c: &str| capabilities.iter().any(|x| x == c);
    if has("lock") {
        DeviceType::Lock
    } else if has("thermostatMode") || has("thermostatHeatingSetpoint") {
        DeviceType::Thermostat
    } else if has("robotCleanerMovement") {
        DeviceType::Vacuum
    } else if has("videoCamera") || has("imageCapture") {
        DeviceType::Camera
    } else if has("tvChannel") {
        DeviceType::Tv
    } else if has("mediaPlayback") || has("audioVolume") {
        DeviceType::Speaker
    } else if has("switchLevel") || has("colorControl") {
        DeviceType::Bulb
    } else {
        DeviceType::HubDevice
    }
}

/// Controls SmartThings devices through the public REST API.
pub struct SmartThingsAdapter {
    http: PlatformHttp,
    base_url: String,
    oauth: OAuthBinding,
}

impl SmartThingsAdapter {
    pub fn new(
        client: reqwest::Client,
        section: &OAuthPlatformConfig,
        oauth: &OAuthConfig,
        session: Arc<dyn WebAuthSession>,
    ) -> Self {
        Self {
            http: PlatformHttp::new(Platform::SmartThings, client.clone()),
            base_url: section
                .base_url
                .as_deref()
                .unwrap_or(DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            oauth: OAuthBinding::new(Platform::SmartThings, client, section, oauth, PROVIDER, session),
        }
    }

    fn invoke(capability: &str, command: &str, arguments: Value) -> Value {
        json!({
            "commands": [{
                "component": "main",
                "capability": capability,
                "command": command,
                "arguments": arguments,
            }]
        })
    }
}

/// Reads `components.main.{capability}.{attribute}.value`.
fn attribute<'a>(status: &'a Value, capability: &str, attribute: &str) -> Option<&'a Value> {
    status
        .pointer(&format!("/components/main/{capability}/{attribute}/value"))
        .filter(|v| !v.is_null())
}

fn as_percent(value: &Value) -> Option<u8> {
    value.as_f64().map(|v| v.round().clamp(0.0, 100.0) as u8)
}

#[async_trait]
impl PlatformAdapter for SmartThingsAdapter {
    fn platform(&self) -> Platform {
        Platform::SmartThings
    }

    fn supports(&self, action: Action) -> bool {
        !matches!(
            action,
            Action::SpotClean | Action::StartRecording | Action::StopRecording
        )
    }

    fn translate(&self, command: &Command, device: &PlatformDevice) -> Option<WireCommand> {
        let body = match command {
            Command::Toggle if device.is_on => Self::invoke("switch", "off", json!([])),
            Command::Toggle | Command::TurnOn => Self::invoke("switch", "on", json!([])),
            Command::TurnOff => Self::invoke("switch", "off", json!([])),
            Command::SetBrightness { value } => Self::invoke("switchLevel", "setLevel", json!([value])),
            Command::SetColor { hex } => {
                let (hue, sat, _) = hex_to_hsv(hex)?;
                Self::invoke(
                    "colorControl",
                    "setColor",
                    json!([{ "hue": (hue / 3.6).round(), "saturation": (sat * 100.0).round() }]),
                )
            }
            Command::SetVolume { value } => Self::invoke("audioVolume", "setVolume", json!([value])),
            Command::Play => Self::invoke("mediaPlayback", "play", json!([])),
            Command::Pause => Self::invoke("mediaPlayback", "pause", json!([])),
            Command::Stop => Self::invoke("mediaPlayback", "stop", json!([])),
            Command::Previous => Self::invoke("mediaTrackControl", "previousTrack", json!([])),
            Command::Next => Self::invoke("mediaTrackControl", "nextTrack", json!([])),
            Command::StartCleaning => {
                Self::invoke("robotCleanerMovement", "setRobotCleanerMovement", json!(["cleaning"]))
            }
            Command::StopCleaning => {
                Self::invoke("robotCleanerMovement", "setRobotCleanerMovement", json!(["idle"]))
            }
            Command::ReturnToBase => {
                Self::invoke("robotCleanerMovement", "setRobotCleanerMovement", json!(["homing"]))
            }
            Command::SetTemperature { celsius } => Self::invoke(
                "thermostatHeatingSetpoint",
                "setHeatingSetpoint",
                json!([celsius]),
            ),
            Command::SetMode { mode } if device.device_type == DeviceType::Vacuum => Self::invoke(
                "robotCleanerCleaningMode",
                "setRobotCleanerCleaningMode",
                json!([mode]),
            ),
            Command::SetMode { mode } => {
                Self::invoke("thermostatMode", "setThermostatMode", json!([mode]))
            }
            Command::Lock => Self::invoke("lock", "lock", json!([])),
            Command::Unlock => Self::invoke("lock", "unlock", json!([])),
            Command::TakePhoto => Self::invoke("imageCapture", "take", json!([])),
            _ => return no_mapping(Platform::SmartThings, command),
        };
        Some(WireCommand::post(
            format!("/devices/{}/commands", segment(&device.native_id)?),
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
        let request = self
            .http
            .client()
            .get(format!("{}/devices", self.base_url))
            .bearer_auth(token);
        let list: DeviceList = self.http.json(request, Operation::Discover, None).await?;

        Ok(list
            .items
            .into_iter()
            .map(|d| {
                let capabilities: Vec<String> = d
                    .components
                    .iter()
                    .filter(|c| c.id == "main")
                    .flat_map(|c| c.capabilities.iter().map(|cap| cap.id.clone()))
                    .collect();
                let name = d.label.or(d.name).unwrap_or_else(|| d.device_id.clone());
                let mut device = PlatformDevice::new(d.device_id, name, device_type_for(&capabilities));
                device.capabilities = capabilities;
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
            .get(format!(
                "{}/devices/{}/status",
                self.base_url,
                self.http.device_segment(&device.native_id)?
            ))
            .bearer_auth(token);
        let body: Value = self
            .http
            .json(request, Operation::Status, Some(&device.native_id))
            .await?;

        let mut status = DeviceStatus::empty(Utc::now());
        status.is_online = true;
        status.is_on = attribute(&body, "switch", "switch").and_then(Value::as_str) == Some("on");
        status.brightness = attribute(&body, "switchLevel", "level").and_then(as_percent);
        status.volume = attribute(&body, "audioVolume", "volume").and_then(as_percent);
        status.battery = attribute(&body, "battery", "battery").and_then(as_percent);
        status.temperature = attribute(&body, "temperatureMeasurement", "temperature").and_then(Value::as_f64);
        status.humidity = attribute(&body, "relativeHumidityMeasurement", "humidity").and_then(Value::as_f64);
        status.mode = attribute(&body, "thermostatMode", "thermostatMode")
            .and_then(Value::as_str)
            .map(str::to_string);
        status.is_locked = attribute(&body, "lock", "lock")
            .and_then(Value::as_str)
            .map(|v| v == "locked");
        status.is_cleaning = attribute(&body, "robotCleanerMovement", "robotCleanerMovement")
            .and_then(Value::as_str)
            == Some("cleaning");
        Ok(status)
    }
}
