// SPDX-FileCopyrightText: 2026 Domus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wyze adapter.
//!
//! Every Wyze call is a POST whose JSON body carries the access token, and
//! application errors come back as HTTP 200 with a non-`"1"` `code`.

use async_trait::async_trait;
use chrono::Utc;
use domus_auth::Operation;
use domus_core::{
    Action, Command, Credentials, DeviceStatus, DeviceType, GatewayError, Platform,
    PlatformAdapter, PlatformDevice, WireCommand,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::http::{no_mapping, PlatformHttp};

pub const DEFAULT_BASE_URL: &str = "https://api.wyzecam.com/app/v2";

const CODE_OK: &str = "1";
/// Codes for an invalid or expired access token.
const AUTH_CODES: &[&str] = &["2001", "2002"];

/// Property ids.
const PID_POWER: &str = "P3";
const PID_ONLINE: &str = "P5";
const PID_BATTERY: &str = "P8";
const PID_BRIGHTNESS: &str = "P1501";
const PID_COLOR: &str = "P1507";

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default, deserialize_with = "code_as_string")]
    code: String,
    #[serde(default)]
    msg: String,
    #[serde(default)]
    data: Value,
}

/// Wyze sends `code` as either a string or a number.
fn code_as_string<'de, D: serde::Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    let value = Value::deserialize(d)?;
    Ok(match value {
        Value::String(s) => s,
        other => other.to_string(),
    })
}

impl Envelope {
    fn into_data(self, operation: Operation) -> Result<Value, GatewayError> {
        if self.code == CODE_OK {
            Ok(self.data)
        } else if AUTH_CODES.contains(&self.code.as_str()) {
            Err(GatewayError::InvalidCredentials {
                platform: Platform::Wyze,
            })
        } else {
            Err(operation.failure(format!("wyze code {}: {}", self.code, self.msg)))
        }
    }
}

#[derive(Debug, Deserialize)]
struct WyzeDevice {
    mac: String,
    #[serde(default)]
    nickname: String,
    #[serde(default)]
    product_type: String,
    #[serde(default)]
    product_model: String,
    #[serde(default)]
    conn_state: i64,
    #[serde(default)]
    device_params: Value,
}

impl WyzeDevice {
    fn device_type(&self) -> Option<DeviceType> {
        match self.product_type.as_str() {
            "Camera" => Some(DeviceType::Camera),
            "Light" | "MeshLight" | "LightStrip" => Some(DeviceType::Bulb),
            "Plug" | "OutdoorPlug" => Some(DeviceType::HubDevice),
            "Lock" => Some(DeviceType::Lock),
            _ => None,
        }
    }
}

/// Controls Wyze bulbs, plugs, locks and cameras.
pub struct WyzeAdapter {
    http: PlatformHttp,
    base_url: String,
}

impl WyzeAdapter {
    pub fn new(client: reqwest::Client, base_url: Option<&str>) -> Self {
        Self {
            http: PlatformHttp::new(Platform::Wyze, client),
            base_url: base_url.unwrap_or(DEFAULT_BASE_URL).trim_end_matches('/').to_string(),
        }
    }

    fn model(device: &PlatformDevice) -> &str {
        device.property("model").unwrap_or_default()
    }

    fn run_action(device: &PlatformDevice, action: &str) -> WireCommand {
        WireCommand::post(
            "/auto/run_action",
            json!({
                "provider_key": Self::model(device),
                "instance_id": device.native_id,
                "action_key": action,
                "action_params": {},
            }),
        )
    }

    fn set_property(device: &PlatformDevice, pid: &str, value: String) -> WireCommand {
        WireCommand::post(
            "/device/set_property",
            json!({
                "device_mac": device.native_id,
                "device_model": Self::model(device),
                "pid": pid,
                "pvalue": value,
            }),
        )
    }

    /// POSTs `body` plus the access token and unwraps the envelope.
    async fn call(
        &self,
        path: &str,
        mut body: Value,
        key: &str,
        operation: Operation,
        device: Option<&str>,
    ) -> Result<Value, GatewayError> {
        if let Some(map) = body.as_object_mut() {
            map.insert("access_token".into(), json!(key));
        }
        let request = self
            .http
            .client()
            .post(format!("{}{path}", self.base_url))
            .json(&body);
        let envelope: Envelope = self.http.json(request, operation, device).await?;
        envelope.into_data(operation)
    }

    async fn list_devices(&self, key: &str, operation: Operation) -> Result<Vec<WyzeDevice>, GatewayError> {
        let data = self
            .call("/home_page/get_object_list", json!({}), key, operation, None)
            .await?;
        let list = data.get("device_list").cloned().unwrap_or(Value::Array(vec![]));
        serde_json::from_value(list)
            .map_err(|e| operation.failure(format!("unexpected device list: {e}")))
    }
}

#[async_trait]
impl PlatformAdapter for WyzeAdapter {
    fn platform(&self) -> Platform {
        Platform::Wyze
    }

    fn supports(&self, action: Action) -> bool {
        matches!(
            action,
            Action::Toggle
                | Action::TurnOn
                | Action::TurnOff
                | Action::SetBrightness
                | Action::SetColor
                | Action::Lock
                | Action::Unlock
        )
    }

    fn translate(&self, command: &Command, device: &PlatformDevice) -> Option<WireCommand> {
        let wire = match command {
            Command::Toggle if device.is_on => Self::run_action(device, "power_off"),
            Command::Toggle | Command::TurnOn => Self::run_action(device, "power_on"),
            Command::TurnOff => Self::run_action(device, "power_off"),
            Command::SetBrightness { value } => {
                Self::set_property(device, PID_BRIGHTNESS, value.to_string())
            }
            Command::SetColor { hex } => {
                Self::set_property(device, PID_COLOR, hex.trim_start_matches('#').to_string())
            }
            Command::Lock => Self::run_action(device, "remoteLock"),
            Command::Unlock => Self::run_action(device, "remoteUnlock"),
            _ => return no_mapping(Platform::Wyze, command),
        };
        Some(wire)
    }

    async fn authenticate_with_key(&self, key: &str) -> Result<Credentials, GatewayError> {
        if key.trim().is_empty() {
            return Err(GatewayError::InvalidCredentials {
                platform: Platform::Wyze,
            });
        }
        self.list_devices(key, Operation::Authenticate).await?;
        info!("wyze access token accepted");
        Ok(Credentials::new(Platform::Wyze).with_api_key(key))
    }

    async fn discover(&self, credentials: &Credentials) -> Result<Vec<PlatformDevice>, GatewayError> {
        let key = self.http.bearer(credentials)?;
        let devices = self.list_devices(key, Operation::Discover).await?;
        Ok(devices
            .into_iter()
            .filter_map(|d| {
                let device_type = d.device_type()?;
                let name = if d.nickname.is_empty() { d.mac.clone() } else { d.nickname.clone() };
                let mut device = PlatformDevice::new(&d.mac, name, device_type);
                device.is_online = d.conn_state == 1;
                device.is_on = d
                    .device_params
                    .get("power_switch")
                    .and_then(Value::as_i64)
                    == Some(1);
                device.properties.insert("model".into(), d.product_model);
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
        let key = self.http.bearer(credentials)?;
        let body = wire.body.unwrap_or_else(|| json!({}));
        self.call(&wire.path, body, key, Operation::Execute, Some(&device.native_id))
            .await?;
        Ok(())
    }

    async fn fetch_status(
        &self,
        device: &PlatformDevice,
        credentials: &Credentials,
    ) -> Result<DeviceStatus, GatewayError> {
        let key = self.http.bearer(credentials)?;
        let body = json!({
            "device_mac": device.native_id,
            "device_model": Self::model(device),
        });
        let data = self
            .call(
                "/device/get_property_list",
                body,
                key,
                Operation::Status,
                Some(&device.native_id),
            )
            .await?;

        let property = |pid: &str| {
            data.get("property_list")
                .and_then(Value::as_array)
                .and_then(|list| list.iter().find(|p| p.get("pid").and_then(Value::as_str) == Some(pid)))
                .and_then(|p| p.get("value"))
                .and_then(|v| match v {
                    Value::String(s) => s.parse::<f64>().ok(),
                    other => other.as_f64(),
                })
        };

        let mut status = DeviceStatus::empty(Utc::now());
        status.is_on = property(PID_POWER) == Some(1.0);
        status.is_online = property(PID_ONLINE).is_none_or(|v| v == 1.0);
        status.brightness = property(PID_BRIGHTNESS).map(|v| v.clamp(0.0, 100.0) as u8);
        status.battery = property(PID_BATTERY).map(|v| v.clamp(0.0, 100.0) as u8);
        Ok(status)
    }
}
