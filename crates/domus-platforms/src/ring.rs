// SPDX-FileCopyrightText: 2026 Domus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ring doorbell and camera adapter.

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

use crate::http::{no_mapping, segment, PlatformHttp};
use crate::oauth::{OAuthBinding, ProviderDefaults};

pub const DEFAULT_BASE_URL: &str = "https://api.ring.com/clients_api";

const PROVIDER: ProviderDefaults = ProviderDefaults {
    authorize_url: "https://oauth.ring.com/oauth/authorize",
    token_url: "https://oauth.ring.com/oauth/token",
    scopes: &["client"],
    extra_params: &[],
};

#[derive(Debug, Deserialize)]
struct RingDevices {
    #[serde(default)]
    doorbots: Vec<RingCamera>,
    #[serde(default)]
    authorized_doorbots: Vec<RingCamera>,
    #[serde(default)]
    stickup_cams: Vec<RingCamera>,
}

#[derive(Debug, Deserialize)]
struct RingCamera {
    id: u64,
    #[serde(default)]
    description: String,
    #[serde(default)]
    kind: Option<String>,
    #[serde(default)]
    battery_life: Option<Value>,
    #[serde(default)]
    alerts: Option<Value>,
    #[serde(default)]
    led_status: Option<Value>,
}

impl RingCamera {
    fn into_device(self, family: &str) -> PlatformDevice {
        let id = self.id.to_string();
        let name = if self.description.is_empty() {
            id.clone()
        } else {
            self.description.clone()
        };
        let mut device = PlatformDevice::new(&id, name, DeviceType::Camera);
        device.is_online = self
            .alerts
            .as_ref()
            .and_then(|a| a.get("connection"))
            .and_then(Value::as_str)
            .is_none_or(|c| c == "online");
        device.is_on = self.led_status.as_ref().and_then(Value::as_str) == Some("on");
        device.properties.insert("family".into(), family.to_string());
        if let Some(kind) = self.kind {
            device.properties.insert("kind".into(), kind);
        }
        if let Some(battery) = self.battery_life.as_ref().and_then(battery_percent) {
            device.properties.insert("battery".into(), battery.to_string());
        }
        device
    }
}

/// Ring reports battery as a number or a numeric string.
fn battery_percent(value: &Value) -> Option<u8> {
    let raw = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.parse().ok()?,
        _ => return None,
    };
    Some(raw.round().clamp(0.0, 100.0) as u8)
}

/// Controls Ring cameras: snapshots, live view, and floodlights.
pub struct RingAdapter {
    http: PlatformHttp,
    base_url: String,
    oauth: OAuthBinding,
}

impl RingAdapter {
    pub fn new(
        client: reqwest::Client,
        section: &OAuthPlatformConfig,
        oauth: &OAuthConfig,
        session: Arc<dyn WebAuthSession>,
    ) -> Self {
        Self {
            http: PlatformHttp::new(Platform::Ring, client.clone()),
            base_url: section
                .base_url
                .as_deref()
                .unwrap_or(DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            oauth: OAuthBinding::new(Platform::Ring, client, section, oauth, PROVIDER, session),
        }
    }
}

#[async_trait]
impl PlatformAdapter for RingAdapter {
    fn platform(&self) -> Platform {
        Platform::Ring
    }

    fn supports(&self, action: Action) -> bool {
        matches!(
            action,
            Action::TakePhoto | Action::StartRecording | Action::TurnOn | Action::TurnOff
        )
    }

    fn translate(&self, command: &Command, device: &PlatformDevice) -> Option<WireCommand> {
        let id = &segment(&device.native_id)?;
        let wire = match command {
            Command::TakePhoto => {
                let doorbot: Value = id.parse::<u64>().map(Value::from).unwrap_or_else(|_| json!(id));
                WireCommand::post("/snapshots", json!({ "doorbot_ids": [doorbot], "refresh": true }))
            }
            Command::StartRecording => WireCommand::post(format!("/doorbots/{id}/live_view"), json!({})),
            Command::TurnOn => WireCommand::put(format!("/doorbots/{id}/floodlight_light_on"), json!({})),
            Command::TurnOff => WireCommand::put(format!("/doorbots/{id}/floodlight_light_off"), json!({})),
            _ => return no_mapping(Platform::Ring, command),
        };
        Some(wire)
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
            .get(format!("{}/ring_devices", self.base_url))
            .bearer_auth(token);
        let devices: RingDevices = self.http.json(request, Operation::Discover, None).await?;

        let mut found: Vec<PlatformDevice> = Vec::new();
        let families = [
            ("doorbot", devices.doorbots),
            ("doorbot", devices.authorized_doorbots),
            ("stickup_cam", devices.stickup_cams),
        ];
        for (family, cameras) in families {
            for camera in cameras {
                let device = camera.into_device(family);
                if !found.iter().any(|d| d.native_id == device.native_id) {
                    found.push(device);
                }
            }
        }
        Ok(found)
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
                "{}/doorbots/{}/health",
                self.base_url,
                self.http.device_segment(&device.native_id)?
            ))
            .bearer_auth(token);
        let body: Value = self
            .http
            .json(request, Operation::Status, Some(&device.native_id))
            .await?;
        let health = body.get("device_health").unwrap_or(&Value::Null);

        let mut status = DeviceStatus::empty(Utc::now());
        status.is_online = !health.is_null();
        status.battery = health.get("battery_percentage").and_then(battery_percent);
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn battery_accepts_numbers_and_strings() {
        assert_eq!(battery_percent(&json!(87)), Some(87));
        assert_eq!(battery_percent(&json!("42")), Some(42));
        assert_eq!(battery_percent(&json!(null)), None);
    }

    #[test]
    fn snapshot_targets_numeric_doorbot_id() {
        let device = PlatformDevice::new("12345", "Front Door", DeviceType::Camera);
        struct Noop;
        #[async_trait]
        impl WebAuthSession for Noop {
            async fn authorize(&self, _: &url::Url, _: &str) -> Result<url::Url, GatewayError> {
                Err(GatewayError::auth_failed("noop"))
            }
        }
        let adapter = RingAdapter::new(
            reqwest::Client::new(),
            &OAuthPlatformConfig::default(),
            &OAuthConfig::default(),
            Arc::new(Noop),
        );
        let wire = adapter.translate(&Command::TakePhoto, &device).unwrap();
        assert_eq!(wire.path, "/snapshots");
        assert_eq!(wire.body.unwrap()["doorbot_ids"], json!([12345]));
        assert!(adapter.translate(&Command::StopRecording, &device).is_none());
    }
}
