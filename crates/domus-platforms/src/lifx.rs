// SPDX-FileCopyrightText: 2026 Domus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! LIFX cloud HTTP API adapter.

use async_trait::async_trait;
use chrono::Utc;
use domus_auth::{api_key, Operation};
use domus_core::{
    Action, Command, Credentials, DeviceStatus, DeviceType, GatewayError, Platform,
    PlatformAdapter, PlatformDevice, WireCommand,
};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::http::{fraction, no_mapping, segment, PlatformHttp};

pub const DEFAULT_BASE_URL: &str = "https://api.lifx.com/v1";

#[derive(Debug, Deserialize)]
struct Light {
    id: String,
    #[serde(default)]
    label: String,
    #[serde(default)]
    connected: bool,
    #[serde(default)]
    power: String,
    #[serde(default)]
    brightness: Option<f64>,
    #[serde(default)]
    group: Option<Named>,
    #[serde(default)]
    product: Option<Named>,
}

#[derive(Debug, Deserialize)]
struct Named {
    name: String,
}

impl Light {
    fn into_device(self) -> PlatformDevice {
        let name = if self.label.is_empty() {
            self.id.clone()
        } else {
            self.label.clone()
        };
        let mut device = PlatformDevice::new(&self.id, name, DeviceType::Bulb);
        device.is_online = self.connected;
        device.is_on = self.power == "on";
        device.capabilities = vec!["power".into(), "brightness".into(), "color".into()];
        if let Some(b) = self.brightness {
            device.properties.insert("brightness".into(), percent(b).to_string());
        }
        if let Some(group) = self.group {
            device.properties.insert("group".into(), group.name);
        }
        if let Some(product) = self.product {
            device.properties.insert("model".into(), product.name);
        }
        device
    }
}

fn percent(fraction: f64) -> u8 {
    (fraction * 100.0).round().clamp(0.0, 100.0) as u8
}

/// Controls LIFX bulbs through the cloud API with a personal access token.
pub struct LifxAdapter {
    http: PlatformHttp,
    base_url: String,
}

impl LifxAdapter {
    pub fn new(client: reqwest::Client, base_url: Option<&str>) -> Self {
        Self {
            http: PlatformHttp::new(Platform::Lifx, client),
            base_url: base_url.unwrap_or(DEFAULT_BASE_URL).trim_end_matches('/').to_string(),
        }
    }

    fn state(id: &str, body: serde_json::Value) -> WireCommand {
        WireCommand::put(format!("/lights/id:{id}/state"), body)
    }
}

#[async_trait]
impl PlatformAdapter for LifxAdapter {
    fn platform(&self) -> Platform {
        Platform::Lifx
    }

    fn supports(&self, action: Action) -> bool {
        matches!(
            action,
            Action::Toggle
                | Action::TurnOn
                | Action::TurnOff
                | Action::SetBrightness
                | Action::SetColor
        )
    }

    fn translate(&self, command: &Command, device: &PlatformDevice) -> Option<WireCommand> {
        let id = &segment(&device.native_id)?;
        let wire = match command {
            Command::Toggle => WireCommand::post(format!("/lights/id:{id}/toggle"), json!({})),
            Command::TurnOn => Self::state(id, json!({ "power": "on" })),
            Command::TurnOff => Self::state(id, json!({ "power": "off" })),
            Command::SetBrightness { value } => Self::state(
                id,
                json!({ "power": if *value > 0 { "on" } else { "off" }, "brightness": fraction(*value) }),
            ),
            Command::SetColor { hex } => Self::state(id, json!({ "power": "on", "color": hex })),
            _ => return no_mapping(Platform::Lifx, command),
        };
        Some(wire)
    }

    async fn authenticate_with_key(&self, key: &str) -> Result<Credentials, GatewayError> {
        let probe = self
            .http
            .client()
            .get(format!("{}/lights/all", self.base_url))
            .bearer_auth(key);
        api_key::validate(Platform::Lifx, key, probe).await
    }

    async fn discover(&self, credentials: &Credentials) -> Result<Vec<PlatformDevice>, GatewayError> {
        let token = self.http.bearer(credentials)?;
        let request = self
            .http
            .client()
            .get(format!("{}/lights/all", self.base_url))
            .bearer_auth(token);
        let lights: Vec<Light> = self.http.json(request, Operation::Discover, None).await?;
        debug!(count = lights.len(), "lifx lights listed");
        Ok(lights.into_iter().map(Light::into_device).collect())
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
                "{}/lights/id:{}",
                self.base_url,
                self.http.device_segment(&device.native_id)?
            ))
            .bearer_auth(token);
        let lights: Vec<Light> = self
            .http
            .json(request, Operation::Status, Some(&device.native_id))
            .await?;
        let light = lights.into_iter().next().ok_or_else(|| GatewayError::DeviceNotFound {
            id: domus_core::DeviceId::for_platform(Platform::Lifx, &device.native_id),
        })?;

        let mut status = DeviceStatus::empty(Utc::now());
        status.is_online = light.connected;
        status.is_on = light.power == "on";
        status.brightness = light.brightness.map(percent);
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domus_core::WireMethod;

    fn bulb() -> PlatformDevice {
        PlatformDevice::new("d073d5", "Desk", DeviceType::Bulb)
    }

    #[test]
    fn toggle_uses_toggle_endpoint() {
        let adapter = LifxAdapter::new(reqwest::Client::new(), None);
        let wire = adapter.translate(&Command::Toggle, &bulb()).unwrap();
        assert_eq!(wire.method, WireMethod::Post);
        assert_eq!(wire.path, "/lights/id:d073d5/toggle");
    }

    #[test]
    fn brightness_is_sent_as_fraction() {
        let adapter = LifxAdapter::new(reqwest::Client::new(), None);
        let wire = adapter
            .translate(&Command::SetBrightness { value: 75 }, &bulb())
            .unwrap();
        assert_eq!(wire.method, WireMethod::Put);
        assert_eq!(wire.body, Some(json!({ "power": "on", "brightness": 0.75 })));
    }

    #[test]
    fn non_light_commands_have_no_mapping() {
        let adapter = LifxAdapter::new(reqwest::Client::new(), None);
        assert!(adapter.translate(&Command::Lock, &bulb()).is_none());
        assert!(!adapter.supports(Action::SetVolume));
    }
}
