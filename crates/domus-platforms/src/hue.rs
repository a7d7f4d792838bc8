// SPDX-FileCopyrightText: 2026 Domus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Philips Hue bridge adapter (local REST API v1).
//!
//! The bridge answers most errors with HTTP 200 and a JSON array of
//! `{"error": {...}}` objects, so every response body is checked.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use domus_auth::{BridgeLocator, BridgePairing, Operation};
use domus_core::{
    Action, Command, Credentials, DeviceId, DeviceStatus, DeviceType, GatewayError, Platform,
    PlatformAdapter, PlatformDevice, WireCommand,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::http::{hex_to_hsv, no_mapping, segment, PlatformHttp};

pub const DEFAULT_DISCOVERY_URL: &str = "https://discovery.meethue.com";

/// Hue API error type for an unknown or revoked username.
const UNAUTHORIZED_USER: u64 = 1;
/// Hue API error type for an unknown resource.
const RESOURCE_NOT_AVAILABLE: u64 = 3;

#[derive(Debug, Deserialize)]
struct LightState {
    #[serde(default)]
    on: bool,
    #[serde(default)]
    bri: Option<u8>,
    #[serde(default)]
    reachable: bool,
}

#[derive(Debug, Deserialize)]
struct Light {
    name: String,
    state: LightState,
    #[serde(default)]
    modelid: Option<String>,
    #[serde(rename = "type", default)]
    kind: Option<String>,
}

/// Hue brightness (1..=254) to percent.
fn bri_to_percent(bri: u8) -> u8 {
    ((f64::from(bri) / 254.0) * 100.0).round() as u8
}

fn percent_to_bri(percent: u8) -> u8 {
    ((f64::from(percent.min(100)) / 100.0) * 254.0).round().max(1.0) as u8
}

/// Controls lights behind a Hue bridge paired by link button.
pub struct HueAdapter {
    http: PlatformHttp,
    locator: BridgeLocator,
    pairing: BridgePairing,
}

impl HueAdapter {
    pub fn new(client: reqwest::Client, locator: BridgeLocator, pairing: BridgePairing) -> Self {
        Self {
            http: PlatformHttp::new(Platform::Hue, client),
            locator,
            pairing,
        }
    }

    fn base(&self, credentials: &Credentials) -> Result<String, GatewayError> {
        let host = self.http.host(credentials)?;
        let user = credentials
            .user_id
            .as_deref()
            .ok_or(GatewayError::PlatformNotAuthenticated {
                platform: Platform::Hue,
            })?;
        Ok(format!("http://{host}/api/{user}"))
    }

    /// Turns a 200-with-error-array body into the matching error.
    fn check_body(body: &Value, operation: Operation, device: Option<&str>) -> Result<(), GatewayError> {
        let Some(error) = body
            .as_array()
            .and_then(|items| items.iter().find_map(|i| i.get("error")))
        else {
            return Ok(());
        };
        let kind = error.get("type").and_then(Value::as_u64);
        let description = error
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or("unknown bridge error");
        match (kind, device) {
            (Some(UNAUTHORIZED_USER), _) => Err(GatewayError::InvalidCredentials {
                platform: Platform::Hue,
            }),
            (Some(RESOURCE_NOT_AVAILABLE), Some(id)) => Err(GatewayError::DeviceNotFound {
                id: DeviceId::for_platform(Platform::Hue, id),
            }),
            _ => Err(operation.failure(description.to_string())),
        }
    }
}

#[async_trait]
impl PlatformAdapter for HueAdapter {
    fn platform(&self) -> Platform {
        Platform::Hue
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
        let path = format!("/lights/{}/state", segment(&device.native_id)?);
        let body = match command {
            // The bridge has no toggle; flip the last known state.
            Command::Toggle => json!({ "on": !device.is_on }),
            Command::TurnOn => json!({ "on": true }),
            Command::TurnOff => json!({ "on": false }),
            Command::SetBrightness { value } if *value == 0 => json!({ "on": false }),
            Command::SetBrightness { value } => json!({ "on": true, "bri": percent_to_bri(*value) }),
            Command::SetColor { hex } => {
                let (hue, sat, _) = hex_to_hsv(hex)?;
                json!({
                    "on": true,
                    "hue": ((hue / 360.0) * 65535.0).round() as u32,
                    "sat": (sat * 254.0).round() as u8,
                })
            }
            _ => return no_mapping(Platform::Hue, command),
        };
        Some(WireCommand::put(path, body))
    }

    async fn authenticate(&self) -> Result<Credentials, GatewayError> {
        let host = self.locator.locate().await?;
        let username = self.pairing.pair(&host).await?;
        info!(host = %host, "hue bridge user created");
        Ok(Credentials::new(Platform::Hue)
            .with_bridge_ip(host)
            .with_user_id(username))
    }

    async fn discover(&self, credentials: &Credentials) -> Result<Vec<PlatformDevice>, GatewayError> {
        let base = self.base(credentials)?;
        let body: Value = self
            .http
            .json(self.http.client().get(format!("{base}/lights")), Operation::Discover, None)
            .await?;
        Self::check_body(&body, Operation::Discover, None)?;
        let lights: BTreeMap<String, Light> = serde_json::from_value(body)
            .map_err(|e| Operation::Discover.failure(format!("unexpected light list: {e}")))?;

        Ok(lights
            .into_iter()
            .map(|(id, light)| {
                let mut device = PlatformDevice::new(id, light.name, DeviceType::Bulb);
                device.is_online = light.state.reachable;
                device.is_on = light.state.on;
                if let Some(bri) = light.state.bri {
                    device.properties.insert("brightness".into(), bri_to_percent(bri).to_string());
                }
                if let Some(model) = light.modelid {
                    device.properties.insert("model".into(), model);
                }
                if let Some(kind) = light.kind {
                    device.properties.insert("kind".into(), kind);
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
        let base = self.base(credentials)?;
        let body: Value = self
            .http
            .json(self.http.wire(&base, &wire), Operation::Execute, Some(&device.native_id))
            .await?;
        Self::check_body(&body, Operation::Execute, Some(&device.native_id))
    }

    async fn fetch_status(
        &self,
        device: &PlatformDevice,
        credentials: &Credentials,
    ) -> Result<DeviceStatus, GatewayError> {
        let base = self.base(credentials)?;
        let id = &device.native_id;
        let light_path = format!("{base}/lights/{}", self.http.device_segment(id)?);
        let body: Value = self
            .http
            .json(self.http.client().get(light_path), Operation::Status, Some(id))
            .await?;
        Self::check_body(&body, Operation::Status, Some(id))?;
        let light: Light = serde_json::from_value(body)
            .map_err(|e| Operation::Status.failure(format!("unexpected light state: {e}")))?;

        let mut status = DeviceStatus::empty(Utc::now());
        status.is_online = light.state.reachable;
        status.is_on = light.state.on;
        status.brightness = light.state.bri.map(bri_to_percent);
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brightness_maps_to_bri_range() {
        assert_eq!(percent_to_bri(100), 254);
        assert_eq!(percent_to_bri(1), 3);
        assert_eq!(bri_to_percent(254), 100);
        assert_eq!(bri_to_percent(127), 50);
    }

    #[test]
    fn unauthorized_user_body_is_invalid_credentials() {
        let body = json!([{ "error": { "type": 1, "address": "/lights", "description": "unauthorized user" } }]);
        let err = HueAdapter::check_body(&body, Operation::Discover, None).unwrap_err();
        assert!(matches!(err, GatewayError::InvalidCredentials { .. }));
    }

    #[test]
    fn missing_light_body_is_device_not_found() {
        let body = json!([{ "error": { "type": 3, "description": "resource, /lights/9, not available" } }]);
        let err = HueAdapter::check_body(&body, Operation::Status, Some("9")).unwrap_err();
        assert!(matches!(err, GatewayError::DeviceNotFound { .. }));
    }

    #[test]
    fn success_array_passes() {
        let body = json!([{ "success": { "/lights/1/state/on": true } }]);
        assert!(HueAdapter::check_body(&body, Operation::Execute, Some("1")).is_ok());
    }
}
