// SPDX-FileCopyrightText: 2026 Domus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Hubitat Elevation adapter (Maker API on the local hub).
//!
//! Commands are GET requests of the form `/devices/{id}/{command}[/{arg}]`,
//! authorized by an `access_token` query parameter.

use async_trait::async_trait;
use chrono::Utc;
use domus_auth::{HostProbe, Operation};
use domus_core::{
    Action, Command, Credentials, DeviceStatus, DeviceType, GatewayError, Platform,
    PlatformAdapter, PlatformDevice, WireCommand,
};
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::http::{hex_to_hsv, no_mapping, segment, PlatformHttp};

/// Path probed on candidate hosts.
pub const PROBE_PATH: &str = "/hub/advanced/hubInfo";

#[derive(Debug, Deserialize)]
struct MakerDevice {
    id: Value,
    #[serde(default)]
    name: String,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    capabilities: Vec<Value>,
    #[serde(default)]
    attributes: Value,
}

impl MakerDevice {
    fn id(&self) -> String {
        match &self.id {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    /// Capability names; `/devices/all` lists strings, `/devices/{id}` may list objects.
    fn capability_names(&self) -> Vec<String> {
        self.capabilities
            .iter()
            .filter_map(|c| c.as_str().map(str::to_string))
            .collect()
    }

    /// Reads an attribute from either the map form or the list-of-objects form.
    fn attribute(&self, name: &str) -> Option<&Value> {
        let value = match &self.attributes {
            Value::Object(map) => map.get(name),
            Value::Array(list) => list
                .iter()
                .find(|a| a.get("name").and_then(Value::as_str) == Some(name))
                .and_then(|a| a.get("currentValue")),
            _ => None,
        };
        value.filter(|v| !v.is_null())
    }

    fn number(&self, name: &str) -> Option<f64> {
        self.attribute(name).and_then(|v| match v {
            Value::String(s) => s.parse().ok(),
            other => other.as_f64(),
        })
    }

    fn text(&self, name: &str) -> Option<&str> {
        self.attribute(name).and_then(Value::as_str)
    }
}

fn device_type_for(capabilities: &[String]) -> DeviceType {
    let has = |c: &str| capabilities.iter().any(|x| x == c);
    if has("Lock") {
        DeviceType::Lock
    } else if has("Thermostat") {
        DeviceType::Thermostat
    } else if has("VideoCamera") || has("ImageCapture") {
        DeviceType::Camera
    } else if has("MusicPlayer") || has("AudioVolume") {
        DeviceType::Speaker
    } else if has("SwitchLevel") || has("ColorControl") || has("Bulb") {
        DeviceType::Bulb
    } else {
        DeviceType::HubDevice
    }
}

fn percent(value: f64) -> u8 {
    value.round().clamp(0.0, 100.0) as u8
}

/// Controls devices exposed by a Hubitat hub's Maker API app.
pub struct HubitatAdapter {
    http: PlatformHttp,
    probe: HostProbe,
    app_id: String,
    token: Option<String>,
    host: Option<String>,
}

impl HubitatAdapter {
    pub fn new(
        client: reqwest::Client,
        probe: HostProbe,
        app_id: impl Into<String>,
        token: Option<String>,
        host: Option<String>,
    ) -> Self {
        Self {
            http: PlatformHttp::new(Platform::Hubitat, client),
            probe,
            app_id: app_id.into(),
            token,
            host,
        }
    }

    fn base(&self, host: &str) -> String {
        format!("http://{host}/apps/api/{}", self.app_id)
    }

    /// Host and Maker API token of credentials issued for this hub.
    fn endpoint<'a>(&self, credentials: &'a Credentials) -> Result<(String, &'a str), GatewayError> {
        let host = self.http.host(credentials)?;
        let token = credentials
            .access_token
            .as_ref()
            .map(|t| t.expose_secret())
            .ok_or(GatewayError::PlatformNotAuthenticated {
                platform: Platform::Hubitat,
            })?;
        Ok((self.base(host), token))
    }

    /// `/devices/{id}/{name}[/{arg}]` with `arg` encoded as one segment.
    fn command(id: &str, name: &str, argument: Option<String>) -> Option<WireCommand> {
        match argument {
            Some(arg) => Some(WireCommand::get(format!("/devices/{id}/{name}/{}", segment(&arg)?))),
            None => Some(WireCommand::get(format!("/devices/{id}/{name}"))),
        }
    }
}

#[async_trait]
impl PlatformAdapter for HubitatAdapter {
    fn platform(&self) -> Platform {
        Platform::Hubitat
    }

    fn supports(&self, action: Action) -> bool {
        !matches!(
            action,
            Action::StartCleaning
                | Action::StopCleaning
                | Action::SpotClean
                | Action::ReturnToBase
                | Action::StartRecording
                | Action::StopRecording
        )
    }

    fn translate(&self, command: &Command, device: &PlatformDevice) -> Option<WireCommand> {
        let id = segment(&device.native_id)?;
        let id = id.as_str();
        let wire = match command {
            Command::Toggle if device.is_on => Self::command(id, "off", None),
            Command::Toggle | Command::TurnOn => Self::command(id, "on", None),
            Command::TurnOff => Self::command(id, "off", None),
            Command::SetBrightness { value } => Self::command(id, "setLevel", Some(value.to_string())),
            Command::SetColor { hex } => {
                let (hue, sat, val) = hex_to_hsv(hex)?;
                let color = json!({
                    "hue": (hue / 3.6).round(),
                    "saturation": (sat * 100.0).round(),
                    "level": (val * 100.0).round(),
                })
                .to_string();
                Self::command(id, "setColor", Some(color))
            }
            Command::SetVolume { value } => Self::command(id, "setVolume", Some(value.to_string())),
            Command::Play => Self::command(id, "play", None),
            Command::Pause => Self::command(id, "pause", None),
            Command::Stop => Self::command(id, "stop", None),
            Command::Previous => Self::command(id, "previousTrack", None),
            Command::Next => Self::command(id, "nextTrack", None),
            Command::SetTemperature { celsius } => {
                Self::command(id, "setHeatingSetpoint", Some(celsius.to_string()))
            }
            Command::SetMode { mode } => Self::command(id, "setThermostatMode", Some(mode.to_ascii_lowercase())),
            Command::Lock => Self::command(id, "lock", None),
            Command::Unlock => Self::command(id, "unlock", None),
            Command::TakePhoto => Self::command(id, "take", None),
            _ => return no_mapping(Platform::Hubitat, command),
        };
        wire
    }

    /// Locates the hub; completes with the configured Maker API token when one is set.
    async fn authenticate(&self) -> Result<Credentials, GatewayError> {
        let host = match &self.host {
            Some(host) => host.clone(),
            None => self.probe.locate().await?,
        };
        match &self.token {
            Some(token) => self.authenticate_with_token(token, &host).await,
            None => Ok(Credentials::new(Platform::Hubitat).with_local_ip(host)),
        }
    }

    async fn authenticate_with_token(&self, token: &str, host: &str) -> Result<Credentials, GatewayError> {
        let request = self
            .http
            .client()
            .get(format!("{}/devices", self.base(host)))
            .query(&[("access_token", token)]);
        self.http.send(request, Operation::Authenticate, None).await?;
        info!(host, "hubitat maker api token accepted");
        Ok(Credentials::new(Platform::Hubitat)
            .with_local_ip(host)
            .with_access_token(token))
    }

    async fn discover(&self, credentials: &Credentials) -> Result<Vec<PlatformDevice>, GatewayError> {
        let (base, token) = self.endpoint(credentials)?;
        let request = self
            .http
            .client()
            .get(format!("{base}/devices/all"))
            .query(&[("access_token", token)]);
        let devices: Vec<MakerDevice> = self.http.json(request, Operation::Discover, None).await?;

        Ok(devices
            .into_iter()
            .map(|d| {
                let capabilities = d.capability_names();
                let name = d.label.clone().filter(|l| !l.is_empty()).unwrap_or_else(|| d.name.clone());
                let mut device = PlatformDevice::new(d.id(), name, device_type_for(&capabilities));
                device.is_on = d.text("switch") == Some("on");
                if let Some(level) = d.number("level") {
                    device.properties.insert("brightness".into(), percent(level).to_string());
                }
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
        let (base, token) = self.endpoint(credentials)?;
        let request = self.http.wire(&base, &wire).query(&[("access_token", token)]);
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
        let (base, token) = self.endpoint(credentials)?;
        let request = self
            .http
            .client()
            .get(format!("{base}/devices/{}", self.http.device_segment(&device.native_id)?))
            .query(&[("access_token", token)]);
        let maker: MakerDevice = self
            .http
            .json(request, Operation::Status, Some(&device.native_id))
            .await?;

        let mut status = DeviceStatus::empty(Utc::now());
        status.is_online = true;
        status.is_on = maker.text("switch") == Some("on");
        status.brightness = maker.number("level").map(percent);
        status.volume = maker.number("volume").map(percent);
        status.battery = maker.number("battery").map(percent);
        status.temperature = maker.number("temperature");
        status.humidity = maker.number("humidity");
        status.mode = maker.text("thermostatMode").map(str::to_string);
        status.is_locked = maker.text("lock").map(|l| l == "locked");
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attributes_read_in_both_shapes() {
        let map: MakerDevice = serde_json::from_value(json!({
            "id": "7", "name": "Lamp", "attributes": { "switch": "on", "level": "40" }
        }))
        .unwrap();
        assert_eq!(map.text("switch"), Some("on"));
        assert_eq!(map.number("level"), Some(40.0));

        let list: MakerDevice = serde_json::from_value(json!({
            "id": 7, "name": "Lamp",
            "attributes": [{ "name": "switch", "currentValue": "off" }, { "name": "level", "currentValue": 55 }]
        }))
        .unwrap();
        assert_eq!(list.id(), "7");
        assert_eq!(list.text("switch"), Some("off"));
        assert_eq!(list.number("level"), Some(55.0));
    }

    fn adapter() -> HubitatAdapter {
        let probe = HostProbe::new(
            Platform::Hubitat,
            reqwest::Client::new(),
            "localhost",
            vec![],
            std::time::Duration::from_millis(10),
        );
        HubitatAdapter::new(reqwest::Client::new(), probe, "1", None, None)
    }

    #[test]
    fn set_level_carries_argument_in_path() {
        let adapter = adapter();
        let lamp = PlatformDevice::new("7", "Lamp", DeviceType::Bulb);
        let wire = adapter
            .translate(&Command::SetBrightness { value: 30 }, &lamp)
            .unwrap();
        assert_eq!(wire.path, "/devices/7/setLevel/30");
        assert!(adapter.translate(&Command::StartCleaning, &lamp).is_none());
    }

    #[test]
    fn path_arguments_stay_in_one_segment() {
        let adapter = adapter();
        let thermostat = PlatformDevice::new("12", "Hall", DeviceType::Thermostat);
        let wire = adapter
            .translate(
                &Command::SetMode {
                    mode: "heat/../../hub/reboot".into(),
                },
                &thermostat,
            )
            .unwrap();
        assert_eq!(
            wire.path,
            "/devices/12/setThermostatMode/heat%2F..%2F..%2Fhub%2Freboot"
        );

        let odd = PlatformDevice::new("a b/c", "Odd", DeviceType::Lock);
        assert_eq!(adapter.translate(&Command::Lock, &odd).unwrap().path, "/devices/a%20b%2Fc/lock");

        let dots = PlatformDevice::new("..", "Dots", DeviceType::Lock);
        assert!(adapter.translate(&Command::Lock, &dots).is_none());
    }

    #[test]
    fn color_argument_is_encoded_json() {
        let lamp = PlatformDevice::new("7", "Lamp", DeviceType::Bulb);
        let wire = adapter()
            .translate(&Command::SetColor { hex: "#FF0000".into() }, &lamp)
            .unwrap();
        let argument = wire.path.strip_prefix("/devices/7/setColor/").unwrap();
        assert!(argument.starts_with("%7B%22hue%22"));
        assert!(!argument.contains('/'));
    }
}
