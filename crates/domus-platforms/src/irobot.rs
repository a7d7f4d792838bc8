// SPDX-FileCopyrightText: 2026 Domus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! iRobot Roomba adapter, talking to a local REST bridge (rest980 style).

use async_trait::async_trait;
use chrono::Utc;
use domus_auth::{HostProbe, Operation};
use domus_core::{
    Action, Command, Credentials, DeviceStatus, DeviceType, GatewayError, Platform,
    PlatformAdapter, PlatformDevice, WireCommand,
};
use serde::Deserialize;
use tracing::info;

use crate::http::{no_mapping, PlatformHttp};

/// Path probed on candidate hosts.
pub const PROBE_PATH: &str = "/api/local/info/state";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RobotState {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    mac: Option<String>,
    #[serde(default)]
    sku: Option<String>,
    #[serde(default)]
    bat_pct: Option<u8>,
    #[serde(default)]
    clean_mission_status: Option<MissionStatus>,
}

#[derive(Debug, Default, Deserialize)]
struct MissionStatus {
    #[serde(default)]
    phase: String,
}

impl RobotState {
    fn phase(&self) -> &str {
        self.clean_mission_status
            .as_ref()
            .map(|m| m.phase.as_str())
            .unwrap_or("")
    }

    fn is_cleaning(&self) -> bool {
        matches!(self.phase(), "run" | "hmMidMsn" | "hmPostMsn")
    }
}

/// Controls a single Roomba found on the local network.
pub struct IRobotAdapter {
    http: PlatformHttp,
    probe: HostProbe,
    token: Option<String>,
    host: Option<String>,
}

impl IRobotAdapter {
    pub fn new(client: reqwest::Client, probe: HostProbe, token: Option<String>, host: Option<String>) -> Self {
        Self {
            http: PlatformHttp::new(Platform::IRobot, client),
            probe,
            token,
            host,
        }
    }

    fn base(host: &str) -> String {
        format!("http://{host}/api/local")
    }

    fn request(&self, credentials: &Credentials, path: &str) -> Result<reqwest::RequestBuilder, GatewayError> {
        let host = self.http.host(credentials)?;
        let request = self.http.client().get(format!("{}{path}", Self::base(host)));
        Ok(match credentials.bearer() {
            Some(token) => request.bearer_auth(token),
            None => request,
        })
    }

    async fn state(&self, credentials: &Credentials, operation: Operation) -> Result<RobotState, GatewayError> {
        let request = self.request(credentials, "/info/state")?;
        self.http.json(request, operation, None).await
    }
}

#[async_trait]
impl PlatformAdapter for IRobotAdapter {
    fn platform(&self) -> Platform {
        Platform::IRobot
    }

    fn supports(&self, action: Action) -> bool {
        matches!(
            action,
            Action::StartCleaning | Action::StopCleaning | Action::ReturnToBase
        )
    }

    fn translate(&self, command: &Command, _device: &PlatformDevice) -> Option<WireCommand> {
        let action = match command {
            Command::StartCleaning => "start",
            Command::StopCleaning => "stop",
            Command::ReturnToBase => "dock",
            _ => return no_mapping(Platform::IRobot, command),
        };
        Some(WireCommand::get(format!("/action/{action}")))
    }

    async fn authenticate(&self) -> Result<Credentials, GatewayError> {
        let host = match &self.host {
            Some(host) => host.clone(),
            None => self.probe.locate().await?,
        };
        match &self.token {
            Some(token) => self.authenticate_with_token(token, &host).await,
            None => Ok(Credentials::new(Platform::IRobot).with_local_ip(host)),
        }
    }

    async fn authenticate_with_token(&self, token: &str, host: &str) -> Result<Credentials, GatewayError> {
        let credentials = Credentials::new(Platform::IRobot)
            .with_local_ip(host)
            .with_access_token(token);
        self.state(&credentials, Operation::Authenticate).await?;
        info!(host, "roomba bridge accepted token");
        Ok(credentials)
    }

    async fn discover(&self, credentials: &Credentials) -> Result<Vec<PlatformDevice>, GatewayError> {
        let state = self.state(credentials, Operation::Discover).await?;
        let native_id = state
            .mac
            .clone()
            .or_else(|| state.sku.clone())
            .unwrap_or_else(|| "roomba".to_string());
        let name = state.name.clone().unwrap_or_else(|| "Roomba".to_string());
        let mut device = PlatformDevice::new(native_id, name, DeviceType::Vacuum);
        device.is_on = state.is_cleaning();
        if let Some(sku) = state.sku {
            device.properties.insert("model".into(), sku);
        }
        Ok(vec![device])
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
        let request = self.request(credentials, &wire.path)?;
        self.http.send(request, Operation::Execute, None).await?;
        Ok(())
    }

    async fn fetch_status(
        &self,
        _device: &PlatformDevice,
        credentials: &Credentials,
    ) -> Result<DeviceStatus, GatewayError> {
        let state = self.state(credentials, Operation::Status).await?;
        let mut status = DeviceStatus::empty(Utc::now());
        status.is_online = true;
        status.is_cleaning = state.is_cleaning();
        status.is_on = status.is_cleaning;
        status.battery = state.bat_pct;
        status.mode = Some(state.phase().to_string()).filter(|p| !p.is_empty());
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;

    fn hub_search() -> HostProbe {
        HostProbe::new(
            Platform::IRobot,
            reqwest::Client::new(),
            "127.0.0.1:1",
            Vec::new(),
            Duration::from_millis(100),
        )
    }

    fn adapter() -> IRobotAdapter {
        IRobotAdapter::new(reqwest::Client::new(), hub_search(), None, None)
    }

    fn state(phase: &str) -> RobotState {
        serde_json::from_value(json!({
            "name": "Rosie",
            "batPct": 64,
            "cleanMissionStatus": { "phase": phase }
        }))
        .unwrap()
    }

    #[test]
    fn mission_phase_decides_cleaning() {
        assert!(state("run").is_cleaning());
        assert!(state("hmPostMsn").is_cleaning());
        assert!(!state("charge").is_cleaning());
        assert_eq!(state("stuck").bat_pct, Some(64));

        let idle = RobotState::default();
        assert_eq!(idle.phase(), "");
        assert!(!idle.is_cleaning());
    }

    #[test]
    fn commands_map_to_bridge_actions() {
        let adapter = adapter();
        let roomba = PlatformDevice::new("aa:bb", "Rosie", DeviceType::Vacuum);
        let dock = adapter.translate(&Command::ReturnToBase, &roomba).unwrap();
        assert_eq!(dock.path, "/action/dock");
        assert!(dock.body.is_none());
        assert_eq!(
            adapter.translate(&Command::StartCleaning, &roomba).unwrap().path,
            "/action/start"
        );
        assert!(adapter.translate(&Command::SpotClean, &roomba).is_none());
        assert!(!adapter.supports(Action::SpotClean));
    }

    #[tokio::test]
    async fn address_only_credentials_need_no_token() {
        let adapter =
            IRobotAdapter::new(reqwest::Client::new(), hub_search(), None, Some("10.0.0.9".into()));
        let creds = adapter.authenticate().await.unwrap();
        assert_eq!(creds.host(), Some("10.0.0.9"));
        assert_eq!(creds.bearer(), None);
    }

    #[tokio::test]
    async fn foreign_credentials_are_rejected_before_any_request() {
        let hue = Credentials::new(Platform::Hue).with_bridge_ip("10.0.0.2");
        let roomba = PlatformDevice::new("aa:bb", "Rosie", DeviceType::Vacuum);
        let err = adapter().fetch_status(&roomba, &hue).await.unwrap_err();
        assert!(matches!(err, GatewayError::InvalidCredentials { platform: Platform::IRobot }));
    }
}
