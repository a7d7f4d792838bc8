// SPDX-FileCopyrightText: 2026 Domus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Simulated adapter: a stand-in for any platform that performs no I/O.
//!
//! Every auth entry point succeeds, discovery returns a fixed demo set per
//! platform, executed commands are recorded and applied to an in-memory
//! status, and every status it reports is flagged `simulated`.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use domus_core::traits::adapter::ensure_platform;
use domus_core::{
    Action, AuthType, Command, Credentials, DeviceId, DeviceStatus, DeviceType, GatewayError,
    Platform, PlatformAdapter, PlatformDevice, WireCommand,
};
use tokio::sync::Mutex;
use tracing::debug;

use crate::http::no_mapping;

const SIMULATED_HOST: &str = "127.0.0.1";

/// The demo devices a simulated platform reports.
pub fn demo_devices(platform: Platform) -> Vec<PlatformDevice> {
    use DeviceType::*;
    let specs: &[(&str, &str, DeviceType)] = match platform {
        Platform::Lifx => &[("d073d5000001", "Desk Lamp", Bulb), ("d073d5000002", "Floor Lamp", Bulb)],
        Platform::Hue => &[("1", "Living Room Ceiling", Bulb), ("2", "Hallway", Bulb)],
        Platform::Nest => &[
            ("enterprises/demo/devices/thermostat", "Hallway Thermostat", Thermostat),
            ("enterprises/demo/devices/cam", "Nest Cam", Camera),
        ],
        Platform::SmartThings => &[
            ("st-lock", "Front Door Lock", Lock),
            ("st-speaker", "Kitchen Speaker", Speaker),
            ("st-tv", "Living Room TV", Tv),
            ("st-plug", "Coffee Maker Plug", HubDevice),
        ],
        Platform::Ecobee => &[("311000000001", "Upstairs", Thermostat)],
        Platform::Ring => &[("1000001", "Front Door", Camera), ("1000002", "Backyard", Camera)],
        Platform::Roborock => &[("rr-demo", "Roborock S7", Vacuum)],
        Platform::Wyze => &[
            ("2CAA8E000001", "Garage Cam", Camera),
            ("7C78B2000001", "Bedroom Bulb", Bulb),
            ("YD.LO1.demo", "Back Door Lock", Lock),
        ],
        Platform::Hubitat => &[
            ("101", "Porch Light", Bulb),
            ("102", "Side Door Lock", Lock),
            ("103", "Dehumidifier", HubDevice),
        ],
        Platform::IRobot => &[("roomba-demo", "Roomba i7", Vacuum)],
    };
    specs
        .iter()
        .map(|(id, name, device_type)| PlatformDevice::new(*id, *name, *device_type))
        .collect()
}

/// A platform adapter that simulates `platform` entirely in memory.
pub struct SimulatedAdapter {
    platform: Platform,
    device_types: Vec<DeviceType>,
    executed: Mutex<Vec<(String, Command)>>,
    statuses: Mutex<HashMap<String, DeviceStatus>>,
}

impl SimulatedAdapter {
    pub fn new(platform: Platform) -> Self {
        let mut device_types: Vec<DeviceType> =
            demo_devices(platform).iter().map(|d| d.device_type).collect();
        device_types.dedup();
        Self {
            platform,
            device_types,
            executed: Mutex::new(Vec::new()),
            statuses: Mutex::new(HashMap::new()),
        }
    }

    /// Commands executed so far, with the native id they targeted.
    pub async fn executed(&self) -> Vec<(String, Command)> {
        self.executed.lock().await.clone()
    }

    fn token_credentials(&self) -> Credentials {
        Credentials::new(self.platform)
            .with_access_token(format!("simulated-{}", self.platform))
            .with_refresh_token("simulated-refresh")
            .with_expiry(Utc::now() + Duration::hours(1))
    }
}

#[async_trait]
impl PlatformAdapter for SimulatedAdapter {
    fn platform(&self) -> Platform {
        self.platform
    }

    fn is_simulated(&self) -> bool {
        true
    }

    fn supports(&self, action: Action) -> bool {
        self.device_types.iter().any(|t| action.is_available_for(*t))
    }

    fn translate(&self, command: &Command, device: &PlatformDevice) -> Option<WireCommand> {
        if !command.action().is_available_for(device.device_type) {
            return no_mapping(self.platform, command);
        }
        let body = serde_json::to_value(command).ok()?;
        Some(WireCommand::post(format!("/simulated/{}", device.native_id), body))
    }

    async fn authenticate(&self) -> Result<Credentials, GatewayError> {
        Ok(match self.platform.auth_type() {
            AuthType::Bridge => Credentials::new(self.platform)
                .with_bridge_ip(SIMULATED_HOST)
                .with_user_id("simulated"),
            AuthType::LocalNetwork => Credentials::new(self.platform).with_local_ip(SIMULATED_HOST),
            AuthType::ApiKey | AuthType::OAuth2 => self.token_credentials(),
        })
    }

    async fn authenticate_with_key(&self, key: &str) -> Result<Credentials, GatewayError> {
        if key.trim().is_empty() {
            return Err(GatewayError::InvalidCredentials {
                platform: self.platform,
            });
        }
        Ok(Credentials::new(self.platform).with_api_key(key))
    }

    async fn authenticate_with_token(&self, token: &str, host: &str) -> Result<Credentials, GatewayError> {
        Ok(Credentials::new(self.platform)
            .with_local_ip(host)
            .with_access_token(token))
    }

    async fn refresh(&self, credentials: &Credentials) -> Result<Credentials, GatewayError> {
        ensure_platform(self.platform, credentials)?;
        Ok(self.token_credentials())
    }

    async fn discover(&self, credentials: &Credentials) -> Result<Vec<PlatformDevice>, GatewayError> {
        ensure_platform(self.platform, credentials)?;
        Ok(demo_devices(self.platform))
    }

    async fn execute(
        &self,
        command: &Command,
        device: &PlatformDevice,
        credentials: &Credentials,
    ) -> Result<(), GatewayError> {
        ensure_platform(self.platform, credentials)?;
        if self.translate(command, device).is_none() {
            return Err(GatewayError::ActionUnsupported {
                action: command.action(),
                target: Some(device.device_type.to_string()),
            });
        }
        debug!(platform = %self.platform, device = %device.native_id, action = %command.action(), "simulated execute");

        let mut statuses = self.statuses.lock().await;
        let status = statuses.entry(device.native_id.clone()).or_insert_with(|| {
            let mut s = DeviceStatus::empty(Utc::now());
            s.is_online = true;
            s.is_on = device.is_on;
            s
        });
        command.apply_to(status);
        status.last_updated = Utc::now();
        self.executed
            .lock()
            .await
            .push((device.native_id.clone(), command.clone()));
        Ok(())
    }

    async fn fetch_status(
        &self,
        device: &PlatformDevice,
        credentials: &Credentials,
    ) -> Result<DeviceStatus, GatewayError> {
        ensure_platform(self.platform, credentials)?;
        if !demo_devices(self.platform)
            .iter()
            .any(|d| d.native_id == device.native_id)
        {
            return Err(GatewayError::DeviceNotFound {
                id: DeviceId::for_platform(self.platform, &device.native_id),
            });
        }
        let mut status = self
            .statuses
            .lock()
            .await
            .get(&device.native_id)
            .cloned()
            .unwrap_or_else(|| {
                let mut s = DeviceStatus::empty(Utc::now());
                s.is_online = true;
                s.is_on = device.is_on;
                s
            });
        status.simulated = true;
        status.last_updated = Utc::now();
        Ok(status)
    }
}
