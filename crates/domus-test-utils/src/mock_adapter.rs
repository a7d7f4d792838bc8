// SPDX-FileCopyrightText: 2026 Domus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock platform adapter for deterministic testing.
//!
//! `MockAdapter` implements `PlatformAdapter` with scripted results. Each
//! scripted result is consumed by one call; when a queue is empty the call
//! succeeds with a plausible default. Every network-facing call is recorded.

use std::collections::{HashSet, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use domus_core::{
    Action, AuthType, Command, Credentials, DeviceStatus, GatewayError, Platform, PlatformAdapter,
    PlatformDevice, WireCommand,
};

/// One recorded adapter call.
#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    Authenticate,
    AuthenticateWithKey(String),
    AuthenticateWithToken { token: String, host: String },
    Refresh,
    Discover,
    Execute { native_id: String, command: Command },
    FetchStatus { native_id: String },
}

type AuthStep = (Duration, Result<Credentials, GatewayError>);

/// A platform adapter whose results are scripted by the test.
pub struct MockAdapter {
    platform: Platform,
    unsupported: HashSet<Action>,
    devices: Mutex<Vec<PlatformDevice>>,
    auth_results: Mutex<VecDeque<AuthStep>>,
    refresh_results: Mutex<VecDeque<Result<Credentials, GatewayError>>>,
    discover_errors: Mutex<VecDeque<GatewayError>>,
    execute_results: Mutex<VecDeque<Result<(), GatewayError>>>,
    status_results: Mutex<VecDeque<Result<DeviceStatus, GatewayError>>>,
    calls: Mutex<Vec<MockCall>>,
}

impl MockAdapter {
    /// A mock for `platform` that supports every action and reports no devices.
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            unsupported: HashSet::new(),
            devices: Mutex::new(Vec::new()),
            auth_results: Mutex::new(VecDeque::new()),
            refresh_results: Mutex::new(VecDeque::new()),
            discover_errors: Mutex::new(VecDeque::new()),
            execute_results: Mutex::new(VecDeque::new()),
            status_results: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Devices returned by every successful discovery.
    pub fn with_devices(mut self, devices: Vec<PlatformDevice>) -> Self {
        *self.devices.get_mut() = devices;
        self
    }

    /// Makes the adapter report no wire mapping for `action`.
    pub fn without_action(mut self, action: Action) -> Self {
        self.unsupported.insert(action);
        self
    }

    /// Queues the result of the next authentication call, whichever entry point it uses.
    pub fn with_auth_result(self, result: Result<Credentials, GatewayError>) -> Self {
        self.with_delayed_auth_result(Duration::ZERO, result)
    }

    /// Like [`Self::with_auth_result`], but the call sleeps for `delay` first.
    pub fn with_delayed_auth_result(
        mut self,
        delay: Duration,
        result: Result<Credentials, GatewayError>,
    ) -> Self {
        self.auth_results.get_mut().push_back((delay, result));
        self
    }

    pub fn with_refresh_result(mut self, result: Result<Credentials, GatewayError>) -> Self {
        self.refresh_results.get_mut().push_back(result);
        self
    }

    /// Makes the next discovery fail with `error`.
    pub fn with_discover_error(mut self, error: GatewayError) -> Self {
        self.discover_errors.get_mut().push_back(error);
        self
    }

    pub fn with_execute_result(mut self, result: Result<(), GatewayError>) -> Self {
        self.execute_results.get_mut().push_back(result);
        self
    }

    pub fn with_status_result(mut self, result: Result<DeviceStatus, GatewayError>) -> Self {
        self.status_results.get_mut().push_back(result);
        self
    }

    /// Queues an execution result on an adapter that is already shared.
    pub async fn push_execute_result(&self, result: Result<(), GatewayError>) {
        self.execute_results.lock().await.push_back(result);
    }

    pub async fn push_status_result(&self, result: Result<DeviceStatus, GatewayError>) {
        self.status_results.lock().await.push_back(result);
    }

    pub async fn push_discover_error(&self, error: GatewayError) {
        self.discover_errors.lock().await.push_back(error);
    }

    pub async fn set_devices(&self, devices: Vec<PlatformDevice>) {
        *self.devices.lock().await = devices;
    }

    /// Every recorded call, oldest first.
    pub async fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().await.clone()
    }

    /// Only the commands passed to `execute`, oldest first.
    pub async fn executed(&self) -> Vec<Command> {
        self.calls
            .lock()
            .await
            .iter()
            .filter_map(|call| match call {
                MockCall::Execute { command, .. } => Some(command.clone()),
                _ => None,
            })
            .collect()
    }

    async fn record(&self, call: MockCall) {
        self.calls.lock().await.push(call);
    }

    async fn next_auth(&self, default: Credentials) -> Result<Credentials, GatewayError> {
        let step = self.auth_results.lock().await.pop_front();
        match step {
            Some((delay, result)) => {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                result
            }
            None => Ok(default),
        }
    }

    fn default_credentials(&self) -> Credentials {
        let creds = Credentials::new(self.platform);
        match self.platform.auth_type() {
            AuthType::Bridge => creds.with_bridge_ip("127.0.0.1").with_user_id("mock-user"),
            AuthType::LocalNetwork => creds.with_local_ip("127.0.0.1"),
            AuthType::ApiKey | AuthType::OAuth2 => creds
                .with_access_token("mock-access-token")
                .with_refresh_token("mock-refresh-token")
                .with_expiry(Utc::now() + chrono::Duration::hours(1)),
        }
    }
}

#[async_trait]
impl PlatformAdapter for MockAdapter {
    fn platform(&self) -> Platform {
        self.platform
    }

    fn supports(&self, action: Action) -> bool {
        !self.unsupported.contains(&action)
    }

    fn translate(&self, command: &Command, device: &PlatformDevice) -> Option<WireCommand> {
        if !self.supports(command.action()) {
            return None;
        }
        let body = serde_json::to_value(command).unwrap_or_default();
        Some(WireCommand::post(format!("/mock/{}", device.native_id), body))
    }

    async fn authenticate(&self) -> Result<Credentials, GatewayError> {
        self.record(MockCall::Authenticate).await;
        let default = self.default_credentials();
        self.next_auth(default).await
    }

    async fn authenticate_with_key(&self, key: &str) -> Result<Credentials, GatewayError> {
        self.record(MockCall::AuthenticateWithKey(key.to_string())).await;
        if key.is_empty() {
            return Err(GatewayError::InvalidCredentials {
                platform: self.platform,
            });
        }
        let default = Credentials::new(self.platform).with_api_key(key);
        self.next_auth(default).await
    }

    async fn authenticate_with_token(
        &self,
        token: &str,
        host: &str,
    ) -> Result<Credentials, GatewayError> {
        self.record(MockCall::AuthenticateWithToken {
            token: token.to_string(),
            host: host.to_string(),
        })
        .await;
        let default = Credentials::new(self.platform)
            .with_access_token(token)
            .with_local_ip(host);
        self.next_auth(default).await
    }

    async fn refresh(&self, credentials: &Credentials) -> Result<Credentials, GatewayError> {
        self.record(MockCall::Refresh).await;
        if let Some(result) = self.refresh_results.lock().await.pop_front() {
            return result;
        }
        let mut refreshed = credentials
            .clone()
            .with_access_token("mock-refreshed-token")
            .with_expiry(Utc::now() + chrono::Duration::hours(1));
        if refreshed.refresh_token.is_none() {
            refreshed = refreshed.with_refresh_token("mock-refresh-token");
        }
        Ok(refreshed)
    }

    async fn discover(&self, _credentials: &Credentials) -> Result<Vec<PlatformDevice>, GatewayError> {
        self.record(MockCall::Discover).await;
        if let Some(error) = self.discover_errors.lock().await.pop_front() {
            return Err(error);
        }
        Ok(self.devices.lock().await.clone())
    }

    async fn execute(
        &self,
        command: &Command,
        device: &PlatformDevice,
        _credentials: &Credentials,
    ) -> Result<(), GatewayError> {
        self.record(MockCall::Execute {
            native_id: device.native_id.clone(),
            command: command.clone(),
        })
        .await;
        self.execute_results.lock().await.pop_front().unwrap_or(Ok(()))
    }

    async fn fetch_status(
        &self,
        device: &PlatformDevice,
        _credentials: &Credentials,
    ) -> Result<DeviceStatus, GatewayError> {
        self.record(MockCall::FetchStatus {
            native_id: device.native_id.clone(),
        })
        .await;
        if let Some(result) = self.status_results.lock().await.pop_front() {
            return result;
        }
        let mut status = DeviceStatus::empty(Utc::now());
        status.is_online = device.is_online;
        status.is_on = device.is_on;
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domus_core::DeviceType;

    fn bulb() -> PlatformDevice {
        PlatformDevice::new("b1", "Bulb", DeviceType::Bulb)
    }

    #[tokio::test]
    async fn defaults_succeed_and_are_recorded() {
        let mock = MockAdapter::new(Platform::Lifx).with_devices(vec![bulb()]);
        let creds = mock.authenticate_with_key("k").await.unwrap();
        assert_eq!(creds.bearer(), Some("k"));

        let devices = mock.discover(&creds).await.unwrap();
        assert_eq!(devices.len(), 1);
        mock.execute(&Command::TurnOn, &bulb(), &creds).await.unwrap();

        assert_eq!(
            mock.calls().await,
            vec![
                MockCall::AuthenticateWithKey("k".into()),
                MockCall::Discover,
                MockCall::Execute {
                    native_id: "b1".into(),
                    command: Command::TurnOn
                },
            ]
        );
    }

    #[tokio::test]
    async fn scripted_results_are_consumed_in_order() {
        let mock = MockAdapter::new(Platform::Lifx)
            .with_execute_result(Err(GatewayError::ActionExecutionFailed {
                reason: "offline".into(),
            }));
        let creds = Credentials::new(Platform::Lifx).with_api_key("k");

        assert!(mock.execute(&Command::Toggle, &bulb(), &creds).await.is_err());
        assert!(mock.execute(&Command::Toggle, &bulb(), &creds).await.is_ok());
        assert_eq!(mock.executed().await.len(), 2);
    }

    #[tokio::test]
    async fn empty_key_is_rejected() {
        let mock = MockAdapter::new(Platform::Wyze);
        let err = mock.authenticate_with_key("").await.unwrap_err();
        assert!(matches!(err, GatewayError::InvalidCredentials { .. }));
    }

    #[test]
    fn removed_actions_have_no_mapping() {
        let mock = MockAdapter::new(Platform::Hue).without_action(Action::SetColor);
        let cmd = Command::SetColor {
            hex: "#FF0000".into(),
        };
        assert!(!mock.supports(Action::SetColor));
        assert!(mock.translate(&cmd, &bulb()).is_none());
        assert!(mock.translate(&Command::TurnOn, &bulb()).is_some());
    }

    #[tokio::test]
    async fn local_default_credentials_carry_an_address() {
        let mock = MockAdapter::new(Platform::Hubitat);
        let creds = mock.authenticate().await.unwrap();
        assert_eq!(creds.host(), Some("127.0.0.1"));
        assert!(creds.bearer().is_none());
    }
}
