// SPDX-FileCopyrightText: 2026 Domus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The per-platform adapter contract.

use async_trait::async_trait;

use crate::action::{Action, Command};
use crate::error::GatewayError;
use crate::types::{Credentials, DeviceStatus, Platform, PlatformDevice, WireCommand};

/// Adapter for one smart-home platform.
///
/// Every platform implements the same contract. Authentication entry points
/// that do not apply to a platform keep the default implementation, which
/// fails with [`GatewayError::AuthUnsupported`].
///
/// Adapters hold no mutable credential state: credentials are passed into
/// every call and returned from every auth flow.
#[async_trait]
pub trait PlatformAdapter: Send + Sync + 'static {
    /// The platform this adapter speaks to.
    fn platform(&self) -> Platform;

    /// True when the adapter never touches a live backend.
    fn is_simulated(&self) -> bool {
        false
    }

    /// Whether the platform has a wire mapping for `action` at all.
    fn supports(&self, action: Action) -> bool;

    /// Pure translation of a command into the platform's wire request.
    ///
    /// Returns `None` when the platform has no mapping for the command.
    fn translate(&self, command: &Command, device: &PlatformDevice) -> Option<WireCommand>;

    /// Zero-argument flow (OAuth2, bridge pairing, local probing).
    async fn authenticate(&self) -> Result<Credentials, GatewayError> {
        Err(GatewayError::AuthUnsupported {
            platform: self.platform(),
            method: "interactive",
        })
    }

    /// API-key flow.
    async fn authenticate_with_key(&self, _key: &str) -> Result<Credentials, GatewayError> {
        Err(GatewayError::AuthUnsupported {
            platform: self.platform(),
            method: "api-key",
        })
    }

    /// Local hub flow with a pre-shared token and a discovered address.
    async fn authenticate_with_token(
        &self,
        _token: &str,
        _host: &str,
    ) -> Result<Credentials, GatewayError> {
        Err(GatewayError::AuthUnsupported {
            platform: self.platform(),
            method: "token",
        })
    }

    /// Exchanges a refresh token for fresh credentials.
    async fn refresh(&self, _credentials: &Credentials) -> Result<Credentials, GatewayError> {
        Err(GatewayError::AuthUnsupported {
            platform: self.platform(),
            method: "refresh",
        })
    }

    /// Lists the devices visible under `credentials`.
    async fn discover(&self, credentials: &Credentials) -> Result<Vec<PlatformDevice>, GatewayError>;

    /// Performs `command` against `device`.
    async fn execute(
        &self,
        command: &Command,
        device: &PlatformDevice,
        credentials: &Credentials,
    ) -> Result<(), GatewayError>;

    /// Reads the device's current state.
    async fn fetch_status(
        &self,
        device: &PlatformDevice,
        credentials: &Credentials,
    ) -> Result<DeviceStatus, GatewayError>;
}

/// Rejects credentials issued for a different platform.
pub fn ensure_platform(
    adapter_platform: Platform,
    credentials: &Credentials,
) -> Result<(), GatewayError> {
    if credentials.platform == adapter_platform {
        Ok(())
    } else {
        Err(GatewayError::InvalidCredentials {
            platform: adapter_platform,
        })
    }
}
