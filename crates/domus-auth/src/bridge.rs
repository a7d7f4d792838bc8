// SPDX-FileCopyrightText: 2026 Domus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bridge discovery and link-button pairing.

use std::time::Duration;

use domus_core::{GatewayError, Platform};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::http::{self, Operation};
use crate::probe::HostProbe;

/// Hue API error type for "link button not pressed".
pub const LINK_BUTTON_NOT_PRESSED: u32 = 101;

#[derive(Debug, Deserialize)]
struct DiscoveredBridge {
    #[serde(default)]
    id: Option<String>,
    internalipaddress: String,
}

/// Finds a bridge: cloud discovery first, local probing as fallback.
#[derive(Debug, Clone)]
pub struct BridgeLocator {
    platform: Platform,
    client: reqwest::Client,
    discovery_url: String,
    probe: HostProbe,
}

impl BridgeLocator {
    pub fn new(
        platform: Platform,
        client: reqwest::Client,
        discovery_url: impl Into<String>,
        probe: HostProbe,
    ) -> Self {
        Self {
            platform,
            client,
            discovery_url: discovery_url.into(),
            probe,
        }
    }

    /// Returns the bridge's LAN address.
    pub async fn locate(&self) -> Result<String, GatewayError> {
        match self.cloud_discovery().await {
            Ok(Some(host)) => return Ok(host),
            Ok(None) => debug!(platform = %self.platform, "cloud discovery found no bridges"),
            Err(e) => warn!(platform = %self.platform, error = %e, "cloud discovery failed"),
        }
        self.probe.locate().await
    }

    async fn cloud_discovery(&self) -> Result<Option<String>, GatewayError> {
        let bridges: Vec<DiscoveredBridge> = http::send_json(
            self.client.get(&self.discovery_url),
            self.platform,
            Operation::Authenticate,
            None,
        )
        .await?;
        Ok(bridges.into_iter().next().map(|b| {
            info!(
                platform = %self.platform,
                bridge = b.id.as_deref().unwrap_or("?"),
                host = %b.internalipaddress,
                "bridge found by cloud discovery"
            );
            b.internalipaddress
        }))
    }
}

/// Creates a bridge user once the link button has been pressed.
#[derive(Debug, Clone)]
pub struct BridgePairing {
    platform: Platform,
    client: reqwest::Client,
    app_name: String,
    attempts: u32,
    interval: Duration,
}

impl BridgePairing {
    pub fn new(
        platform: Platform,
        client: reqwest::Client,
        app_name: impl Into<String>,
        attempts: u32,
        interval: Duration,
    ) -> Self {
        Self {
            platform,
            client,
            app_name: app_name.into(),
            attempts: attempts.max(1),
            interval,
        }
    }

    /// POSTs `/api` until the bridge hands out a username or attempts run out.
    pub async fn pair(&self, host: &str) -> Result<String, GatewayError> {
        let url = format!("http://{host}/api");
        for attempt in 1..=self.attempts {
            if attempt > 1 {
                tokio::time::sleep(self.interval).await;
            }
            let replies: Vec<serde_json::Value> = http::send_json(
                self.client
                    .post(&url)
                    .json(&json!({ "devicetype": self.app_name })),
                self.platform,
                Operation::Authenticate,
                None,
            )
            .await?;

            if let Some(username) = replies
                .iter()
                .find_map(|r| r.pointer("/success/username").and_then(|u| u.as_str()))
            {
                info!(platform = %self.platform, host, attempt, "bridge paired");
                return Ok(username.to_string());
            }

            let error = replies.iter().find_map(|r| r.get("error"));
            match error.and_then(|e| e.get("type")).and_then(|t| t.as_u64()) {
                Some(t) if t == u64::from(LINK_BUTTON_NOT_PRESSED) => {
                    debug!(platform = %self.platform, attempt, "link button not pressed yet");
                }
                _ => {
                    let description = error
                        .and_then(|e| e.get("description"))
                        .and_then(|d| d.as_str())
                        .unwrap_or("unexpected pairing response");
                    return Err(GatewayError::auth_failed(description));
                }
            }
        }
        Err(GatewayError::auth_failed("link button not pressed"))
    }
}
