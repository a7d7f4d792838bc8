// SPDX-FileCopyrightText: 2026 Domus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Local-network hub location by sequential HTTP probing.

use std::time::Duration;

use domus_core::{GatewayError, Platform};
use tracing::{debug, info};

/// Probes a fixed list of addresses and reports the first that answers 200.
///
/// The configured localhost address is always tried first, then each
/// candidate in order. Addresses may carry a port (`10.0.0.2:8080`).
#[derive(Debug, Clone)]
pub struct HostProbe {
    platform: Platform,
    client: reqwest::Client,
    localhost: String,
    candidates: Vec<String>,
    path: String,
    timeout: Duration,
}

impl HostProbe {
    pub fn new(
        platform: Platform,
        client: reqwest::Client,
        localhost: impl Into<String>,
        candidates: Vec<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            platform,
            client,
            localhost: localhost.into(),
            candidates,
            path: "/".to_string(),
            timeout,
        }
    }

    /// Path requested on each host, e.g. `/api/config` for a Hue bridge.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Addresses in probe order.
    pub fn order(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.localhost.as_str()).chain(self.candidates.iter().map(String::as_str))
    }

    /// Returns the first host answering HTTP 200 on the probe path.
    pub async fn locate(&self) -> Result<String, GatewayError> {
        for host in self.order() {
            if self.answers(host).await {
                info!(platform = %self.platform, host, "hub found on local network");
                return Ok(host.to_string());
            }
        }
        Err(GatewayError::auth_failed(format!(
            "no {} hub answered on the local network",
            self.platform.display_name()
        )))
    }

    async fn answers(&self, host: &str) -> bool {
        let url = format!("http://{host}{}", self.path);
        match self.client.get(&url).timeout(self.timeout).send().await {
            Ok(response) if response.status() == reqwest::StatusCode::OK => true,
            Ok(response) => {
                debug!(platform = %self.platform, host, status = %response.status(), "probe rejected");
                false
            }
            Err(e) => {
                debug!(platform = %self.platform, host, error = %e, "probe unreachable");
                false
            }
        }
    }
}
