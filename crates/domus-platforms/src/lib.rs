// SPDX-FileCopyrightText: 2026 Domus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Platform adapters for the Domus device gateway.
//!
//! One [`PlatformAdapter`] per supported ecosystem, plus a simulated adapter
//! that any platform can be routed to via `[simulation].platforms`. Adapters
//! are built from [`DomusConfig`] by [`create_adapters`] and handed to the
//! registry, which never sees a concrete adapter type.

mod http;
mod oauth;

pub mod ecobee;
pub mod hubitat;
pub mod hue;
pub mod irobot;
pub mod lifx;
pub mod nest;
pub mod ring;
pub mod roborock;
pub mod simulated;
pub mod smartthings;
pub mod wyze;

use std::sync::Arc;
use std::time::Duration;

use domus_auth::{BridgeLocator, BridgePairing, HostProbe, HttpSettings};
use domus_config::DomusConfig;
use domus_core::{GatewayError, Platform, PlatformAdapter, WebAuthSession};
use tracing::debug;

pub use ecobee::EcobeeAdapter;
pub use hubitat::HubitatAdapter;
pub use hue::HueAdapter;
pub use irobot::IRobotAdapter;
pub use lifx::LifxAdapter;
pub use nest::NestAdapter;
pub use oauth::ProviderDefaults;
pub use ring::RingAdapter;
pub use roborock::RoborockAdapter;
pub use simulated::SimulatedAdapter;
pub use smartthings::SmartThingsAdapter;
pub use wyze::WyzeAdapter;

/// Probe path of a Hue bridge's unauthenticated config endpoint.
const HUE_PROBE_PATH: &str = "/api/config";

/// Everything an adapter needs at construction time.
#[derive(Clone)]
pub struct AdapterContext {
    pub config: DomusConfig,
    pub client: reqwest::Client,
    pub web_auth: Arc<dyn WebAuthSession>,
}

impl AdapterContext {
    /// Builds the shared HTTP client from `[gateway]` settings.
    pub fn new(config: DomusConfig, web_auth: Arc<dyn WebAuthSession>) -> Result<Self, GatewayError> {
        let settings = HttpSettings {
            timeout: Duration::from_secs(config.gateway.http_timeout_secs),
            user_agent: config.gateway.user_agent.clone(),
        };
        let client = settings.build_client()?;
        Ok(Self {
            config,
            client,
            web_auth,
        })
    }

    fn probe(&self, platform: Platform, path: &str) -> HostProbe {
        let discovery = &self.config.discovery;
        HostProbe::new(
            platform,
            self.client.clone(),
            discovery.localhost.clone(),
            discovery.candidates.clone(),
            Duration::from_millis(discovery.probe_timeout_ms),
        )
        .with_path(path)
    }
}

/// Builds the adapter serving `platform`.
///
/// Platforms listed under `[simulation].platforms` get a [`SimulatedAdapter`].
pub fn create_adapter(
    platform: Platform,
    ctx: &AdapterContext,
) -> Result<Arc<dyn PlatformAdapter>, GatewayError> {
    let config = &ctx.config;
    if config.simulation.platforms.contains(&platform) {
        debug!(%platform, "using simulated adapter");
        return Ok(Arc::new(SimulatedAdapter::new(platform)));
    }

    let client = ctx.client.clone();
    let adapter: Arc<dyn PlatformAdapter> = match platform {
        Platform::Lifx => Arc::new(LifxAdapter::new(client, config.lifx.base_url.as_deref())),
        Platform::Hue => {
            let section = &config.hue;
            let discovery_url = section
                .discovery_url
                .clone()
                .unwrap_or_else(|| hue::DEFAULT_DISCOVERY_URL.to_string());
            let locator = BridgeLocator::new(
                Platform::Hue,
                client.clone(),
                discovery_url,
                ctx.probe(Platform::Hue, HUE_PROBE_PATH),
            );
            let pairing = BridgePairing::new(
                Platform::Hue,
                client.clone(),
                section.app_name.clone(),
                section.pairing_attempts,
                Duration::from_millis(section.pairing_interval_ms),
            );
            Arc::new(HueAdapter::new(client, locator, pairing))
        }
        Platform::Nest => Arc::new(NestAdapter::new(
            client,
            &config.nest,
            &config.oauth,
            ctx.web_auth.clone(),
        )),
        Platform::SmartThings => Arc::new(SmartThingsAdapter::new(
            client,
            &config.smartthings,
            &config.oauth,
            ctx.web_auth.clone(),
        )),
        Platform::Ecobee => Arc::new(EcobeeAdapter::new(
            client,
            &config.ecobee,
            &config.oauth,
            ctx.web_auth.clone(),
        )),
        Platform::Ring => Arc::new(RingAdapter::new(
            client,
            &config.ring,
            &config.oauth,
            ctx.web_auth.clone(),
        )),
        Platform::Roborock => Arc::new(RoborockAdapter::new(client, config.roborock.base_url.as_deref())),
        Platform::Wyze => Arc::new(WyzeAdapter::new(client, config.wyze.base_url.as_deref())),
        Platform::Hubitat => Arc::new(HubitatAdapter::new(
            client,
            ctx.probe(Platform::Hubitat, hubitat::PROBE_PATH),
            config.hubitat.app_id.clone(),
            config.hubitat.token.clone(),
            config.hubitat.host.clone(),
        )),
        Platform::IRobot => Arc::new(IRobotAdapter::new(
            client,
            ctx.probe(Platform::IRobot, irobot::PROBE_PATH),
            config.irobot.token.clone(),
            config.irobot.host.clone(),
        )),
    };
    Ok(adapter)
}

/// Builds one adapter for every platform.
pub fn create_adapters(ctx: &AdapterContext) -> Result<Vec<Arc<dyn PlatformAdapter>>, GatewayError> {
    Platform::all()
        .into_iter()
        .map(|platform| create_adapter(platform, ctx))
        .collect()
}
