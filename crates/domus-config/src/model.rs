// SPDX-FileCopyrightText: 2026 Domus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Domus device gateway.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup. Platform endpoint URLs are optional; `None` means
//! the platform's public default.

use domus_core::Platform;
use serde::{Deserialize, Serialize};

/// Top-level Domus configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DomusConfig {
    /// Process-wide gateway settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// OAuth2 callback registration shared by all OAuth2 platforms.
    #[serde(default)]
    pub oauth: OAuthConfig,

    /// Local-network probing for hubs and bridges.
    #[serde(default)]
    pub discovery: DiscoveryConfig,

    /// Platforms served by the simulated adapter instead of a live backend.
    #[serde(default)]
    pub simulation: SimulationConfig,

    #[serde(default)]
    pub lifx: ApiKeyPlatformConfig,

    #[serde(default)]
    pub hue: HueConfig,

    #[serde(default)]
    pub nest: OAuthPlatformConfig,

    #[serde(default)]
    pub smartthings: OAuthPlatformConfig,

    #[serde(default)]
    pub ecobee: OAuthPlatformConfig,

    #[serde(default)]
    pub ring: OAuthPlatformConfig,

    #[serde(default)]
    pub roborock: ApiKeyPlatformConfig,

    #[serde(default)]
    pub wyze: ApiKeyPlatformConfig,

    #[serde(default)]
    pub hubitat: HubitatConfig,

    #[serde(default)]
    pub irobot: LocalHubConfig,
}

/// Process-wide gateway settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Timeout applied to every platform HTTP request, in seconds.
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    /// User-Agent header sent to platform APIs.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Where the shell persists registry snapshots. `None` disables persistence.
    #[serde(default)]
    pub snapshot_path: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            http_timeout_secs: default_http_timeout_secs(),
            user_agent: default_user_agent(),
            snapshot_path: default_snapshot_path(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_http_timeout_secs() -> u64 {
    15
}

fn default_user_agent() -> String {
    format!("domus/{}", env!("CARGO_PKG_VERSION"))
}

fn default_snapshot_path() -> Option<String> {
    dirs::data_dir().map(|p| p.join("domus").join("registry.json").to_string_lossy().into_owned())
}

/// OAuth2 callback registration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OAuthConfig {
    /// URL scheme the web-auth session listens for.
    #[serde(default = "default_callback_scheme")]
    pub callback_scheme: String,

    /// Redirect URI registered with every OAuth2 provider.
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            callback_scheme: default_callback_scheme(),
            redirect_uri: default_redirect_uri(),
        }
    }
}

fn default_callback_scheme() -> String {
    "domus".to_string()
}

fn default_redirect_uri() -> String {
    "domus://oauth-callback".to_string()
}

/// Local-network probing settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DiscoveryConfig {
    /// Address probed before any candidate.
    #[serde(default = "default_localhost")]
    pub localhost: String,

    /// Private IPv4 addresses (optionally with `:port`) probed in order.
    #[serde(default = "default_candidates")]
    pub candidates: Vec<String>,

    /// Per-probe timeout in milliseconds.
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            localhost: default_localhost(),
            candidates: default_candidates(),
            probe_timeout_ms: default_probe_timeout_ms(),
        }
    }
}

fn default_localhost() -> String {
    "localhost".to_string()
}

fn default_candidates() -> Vec<String> {
    [
        "192.168.1.2",
        "192.168.1.100",
        "192.168.0.2",
        "192.168.0.100",
        "10.0.0.2",
        "10.0.1.2",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_probe_timeout_ms() -> u64 {
    1500
}

/// Platforms routed to the simulated adapter.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SimulationConfig {
    #[serde(default)]
    pub platforms: Vec<Platform>,
}

/// Settings for platforms authenticated with an API key.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ApiKeyPlatformConfig {
    /// Override for the platform's API base URL.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Key used by the shell's `auth` command when none is typed.
    #[serde(default)]
    pub api_key: Option<String>,
}

/// Settings for OAuth2 platforms.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OAuthPlatformConfig {
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default)]
    pub authorize_url: Option<String>,

    #[serde(default)]
    pub token_url: Option<String>,

    /// OAuth2 client id. `None` disables the live adapter's auth flow.
    #[serde(default)]
    pub client_id: Option<String>,

    #[serde(default)]
    pub client_secret: Option<String>,

    /// Scopes requested at authorization. Empty means the platform default.
    #[serde(default)]
    pub scopes: Vec<String>,

    /// Google Device Access project id (Nest only).
    #[serde(default)]
    pub project_id: Option<String>,
}

/// Philips Hue bridge settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HueConfig {
    /// Cloud bridge discovery endpoint.
    #[serde(default)]
    pub discovery_url: Option<String>,

    /// `devicetype` sent when creating the bridge user.
    #[serde(default = "default_hue_app_name")]
    pub app_name: String,

    /// How many create-user attempts before giving up on the link button.
    #[serde(default = "default_pairing_attempts")]
    pub pairing_attempts: u32,

    /// Delay between create-user attempts, in milliseconds.
    #[serde(default = "default_pairing_interval_ms")]
    pub pairing_interval_ms: u64,
}

impl Default for HueConfig {
    fn default() -> Self {
        Self {
            discovery_url: None,
            app_name: default_hue_app_name(),
            pairing_attempts: default_pairing_attempts(),
            pairing_interval_ms: default_pairing_interval_ms(),
        }
    }
}

fn default_hue_app_name() -> String {
    "domus#gateway".to_string()
}

fn default_pairing_attempts() -> u32 {
    1
}

fn default_pairing_interval_ms() -> u64 {
    3000
}

/// Settings for hubs found by local probing.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LocalHubConfig {
    /// Pre-shared token supplied out of band.
    #[serde(default)]
    pub token: Option<String>,

    /// Fixed hub address; skips probing when set.
    #[serde(default)]
    pub host: Option<String>,
}

/// Hubitat Maker API settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HubitatConfig {
    #[serde(default)]
    pub token: Option<String>,

    #[serde(default)]
    pub host: Option<String>,

    /// Maker API app instance id.
    #[serde(default = "default_maker_app_id")]
    pub app_id: String,
}

impl Default for HubitatConfig {
    fn default() -> Self {
        Self {
            token: None,
            host: None,
            app_id: default_maker_app_id(),
        }
    }
}

fn default_maker_app_id() -> String {
    "1".to_string()
}
