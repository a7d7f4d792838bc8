// SPDX-FileCopyrightText: 2026 Domus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across adapters, auth flows, and the device registry.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

/// A third-party smart-home ecosystem with its own auth scheme and wire protocol.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Lifx,
    Hue,
    Nest,
    SmartThings,
    Ecobee,
    Ring,
    Roborock,
    Wyze,
    Hubitat,
    IRobot,
}

/// How a platform establishes credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum AuthType {
    /// Caller supplies a key that is validated with one read call.
    ApiKey,
    /// Authorization-code grant through an interactive web session.
    #[strum(serialize = "oauth2")]
    #[serde(rename = "oauth2")]
    OAuth2,
    /// Hub found by probing the local network; token supplied out of band.
    LocalNetwork,
    /// Bridge found via cloud discovery or probing, then paired by link button.
    Bridge,
}

/// Static presentation and auth metadata for a [`Platform`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformInfo {
    pub display_name: &'static str,
    pub icon: &'static str,
    pub color: &'static str,
    pub auth_type: AuthType,
}

impl Platform {
    /// Returns the compile-time metadata for this platform.
    pub const fn info(self) -> PlatformInfo {
        match self {
            Platform::Lifx => PlatformInfo {
                display_name: "LIFX",
                icon: "lightbulb",
                color: "#7B3FE4",
                auth_type: AuthType::ApiKey,
            },
            Platform::Hue => PlatformInfo {
                display_name: "Philips Hue",
                icon: "lightbulb.2",
                color: "#0065D3",
                auth_type: AuthType::Bridge,
            },
            Platform::Nest => PlatformInfo {
                display_name: "Google Nest",
                icon: "thermometer",
                color: "#EA4335",
                auth_type: AuthType::OAuth2,
            },
            Platform::SmartThings => PlatformInfo {
                display_name: "SmartThings",
                icon: "house",
                color: "#15BFFF",
                auth_type: AuthType::OAuth2,
            },
            Platform::Ecobee => PlatformInfo {
                display_name: "ecobee",
                icon: "thermometer.sun",
                color: "#3B8526",
                auth_type: AuthType::OAuth2,
            },
            Platform::Ring => PlatformInfo {
                display_name: "Ring",
                icon: "video.doorbell",
                color: "#1C9AD6",
                auth_type: AuthType::OAuth2,
            },
            Platform::Roborock => PlatformInfo {
                display_name: "Roborock",
                icon: "fan",
                color: "#E60012",
                auth_type: AuthType::ApiKey,
            },
            Platform::Wyze => PlatformInfo {
                display_name: "Wyze",
                icon: "video",
                color: "#1DF0BB",
                auth_type: AuthType::ApiKey,
            },
            Platform::Hubitat => PlatformInfo {
                display_name: "Hubitat",
                icon: "server.rack",
                color: "#0B6EFD",
                auth_type: AuthType::LocalNetwork,
            },
            Platform::IRobot => PlatformInfo {
                display_name: "iRobot",
                icon: "circle.circle",
                color: "#6CC04A",
                auth_type: AuthType::LocalNetwork,
            },
        }
    }

    /// Shorthand for `self.info().auth_type`.
    pub const fn auth_type(self) -> AuthType {
        self.info().auth_type
    }

    /// Shorthand for `self.info().display_name`.
    pub const fn display_name(self) -> &'static str {
        self.info().display_name
    }

    /// All platforms in declaration order.
    pub fn all() -> Vec<Platform> {
        Platform::iter().collect()
    }
}

/// Stable unique identifier of a device tracked by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeviceId(pub String);

impl DeviceId {
    /// Builds the id used for devices that came from a platform's discovery call.
    pub fn for_platform(platform: Platform, native_id: &str) -> Self {
        DeviceId(format!("{platform}:{native_id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(value: &str) -> Self {
        DeviceId(value.to_string())
    }
}

/// Identifier of a room owned by the scanning collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoomId(pub String);

/// The eight kinds of device the gateway knows how to control.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
#[serde(rename_all = "kebab-case")]
pub enum DeviceType {
    Bulb,
    Tv,
    Vacuum,
    HubDevice,
    Speaker,
    Thermostat,
    Lock,
    Camera,
}

/// Position in room space. Only meaningful once the placement UI has placed the device.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// A platform-agnostic control target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    pub name: String,
    pub device_type: DeviceType,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub room_id: Option<RoomId>,
    #[serde(default)]
    pub platform: Option<Platform>,
    /// The id the platform itself uses for this device.
    #[serde(default)]
    pub native_id: Option<String>,
    #[serde(default)]
    pub is_online: bool,
    #[serde(default)]
    pub is_on: bool,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    pub last_updated: DateTime<Utc>,
}

impl Device {
    /// Creates an unbound device, e.g. one placed manually before a platform is chosen.
    pub fn new(id: impl Into<String>, name: impl Into<String>, device_type: DeviceType) -> Self {
        Self {
            id: DeviceId(id.into()),
            name: name.into(),
            device_type,
            position: Position::default(),
            room_id: None,
            platform: None,
            native_id: None,
            is_online: false,
            is_on: false,
            properties: BTreeMap::new(),
            last_updated: Utc::now(),
        }
    }

    /// Binds the device to a platform-native identity.
    pub fn with_platform(mut self, platform: Platform, native_id: impl Into<String>) -> Self {
        self.platform = Some(platform);
        self.native_id = Some(native_id.into());
        self
    }

    pub fn in_room(mut self, room: impl Into<String>) -> Self {
        self.room_id = Some(RoomId(room.into()));
        self
    }

    /// Normalizes a discovery record into a gateway device.
    pub fn from_discovered(platform: Platform, discovered: &PlatformDevice) -> Self {
        Self {
            id: DeviceId::for_platform(platform, &discovered.native_id),
            name: discovered.name.clone(),
            device_type: discovered.device_type,
            position: Position::default(),
            room_id: None,
            platform: Some(platform),
            native_id: Some(discovered.native_id.clone()),
            is_online: discovered.is_online,
            is_on: discovered.is_on,
            properties: discovered.properties.clone(),
            last_updated: Utc::now(),
        }
    }

    /// Rebuilds the platform-native view adapters operate on.
    ///
    /// Returns `None` for devices without a platform binding.
    pub fn to_platform_device(&self) -> Option<PlatformDevice> {
        self.platform?;
        let native_id = self
            .native_id
            .clone()
            .unwrap_or_else(|| self.id.0.clone());
        Some(PlatformDevice {
            native_id,
            name: self.name.clone(),
            device_type: self.device_type,
            capabilities: Vec::new(),
            is_online: self.is_online,
            is_on: self.is_on,
            properties: self.properties.clone(),
        })
    }
}

/// A device record as returned by a platform's discovery call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformDevice {
    pub native_id: String,
    pub name: String,
    pub device_type: DeviceType,
    /// Platform capability tags (e.g. `switch`, `switchLevel`, `color`).
    #[serde(default)]
    pub capabilities: Vec<String>,
    pub is_online: bool,
    pub is_on: bool,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl PlatformDevice {
    pub fn new(native_id: impl Into<String>, name: impl Into<String>, device_type: DeviceType) -> Self {
        Self {
            native_id: native_id.into(),
            name: name.into(),
            device_type,
            capabilities: Vec::new(),
            is_online: true,
            is_on: false,
            properties: BTreeMap::new(),
        }
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }
}

/// Cached per-device state, rebuilt from action results and status reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceStatus {
    pub is_online: bool,
    pub is_on: bool,
    pub brightness: Option<u8>,
    pub volume: Option<u8>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub battery: Option<u8>,
    pub is_cleaning: bool,
    pub mode: Option<String>,
    pub color: Option<String>,
    pub is_locked: Option<bool>,
    pub is_recording: Option<bool>,
    /// Set when the value came from a simulated adapter rather than a live backend.
    pub simulated: bool,
    pub last_updated: DateTime<Utc>,
    pub last_error: Option<String>,
}

impl DeviceStatus {
    /// An "unknown" status stamped at `at`.
    pub fn empty(at: DateTime<Utc>) -> Self {
        Self {
            is_online: false,
            is_on: false,
            brightness: None,
            volume: None,
            temperature: None,
            humidity: None,
            battery: None,
            is_cleaning: false,
            mode: None,
            color: None,
            is_locked: None,
            is_recording: None,
            simulated: false,
            last_updated: at,
            last_error: None,
        }
    }

    /// Seeds a status from a device's discovery flags.
    pub fn from_device(device: &Device) -> Self {
        let mut status = Self::empty(device.last_updated);
        status.is_online = device.is_online;
        status.is_on = device.is_on;
        status
    }
}

/// Credentials held for one platform.
///
/// Secrets are stored as [`SecretString`] and never appear in `Debug` output.
#[derive(Clone)]
pub struct Credentials {
    pub platform: Platform,
    pub access_token: Option<SecretString>,
    pub refresh_token: Option<SecretString>,
    pub api_key: Option<SecretString>,
    pub local_ip: Option<String>,
    pub bridge_ip: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub user_id: Option<String>,
}

impl Credentials {
    /// Empty credentials for `platform`; never valid until a field is set.
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            access_token: None,
            refresh_token: None,
            api_key: None,
            local_ip: None,
            bridge_ip: None,
            expires_at: None,
            user_id: None,
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::from(key.into()));
        self
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(SecretString::from(token.into()));
        self
    }

    pub fn with_refresh_token(mut self, token: impl Into<String>) -> Self {
        self.refresh_token = Some(SecretString::from(token.into()));
        self
    }

    pub fn with_local_ip(mut self, ip: impl Into<String>) -> Self {
        self.local_ip = Some(ip.into());
        self
    }

    pub fn with_bridge_ip(mut self, ip: impl Into<String>) -> Self {
        self.bridge_ip = Some(ip.into());
        self
    }

    pub fn with_expiry(mut self, at: DateTime<Utc>) -> Self {
        self.expires_at = Some(at);
        self
    }

    pub fn with_user_id(mut self, user: impl Into<String>) -> Self {
        self.user_id = Some(user.into());
        self
    }

    /// True when unexpired at `now` and at least one usable field is present.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        let unexpired = self.expires_at.is_none_or(|at| at > now);
        unexpired && self.has_usable_field()
    }

    /// True when valid at `now`, or expired but carrying a refresh token.
    pub fn is_acceptable_at(&self, now: DateTime<Utc>) -> bool {
        self.is_valid_at(now) || (self.has_usable_field() && self.refresh_token.is_some())
    }

    fn has_usable_field(&self) -> bool {
        self.access_token.is_some()
            || self.api_key.is_some()
            || self.local_ip.is_some()
            || self.bridge_ip.is_some()
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }

    /// True when the credentials have an expiry in the past.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    /// The bearer secret for cloud calls: access token first, then API key.
    pub fn bearer(&self) -> Option<&str> {
        self.access_token
            .as_ref()
            .or(self.api_key.as_ref())
            .map(|s| s.expose_secret())
    }

    pub fn refresh_secret(&self) -> Option<&str> {
        self.refresh_token.as_ref().map(|s| s.expose_secret())
    }

    /// Local hub or bridge address, whichever is set.
    pub fn host(&self) -> Option<&str> {
        self.bridge_ip.as_deref().or(self.local_ip.as_deref())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn mask(s: &Option<SecretString>) -> &'static str {
            if s.is_some() { "[REDACTED]" } else { "None" }
        }
        f.debug_struct("Credentials")
            .field("platform", &self.platform)
            .field("access_token", &mask(&self.access_token))
            .field("refresh_token", &mask(&self.refresh_token))
            .field("api_key", &mask(&self.api_key))
            .field("local_ip", &self.local_ip)
            .field("bridge_ip", &self.bridge_ip)
            .field("expires_at", &self.expires_at)
            .field("user_id", &self.user_id)
            .finish()
    }
}

/// Authentication lifecycle of one platform.
#[derive(Debug, Clone)]
pub enum AuthState {
    NotAuthenticated,
    Authenticating,
    Authenticated(Credentials),
    Failed(String),
}

impl AuthState {
    /// Short state name used in logs and transition errors.
    pub fn name(&self) -> &'static str {
        match self {
            AuthState::NotAuthenticated => "not-authenticated",
            AuthState::Authenticating => "authenticating",
            AuthState::Authenticated(_) => "authenticated",
            AuthState::Failed(_) => "failed",
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::Authenticated(_))
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        match self {
            AuthState::Authenticated(creds) => Some(creds),
            _ => None,
        }
    }
}

impl PartialEq for AuthState {
    /// Compares by state only; credentials and failure reasons are ignored.
    fn eq(&self, other: &Self) -> bool {
        self.name() == other.name()
    }
}

/// HTTP verb of a translated platform command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum WireMethod {
    Get,
    Post,
    Put,
}

/// A platform-native request produced by command translation.
///
/// `path` is relative to the adapter's device endpoint; the adapter owns the
/// base URL and authentication headers.
#[derive(Debug, Clone, PartialEq)]
pub struct WireCommand {
    pub method: WireMethod,
    pub path: String,
    pub body: Option<serde_json::Value>,
}

impl WireCommand {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: WireMethod::Get,
            path: path.into(),
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: WireMethod::Post,
            path: path.into(),
            body: Some(body),
        }
    }

    pub fn put(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: WireMethod::Put,
            path: path.into(),
            body: Some(body),
        }
    }
}

/// Whole-collection snapshot handed to the persistence collaborator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    pub devices: Vec<Device>,
    pub authenticated_platforms: Vec<Platform>,
}
