// SPDX-FileCopyrightText: 2026 Domus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Change notifications and read-side projections published by the registry.

use std::collections::BTreeMap;

use domus_core::{AuthState, DeviceId, Platform};

/// A change broadcast to [`crate::Registry::subscribe`] receivers.
///
/// Events are hints: receivers that lag behind may miss some and should
/// re-read the registry instead of replaying them.
#[derive(Debug, Clone)]
pub enum RegistryEvent {
    /// A platform's auth state changed (begin, completion, disconnect, reset).
    AuthStateChanged { platform: Platform, state: AuthState },
    /// Devices were added, removed, or edited.
    DevicesChanged,
    /// A device's cached status changed.
    StatusChanged { device_id: DeviceId },
    /// One platform's discovery call failed during a discovery pass.
    DiscoveryFailed { platform: Platform, reason: String },
}

/// Per-platform summary for the UI.
#[derive(Debug, Clone)]
pub struct PlatformStatus {
    pub platform: Platform,
    pub auth_state: AuthState,
    pub device_count: usize,
    /// Error from the platform's most recent discovery call, if it failed.
    pub discovery_error: Option<String>,
    pub simulated: bool,
}

impl PlatformStatus {
    pub fn is_connected(&self) -> bool {
        self.auth_state.is_authenticated()
    }
}

/// Outcome of one discovery pass across all authenticated platforms.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryReport {
    /// Devices reported by each platform that answered.
    pub discovered: BTreeMap<Platform, usize>,
    /// Failure message of each platform whose discovery call failed.
    pub failed: BTreeMap<Platform, String>,
}

impl DiscoveryReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn total(&self) -> usize {
        self.discovered.values().sum()
    }
}
