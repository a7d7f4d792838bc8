// SPDX-FileCopyrightText: 2026 Domus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The registry's data and the rules for changing it.
//!
//! [`RegistryState`] is plain synchronous data owned by exactly one task; it
//! performs no I/O. Every rule about devices, statuses, and auth lives here so
//! it can be tested without a runtime.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use domus_auth::{AuthTicket, AuthTracker, Completion};
use domus_core::{
    Action, AuthState, Command, Credentials, Device, DeviceId, DeviceStatus, GatewayError, Platform,
    PlatformAdapter, PlatformDevice, RegistrySnapshot, RoomId,
};
use tracing::{debug, info, warn};

/// Adapters keyed by platform, in declaration order.
pub(crate) type Adapters = BTreeMap<Platform, Arc<dyn PlatformAdapter>>;

/// What the caller of [`RegistryState::prepare`] is about to do.
#[derive(Debug, Clone)]
pub(crate) enum Intent {
    /// Read the device's status.
    Status,
    /// Send this command.
    Execute(Command),
    /// Run an action whose parameters are unusable. Checked like
    /// [`Intent::Execute`] but never translated.
    Attempt(Action),
}

/// A device resolved to its adapter and credentials, ready for a network call.
pub(crate) struct Prepared {
    pub platform: Platform,
    pub target: PlatformDevice,
    pub adapter: Arc<dyn PlatformAdapter>,
    pub credentials: Credentials,
}

/// An authenticated platform to include in a discovery pass.
pub(crate) struct DiscoveryTarget {
    pub platform: Platform,
    pub adapter: Arc<dyn PlatformAdapter>,
    pub credentials: Credentials,
}

/// Single-field edits a caller can make to an existing device.
#[derive(Debug, Clone)]
pub(crate) enum DeviceEdit {
    Rename(String),
    Position(domus_core::Position),
    Room(Option<RoomId>),
}

/// Immutable copy of the state published to readers after every change.
#[derive(Debug, Clone, Default)]
pub(crate) struct RegistryView {
    pub devices: Vec<Device>,
    pub statuses: HashMap<DeviceId, DeviceStatus>,
    pub auth: BTreeMap<Platform, AuthState>,
    pub discovery_errors: BTreeMap<Platform, String>,
    pub last_error: Option<String>,
}

#[derive(Debug, Default)]
pub(crate) struct RegistryState {
    devices: BTreeMap<DeviceId, Device>,
    statuses: HashMap<DeviceId, DeviceStatus>,
    auth: AuthTracker,
    discovery_errors: BTreeMap<Platform, String>,
    last_error: Option<String>,
}

impl RegistryState {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Loads devices from a persisted snapshot. Credentials are never persisted,
    /// so previously authenticated platforms start out `NotAuthenticated`.
    pub(crate) fn rehydrate(&mut self, snapshot: RegistrySnapshot) {
        let count = snapshot.devices.len();
        for device in snapshot.devices {
            self.devices.insert(device.id.clone(), device);
        }
        if !snapshot.authenticated_platforms.is_empty() {
            info!(
                platforms = ?snapshot.authenticated_platforms,
                "platforms from the last session need to re-authenticate"
            );
        }
        debug!(count, "registry rehydrated from snapshot");
    }

    pub(crate) fn view(&self) -> RegistryView {
        RegistryView {
            devices: self.devices.values().cloned().collect(),
            statuses: self.statuses.clone(),
            auth: Platform::all()
                .into_iter()
                .map(|p| (p, self.auth.state(p)))
                .collect(),
            discovery_errors: self.discovery_errors.clone(),
            last_error: self.last_error.clone(),
        }
    }

    pub(crate) fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            devices: self.devices.values().cloned().collect(),
            authenticated_platforms: self.auth.authenticated_platforms(),
        }
    }

    pub(crate) fn auth_state(&self, platform: Platform) -> AuthState {
        self.auth.state(platform)
    }

    pub(crate) fn set_last_error(&mut self, message: impl Into<String>) {
        self.last_error = Some(message.into());
    }

    // ----- devices -----

    /// Inserts or replaces a device.
    pub(crate) fn upsert(&mut self, device: Device) -> Result<(), GatewayError> {
        if let Some(existing) = self.devices.get(&device.id) {
            check_platform(existing, &device)?;
        }
        self.devices.insert(device.id.clone(), device);
        Ok(())
    }

    /// Replaces an existing device.
    pub(crate) fn update(&mut self, device: Device) -> Result<(), GatewayError> {
        let existing = self
            .devices
            .get(&device.id)
            .ok_or_else(|| GatewayError::DeviceNotFound {
                id: device.id.clone(),
            })?;
        check_platform(existing, &device)?;
        self.devices.insert(device.id.clone(), device);
        Ok(())
    }

    /// Removes a device and its cached status. Returns whether it existed.
    pub(crate) fn remove(&mut self, id: &DeviceId) -> bool {
        self.statuses.remove(id);
        self.devices.remove(id).is_some()
    }

    pub(crate) fn edit(&mut self, id: &DeviceId, edit: DeviceEdit) -> Result<(), GatewayError> {
        let device = self
            .devices
            .get_mut(id)
            .ok_or_else(|| GatewayError::DeviceNotFound { id: id.clone() })?;
        match edit {
            DeviceEdit::Rename(name) => device.name = name,
            DeviceEdit::Position(position) => device.position = position,
            DeviceEdit::Room(room) => device.room_id = room,
        }
        Ok(())
    }

    /// Folds one platform's discovery results into the device list.
    ///
    /// Known devices keep their user-assigned name, position, and room.
    /// Devices the platform no longer reports are kept. Returns how many
    /// devices were new.
    pub(crate) fn merge_discovered(
        &mut self,
        platform: Platform,
        discovered: Vec<PlatformDevice>,
        at: DateTime<Utc>,
    ) -> usize {
        let mut added = 0;
        for record in discovered {
            let id = DeviceId::for_platform(platform, &record.native_id);
            match self.devices.get_mut(&id) {
                Some(existing) if existing.platform.is_some_and(|p| p != platform) => {
                    warn!(device_id = %id, %platform, "discovered device id is bound to another platform; skipping");
                    continue;
                }
                Some(existing) => {
                    existing.platform = Some(platform);
                    existing.native_id = Some(record.native_id.clone());
                    existing.device_type = record.device_type;
                    existing.is_online = record.is_online;
                    existing.is_on = record.is_on;
                    existing.properties = record.properties.clone();
                    existing.last_updated = at;
                }
                None => {
                    let mut device = Device::from_discovered(platform, &record);
                    device.last_updated = at;
                    self.devices.insert(id.clone(), device);
                    added += 1;
                }
            }

            match self.statuses.get_mut(&id) {
                Some(status) if status.last_updated <= at => {
                    status.is_online = record.is_online;
                    status.is_on = record.is_on;
                    status.last_updated = at;
                }
                Some(_) => {}
                None => {
                    if let Some(device) = self.devices.get(&id) {
                        self.statuses.insert(id.clone(), DeviceStatus::from_device(device));
                    }
                }
            }
        }
        self.discovery_errors.remove(&platform);
        added
    }

    pub(crate) fn record_discovery_failure(&mut self, platform: Platform, reason: String) {
        self.last_error = Some(format!("{}: {reason}", platform.display_name()));
        self.discovery_errors.insert(platform, reason);
    }

    // ----- statuses -----

    /// Replaces a device's cached status unless the cached one is newer.
    ///
    /// Returns whether the status was written.
    pub(crate) fn apply_status(
        &mut self,
        id: &DeviceId,
        status: DeviceStatus,
    ) -> Result<bool, GatewayError> {
        let device = self
            .devices
            .get_mut(id)
            .ok_or_else(|| GatewayError::DeviceNotFound { id: id.clone() })?;
        if let Some(current) = self.statuses.get(id) {
            if status.last_updated < current.last_updated {
                debug!(
                    device_id = %id,
                    cached = %current.last_updated,
                    incoming = %status.last_updated,
                    "discarding out-of-date status"
                );
                return Ok(false);
            }
        }
        device.is_online = status.is_online;
        device.is_on = status.is_on;
        device.last_updated = device.last_updated.max(status.last_updated);
        self.statuses.insert(id.clone(), status);
        Ok(true)
    }

    /// Applies the result of an adapter `execute` call finished at `at`.
    ///
    /// Returns whether the cached status changed.
    pub(crate) fn record_execution(
        &mut self,
        id: &DeviceId,
        command: &Command,
        outcome: Result<(), String>,
        at: DateTime<Utc>,
    ) -> bool {
        let Some(device) = self.devices.get(id) else {
            debug!(device_id = %id, "device removed while its action was in flight");
            return false;
        };
        let mut status = self
            .statuses
            .get(id)
            .cloned()
            .unwrap_or_else(|| DeviceStatus::from_device(device));

        match outcome {
            Ok(()) => {
                command.apply_to(&mut status);
                status.last_updated = status.last_updated.max(at);
                self.apply_status(id, status).unwrap_or(false)
            }
            Err(message) => {
                status.last_error = Some(message.clone());
                self.statuses.insert(id.clone(), status);
                self.last_error = Some(message);
                true
            }
        }
    }

    /// Stores a failure message on a device's status without touching its timestamp.
    pub(crate) fn record_device_error(&mut self, id: &DeviceId, message: String) -> bool {
        let Some(device) = self.devices.get(id) else {
            return false;
        };
        let status = self
            .statuses
            .entry(id.clone())
            .or_insert_with(|| DeviceStatus::from_device(device));
        status.last_error = Some(message.clone());
        self.last_error = Some(message);
        true
    }

    // ----- adapters and auth -----

    /// Resolves `id` for a network call.
    ///
    /// Checks run in this order: unknown device, missing platform or adapter,
    /// action not available for the device type or platform, platform not
    /// authenticated. No check touches the network.
    pub(crate) fn prepare(
        &self,
        id: &DeviceId,
        intent: &Intent,
        adapters: &Adapters,
    ) -> Result<Prepared, GatewayError> {
        let device = self
            .devices
            .get(id)
            .ok_or_else(|| GatewayError::DeviceNotFound { id: id.clone() })?;
        let platform = device
            .platform
            .ok_or(GatewayError::PlatformNotSupported { platform: None })?;
        let adapter = adapters
            .get(&platform)
            .cloned()
            .ok_or(GatewayError::PlatformNotSupported {
                platform: Some(platform),
            })?;
        let target = device
            .to_platform_device()
            .ok_or(GatewayError::PlatformNotSupported { platform: None })?;

        let (action, command) = match intent {
            Intent::Status => (None, None),
            Intent::Execute(command) => (Some(command.action()), Some(command)),
            Intent::Attempt(action) => (Some(*action), None),
        };
        if let Some(action) = action {
            if !action.is_available_for(device.device_type) {
                return Err(GatewayError::ActionUnsupported {
                    action,
                    target: Some(device.device_type.to_string()),
                });
            }
            let mapped = command.is_none_or(|c| adapter.translate(c, &target).is_some());
            if !adapter.supports(action) || !mapped {
                return Err(GatewayError::ActionUnsupported {
                    action,
                    target: Some(platform.display_name().to_string()),
                });
            }
        }

        let credentials = self
            .auth
            .credentials(platform)
            .cloned()
            .ok_or(GatewayError::PlatformNotAuthenticated { platform })?;

        Ok(Prepared {
            platform,
            target,
            adapter,
            credentials,
        })
    }

    pub(crate) fn discovery_targets(&self, adapters: &Adapters) -> Vec<DiscoveryTarget> {
        self.auth
            .authenticated_platforms()
            .into_iter()
            .filter_map(|platform| {
                let adapter = adapters.get(&platform)?.clone();
                let credentials = self.auth.credentials(platform)?.clone();
                Some(DiscoveryTarget {
                    platform,
                    adapter,
                    credentials,
                })
            })
            .collect()
    }

    pub(crate) fn begin_auth(&mut self, platform: Platform) -> AuthTicket {
        self.auth.begin(platform)
    }

    pub(crate) fn complete_auth(
        &mut self,
        ticket: AuthTicket,
        outcome: &Result<Credentials, GatewayError>,
    ) -> Completion {
        let completion = self.auth.complete(ticket, outcome);
        if let Completion::Applied(AuthState::Failed(reason)) = &completion {
            self.last_error = Some(reason.clone());
        }
        completion
    }

    pub(crate) fn replace_credentials(
        &mut self,
        platform: Platform,
        credentials: Credentials,
    ) -> Result<(), GatewayError> {
        self.auth.replace_credentials(platform, credentials)
    }

    /// Drops a platform's credentials. Its devices stay in the registry.
    pub(crate) fn disconnect(&mut self, platform: Platform) -> Result<(), GatewayError> {
        self.auth.disconnect(platform)?;
        self.discovery_errors.remove(&platform);
        Ok(())
    }

    /// Forgets devices, statuses, errors, and every platform's credentials.
    pub(crate) fn reset(&mut self) {
        self.devices.clear();
        self.statuses.clear();
        self.auth.reset();
        self.discovery_errors.clear();
        self.last_error = None;
    }
}

/// Rejects moving a bound device to a different platform or unbinding it.
fn check_platform(existing: &Device, incoming: &Device) -> Result<(), GatewayError> {
    match (existing.platform, incoming.platform) {
        (Some(bound), requested) if requested != Some(bound) => {
            Err(GatewayError::PlatformConflict {
                id: existing.id.clone(),
                existing: bound,
                requested,
            })
        }
        _ => Ok(()),
    }
}
