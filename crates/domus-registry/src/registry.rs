// SPDX-FileCopyrightText: 2026 Domus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The cloneable registry handle and its builder.

use std::sync::Arc;

use chrono::Utc;
use domus_auth::Completion;
use domus_core::{
    Action, AuthState, AuthType, Command, Credentials, Device, DeviceId, DeviceStatus,
    GatewayError, Platform, PlatformAdapter, Position, RegistrySnapshot, RoomId, SnapshotSink,
};
use futures::future::join_all;
use serde_json::Value;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tracing::{debug, info, warn};

use crate::actor::{forward_snapshots, Owner, Request};
use crate::event::{DiscoveryReport, PlatformStatus, RegistryEvent};
use crate::state::{Adapters, DeviceEdit, Intent, Prepared, RegistryState, RegistryView};

const REQUEST_QUEUE_DEPTH: usize = 64;
const EVENT_CAPACITY: usize = 128;

/// Builder for a [`Registry`].
pub struct RegistryBuilder {
    adapters: Adapters,
    sink: Option<Arc<dyn SnapshotSink>>,
    snapshot: Option<RegistrySnapshot>,
}

impl RegistryBuilder {
    fn new() -> Self {
        Self {
            adapters: Adapters::new(),
            sink: None,
            snapshot: None,
        }
    }

    /// Registers the adapter for its platform, replacing any earlier one.
    pub fn with_adapter(mut self, adapter: Arc<dyn PlatformAdapter>) -> Self {
        let platform = adapter.platform();
        if self.adapters.insert(platform, adapter).is_some() {
            warn!(%platform, "replacing previously registered adapter");
        }
        self
    }

    pub fn with_adapters(self, adapters: impl IntoIterator<Item = Arc<dyn PlatformAdapter>>) -> Self {
        adapters
            .into_iter()
            .fold(self, |builder, adapter| builder.with_adapter(adapter))
    }

    /// Receives a snapshot after every successful mutation.
    pub fn with_sink(mut self, sink: Arc<dyn SnapshotSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Starts from a previously persisted snapshot.
    pub fn with_snapshot(mut self, snapshot: RegistrySnapshot) -> Self {
        self.snapshot = Some(snapshot);
        self
    }

    /// Spawns the owner task (and the snapshot forwarder, if a sink is set).
    ///
    /// Must be called from within a Tokio runtime.
    pub fn build(self) -> Registry {
        let mut state = RegistryState::new();
        if let Some(snapshot) = self.snapshot {
            state.rehydrate(snapshot);
        }

        let adapters = Arc::new(self.adapters);
        let (view_tx, view_rx) = watch::channel(Arc::new(state.view()));
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (requests, requests_rx) = mpsc::channel(REQUEST_QUEUE_DEPTH);

        let snapshots = self.sink.map(|sink| {
            let (tx, rx) = mpsc::unbounded_channel();
            tokio::spawn(forward_snapshots(sink, rx));
            tx
        });

        let owner = Owner::new(state, Arc::clone(&adapters), view_tx, events.clone(), snapshots);
        tokio::spawn(owner.run(requests_rx));
        info!(platforms = adapters.len(), "device registry started");

        Registry {
            requests,
            view: view_rx,
            events,
            adapters,
        }
    }
}

/// Handle to the device registry.
///
/// Clones share one owner task. Reads are served from the latest published
/// view and never wait on the owner; mutations are serialized by it. Network
/// calls run on the caller's task, never on the owner.
#[derive(Clone)]
pub struct Registry {
    requests: mpsc::Sender<Request>,
    view: watch::Receiver<Arc<RegistryView>>,
    events: broadcast::Sender<RegistryEvent>,
    adapters: Arc<Adapters>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    async fn call<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Request) -> Result<T, GatewayError> {
        let (tx, rx) = oneshot::channel();
        self.requests.send(make(tx)).await.map_err(|_| owner_stopped())?;
        rx.await.map_err(|_| owner_stopped())
    }

    fn read<T>(&self, f: impl FnOnce(&RegistryView) -> T) -> T {
        f(&self.view.borrow())
    }

    fn adapter(&self, platform: Platform) -> Result<Arc<dyn PlatformAdapter>, GatewayError> {
        self.adapters
            .get(&platform)
            .cloned()
            .ok_or(GatewayError::PlatformNotSupported {
                platform: Some(platform),
            })
    }

    // ----- reads -----

    /// All devices, ordered by id.
    pub fn devices(&self) -> Vec<Device> {
        self.read(|v| v.devices.clone())
    }

    pub fn devices_for_platform(&self, platform: Platform) -> Vec<Device> {
        self.read(|v| {
            v.devices
                .iter()
                .filter(|d| d.platform == Some(platform))
                .cloned()
                .collect()
        })
    }

    pub fn devices_in_room(&self, room: &RoomId) -> Vec<Device> {
        self.read(|v| {
            v.devices
                .iter()
                .filter(|d| d.room_id.as_ref() == Some(room))
                .cloned()
                .collect()
        })
    }

    pub fn device_by_id(&self, id: &DeviceId) -> Option<Device> {
        self.read(|v| v.devices.iter().find(|d| &d.id == id).cloned())
    }

    pub fn status_of(&self, id: &DeviceId) -> Option<DeviceStatus> {
        self.read(|v| v.statuses.get(id).cloned())
    }

    pub fn auth_state(&self, platform: Platform) -> AuthState {
        self.read(|v| {
            v.auth
                .get(&platform)
                .cloned()
                .unwrap_or(AuthState::NotAuthenticated)
        })
    }

    /// Authenticated platforms in declaration order.
    pub fn connected_platforms(&self) -> Vec<Platform> {
        self.read(|v| {
            v.auth
                .iter()
                .filter(|(_, state)| state.is_authenticated())
                .map(|(p, _)| *p)
                .collect()
        })
    }

    /// One summary per platform that has an adapter.
    pub fn platform_statuses(&self) -> Vec<PlatformStatus> {
        self.read(|v| {
            self.adapters
                .iter()
                .map(|(platform, adapter)| PlatformStatus {
                    platform: *platform,
                    auth_state: v
                        .auth
                        .get(platform)
                        .cloned()
                        .unwrap_or(AuthState::NotAuthenticated),
                    device_count: v
                        .devices
                        .iter()
                        .filter(|d| d.platform == Some(*platform))
                        .count(),
                    discovery_error: v.discovery_errors.get(platform).cloned(),
                    simulated: adapter.is_simulated(),
                })
                .collect()
        })
    }

    /// The most recent human-readable error from any registry operation.
    pub fn last_error(&self) -> Option<String> {
        self.read(|v| v.last_error.clone())
    }

    /// The device list and authenticated platforms, as handed to the sink.
    pub fn snapshot(&self) -> RegistrySnapshot {
        self.read(|v| RegistrySnapshot {
            devices: v.devices.clone(),
            authenticated_platforms: v
                .auth
                .iter()
                .filter(|(_, state)| state.is_authenticated())
                .map(|(p, _)| *p)
                .collect(),
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.events.subscribe()
    }

    // ----- device mutations -----

    /// Inserts or replaces a device by id.
    pub async fn add_device(&self, device: Device) -> Result<(), GatewayError> {
        self.call(|reply| Request::Upsert { device, reply }).await?
    }

    /// Removes a device and its cached status. Removing an unknown id is a no-op.
    pub async fn remove_device(&self, id: &DeviceId) -> Result<(), GatewayError> {
        let removed = self
            .call(|reply| Request::Remove {
                id: id.clone(),
                reply,
            })
            .await?;
        if !removed {
            debug!(device_id = %id, "remove of unknown device ignored");
        }
        Ok(())
    }

    /// Replaces an existing device; fails with `DeviceNotFound` otherwise.
    pub async fn update_device(&self, device: Device) -> Result<(), GatewayError> {
        self.call(|reply| Request::Update { device, reply }).await?
    }

    pub async fn rename_device(&self, id: &DeviceId, name: impl Into<String>) -> Result<(), GatewayError> {
        self.edit(id, DeviceEdit::Rename(name.into())).await
    }

    /// Stores a placement from the scanning collaborator as-is.
    pub async fn set_position(&self, id: &DeviceId, position: Position) -> Result<(), GatewayError> {
        self.edit(id, DeviceEdit::Position(position)).await
    }

    pub async fn assign_room(&self, id: &DeviceId, room: Option<RoomId>) -> Result<(), GatewayError> {
        self.edit(id, DeviceEdit::Room(room)).await
    }

    async fn edit(&self, id: &DeviceId, edit: DeviceEdit) -> Result<(), GatewayError> {
        self.call(|reply| Request::Edit {
            id: id.clone(),
            edit,
            reply,
        })
        .await?
    }

    // ----- authentication -----

    /// Runs the platform's auth flow and, on success, a discovery pass.
    ///
    /// `secret` is the API key for api-key platforms and the optional
    /// pre-shared hub token for local-network platforms; other platforms
    /// ignore it. Discovery failures are recorded per platform and do not
    /// fail the call.
    pub async fn authenticate(&self, platform: Platform, secret: Option<&str>) -> Result<(), GatewayError> {
        let adapter = self.adapter(platform)?;
        if platform.auth_type() == AuthType::ApiKey && secret.is_none_or(|k| k.trim().is_empty()) {
            return Err(GatewayError::auth_failed(format!(
                "{} requires an API key",
                platform.display_name()
            )));
        }

        info!(%platform, auth_type = %platform.auth_type(), "authenticating platform");
        let ticket = self.call(|reply| Request::BeginAuth { platform, reply }).await?;
        let outcome = match (platform.auth_type(), secret) {
            (AuthType::ApiKey, Some(key)) => adapter.authenticate_with_key(key).await,
            (AuthType::LocalNetwork, Some(token)) => match adapter.authenticate().await {
                Ok(located) => match located.host() {
                    Some(host) => adapter.authenticate_with_token(token, host).await,
                    None => Err(GatewayError::auth_failed("hub address unknown after probing")),
                },
                Err(e) => Err(e),
            },
            _ => adapter.authenticate().await,
        };
        self.finish_auth(ticket, outcome).await
    }

    /// Completes a local hub with a token and an already-known address.
    pub async fn authenticate_with_token(
        &self,
        platform: Platform,
        token: &str,
        host: &str,
    ) -> Result<(), GatewayError> {
        let adapter = self.adapter(platform)?;
        let ticket = self.call(|reply| Request::BeginAuth { platform, reply }).await?;
        let outcome = adapter.authenticate_with_token(token, host).await;
        self.finish_auth(ticket, outcome).await
    }

    async fn finish_auth(
        &self,
        ticket: domus_auth::AuthTicket,
        outcome: Result<Credentials, GatewayError>,
    ) -> Result<(), GatewayError> {
        let platform = ticket.platform;
        let (completion, outcome) = self
            .call(|reply| Request::CompleteAuth {
                ticket,
                outcome,
                reply,
            })
            .await?;

        match completion {
            Completion::Stale => Err(GatewayError::auth_failed(format!(
                "{} authentication was superseded by a newer attempt",
                platform.display_name()
            ))),
            Completion::Applied(AuthState::Authenticated(_)) => {
                let report = self.discover_all().await?;
                if !report.is_complete() {
                    let failed: Vec<Platform> = report.failed.keys().copied().collect();
                    warn!(%platform, ?failed, "discovery incomplete after authentication");
                }
                Ok(())
            }
            // An `Ok` outcome only fails when its credentials were unusable.
            Completion::Applied(AuthState::Failed(_)) => Err(outcome
                .err()
                .unwrap_or(GatewayError::InvalidCredentials { platform })),
            Completion::Applied(state) => Err(GatewayError::Internal(format!(
                "authentication of {platform} ended in state {}",
                state.name()
            ))),
        }
    }

    /// Drops a platform's credentials. Its devices stay, but actions on them
    /// fail with `PlatformNotAuthenticated` until it re-authenticates.
    pub async fn disconnect(&self, platform: Platform) -> Result<(), GatewayError> {
        self.call(|reply| Request::Disconnect { platform, reply }).await?
    }

    // ----- discovery -----

    /// Lists devices on every authenticated platform concurrently.
    ///
    /// One platform's failure never prevents the others' devices from being
    /// merged; it is stored on that platform's status and in the report.
    pub async fn discover_all(&self) -> Result<DiscoveryReport, GatewayError> {
        let targets = self.call(|reply| Request::DiscoveryTargets { reply }).await?;
        let results = join_all(targets.into_iter().map(|target| async move {
            let outcome = match self
                .fresh_credentials(target.platform, &target.adapter, target.credentials)
                .await
            {
                Ok(credentials) => target.adapter.discover(&credentials).await,
                Err(e) => Err(e),
            };
            (target.platform, outcome)
        }))
        .await;

        let mut report = DiscoveryReport::default();
        for (platform, outcome) in results {
            let outcome = match outcome {
                Ok(devices) => {
                    info!(%platform, count = devices.len(), "devices discovered");
                    report.discovered.insert(platform, devices.len());
                    Ok(devices)
                }
                Err(e) => {
                    warn!(%platform, error = %e, "discovery failed");
                    report.failed.insert(platform, e.to_string());
                    Err(e.to_string())
                }
            };
            self.call(|reply| Request::MergeDiscovered {
                platform,
                outcome,
                reply,
            })
            .await?;
        }
        Ok(report)
    }

    // ----- actions and status -----

    /// Performs `command` on a device through its platform's adapter.
    ///
    /// A command whose parameters are unusable (see
    /// [`Command::has_valid_params`]) passes the same checks and is then a
    /// logged no-op.
    pub async fn execute(&self, id: &DeviceId, command: Command) -> Result<(), GatewayError> {
        let action = command.action();
        if !command.has_valid_params() {
            return self.skip_action(id, action).await;
        }
        let prepared = self
            .call(|reply| Request::Prepare {
                id: id.clone(),
                intent: Intent::Execute(command.clone()),
                reply,
            })
            .await??;

        let outcome = self.run_execute(&prepared, &command).await;
        let recorded = outcome.as_ref().map(|_| ()).map_err(ToString::to_string);
        self.call(|reply| Request::RecordExecution {
            id: id.clone(),
            command,
            outcome: recorded,
            at: Utc::now(),
            reply,
        })
        .await?;

        match &outcome {
            Ok(()) => info!(device_id = %id, %action, "action executed"),
            Err(e) => warn!(device_id = %id, %action, error = %e, "action failed"),
        }
        outcome
    }

    async fn run_execute(&self, prepared: &Prepared, command: &Command) -> Result<(), GatewayError> {
        let credentials = self
            .fresh_credentials(prepared.platform, &prepared.adapter, prepared.credentials.clone())
            .await?;
        prepared
            .adapter
            .execute(command, &prepared.target, &credentials)
            .await
    }

    /// Builds the command from an untyped parameter bag and executes it.
    ///
    /// A missing or ill-typed required parameter makes this a logged no-op.
    pub async fn execute_params(
        &self,
        id: &DeviceId,
        action: Action,
        params: Option<&Value>,
    ) -> Result<(), GatewayError> {
        match Command::from_params(action, params) {
            Some(command) => self.execute(id, command).await,
            None => self.skip_action(id, action).await,
        }
    }

    /// Runs every check `execute` would for `action`, then does nothing.
    async fn skip_action(&self, id: &DeviceId, action: Action) -> Result<(), GatewayError> {
        self.call(|reply| Request::Prepare {
            id: id.clone(),
            intent: Intent::Attempt(action),
            reply,
        })
        .await??;
        warn!(device_id = %id, %action, "parameters missing or invalid; nothing executed");
        Ok(())
    }

    /// Reads a device's state from its platform and caches it.
    pub async fn refresh_status(&self, id: &DeviceId) -> Result<DeviceStatus, GatewayError> {
        let prepared = self
            .call(|reply| Request::Prepare {
                id: id.clone(),
                intent: Intent::Status,
                reply,
            })
            .await??;

        let outcome = match self
            .fresh_credentials(prepared.platform, &prepared.adapter, prepared.credentials.clone())
            .await
        {
            Ok(credentials) => prepared.adapter.fetch_status(&prepared.target, &credentials).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(status) => {
                self.apply_status(id, status.clone()).await?;
                Ok(self.status_of(id).unwrap_or(status))
            }
            Err(e) => {
                warn!(device_id = %id, error = %e, "status refresh failed");
                self.call(|reply| Request::RecordDeviceError {
                    id: id.clone(),
                    message: e.to_string(),
                    reply,
                })
                .await?;
                Err(e)
            }
        }
    }

    /// Caches `status` unless the cached one is newer. Returns whether it was written.
    pub async fn apply_status(&self, id: &DeviceId, status: DeviceStatus) -> Result<bool, GatewayError> {
        self.call(|reply| Request::ApplyStatus {
            id: id.clone(),
            status,
            reply,
        })
        .await?
    }

    /// Clears devices, statuses, and errors, and disconnects every platform.
    pub async fn reset_all(&self) -> Result<(), GatewayError> {
        self.call(|reply| Request::Reset { reply }).await?;
        info!("registry reset");
        Ok(())
    }

    /// Returns usable credentials, refreshing expired ones once.
    async fn fresh_credentials(
        &self,
        platform: Platform,
        adapter: &Arc<dyn PlatformAdapter>,
        credentials: Credentials,
    ) -> Result<Credentials, GatewayError> {
        if !credentials.is_expired_at(Utc::now()) {
            return Ok(credentials);
        }
        if credentials.refresh_secret().is_none() {
            return Err(GatewayError::PlatformNotAuthenticated { platform });
        }
        info!(%platform, "access token expired; refreshing");
        let refreshed = adapter.refresh(&credentials).await?;
        self.call(|reply| Request::ReplaceCredentials {
            platform,
            credentials: refreshed.clone(),
            reply,
        })
        .await??;
        Ok(refreshed)
    }
}

fn owner_stopped() -> GatewayError {
    GatewayError::Internal("registry task has stopped".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use domus_core::{DeviceType, PlatformDevice, WireCommand};
    use tracing_test::traced_test;

    /// Authenticates with any key, then fails every network call.
    struct Unreachable(Platform);

    #[async_trait]
    impl PlatformAdapter for Unreachable {
        fn platform(&self) -> Platform {
            self.0
        }

        fn supports(&self, _action: Action) -> bool {
            true
        }

        fn translate(&self, _command: &Command, device: &PlatformDevice) -> Option<WireCommand> {
            Some(WireCommand::get(format!("/{}", device.native_id)))
        }

        async fn authenticate_with_key(&self, key: &str) -> Result<Credentials, GatewayError> {
            Ok(Credentials::new(self.0).with_api_key(key))
        }

        async fn discover(&self, _credentials: &Credentials) -> Result<Vec<PlatformDevice>, GatewayError> {
            Err(GatewayError::DeviceDiscoveryFailed {
                reason: "cloud down".into(),
            })
        }

        async fn execute(
            &self,
            _command: &Command,
            _device: &PlatformDevice,
            _credentials: &Credentials,
        ) -> Result<(), GatewayError> {
            Err(GatewayError::ActionExecutionFailed {
                reason: "bulb offline".into(),
            })
        }

        async fn fetch_status(
            &self,
            _device: &PlatformDevice,
            _credentials: &Credentials,
        ) -> Result<DeviceStatus, GatewayError> {
            Err(GatewayError::DeviceStatusFailed {
                reason: "bulb offline".into(),
            })
        }
    }

    #[tokio::test]
    #[traced_test]
    async fn network_failures_are_logged() {
        let registry = Registry::builder()
            .with_adapter(Arc::new(Unreachable(Platform::Lifx)))
            .build();

        registry.authenticate(Platform::Lifx, Some("key")).await.unwrap();
        assert!(logs_contain("discovery failed"));

        let device = Device::new("lifx:b", "Bulb", DeviceType::Bulb).with_platform(Platform::Lifx, "b");
        registry.add_device(device.clone()).await.unwrap();
        assert!(registry.execute(&device.id, Command::TurnOn).await.is_err());
        assert!(logs_contain("action failed"));
        assert!(registry.refresh_status(&device.id).await.is_err());
        assert!(logs_contain("status refresh failed"));
    }

    #[tokio::test]
    async fn later_adapter_for_a_platform_wins() {
        let registry = Registry::builder()
            .with_adapters([
                Arc::new(Unreachable(Platform::Wyze)) as Arc<dyn PlatformAdapter>,
                Arc::new(Unreachable(Platform::Wyze)) as Arc<dyn PlatformAdapter>,
                Arc::new(Unreachable(Platform::Ring)) as Arc<dyn PlatformAdapter>,
            ])
            .build();
        let platforms: Vec<Platform> = registry
            .platform_statuses()
            .into_iter()
            .map(|s| s.platform)
            .collect();
        assert_eq!(platforms, vec![Platform::Ring, Platform::Wyze]);
    }

    #[tokio::test]
    async fn reads_reflect_an_awaited_mutation_immediately() {
        let registry = Registry::builder().build();
        let handle = registry.clone();
        handle
            .add_device(Device::new("tv", "TV", DeviceType::Tv))
            .await
            .unwrap();
        assert!(registry.device_by_id(&DeviceId::from("tv")).is_some());
        assert_eq!(registry.snapshot().devices.len(), 1);
    }
}
