// SPDX-FileCopyrightText: 2026 Domus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The task that owns [`RegistryState`] and serializes every mutation.
//!
//! Handles send a [`Request`] over an mpsc channel and wait on a oneshot for
//! the reply. After each request the owner publishes a fresh
//! [`RegistryView`] on the watch channel before replying, so a caller that
//! reads right after an awaited mutation sees its effect.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use domus_auth::{AuthTicket, Completion};
use domus_core::{
    Command, Credentials, Device, DeviceId, DeviceStatus, GatewayError, Platform, PlatformDevice,
    RegistrySnapshot, SnapshotSink,
};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tracing::{debug, warn};

use crate::event::RegistryEvent;
use crate::state::{
    Adapters, DeviceEdit, DiscoveryTarget, Intent, Prepared, RegistryState, RegistryView,
};

type Reply<T> = oneshot::Sender<T>;

pub(crate) enum Request {
    Upsert {
        device: Device,
        reply: Reply<Result<(), GatewayError>>,
    },
    Update {
        device: Device,
        reply: Reply<Result<(), GatewayError>>,
    },
    Remove {
        id: DeviceId,
        reply: Reply<bool>,
    },
    Edit {
        id: DeviceId,
        edit: DeviceEdit,
        reply: Reply<Result<(), GatewayError>>,
    },
    BeginAuth {
        platform: Platform,
        reply: Reply<AuthTicket>,
    },
    /// The outcome travels back with the reply so the caller keeps the typed error.
    CompleteAuth {
        ticket: AuthTicket,
        outcome: Result<Credentials, GatewayError>,
        reply: Reply<(Completion, Result<Credentials, GatewayError>)>,
    },
    ReplaceCredentials {
        platform: Platform,
        credentials: Credentials,
        reply: Reply<Result<(), GatewayError>>,
    },
    Disconnect {
        platform: Platform,
        reply: Reply<Result<(), GatewayError>>,
    },
    DiscoveryTargets {
        reply: Reply<Vec<DiscoveryTarget>>,
    },
    MergeDiscovered {
        platform: Platform,
        outcome: Result<Vec<PlatformDevice>, String>,
        reply: Reply<()>,
    },
    Prepare {
        id: DeviceId,
        intent: Intent,
        reply: Reply<Result<Prepared, GatewayError>>,
    },
    RecordExecution {
        id: DeviceId,
        command: Command,
        outcome: Result<(), String>,
        at: DateTime<Utc>,
        reply: Reply<()>,
    },
    RecordDeviceError {
        id: DeviceId,
        message: String,
        reply: Reply<()>,
    },
    ApplyStatus {
        id: DeviceId,
        status: DeviceStatus,
        reply: Reply<Result<bool, GatewayError>>,
    },
    Reset {
        reply: Reply<()>,
    },
}

pub(crate) struct Owner {
    state: RegistryState,
    adapters: Arc<Adapters>,
    view: watch::Sender<Arc<RegistryView>>,
    events: broadcast::Sender<RegistryEvent>,
    snapshots: Option<mpsc::UnboundedSender<RegistrySnapshot>>,
}

impl Owner {
    pub(crate) fn new(
        state: RegistryState,
        adapters: Arc<Adapters>,
        view: watch::Sender<Arc<RegistryView>>,
        events: broadcast::Sender<RegistryEvent>,
        snapshots: Option<mpsc::UnboundedSender<RegistrySnapshot>>,
    ) -> Self {
        Self {
            state,
            adapters,
            view,
            events,
            snapshots,
        }
    }

    /// Serves requests until every handle is dropped.
    pub(crate) async fn run(mut self, mut requests: mpsc::Receiver<Request>) {
        while let Some(request) = requests.recv().await {
            self.handle(request);
        }
        debug!("registry owner stopped");
    }

    fn handle(&mut self, request: Request) {
        match request {
            Request::Upsert { device, reply } => {
                let result = self.state.upsert(device);
                self.after_device_change(result.is_ok());
                let _ = reply.send(result);
            }
            Request::Update { device, reply } => {
                let result = self.state.update(device);
                self.after_device_change(result.is_ok());
                let _ = reply.send(result);
            }
            Request::Remove { id, reply } => {
                let removed = self.state.remove(&id);
                self.after_device_change(removed);
                let _ = reply.send(removed);
            }
            Request::Edit { id, edit, reply } => {
                let result = self.state.edit(&id, edit);
                self.after_device_change(result.is_ok());
                let _ = reply.send(result);
            }
            Request::BeginAuth { platform, reply } => {
                let ticket = self.state.begin_auth(platform);
                self.after_auth_change(platform, false);
                let _ = reply.send(ticket);
            }
            Request::CompleteAuth {
                ticket,
                outcome,
                reply,
            } => {
                let completion = self.state.complete_auth(ticket, &outcome);
                if matches!(completion, Completion::Applied(_)) {
                    self.after_auth_change(ticket.platform, true);
                }
                let _ = reply.send((completion, outcome));
            }
            Request::ReplaceCredentials {
                platform,
                credentials,
                reply,
            } => {
                let result = self.state.replace_credentials(platform, credentials);
                if result.is_ok() {
                    self.publish();
                }
                let _ = reply.send(result);
            }
            Request::Disconnect { platform, reply } => {
                let before = self.state.auth_state(platform);
                let result = self.state.disconnect(platform);
                let changed = result.is_ok() && before != self.state.auth_state(platform);
                if changed {
                    self.after_auth_change(platform, true);
                }
                let _ = reply.send(result);
            }
            Request::DiscoveryTargets { reply } => {
                let _ = reply.send(self.state.discovery_targets(&self.adapters));
            }
            Request::MergeDiscovered {
                platform,
                outcome,
                reply,
            } => {
                match outcome {
                    Ok(devices) => {
                        let added = self.state.merge_discovered(platform, devices, Utc::now());
                        debug!(%platform, added, "discovery results merged");
                        self.after_device_change(true);
                    }
                    Err(reason) => {
                        self.state.record_discovery_failure(platform, reason.clone());
                        self.publish();
                        self.emit(RegistryEvent::DiscoveryFailed { platform, reason });
                    }
                }
                let _ = reply.send(());
            }
            Request::Prepare { id, intent, reply } => {
                let result = self.state.prepare(&id, &intent, &self.adapters);
                if let Err(e) = &result {
                    self.state.set_last_error(e.to_string());
                    self.publish();
                }
                let _ = reply.send(result);
            }
            Request::RecordExecution {
                id,
                command,
                outcome,
                at,
                reply,
            } => {
                if self.state.record_execution(&id, &command, outcome, at) {
                    self.after_status_change(id);
                } else {
                    self.publish();
                }
                let _ = reply.send(());
            }
            Request::RecordDeviceError { id, message, reply } => {
                if self.state.record_device_error(&id, message) {
                    self.after_status_change(id);
                }
                let _ = reply.send(());
            }
            Request::ApplyStatus { id, status, reply } => {
                let result = self.state.apply_status(&id, status);
                if matches!(result, Ok(true)) {
                    self.after_status_change(id);
                }
                let _ = reply.send(result);
            }
            Request::Reset { reply } => {
                self.state.reset();
                self.after_device_change(true);
                for platform in self.adapters.keys() {
                    self.emit(RegistryEvent::AuthStateChanged {
                        platform: *platform,
                        state: self.state.auth_state(*platform),
                    });
                }
                let _ = reply.send(());
            }
        }
    }

    fn publish(&self) {
        self.view.send_replace(Arc::new(self.state.view()));
    }

    fn emit(&self, event: RegistryEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn persist(&self) {
        if let Some(snapshots) = &self.snapshots {
            if snapshots.send(self.state.snapshot()).is_err() {
                warn!("snapshot forwarder has stopped; snapshot dropped");
            }
        }
    }

    fn after_device_change(&self, changed: bool) {
        if changed {
            self.publish();
            self.persist();
            self.emit(RegistryEvent::DevicesChanged);
        }
    }

    fn after_auth_change(&self, platform: Platform, persist: bool) {
        self.publish();
        if persist {
            self.persist();
        }
        self.emit(RegistryEvent::AuthStateChanged {
            platform,
            state: self.state.auth_state(platform),
        });
    }

    fn after_status_change(&self, device_id: DeviceId) {
        self.publish();
        self.emit(RegistryEvent::StatusChanged { device_id });
    }
}

/// Hands snapshots to the sink one at a time, in the order they were taken.
pub(crate) async fn forward_snapshots(
    sink: Arc<dyn SnapshotSink>,
    mut snapshots: mpsc::UnboundedReceiver<RegistrySnapshot>,
) {
    while let Some(snapshot) = snapshots.recv().await {
        let devices = snapshot.devices.len();
        match sink.persist(snapshot).await {
            Ok(()) => debug!(devices, "registry snapshot persisted"),
            Err(e) => warn!(error = %e, "failed to persist registry snapshot"),
        }
    }
    debug!("snapshot forwarder stopped");
}
