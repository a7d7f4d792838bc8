// SPDX-FileCopyrightText: 2026 Domus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Boundary with the persistence collaborator.

use async_trait::async_trait;

use crate::error::GatewayError;
use crate::types::RegistrySnapshot;

/// Receives whole-collection snapshots after every successful registry mutation.
///
/// Snapshots are delivered in mutation order. A failing sink is logged and
/// never rolls back the registry.
#[async_trait]
pub trait SnapshotSink: Send + Sync + 'static {
    async fn persist(&self, snapshot: RegistrySnapshot) -> Result<(), GatewayError>;
}
