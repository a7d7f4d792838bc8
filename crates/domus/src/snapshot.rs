// SPDX-FileCopyrightText: 2026 Domus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! JSON file persistence for registry snapshots.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use domus_core::{GatewayError, RegistrySnapshot, SnapshotSink};
use tracing::debug;

/// Writes each snapshot to one JSON file, replacing the previous one.
pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the last persisted snapshot. A missing file is `Ok(None)`.
    pub async fn load(&self) -> Result<Option<RegistrySnapshot>, GatewayError> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(GatewayError::Internal(format!(
                    "failed to read {}: {e}",
                    self.path.display()
                )));
            }
        };
        serde_json::from_slice(&raw).map(Some).map_err(|e| {
            GatewayError::Internal(format!("corrupt snapshot {}: {e}", self.path.display()))
        })
    }
}

#[async_trait]
impl SnapshotSink for JsonFileSink {
    async fn persist(&self, snapshot: RegistrySnapshot) -> Result<(), GatewayError> {
        let body = serde_json::to_vec_pretty(&snapshot)
            .map_err(|e| GatewayError::Internal(format!("failed to encode snapshot: {e}")))?;
        if let Some(dir) = self.path.parent() {
            tokio::fs::create_dir_all(dir).await.map_err(|e| {
                GatewayError::Internal(format!("failed to create {}: {e}", dir.display()))
            })?;
        }

        // Staged write, then rename over the previous snapshot.
        let staging = self.path.with_extension("json.tmp");
        tokio::fs::write(&staging, &body).await.map_err(|e| {
            GatewayError::Internal(format!("failed to write {}: {e}", staging.display()))
        })?;
        tokio::fs::rename(&staging, &self.path).await.map_err(|e| {
            GatewayError::Internal(format!("failed to replace {}: {e}", self.path.display()))
        })?;
        debug!(path = %self.path.display(), devices = snapshot.devices.len(), "snapshot written");
        Ok(())
    }
}
