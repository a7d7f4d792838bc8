// SPDX-FileCopyrightText: 2026 Domus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory snapshot sink.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use domus_core::{GatewayError, RegistrySnapshot, SnapshotSink};

/// Keeps every snapshot it receives, in arrival order.
#[derive(Default)]
pub struct MemorySink {
    snapshots: Mutex<Vec<RegistrySnapshot>>,
    failing: AtomicBool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose `persist` always fails (nothing is stored).
    pub fn failing() -> Self {
        let sink = Self::default();
        sink.failing.store(true, Ordering::SeqCst);
        sink
    }

    pub async fn snapshots(&self) -> Vec<RegistrySnapshot> {
        self.snapshots.lock().await.clone()
    }

    pub async fn last(&self) -> Option<RegistrySnapshot> {
        self.snapshots.lock().await.last().cloned()
    }

    /// Waits until at least `count` snapshots have arrived, for up to two seconds.
    ///
    /// Returns whatever has arrived by then.
    pub async fn wait_for(&self, count: usize) -> Vec<RegistrySnapshot> {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        loop {
            let snapshots = self.snapshots().await;
            if snapshots.len() >= count || tokio::time::Instant::now() >= deadline {
                return snapshots;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

#[async_trait]
impl SnapshotSink for MemorySink {
    async fn persist(&self, snapshot: RegistrySnapshot) -> Result<(), GatewayError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(GatewayError::Internal("memory sink configured to fail".into()));
        }
        self.snapshots.lock().await.push(snapshot);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn keeps_snapshots_in_order() {
        let sink = MemorySink::new();
        for n in 0..3 {
            let snapshot = RegistrySnapshot {
                devices: Vec::new(),
                authenticated_platforms: Vec::new(),
            };
            sink.persist(snapshot).await.unwrap();
            assert_eq!(sink.snapshots().await.len(), n + 1);
        }
        assert_eq!(sink.wait_for(3).await.len(), 3);
    }

    #[tokio::test]
    async fn failing_sink_stores_nothing() {
        let sink = MemorySink::failing();
        let snapshot = RegistrySnapshot {
            devices: Vec::new(),
            authenticated_platforms: Vec::new(),
        };
        assert!(sink.persist(snapshot).await.is_err());
        assert!(sink.last().await.is_none());
    }
}
