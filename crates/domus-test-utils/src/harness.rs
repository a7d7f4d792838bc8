// SPDX-FileCopyrightText: 2026 Domus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for registry integration testing.
//!
//! `TestHarness` assembles a running registry with one [`MockAdapter`] per
//! requested platform and a [`MemorySink`], and keeps typed handles to the
//! mocks for assertions.

use std::collections::BTreeMap;
use std::sync::Arc;

use domus_core::{
    AuthType, Device, DeviceType, GatewayError, Platform, PlatformAdapter, PlatformDevice,
    RegistrySnapshot,
};
use domus_registry::Registry;

use crate::memory_sink::MemorySink;
use crate::mock_adapter::MockAdapter;

/// Key used by [`TestHarness::connect`] for api-key platforms.
pub const MOCK_API_KEY: &str = "mock-api-key";

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    mocks: Vec<MockAdapter>,
    snapshot: Option<RegistrySnapshot>,
    failing_sink: bool,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            mocks: Vec::new(),
            snapshot: None,
            failing_sink: false,
        }
    }

    /// Registers a default mock for `platform`.
    pub fn with_platform(self, platform: Platform) -> Self {
        self.with_mock(MockAdapter::new(platform))
    }

    /// Registers a pre-configured mock.
    pub fn with_mock(mut self, mock: MockAdapter) -> Self {
        self.mocks.push(mock);
        self
    }

    /// Starts the registry from a persisted snapshot.
    pub fn with_snapshot(mut self, snapshot: RegistrySnapshot) -> Self {
        self.snapshot = Some(snapshot);
        self
    }

    /// Uses a sink that rejects every snapshot.
    pub fn with_failing_sink(mut self) -> Self {
        self.failing_sink = true;
        self
    }

    /// Starts the registry. Must be called inside a Tokio runtime.
    pub fn build(self) -> TestHarness {
        let sink = Arc::new(if self.failing_sink {
            MemorySink::failing()
        } else {
            MemorySink::new()
        });

        let mocks: BTreeMap<Platform, Arc<MockAdapter>> = self
            .mocks
            .into_iter()
            .map(|mock| (mock.platform(), Arc::new(mock)))
            .collect();

        let mut builder = Registry::builder()
            .with_adapters(
                mocks
                    .values()
                    .map(|mock| Arc::clone(mock) as Arc<dyn PlatformAdapter>),
            )
            .with_sink(sink.clone());
        if let Some(snapshot) = self.snapshot {
            builder = builder.with_snapshot(snapshot);
        }

        TestHarness {
            registry: builder.build(),
            mocks,
            sink,
        }
    }
}

/// A running registry backed by mock adapters and an in-memory sink.
pub struct TestHarness {
    /// The registry under test.
    pub registry: Registry,
    /// Mocks by platform, for scripting and call assertions.
    pub mocks: BTreeMap<Platform, Arc<MockAdapter>>,
    /// Receives every snapshot the registry emits.
    pub sink: Arc<MemorySink>,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// The mock registered for `platform`.
    ///
    /// # Panics
    ///
    /// Panics when the harness was built without that platform.
    pub fn mock(&self, platform: Platform) -> &Arc<MockAdapter> {
        self.mocks
            .get(&platform)
            .unwrap_or_else(|| panic!("no mock registered for {platform}"))
    }

    /// Authenticates `platform` the way its auth type expects, using
    /// [`MOCK_API_KEY`] for api-key platforms.
    pub async fn connect(&self, platform: Platform) -> Result<(), GatewayError> {
        let secret = match platform.auth_type() {
            AuthType::ApiKey => Some(MOCK_API_KEY),
            _ => None,
        };
        self.registry.authenticate(platform, secret).await
    }

    /// Adds a device bound to `platform` under `native_id`.
    pub async fn add_bound(
        &self,
        platform: Platform,
        native_id: &str,
        device_type: DeviceType,
    ) -> Result<Device, GatewayError> {
        let record = PlatformDevice::new(native_id, format!("{platform} {native_id}"), device_type);
        let device = Device::from_discovered(platform, &record);
        self.registry.add_device(device.clone()).await?;
        Ok(device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domus_core::AuthState;

    #[tokio::test]
    async fn builder_creates_working_environment() {
        let harness = TestHarness::builder().with_platform(Platform::Lifx).build();
        assert!(harness.registry.devices().is_empty());
        assert_eq!(harness.registry.platform_statuses().len(), 1);
    }

    #[tokio::test]
    async fn connect_uses_the_platform_auth_type() {
        let harness = TestHarness::builder()
            .with_platform(Platform::Lifx)
            .with_platform(Platform::Nest)
            .build();

        harness.connect(Platform::Lifx).await.unwrap();
        harness.connect(Platform::Nest).await.unwrap();

        assert!(matches!(
            harness.registry.auth_state(Platform::Lifx),
            AuthState::Authenticated(_)
        ));
        assert_eq!(
            harness.mock(Platform::Lifx).calls().await[0],
            crate::MockCall::AuthenticateWithKey(MOCK_API_KEY.into())
        );
        assert_eq!(
            harness.mock(Platform::Nest).calls().await[0],
            crate::MockCall::Authenticate
        );
    }

    #[tokio::test]
    async fn added_devices_reach_the_sink() {
        let harness = TestHarness::builder().with_platform(Platform::Hue).build();
        let device = harness
            .add_bound(Platform::Hue, "1", DeviceType::Bulb)
            .await
            .unwrap();

        let snapshots = harness.sink.wait_for(1).await;
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].devices, vec![device]);
    }
}
