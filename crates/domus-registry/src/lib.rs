// SPDX-FileCopyrightText: 2026 Domus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Device registry and status store for the Domus device gateway.
//!
//! A single owner task holds every device, its cached status, and each
//! platform's auth state. [`Registry`] handles are cheap clones that send
//! mutations to that task and read from the view it publishes. Adapters are
//! injected through [`RegistryBuilder`], and every snapshot is handed to an
//! optional [`domus_core::SnapshotSink`] in mutation order.

mod actor;
pub mod event;
mod registry;
mod state;

pub use event::{DiscoveryReport, PlatformStatus, RegistryEvent};
pub use registry::{Registry, RegistryBuilder};
