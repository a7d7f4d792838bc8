// SPDX-FileCopyrightText: 2026 Domus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Domus integration tests.
//!
//! Provides a scriptable platform adapter, an in-memory snapshot sink, and a
//! harness that wires them into a running registry, so registry behavior can
//! be tested without any platform backend.
//!
//! # Components
//!
//! - [`MockAdapter`] - Platform adapter with scripted results and call recording
//! - [`MemorySink`] - Snapshot sink that keeps every snapshot in order
//! - [`TestHarness`] - Registry pre-wired with mock adapters and a memory sink

pub mod harness;
pub mod memory_sink;
pub mod mock_adapter;

pub use harness::TestHarness;
pub use memory_sink::MemorySink;
pub use mock_adapter::{MockAdapter, MockCall};
