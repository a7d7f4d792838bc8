// SPDX-FileCopyrightText: 2026 Domus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait seams between the registry, the platform adapters, and external collaborators.
//!
//! All traits use `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod sink;
pub mod web_auth;

pub use adapter::PlatformAdapter;
pub use sink::SnapshotSink;
pub use web_auth::WebAuthSession;
