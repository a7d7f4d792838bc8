// SPDX-FileCopyrightText: 2026 Domus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Authentication flows and the per-platform auth state machine.
//!
//! Four credential acquisition strategies are provided, one per
//! [`domus_core::AuthType`]:
//!
//! - [`api_key`]: validate a caller-supplied key with one read-only call.
//! - [`oauth`]: authorization-code grant through a [`domus_core::WebAuthSession`].
//! - [`probe`]: locate a hub on the local network.
//! - [`bridge`]: locate a bridge through cloud discovery, then pair it.
//!
//! [`state::AuthTracker`] owns the lifecycle of every platform's
//! [`domus_core::AuthState`] and discards superseded completions.

pub mod api_key;
pub mod bridge;
pub mod http;
pub mod oauth;
pub mod probe;
pub mod state;

pub use bridge::{BridgeLocator, BridgePairing};
pub use http::{HttpSettings, Operation};
pub use oauth::{OAuthClientConfig, OAuthFlow};
pub use probe::HostProbe;
pub use state::{AuthTicket, AuthTracker, Completion};
