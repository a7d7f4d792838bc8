// SPDX-FileCopyrightText: 2026 Domus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-platform authentication lifecycle.
//!
//! ```text
//! NotAuthenticated ──begin──▶ Authenticating ──complete──▶ Authenticated
//!        ▲                        │    ▲                        │
//!        │                        ▼    │ begin                  │
//!        └──── disconnect ──── Failed ─┴────────────────────────┘
//! ```
//!
//! Every [`AuthTracker::begin`] bumps the platform's version and hands out an
//! [`AuthTicket`]. A completion presenting an older ticket is stale and is
//! discarded without touching state.

use std::collections::HashMap;

use chrono::Utc;
use domus_core::{AuthState, Credentials, GatewayError, Platform};
use tracing::{debug, info, warn};

/// Proof that a caller started the current authentication attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthTicket {
    pub platform: Platform,
    pub version: u64,
}

/// What happened to a completion handed to [`AuthTracker::complete`].
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    /// The result became the platform's new state.
    Applied(AuthState),
    /// A newer attempt (or a disconnect) superseded this one.
    Stale,
}

#[derive(Debug, Clone)]
struct Entry {
    state: AuthState,
    version: u64,
}

impl Default for Entry {
    fn default() -> Self {
        Self {
            state: AuthState::NotAuthenticated,
            version: 0,
        }
    }
}

/// Owns the [`AuthState`] of every platform.
#[derive(Debug, Clone, Default)]
pub struct AuthTracker {
    entries: HashMap<Platform, Entry>,
}

impl AuthTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state; platforms never seen are `NotAuthenticated`.
    pub fn state(&self, platform: Platform) -> AuthState {
        self.entries
            .get(&platform)
            .map(|e| e.state.clone())
            .unwrap_or(AuthState::NotAuthenticated)
    }

    /// Credentials of an authenticated platform.
    pub fn credentials(&self, platform: Platform) -> Option<&Credentials> {
        self.entries.get(&platform).and_then(|e| e.state.credentials())
    }

    /// Authenticated platforms in declaration order.
    pub fn authenticated_platforms(&self) -> Vec<Platform> {
        let mut platforms: Vec<Platform> = self
            .entries
            .iter()
            .filter(|(_, e)| e.state.is_authenticated())
            .map(|(p, _)| *p)
            .collect();
        platforms.sort();
        platforms
    }

    /// Enters `Authenticating` and returns the ticket for this attempt.
    ///
    /// Starting over while an attempt is in flight supersedes that attempt.
    pub fn begin(&mut self, platform: Platform) -> AuthTicket {
        let entry = self.entries.entry(platform).or_default();
        if matches!(entry.state, AuthState::Authenticating) {
            debug!(%platform, "superseding in-flight authentication");
        }
        entry.version += 1;
        entry.state = AuthState::Authenticating;
        AuthTicket {
            platform,
            version: entry.version,
        }
    }

    /// Finishes the attempt identified by `ticket`.
    pub fn complete(
        &mut self,
        ticket: AuthTicket,
        outcome: &Result<Credentials, GatewayError>,
    ) -> Completion {
        let platform = ticket.platform;
        let entry = self.entries.entry(platform).or_default();
        if entry.version != ticket.version || !matches!(entry.state, AuthState::Authenticating) {
            warn!(
                %platform,
                ticket = ticket.version,
                current = entry.version,
                "discarding stale authentication result"
            );
            return Completion::Stale;
        }

        entry.state = match outcome {
            Ok(creds) if creds.platform != platform || !creds.is_acceptable_at(Utc::now()) => {
                warn!(%platform, "authentication produced unusable credentials");
                AuthState::Failed(GatewayError::InvalidCredentials { platform }.to_string())
            }
            Ok(creds) => {
                info!(%platform, "platform authenticated");
                AuthState::Authenticated(creds.clone())
            }
            Err(e) => {
                warn!(%platform, error = %e, "platform authentication failed");
                AuthState::Failed(e.to_string())
            }
        };
        Completion::Applied(entry.state.clone())
    }

    /// Replaces the credentials of an authenticated platform (token refresh).
    pub fn replace_credentials(
        &mut self,
        platform: Platform,
        credentials: Credentials,
    ) -> Result<(), GatewayError> {
        if credentials.platform != platform || !credentials.is_valid() {
            return Err(GatewayError::InvalidCredentials { platform });
        }
        match self.entries.get_mut(&platform) {
            Some(entry) if entry.state.is_authenticated() => {
                entry.state = AuthState::Authenticated(credentials);
                Ok(())
            }
            _ => Err(GatewayError::PlatformNotAuthenticated { platform }),
        }
    }

    /// Drops credentials: `Authenticated | Failed -> NotAuthenticated`.
    ///
    /// Disconnecting a platform that is already `NotAuthenticated` is a no-op;
    /// disconnecting mid-attempt is rejected.
    pub fn disconnect(&mut self, platform: Platform) -> Result<(), GatewayError> {
        let entry = self.entries.entry(platform).or_default();
        match entry.state {
            AuthState::NotAuthenticated => Ok(()),
            AuthState::Authenticated(_) | AuthState::Failed(_) => {
                entry.version += 1;
                entry.state = AuthState::NotAuthenticated;
                info!(%platform, "platform disconnected");
                Ok(())
            }
            AuthState::Authenticating => Err(GatewayError::InvalidTransition {
                platform,
                from: entry.state.name(),
                to: AuthState::NotAuthenticated.name(),
            }),
        }
    }

    /// Forgets every platform. Outstanding tickets become stale.
    pub fn reset(&mut self) {
        for entry in self.entries.values_mut() {
            entry.version += 1;
            entry.state = AuthState::NotAuthenticated;
        }
    }
}
