// SPDX-FileCopyrightText: 2026 Domus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types shared by every adapter and the device registry.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;

use crate::types::{DeviceId, Platform};

/// The error type returned by every gateway operation.
///
/// `Display` is the human-readable message surfaced to the UI; [`GatewayError::kind`]
/// is the machine-checkable classification.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The device has no platform, or no adapter is registered for it.
    #[error("platform not supported{}", platform.map(|p| format!(": {p}")).unwrap_or_default())]
    PlatformNotSupported { platform: Option<Platform> },

    /// The platform has no valid credentials (never authenticated, or disconnected).
    #[error("platform {platform} is not authenticated")]
    PlatformNotAuthenticated { platform: Platform },

    /// The requested authentication entry point does not apply to this platform.
    #[error("{platform} does not support {method} authentication")]
    AuthUnsupported {
        platform: Platform,
        method: &'static str,
    },

    /// The authentication flow failed for a reason other than bad credentials.
    #[error("authentication failed: {reason}")]
    AuthenticationFailed { reason: String },

    /// The platform rejected the supplied key or token.
    #[error("invalid credentials for {platform}")]
    InvalidCredentials { platform: Platform },

    /// The action is not available for the device type or platform.
    #[error("action {action} is not supported{}", target.as_ref().map(|t| format!(" by {t}")).unwrap_or_default())]
    ActionUnsupported {
        action: crate::action::Action,
        target: Option<String>,
    },

    /// No device with the given id is known.
    #[error("device not found: {id}")]
    DeviceNotFound { id: DeviceId },

    /// A platform's discovery call failed.
    #[error("device discovery failed: {reason}")]
    DeviceDiscoveryFailed { reason: String },

    /// A platform rejected or failed an action.
    #[error("action execution failed: {reason}")]
    ActionExecutionFailed { reason: String },

    /// A platform's status read failed.
    #[error("device status failed: {reason}")]
    DeviceStatusFailed { reason: String },

    /// Transport-level failure (connection refused, DNS, timeout, TLS).
    #[error("network error: {message}")]
    NetworkError {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// An upsert tried to move an existing device to a different platform,
    /// or to unbind it (`requested` is `None`).
    #[error(
        "device {id} belongs to {existing}; remove it before {}",
        requested.map(|p| format!("binding it to {p}")).unwrap_or_else(|| "unbinding it".into())
    )]
    PlatformConflict {
        id: DeviceId,
        existing: Platform,
        requested: Option<Platform>,
    },

    /// An auth state change that the lifecycle does not allow.
    #[error("invalid auth transition for {platform}: {from} -> {to}")]
    InvalidTransition {
        platform: Platform,
        from: &'static str,
        to: &'static str,
    },

    /// Configuration errors (missing client id, malformed URL).
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal or unexpected errors (e.g. the registry task has stopped).
    #[error("internal error: {0}")]
    Internal(String),
}

/// Machine-checkable classification of a [`GatewayError`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum ErrorKind {
    PlatformNotSupported,
    PlatformNotAuthenticated,
    AuthUnsupported,
    AuthenticationFailed,
    InvalidCredentials,
    ActionUnsupported,
    DeviceNotFound,
    DeviceDiscoveryFailed,
    ActionExecutionFailed,
    DeviceStatusFailed,
    NetworkError,
    PlatformConflict,
    InvalidTransition,
    Config,
    Internal,
}

impl GatewayError {
    /// Returns the classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            GatewayError::PlatformNotSupported { .. } => ErrorKind::PlatformNotSupported,
            GatewayError::PlatformNotAuthenticated { .. } => ErrorKind::PlatformNotAuthenticated,
            GatewayError::AuthUnsupported { .. } => ErrorKind::AuthUnsupported,
            GatewayError::AuthenticationFailed { .. } => ErrorKind::AuthenticationFailed,
            GatewayError::InvalidCredentials { .. } => ErrorKind::InvalidCredentials,
            GatewayError::ActionUnsupported { .. } => ErrorKind::ActionUnsupported,
            GatewayError::DeviceNotFound { .. } => ErrorKind::DeviceNotFound,
            GatewayError::DeviceDiscoveryFailed { .. } => ErrorKind::DeviceDiscoveryFailed,
            GatewayError::ActionExecutionFailed { .. } => ErrorKind::ActionExecutionFailed,
            GatewayError::DeviceStatusFailed { .. } => ErrorKind::DeviceStatusFailed,
            GatewayError::NetworkError { .. } => ErrorKind::NetworkError,
            GatewayError::PlatformConflict { .. } => ErrorKind::PlatformConflict,
            GatewayError::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            GatewayError::Config(_) => ErrorKind::Config,
            GatewayError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Shorthand for an [`GatewayError::AuthenticationFailed`] with the given reason.
    pub fn auth_failed(reason: impl Into<String>) -> Self {
        GatewayError::AuthenticationFailed {
            reason: reason.into(),
        }
    }

    /// Wraps a transport error as [`GatewayError::NetworkError`].
    pub fn network<E>(context: &str, err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        GatewayError::NetworkError {
            message: format!("{context}: {err}"),
            source: Some(Box::new(err)),
        }
    }

    /// True for errors worth retrying by the caller without user intervention.
    pub fn is_transient(&self) -> bool {
        matches!(self.kind(), ErrorKind::NetworkError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Action;
    use std::str::FromStr;

    #[test]
    fn kind_matches_variant() {
        let err = GatewayError::PlatformNotAuthenticated {
            platform: Platform::Nest,
        };
        assert_eq!(err.kind(), ErrorKind::PlatformNotAuthenticated);
        assert_eq!(err.to_string(), "platform nest is not authenticated");
    }

    #[test]
    fn platform_not_supported_message_handles_missing_platform() {
        let none = GatewayError::PlatformNotSupported { platform: None };
        assert_eq!(none.to_string(), "platform not supported");

        let some = GatewayError::PlatformNotSupported {
            platform: Some(Platform::Hue),
        };
        assert_eq!(some.to_string(), "platform not supported: hue");
    }

    #[test]
    fn action_unsupported_mentions_target() {
        let err = GatewayError::ActionUnsupported {
            action: Action::SetBrightness,
            target: Some("lock".into()),
        };
        assert_eq!(err.to_string(), "action set-brightness is not supported by lock");
    }

    #[test]
    fn platform_conflict_names_the_rejected_change() {
        let unbind = GatewayError::PlatformConflict {
            id: "lifx:d1".into(),
            existing: Platform::Lifx,
            requested: None,
        };
        assert_eq!(
            unbind.to_string(),
            "device lifx:d1 belongs to lifx; remove it before unbinding it"
        );
    }

    #[test]
    fn error_kind_round_trips_through_strings() {
        let kind = ErrorKind::DeviceDiscoveryFailed;
        assert_eq!(ErrorKind::from_str(&kind.to_string()).unwrap(), kind);
    }

    #[test]
    fn only_network_errors_are_transient() {
        let net = GatewayError::network("probe", std::io::Error::other("refused"));
        assert!(net.is_transient());
        assert!(!GatewayError::auth_failed("nope").is_transient());
    }
}
