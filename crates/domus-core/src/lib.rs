// SPDX-FileCopyrightText: 2026 Domus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Domus device gateway.
//!
//! This crate provides the platform and device data model, the generic action
//! vocabulary, the shared error taxonomy, and the trait seams that platform
//! adapters and external collaborators implement.

pub mod action;
pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use action::{Action, Command};
pub use error::{ErrorKind, GatewayError};
pub use types::{
    AuthState, AuthType, Credentials, Device, DeviceId, DeviceStatus, DeviceType, Platform,
    PlatformDevice, PlatformInfo, Position, RegistrySnapshot, RoomId, WireCommand, WireMethod,
};

pub use traits::{PlatformAdapter, SnapshotSink, WebAuthSession};

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use strum::IntoEnumIterator;

    #[test]
    fn all_trait_modules_are_exported() {
        fn _assert_platform_adapter<T: PlatformAdapter>() {}
        fn _assert_snapshot_sink<T: SnapshotSink>() {}
        fn _assert_web_auth<T: WebAuthSession>() {}
    }

    #[test]
    fn snapshot_serialization() {
        let snapshot = RegistrySnapshot {
            devices: vec![Device::new("d1", "Lamp", DeviceType::Bulb).with_platform(Platform::Hue, "3")],
            authenticated_platforms: vec![Platform::Hue],
        };
        let json = serde_json::to_string(&snapshot).expect("should serialize");
        let parsed: RegistrySnapshot = serde_json::from_str(&json).expect("should deserialize");
        assert_eq!(parsed, snapshot);
    }

    proptest! {
        #[test]
        fn action_names_parse_back(idx in 0usize..22) {
            use std::str::FromStr;
            let action = Action::iter().nth(idx).unwrap();
            prop_assert_eq!(Action::from_str(&action.to_string()).unwrap(), action);
        }

        #[test]
        fn percent_params_always_land_in_range(raw in -1000.0f64..1000.0) {
            let bag = serde_json::json!({ "volume": raw });
            if let Some(Command::SetVolume { value }) = Command::from_params(Action::SetVolume, Some(&bag)) {
                prop_assert!(value <= 100);
            } else {
                prop_assert!(false, "numeric volume must parse");
            }
        }
    }
}
