// SPDX-FileCopyrightText: 2026 Domus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The generic action vocabulary and its typed command form.
//!
//! [`Action`] is the symbolic command name used for the static device-type
//! compatibility matrix. [`Command`] carries the action's typed parameters and
//! is what adapters translate into wire requests. Untyped parameter bags from
//! callers are converted with [`Command::from_params`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumIter, EnumString};
use tracing::warn;

use crate::types::{DeviceStatus, DeviceType};

/// Symbolic, platform-agnostic command names.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
#[serde(rename_all = "camelCase")]
pub enum Action {
    Toggle,
    TurnOn,
    TurnOff,
    SetBrightness,
    SetColor,
    SetVolume,
    Play,
    Pause,
    Stop,
    StartCleaning,
    StopCleaning,
    SpotClean,
    ReturnToBase,
    SetTemperature,
    SetMode,
    Lock,
    Unlock,
    TakePhoto,
    StartRecording,
    StopRecording,
    Previous,
    Next,
}

impl Action {
    /// Static compatibility matrix: whether this action applies to `device_type`.
    pub fn is_available_for(self, device_type: DeviceType) -> bool {
        use DeviceType::*;
        match self {
            Action::Toggle | Action::TurnOn | Action::TurnOff => matches!(
                device_type,
                Bulb | Tv | HubDevice | Speaker | Camera | Thermostat
            ),
            Action::SetBrightness | Action::SetColor => device_type == Bulb,
            Action::SetVolume
            | Action::Play
            | Action::Pause
            | Action::Stop
            | Action::Previous
            | Action::Next => matches!(device_type, Speaker | Tv),
            Action::StartCleaning
            | Action::StopCleaning
            | Action::SpotClean
            | Action::ReturnToBase => device_type == Vacuum,
            Action::SetTemperature => device_type == Thermostat,
            Action::SetMode => matches!(device_type, Thermostat | Vacuum),
            Action::Lock | Action::Unlock => device_type == Lock,
            Action::TakePhoto | Action::StartRecording | Action::StopRecording => {
                device_type == Camera
            }
        }
    }

    /// All actions applicable to `device_type`, in declaration order.
    pub fn available_for(device_type: DeviceType) -> Vec<Action> {
        use strum::IntoEnumIterator;
        Action::iter()
            .filter(|a| a.is_available_for(device_type))
            .collect()
    }

    /// True when the action carries parameters.
    pub fn takes_parameters(self) -> bool {
        matches!(
            self,
            Action::SetBrightness
                | Action::SetColor
                | Action::SetVolume
                | Action::SetTemperature
                | Action::SetMode
        )
    }
}

/// An action together with its typed parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Command {
    Toggle,
    TurnOn,
    TurnOff,
    /// Brightness in percent, 0..=100.
    SetBrightness { value: u8 },
    /// Color as `#RRGGBB`.
    SetColor { hex: String },
    /// Volume in percent, 0..=100.
    SetVolume { value: u8 },
    Play,
    Pause,
    Stop,
    StartCleaning,
    StopCleaning,
    SpotClean,
    ReturnToBase,
    SetTemperature { celsius: f64 },
    SetMode { mode: String },
    Lock,
    Unlock,
    TakePhoto,
    StartRecording,
    StopRecording,
    Previous,
    Next,
}

impl Command {
    /// The symbolic action this command performs.
    pub fn action(&self) -> Action {
        match self {
            Command::Toggle => Action::Toggle,
            Command::TurnOn => Action::TurnOn,
            Command::TurnOff => Action::TurnOff,
            Command::SetBrightness { .. } => Action::SetBrightness,
            Command::SetColor { .. } => Action::SetColor,
            Command::SetVolume { .. } => Action::SetVolume,
            Command::Play => Action::Play,
            Command::Pause => Action::Pause,
            Command::Stop => Action::Stop,
            Command::StartCleaning => Action::StartCleaning,
            Command::StopCleaning => Action::StopCleaning,
            Command::SpotClean => Action::SpotClean,
            Command::ReturnToBase => Action::ReturnToBase,
            Command::SetTemperature { .. } => Action::SetTemperature,
            Command::SetMode { .. } => Action::SetMode,
            Command::Lock => Action::Lock,
            Command::Unlock => Action::Unlock,
            Command::TakePhoto => Action::TakePhoto,
            Command::StartRecording => Action::StartRecording,
            Command::StopRecording => Action::StopRecording,
            Command::Previous => Action::Previous,
            Command::Next => Action::Next,
        }
    }

    /// Builds a command from an action name and an untyped parameter bag.
    ///
    /// Returns `None` (after logging a warning) when a required parameter is
    /// missing or has the wrong type. Unknown keys are ignored.
    pub fn from_params(action: Action, params: Option<&Value>) -> Option<Command> {
        let command = match action {
            Action::Toggle => Command::Toggle,
            Action::TurnOn => Command::TurnOn,
            Action::TurnOff => Command::TurnOff,
            Action::SetBrightness => Command::SetBrightness {
                value: percent_param(params, "brightness", action)?,
            },
            Action::SetColor => Command::SetColor {
                hex: color_param(params, action)?,
            },
            Action::SetVolume => Command::SetVolume {
                value: percent_param(params, "volume", action)?,
            },
            Action::Play => Command::Play,
            Action::Pause => Command::Pause,
            Action::Stop => Command::Stop,
            Action::StartCleaning => Command::StartCleaning,
            Action::StopCleaning => Command::StopCleaning,
            Action::SpotClean => Command::SpotClean,
            Action::ReturnToBase => Command::ReturnToBase,
            Action::SetTemperature => {
                let celsius = params
                    .and_then(|p| p.get("temperature"))
                    .and_then(Value::as_f64);
                match celsius {
                    Some(celsius) => Command::SetTemperature { celsius },
                    None => {
                        warn!(%action, "missing or non-numeric `temperature` parameter");
                        return None;
                    }
                }
            }
            Action::SetMode => {
                let mode = params.and_then(|p| p.get("mode")).and_then(Value::as_str);
                match mode {
                    Some(mode) if !mode.is_empty() => Command::SetMode {
                        mode: mode.to_string(),
                    },
                    _ => {
                        warn!(%action, "missing `mode` parameter");
                        return None;
                    }
                }
            }
            Action::Lock => Command::Lock,
            Action::Unlock => Command::Unlock,
            Action::TakePhoto => Command::TakePhoto,
            Action::StartRecording => Command::StartRecording,
            Action::StopRecording => Command::StopRecording,
            Action::Previous => Command::Previous,
            Action::Next => Command::Next,
        };
        Some(command)
    }

    /// Whether the command's parameters are usable by an adapter.
    ///
    /// Commands built with [`Command::from_params`] always are; hand-built
    /// ones may carry a malformed color, an empty mode, or a non-finite
    /// temperature.
    pub fn has_valid_params(&self) -> bool {
        match self {
            Command::SetColor { hex } => is_hex_color(hex),
            Command::SetMode { mode } => !mode.is_empty(),
            Command::SetTemperature { celsius } => celsius.is_finite(),
            _ => true,
        }
    }

    /// Applies the effect of a successfully executed command to a cached status.
    ///
    /// Only fields relevant to the command are touched; `Toggle` flips the
    /// current on flag. The timestamp is left to the caller.
    pub fn apply_to(&self, status: &mut DeviceStatus) {
        match self {
            Command::Toggle => status.is_on = !status.is_on,
            Command::TurnOn => status.is_on = true,
            Command::TurnOff => status.is_on = false,
            Command::SetBrightness { value } => {
                status.brightness = Some(*value);
                status.is_on = *value > 0;
            }
            Command::SetColor { hex } => {
                status.color = Some(hex.clone());
                status.is_on = true;
            }
            Command::SetVolume { value } => status.volume = Some(*value),
            Command::Play => status.is_on = true,
            Command::Pause | Command::Stop | Command::Previous | Command::Next => {}
            Command::StartCleaning | Command::SpotClean => {
                status.is_cleaning = true;
                status.is_on = true;
            }
            Command::StopCleaning | Command::ReturnToBase => status.is_cleaning = false,
            Command::SetTemperature { celsius } => status.temperature = Some(*celsius),
            Command::SetMode { mode } => status.mode = Some(mode.clone()),
            Command::Lock => status.is_locked = Some(true),
            Command::Unlock => status.is_locked = Some(false),
            Command::TakePhoto => {}
            Command::StartRecording => status.is_recording = Some(true),
            Command::StopRecording => status.is_recording = Some(false),
        }
        status.last_error = None;
    }
}

/// Reads a 0..=100 integer parameter, clamping out-of-range numbers.
fn percent_param(params: Option<&Value>, key: &str, action: Action) -> Option<u8> {
    let raw = params.and_then(|p| p.get(key));
    match raw.and_then(Value::as_f64) {
        Some(v) => Some(v.round().clamp(0.0, 100.0) as u8),
        None => {
            warn!(%action, key, "missing or non-numeric parameter");
            None
        }
    }
}

/// Reads a `#RRGGBB` color, accepting it with or without the leading `#`.
fn color_param(params: Option<&Value>, action: Action) -> Option<String> {
    let Some(raw) = params
        .and_then(|p| p.get("color").or_else(|| p.get("hex")))
        .and_then(Value::as_str)
    else {
        warn!(%action, "missing `color` parameter");
        return None;
    };
    if is_hex_color(raw) {
        Some(format!("#{}", raw.trim_start_matches('#').to_ascii_uppercase()))
    } else {
        warn!(%action, color = raw, "color is not a #RRGGBB value");
        None
    }
}

/// `RRGGBB` with an optional leading `#`, ASCII hex digits only.
pub fn is_hex_color(raw: &str) -> bool {
    let digits = raw.strip_prefix('#').unwrap_or(raw);
    digits.len() == 6 && digits.bytes().all(|b| b.is_ascii_hexdigit())
}
