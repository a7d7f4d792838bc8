// SPDX-FileCopyrightText: 2026 Domus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered config loading with Figment.
//!
//! Merge order (later overrides earlier): compiled defaults,
//! `/etc/domus/domus.toml`, `~/.config/domus/domus.toml`, `./domus.toml`,
//! then `DOMUS_*` environment variables.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::DomusConfig;

/// Top-level sections, used to turn `DOMUS_NEST_CLIENT_ID` into `nest.client_id`.
const SECTIONS: &[&str] = &[
    "gateway",
    "oauth",
    "discovery",
    "simulation",
    "lifx",
    "hue",
    "nest",
    "smartthings",
    "ecobee",
    "ring",
    "roborock",
    "wyze",
    "hubitat",
    "irobot",
];

/// Config files in merge order, lowest precedence first.
pub fn config_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("/etc/domus/domus.toml")];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("domus/domus.toml"));
    }
    paths.push(PathBuf::from("domus.toml"));
    paths
}

/// Build the Figment used for config loading (exposed for diagnostic use).
pub fn build_figment() -> Figment {
    let mut figment = Figment::new().merge(Serialized::defaults(DomusConfig::default()));
    for path in config_paths() {
        figment = figment.merge(Toml::file(path));
    }
    figment.merge(env_provider())
}

/// Load configuration from the standard XDG hierarchy with env var overrides.
pub fn load_config() -> Result<DomusConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no files, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<DomusConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(DomusConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<DomusConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(DomusConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Environment provider mapping the first `_` after a known section to a dot.
///
/// `Env::split("_")` would turn `DOMUS_HUE_PAIRING_ATTEMPTS` into
/// `hue.pairing.attempts`, so sections are matched explicitly.
fn env_provider() -> Env {
    Env::prefixed("DOMUS_").map(|key| map_env_key(key.as_str()).into())
}

/// Map a lowercased, prefix-stripped env key onto a dotted config path.
pub(crate) fn map_env_key(key: &str) -> String {
    for section in SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|r| r.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_map_to_sections() {
        assert_eq!(map_env_key("nest_client_id"), "nest.client_id");
        assert_eq!(map_env_key("hue_pairing_attempts"), "hue.pairing_attempts");
        assert_eq!(map_env_key("gateway_log_level"), "gateway.log_level");
        assert_eq!(map_env_key("unknown_key"), "unknown_key");
    }

    #[test]
    fn env_override_reaches_nested_key() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("DOMUS_LIFX_API_KEY", "c0ffee");
            jail.set_env("DOMUS_HUE_PAIRING_ATTEMPTS", "4");
            let config: DomusConfig = Figment::new()
                .merge(Serialized::defaults(DomusConfig::default()))
                .merge(env_provider())
                .extract()?;
            assert_eq!(config.lifx.api_key.as_deref(), Some("c0ffee"));
            assert_eq!(config.hue.pairing_attempts, 4);
            Ok(())
        });
    }
}
