// SPDX-FileCopyrightText: 2026 Domus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates constraints serde cannot express: URL syntax, private probe
//! candidates, callback scheme shape, and numeric ranges.

use std::collections::HashSet;
use std::net::{IpAddr, SocketAddr};

use url::Url;

use crate::diagnostic::ConfigError;
use crate::model::{DomusConfig, OAuthPlatformConfig};

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration; collects every error rather than failing fast.
pub fn validate_config(config: &DomusConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if !LOG_LEVELS.contains(&config.gateway.log_level.as_str()) {
        fail(format!(
            "gateway.log_level must be one of {}, got `{}`",
            LOG_LEVELS.join(", "),
            config.gateway.log_level
        ));
    }

    if config.gateway.http_timeout_secs == 0 {
        fail("gateway.http_timeout_secs must be greater than 0".to_string());
    }

    let scheme = &config.oauth.callback_scheme;
    if scheme.is_empty()
        || !scheme.starts_with(|c: char| c.is_ascii_alphabetic())
        || !scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
    {
        fail(format!("oauth.callback_scheme `{scheme}` is not a valid URL scheme"));
    } else if !config.oauth.redirect_uri.starts_with(&format!("{scheme}:")) {
        fail(format!(
            "oauth.redirect_uri `{}` must use the callback scheme `{scheme}`",
            config.oauth.redirect_uri
        ));
    }

    if config.discovery.probe_timeout_ms == 0 {
        fail("discovery.probe_timeout_ms must be greater than 0".to_string());
    }

    for candidate in &config.discovery.candidates {
        match parse_candidate(candidate) {
            Some(IpAddr::V4(v4)) if v4.is_private() || v4.is_loopback() || v4.is_link_local() => {}
            Some(_) => fail(format!(
                "discovery.candidates entry `{candidate}` is not a private IPv4 address"
            )),
            None => fail(format!(
                "discovery.candidates entry `{candidate}` is not an IP address"
            )),
        }
    }

    let mut seen = HashSet::new();
    for platform in &config.simulation.platforms {
        if !seen.insert(platform) {
            fail(format!("simulation.platforms lists `{platform}` twice"));
        }
    }

    if config.hue.pairing_attempts == 0 {
        fail("hue.pairing_attempts must be at least 1".to_string());
    }

    let urls = [
        ("lifx.base_url", config.lifx.base_url.as_deref()),
        ("roborock.base_url", config.roborock.base_url.as_deref()),
        ("wyze.base_url", config.wyze.base_url.as_deref()),
        ("hue.discovery_url", config.hue.discovery_url.as_deref()),
    ];
    for (key, value) in urls {
        check_url(key, value, &mut fail);
    }

    for (section, oauth) in [
        ("nest", &config.nest),
        ("smartthings", &config.smartthings),
        ("ecobee", &config.ecobee),
        ("ring", &config.ring),
    ] {
        check_oauth_section(section, oauth, &mut fail);
    }

    if config.nest.client_id.is_some() && config.nest.project_id.is_none() {
        fail("nest.project_id is required when nest.client_id is set".to_string());
    }

    if config.hubitat.app_id.trim().is_empty() {
        fail("hubitat.app_id must not be empty".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Accepts `a.b.c.d` or `a.b.c.d:port`.
fn parse_candidate(candidate: &str) -> Option<IpAddr> {
    candidate
        .parse::<IpAddr>()
        .ok()
        .or_else(|| candidate.parse::<SocketAddr>().ok().map(|s| s.ip()))
}

fn check_url(key: &str, value: Option<&str>, fail: &mut impl FnMut(String)) {
    if let Some(raw) = value {
        match Url::parse(raw) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => fail(format!("{key} must be http(s), got scheme `{}`", url.scheme())),
            Err(e) => fail(format!("{key} `{raw}` is not a valid URL: {e}")),
        }
    }
}

fn check_oauth_section(section: &str, oauth: &OAuthPlatformConfig, fail: &mut impl FnMut(String)) {
    check_url(&format!("{section}.base_url"), oauth.base_url.as_deref(), fail);
    check_url(&format!("{section}.authorize_url"), oauth.authorize_url.as_deref(), fail);
    check_url(&format!("{section}.token_url"), oauth.token_url.as_deref(), fail);
    if let Some(id) = &oauth.client_id {
        if id.trim().is_empty() {
            fail(format!("{section}.client_id must not be empty when set"));
        }
    }
}
