// SPDX-FileCopyrightText: 2026 Domus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request plumbing shared by the cloud and local adapters.

use domus_auth::http::{self as auth_http, Operation};
use domus_core::traits::adapter::ensure_platform;
use domus_core::{
    Command, Credentials, DeviceId, GatewayError, Platform, WireCommand, WireMethod,
};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::warn;
use url::form_urlencoded;

/// A platform-tagged HTTP client.
#[derive(Debug, Clone)]
pub(crate) struct PlatformHttp {
    platform: Platform,
    client: reqwest::Client,
}

impl PlatformHttp {
    pub(crate) fn new(platform: Platform, client: reqwest::Client) -> Self {
        Self { platform, client }
    }

    pub(crate) fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Builds the request for a translated command against `base`.
    pub(crate) fn wire(&self, base: &str, wire: &WireCommand) -> RequestBuilder {
        let url = format!("{base}{}", wire.path);
        let request = match wire.method {
            WireMethod::Get => self.client.get(url),
            WireMethod::Post => self.client.post(url),
            WireMethod::Put => self.client.put(url),
        };
        match &wire.body {
            Some(body) => request.json(body),
            None => request,
        }
    }

    pub(crate) async fn send(
        &self,
        request: RequestBuilder,
        operation: Operation,
        device: Option<&str>,
    ) -> Result<Response, GatewayError> {
        auth_http::send(request, self.platform, operation, device).await
    }

    pub(crate) async fn json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        operation: Operation,
        device: Option<&str>,
    ) -> Result<T, GatewayError> {
        auth_http::send_json(request, self.platform, operation, device).await
    }

    /// The bearer secret of credentials issued for this platform.
    pub(crate) fn bearer<'a>(&self, credentials: &'a Credentials) -> Result<&'a str, GatewayError> {
        ensure_platform(self.platform, credentials)?;
        credentials
            .bearer()
            .ok_or(GatewayError::PlatformNotAuthenticated {
                platform: self.platform,
            })
    }

    /// The hub or bridge address of credentials issued for this platform.
    pub(crate) fn host<'a>(&self, credentials: &'a Credentials) -> Result<&'a str, GatewayError> {
        ensure_platform(self.platform, credentials)?;
        credentials
            .host()
            .ok_or(GatewayError::PlatformNotAuthenticated {
                platform: self.platform,
            })
    }

    /// `native_id` encoded as one path segment of a device URL.
    pub(crate) fn device_segment(&self, native_id: &str) -> Result<String, GatewayError> {
        segment(native_id).ok_or_else(|| GatewayError::DeviceNotFound {
            id: DeviceId::for_platform(self.platform, native_id),
        })
    }

    /// Error for a command this platform has no mapping for.
    pub(crate) fn unsupported(&self, command: &Command) -> GatewayError {
        GatewayError::ActionUnsupported {
            action: command.action(),
            target: Some(self.platform.display_name().to_string()),
        }
    }
}

/// Logs and returns `None` for a command `platform` cannot express.
pub(crate) fn no_mapping(platform: Platform, command: &Command) -> Option<WireCommand> {
    warn!(%platform, action = %command.action(), "no wire mapping for command");
    None
}

/// Percent-encodes `raw` as a single URL path segment.
///
/// Empty, `.` and `..` give `None`: URL parsing resolves the dot forms as
/// navigation even when they are percent-encoded.
pub(crate) fn segment(raw: &str) -> Option<String> {
    if matches!(raw, "" | "." | "..") {
        return None;
    }
    let encoded: String = form_urlencoded::byte_serialize(raw.as_bytes()).collect();
    Some(encoded.replace('+', "%20"))
}

/// Encodes every `/`-separated segment of a resource name.
pub(crate) fn resource_path(raw: &str) -> Option<String> {
    raw.split('/')
        .map(segment)
        .collect::<Option<Vec<_>>>()
        .map(|segments| segments.join("/"))
}

/// Parses `#RRGGBB` into hue (degrees), saturation and value (both 0..=1).
pub(crate) fn hex_to_hsv(hex: &str) -> Option<(f64, f64, f64)> {
    if !domus_core::action::is_hex_color(hex) {
        return None;
    }
    let digits = hex.strip_prefix('#').unwrap_or(hex);
    let channel = |i: usize| {
        digits
            .get(i..i + 2)
            .and_then(|pair| u8::from_str_radix(pair, 16).ok())
            .map(|v| f64::from(v) / 255.0)
    };
    let (r, g, b) = (channel(0)?, channel(2)?, channel(4)?);

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;
    let hue = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * (((g - b) / delta).rem_euclid(6.0))
    } else if max == g {
        60.0 * (((b - r) / delta) + 2.0)
    } else {
        60.0 * (((r - g) / delta) + 4.0)
    };
    let saturation = if max == 0.0 { 0.0 } else { delta / max };
    Some((hue, saturation, max))
}

/// Percent (0..=100) to a `0..=1` fraction.
pub(crate) fn fraction(percent: u8) -> f64 {
    f64::from(percent.min(100)) / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_colors_convert() {
        let (h, s, v) = hex_to_hsv("#FF0000").unwrap();
        assert_eq!((h, s, v), (0.0, 1.0, 1.0));
        let (h, _, _) = hex_to_hsv("#00FF00").unwrap();
        assert!((h - 120.0).abs() < 1e-9);
        let (h, _, _) = hex_to_hsv("#0000FF").unwrap();
        assert!((h - 240.0).abs() < 1e-9);
    }

    #[test]
    fn grey_has_no_saturation() {
        let (_, s, v) = hex_to_hsv("#808080").unwrap();
        assert_eq!(s, 0.0);
        assert!((v - 128.0 / 255.0).abs() < 1e-9);
    }

    #[test]
    fn malformed_hex_is_rejected() {
        assert!(hex_to_hsv("#FFF").is_none());
        assert!(hex_to_hsv("#GG0000").is_none());
        assert!(hex_to_hsv("#aébé").is_none());
        assert!(hex_to_hsv("#+12345").is_none());
    }

    #[test]
    fn segments_cannot_escape_their_position() {
        assert_eq!(segment("heat/../../hub/reboot").as_deref(), Some("heat%2F..%2F..%2Fhub%2Freboot"));
        assert_eq!(segment("living room").as_deref(), Some("living%20room"));
        assert_eq!(segment("d073d5a1b2c3").as_deref(), Some("d073d5a1b2c3"));
        assert_eq!(segment(".."), None);
        assert_eq!(segment(""), None);
    }

    #[test]
    fn resource_paths_keep_their_separators() {
        assert_eq!(
            resource_path("enterprises/p-1/devices/AVPH x").as_deref(),
            Some("enterprises/p-1/devices/AVPH%20x")
        );
        assert_eq!(resource_path("enterprises/../admin"), None);
        assert_eq!(resource_path("/enterprises"), None);
    }

    #[test]
    fn unaddressable_device_is_not_found() {
        let http = PlatformHttp::new(Platform::Hubitat, reqwest::Client::new());
        let err = http.device_segment("..").unwrap_err();
        assert!(matches!(err, GatewayError::DeviceNotFound { .. }));
    }

    #[test]
    fn bearer_rejects_foreign_credentials() {
        let http = PlatformHttp::new(Platform::Lifx, reqwest::Client::new());
        let hue = Credentials::new(Platform::Hue).with_api_key("x");
        assert!(matches!(
            http.bearer(&hue),
            Err(GatewayError::InvalidCredentials { platform: Platform::Lifx })
        ));
    }
}
