// SPDX-FileCopyrightText: 2026 Domus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared HTTP plumbing: client construction and status classification.
//!
//! Every platform call goes through [`send`], which maps transport errors to
//! [`GatewayError::NetworkError`], 401/403 to [`GatewayError::InvalidCredentials`],
//! 404 on a device URL to [`GatewayError::DeviceNotFound`], and any other
//! non-2xx to the failure kind of the [`Operation`] being performed.

use std::fmt;
use std::time::Duration;

use domus_core::{DeviceId, GatewayError, Platform};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

/// Client-wide HTTP settings taken from `[gateway]` config.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            user_agent: concat!("domus/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl HttpSettings {
    /// Builds a pooled client with the configured timeout and default headers.
    pub fn build_client(&self) -> Result<reqwest::Client, GatewayError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&self.user_agent).map_err(|e| {
                GatewayError::Config(format!("invalid user agent header value: {e}"))
            })?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        reqwest::Client::builder()
            .default_headers(headers)
            .timeout(self.timeout)
            .build()
            .map_err(|e| GatewayError::NetworkError {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })
    }
}

/// The kind of platform call in flight; decides which error a failed status maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Authenticate,
    Discover,
    Execute,
    Status,
}

impl Operation {
    /// The operation-specific failure carrying `reason`.
    pub fn failure(self, reason: impl Into<String>) -> GatewayError {
        let reason = reason.into();
        match self {
            Operation::Authenticate => GatewayError::AuthenticationFailed { reason },
            Operation::Discover => GatewayError::DeviceDiscoveryFailed { reason },
            Operation::Execute => GatewayError::ActionExecutionFailed { reason },
            Operation::Status => GatewayError::DeviceStatusFailed { reason },
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Authenticate => "authenticate",
            Operation::Discover => "discover",
            Operation::Execute => "execute",
            Operation::Status => "status",
        })
    }
}

/// Sends `request` and classifies the outcome.
///
/// `device` is the platform-native id when the URL addresses a single device;
/// only then does a 404 become [`GatewayError::DeviceNotFound`].
pub async fn send(
    request: RequestBuilder,
    platform: Platform,
    operation: Operation,
    device: Option<&str>,
) -> Result<Response, GatewayError> {
    let response = request
        .send()
        .await
        .map_err(|e| GatewayError::network(&format!("{platform} {operation} request failed"), e))?;

    let status = response.status();
    debug!(%platform, %operation, status = %status, "platform response received");

    if status.is_success() {
        return Ok(response);
    }

    match (status, device) {
        (StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN, _) => {
            Err(GatewayError::InvalidCredentials { platform })
        }
        (StatusCode::NOT_FOUND, Some(native_id)) => Err(GatewayError::DeviceNotFound {
            id: DeviceId::for_platform(platform, native_id),
        }),
        _ => {
            let body = response.text().await.unwrap_or_default();
            Err(operation.failure(format!("{status}: {body}")))
        }
    }
}

/// Sends `request` and decodes a JSON body.
pub async fn send_json<T: DeserializeOwned>(
    request: RequestBuilder,
    platform: Platform,
    operation: Operation,
    device: Option<&str>,
) -> Result<T, GatewayError> {
    let response = send(request, platform, operation, device).await?;
    response
        .json::<T>()
        .await
        .map_err(|e| operation.failure(format!("{platform} returned an unreadable body: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn respond(status: u16, device: Option<&str>) -> Result<Response, GatewayError> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/thing"))
            .respond_with(ResponseTemplate::new(status).set_body_string("nope"))
            .mount(&server)
            .await;
        let client = HttpSettings::default().build_client().unwrap();
        send(
            client.get(format!("{}/thing", server.uri())),
            Platform::Lifx,
            Operation::Execute,
            device,
        )
        .await
    }

    #[tokio::test]
    async fn unauthorized_maps_to_invalid_credentials() {
        let err = respond(401, None).await.unwrap_err();
        assert!(matches!(err, GatewayError::InvalidCredentials { platform: Platform::Lifx }));
        let err = respond(403, None).await.unwrap_err();
        assert!(matches!(err, GatewayError::InvalidCredentials { .. }));
    }

    #[tokio::test]
    async fn not_found_on_device_url_maps_to_device_not_found() {
        let err = respond(404, Some("d073d5")).await.unwrap_err();
        match err {
            GatewayError::DeviceNotFound { id } => assert_eq!(id.as_str(), "lifx:d073d5"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn other_status_uses_operation_failure_with_body() {
        let err = respond(500, Some("d073d5")).await.unwrap_err();
        match err {
            GatewayError::ActionExecutionFailed { reason } => {
                assert!(reason.starts_with("500"), "{reason}");
                assert!(reason.ends_with("nope"), "{reason}");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn connection_refused_is_a_network_error() {
        let client = HttpSettings::default().build_client().unwrap();
        let err = send(
            client.get("http://127.0.0.1:1/unreachable"),
            Platform::Hue,
            Operation::Discover,
            None,
        )
        .await
        .unwrap_err();
        assert!(err.is_transient());
    }
}
