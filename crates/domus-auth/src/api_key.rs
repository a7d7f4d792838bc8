// SPDX-FileCopyrightText: 2026 Domus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! API-key validation by a single read-only call.

use domus_core::{Credentials, GatewayError, Platform};
use reqwest::RequestBuilder;
use tracing::info;

use crate::http::{self, Operation};

/// Sends `probe` (a read-only request already carrying the key) and returns
/// API-key credentials when the platform accepts it.
///
/// 401/403 yield [`GatewayError::InvalidCredentials`]; any other non-2xx is
/// [`GatewayError::AuthenticationFailed`]; transport errors are
/// [`GatewayError::NetworkError`].
pub async fn validate(
    platform: Platform,
    key: &str,
    probe: RequestBuilder,
) -> Result<Credentials, GatewayError> {
    if key.trim().is_empty() {
        return Err(GatewayError::InvalidCredentials { platform });
    }
    http::send(probe, platform, Operation::Authenticate, None).await?;
    info!(%platform, "api key accepted");
    Ok(Credentials::new(platform).with_api_key(key))
}
