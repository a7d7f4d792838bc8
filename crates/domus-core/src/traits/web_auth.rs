// SPDX-FileCopyrightText: 2026 Domus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Interactive web authentication session used by OAuth2 flows.

use async_trait::async_trait;
use url::Url;

use crate::error::GatewayError;

/// Presents an authorization URL to the user and returns the callback URL.
///
/// Implementations open a browser (or print the URL) and wait until the
/// provider redirects to a URL using `callback_scheme`.
#[async_trait]
pub trait WebAuthSession: Send + Sync + 'static {
    async fn authorize(&self, url: &Url, callback_scheme: &str) -> Result<Url, GatewayError>;
}
