// SPDX-FileCopyrightText: 2026 Domus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OAuth2 authorization-code grant.
//!
//! The flow builds an authorization URL with a random `state`, hands it to a
//! [`WebAuthSession`], validates the callback, and exchanges the code for
//! tokens with a form-encoded POST. Refresh uses the same token endpoint.

use chrono::{Duration, Utc};
use domus_core::{Credentials, GatewayError, Platform, WebAuthSession};
use rand::distributions::Alphanumeric;
use rand::Rng;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

use crate::http::{self, Operation};

/// Length of the anti-forgery `state` parameter.
const STATE_LEN: usize = 32;

/// Provider registration for one OAuth2 platform.
#[derive(Debug, Clone)]
pub struct OAuthClientConfig {
    pub authorize_url: String,
    pub token_url: String,
    pub client_id: String,
    pub client_secret: Option<SecretString>,
    pub redirect_uri: String,
    pub callback_scheme: String,
    pub scopes: Vec<String>,
    /// Provider-specific query parameters (e.g. `access_type=offline`).
    pub extra_params: Vec<(String, String)>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Runs the authorization-code grant against one provider.
#[derive(Debug, Clone)]
pub struct OAuthFlow {
    platform: Platform,
    client: reqwest::Client,
    config: OAuthClientConfig,
}

impl OAuthFlow {
    pub fn new(platform: Platform, client: reqwest::Client, config: OAuthClientConfig) -> Self {
        Self {
            platform,
            client,
            config,
        }
    }

    /// Random 32-character alphanumeric `state`.
    pub fn generate_state() -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(STATE_LEN)
            .map(char::from)
            .collect()
    }

    /// The URL the user is sent to.
    pub fn authorization_url(&self, state: &str) -> Result<Url, GatewayError> {
        let mut url = Url::parse(&self.config.authorize_url).map_err(|e| {
            GatewayError::Config(format!(
                "{} authorize URL `{}` is invalid: {e}",
                self.platform, self.config.authorize_url
            ))
        })?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("response_type", "code")
                .append_pair("client_id", &self.config.client_id)
                .append_pair("redirect_uri", &self.config.redirect_uri)
                .append_pair("state", state);
            if !self.config.scopes.is_empty() {
                query.append_pair("scope", &self.config.scopes.join(" "));
            }
            for (key, value) in &self.config.extra_params {
                query.append_pair(key, value);
            }
        }
        Ok(url)
    }

    /// Full interactive flow: authorize, validate the callback, exchange the code.
    pub async fn run(&self, session: &dyn WebAuthSession) -> Result<Credentials, GatewayError> {
        let state = Self::generate_state();
        let url = self.authorization_url(&state)?;
        debug!(platform = %self.platform, "opening web authorization session");
        let callback = session.authorize(&url, &self.config.callback_scheme).await?;
        let code = extract_code(&callback, &state)?;
        self.exchange_code(&code).await
    }

    /// Exchanges an authorization code for tokens.
    pub async fn exchange_code(&self, code: &str) -> Result<Credentials, GatewayError> {
        let mut form = vec![
            ("grant_type", "authorization_code".to_string()),
            ("code", code.to_string()),
            ("redirect_uri", self.config.redirect_uri.clone()),
        ];
        self.push_client_auth(&mut form);
        let tokens = self.token_request(&form).await?;
        info!(platform = %self.platform, "authorization code exchanged");
        Ok(self.credentials_from(tokens, None))
    }

    /// Refresh-token grant. The old refresh token is kept when the provider omits one.
    pub async fn refresh(&self, current: &Credentials) -> Result<Credentials, GatewayError> {
        let refresh_token = current
            .refresh_secret()
            .ok_or_else(|| GatewayError::auth_failed("no refresh token available"))?;
        let mut form = vec![
            ("grant_type", "refresh_token".to_string()),
            ("refresh_token", refresh_token.to_string()),
        ];
        self.push_client_auth(&mut form);
        let tokens = self.token_request(&form).await?;
        debug!(platform = %self.platform, "access token refreshed");
        Ok(self.credentials_from(tokens, Some(current)))
    }

    fn push_client_auth(&self, form: &mut Vec<(&'static str, String)>) {
        form.push(("client_id", self.config.client_id.clone()));
        if let Some(secret) = &self.config.client_secret {
            form.push(("client_secret", secret.expose_secret().to_string()));
        }
    }

    async fn token_request(
        &self,
        form: &[(&'static str, String)],
    ) -> Result<TokenResponse, GatewayError> {
        let request = self.client.post(&self.config.token_url).form(form);
        http::send_json(request, self.platform, Operation::Authenticate, None).await
    }

    fn credentials_from(&self, tokens: TokenResponse, previous: Option<&Credentials>) -> Credentials {
        let mut creds = match previous {
            Some(prev) => prev.clone(),
            None => Credentials::new(self.platform),
        };
        creds.access_token = Some(SecretString::from(tokens.access_token));
        if let Some(refresh) = tokens.refresh_token {
            creds.refresh_token = Some(SecretString::from(refresh));
        }
        creds.expires_at = tokens
            .expires_in
            .map(|secs| Utc::now() + Duration::seconds(secs));
        creds
    }
}

/// Pulls the authorization code out of a callback URL after checking `state`.
pub fn extract_code(callback: &Url, expected_state: &str) -> Result<String, GatewayError> {
    let mut code = None;
    let mut state = None;
    let mut error = None;
    for (key, value) in callback.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            _ => {}
        }
    }

    if let Some(error) = error {
        return Err(GatewayError::auth_failed(error));
    }
    match state {
        Some(s) if s == expected_state => {}
        Some(_) => return Err(GatewayError::auth_failed("state mismatch in OAuth callback")),
        None => return Err(GatewayError::auth_failed("missing state in OAuth callback")),
    }
    code.filter(|c| !c.is_empty())
        .ok_or_else(|| GatewayError::auth_failed("missing authorization code in OAuth callback"))
}
