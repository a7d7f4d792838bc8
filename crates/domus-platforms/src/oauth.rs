// SPDX-FileCopyrightText: 2026 Domus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wiring between OAuth2 platform adapters and the authorization-code flow.

use std::sync::Arc;

use domus_auth::{OAuthClientConfig, OAuthFlow};
use domus_config::model::{OAuthConfig, OAuthPlatformConfig};
use domus_core::{Credentials, GatewayError, Platform, WebAuthSession};
use secrecy::SecretString;

/// Public provider endpoints used when the config leaves them unset.
#[derive(Debug, Clone, Copy)]
pub struct ProviderDefaults {
    pub authorize_url: &'static str,
    pub token_url: &'static str,
    pub scopes: &'static [&'static str],
    pub extra_params: &'static [(&'static str, &'static str)],
}

/// An OAuth2 flow (when a client id is configured) plus the session that drives it.
#[derive(Clone)]
pub(crate) struct OAuthBinding {
    platform: Platform,
    flow: Option<OAuthFlow>,
    session: Arc<dyn WebAuthSession>,
}

impl OAuthBinding {
    pub(crate) fn new(
        platform: Platform,
        client: reqwest::Client,
        section: &OAuthPlatformConfig,
        oauth: &OAuthConfig,
        defaults: ProviderDefaults,
        session: Arc<dyn WebAuthSession>,
    ) -> Self {
        let flow = section.client_id.as_ref().map(|client_id| {
            let scopes = if section.scopes.is_empty() {
                defaults.scopes.iter().map(|s| s.to_string()).collect()
            } else {
                section.scopes.clone()
            };
            OAuthFlow::new(
                platform,
                client,
                OAuthClientConfig {
                    authorize_url: section
                        .authorize_url
                        .clone()
                        .unwrap_or_else(|| defaults.authorize_url.to_string()),
                    token_url: section
                        .token_url
                        .clone()
                        .unwrap_or_else(|| defaults.token_url.to_string()),
                    client_id: client_id.clone(),
                    client_secret: section.client_secret.clone().map(SecretString::from),
                    redirect_uri: oauth.redirect_uri.clone(),
                    callback_scheme: oauth.callback_scheme.clone(),
                    scopes,
                    extra_params: defaults
                        .extra_params
                        .iter()
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .collect(),
                },
            )
        });
        Self {
            platform,
            flow,
            session,
        }
    }

    fn flow(&self) -> Result<&OAuthFlow, GatewayError> {
        self.flow.as_ref().ok_or_else(|| {
            GatewayError::Config(format!(
                "{platform}.client_id is not configured",
                platform = self.platform
            ))
        })
    }

    pub(crate) async fn authenticate(&self) -> Result<Credentials, GatewayError> {
        self.flow()?.run(self.session.as_ref()).await
    }

    pub(crate) async fn refresh(&self, credentials: &Credentials) -> Result<Credentials, GatewayError> {
        self.flow()?.refresh(credentials).await
    }
}
