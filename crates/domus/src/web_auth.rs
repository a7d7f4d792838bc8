// SPDX-FileCopyrightText: 2026 Domus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Terminal web-auth session for OAuth2 platforms.
//!
//! Prints the authorization URL and waits for the user to paste the URL the
//! provider redirected to.

use async_trait::async_trait;
use colored::Colorize;
use domus_core::{GatewayError, WebAuthSession};
use url::Url;

pub struct TerminalWebAuth;

#[async_trait]
impl WebAuthSession for TerminalWebAuth {
    async fn authorize(&self, url: &Url, callback_scheme: &str) -> Result<Url, GatewayError> {
        println!("Open this URL in a browser and approve access:");
        println!("  {}", url.as_str().cyan());
        println!(
            "Then paste the {} URL you were sent to (empty line cancels):",
            format!("{callback_scheme}://").bold()
        );

        let line = tokio::task::spawn_blocking(|| {
            let mut line = String::new();
            std::io::stdin().read_line(&mut line).map(|_| line)
        })
        .await
        .map_err(|e| GatewayError::Internal(format!("stdin reader failed: {e}")))?
        .map_err(|e| GatewayError::auth_failed(format!("could not read callback URL: {e}")))?;

        parse_callback(&line, callback_scheme)
    }
}

fn parse_callback(input: &str, callback_scheme: &str) -> Result<Url, GatewayError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(GatewayError::auth_failed("authorization cancelled"));
    }
    let url = Url::parse(input)
        .map_err(|e| GatewayError::auth_failed(format!("callback is not a URL: {e}")))?;
    if url.scheme() != callback_scheme {
        return Err(GatewayError::auth_failed(format!(
            "callback uses scheme `{}`, expected `{callback_scheme}`",
            url.scheme()
        )));
    }
    Ok(url)
}
