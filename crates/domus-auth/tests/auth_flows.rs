// SPDX-FileCopyrightText: 2026 Domus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Auth flows against wiremock servers.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use domus_auth::{api_key, BridgeLocator, BridgePairing, HostProbe, HttpSettings, OAuthClientConfig, OAuthFlow};
use domus_core::{Credentials, GatewayError, Platform, WebAuthSession};
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client() -> reqwest::Client {
    HttpSettings::default().build_client().expect("client")
}

fn oauth_config(server: &MockServer) -> OAuthClientConfig {
    OAuthClientConfig {
        authorize_url: format!("{}/authorize", server.uri()),
        token_url: format!("{}/token", server.uri()),
        client_id: "cid".into(),
        client_secret: Some("csecret".to_string().into()),
        redirect_uri: "domus://oauth-callback".into(),
        callback_scheme: "domus".into(),
        scopes: vec![],
        extra_params: vec![],
    }
}

/// Echoes the `state` it was given, optionally tampering with it.
struct ScriptedSession {
    tamper: bool,
    seen_scheme: Mutex<Option<String>>,
}

#[async_trait]
impl WebAuthSession for ScriptedSession {
    async fn authorize(&self, url: &Url, callback_scheme: &str) -> Result<Url, GatewayError> {
        *self.seen_scheme.lock().unwrap() = Some(callback_scheme.to_string());
        let state = url
            .query_pairs()
            .find(|(k, _)| k == "state")
            .map(|(_, v)| v.into_owned())
            .unwrap();
        let state = if self.tamper { format!("{state}x") } else { state };
        Ok(Url::parse(&format!("domus://oauth-callback?code=the-code&state={state}")).unwrap())
    }
}

#[tokio::test]
async fn oauth_flow_exchanges_code_for_tokens() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=the-code"))
        .and(body_string_contains("client_secret=csecret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "at-1",
            "refresh_token": "rt-1",
            "expires_in": 3600,
            "token_type": "Bearer"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let flow = OAuthFlow::new(Platform::Ecobee, client(), oauth_config(&server));
    let session = ScriptedSession {
        tamper: false,
        seen_scheme: Mutex::new(None),
    };
    let creds = flow.run(&session).await.expect("flow succeeds");

    assert_eq!(creds.platform, Platform::Ecobee);
    assert_eq!(creds.bearer(), Some("at-1"));
    assert_eq!(creds.refresh_secret(), Some("rt-1"));
    assert!(creds.is_valid());
    assert_eq!(session.seen_scheme.lock().unwrap().as_deref(), Some("domus"));
}

#[tokio::test]
async fn oauth_state_mismatch_never_reaches_token_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let flow = OAuthFlow::new(Platform::Nest, client(), oauth_config(&server));
    let session = ScriptedSession {
        tamper: true,
        seen_scheme: Mutex::new(None),
    };
    let err = flow.run(&session).await.unwrap_err();
    assert!(matches!(err, GatewayError::AuthenticationFailed { .. }));
}

#[tokio::test]
async fn refresh_keeps_old_refresh_token_when_omitted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=rt-old"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "at-new",
            "expires_in": 60
        })))
        .mount(&server)
        .await;

    let flow = OAuthFlow::new(Platform::Ring, client(), oauth_config(&server));
    let old = Credentials::new(Platform::Ring)
        .with_access_token("at-old")
        .with_refresh_token("rt-old");
    let fresh = flow.refresh(&old).await.unwrap();
    assert_eq!(fresh.bearer(), Some("at-new"));
    assert_eq!(fresh.refresh_secret(), Some("rt-old"));
}

#[tokio::test]
async fn rejected_token_exchange_is_invalid_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid_client"))
        .mount(&server)
        .await;

    let flow = OAuthFlow::new(Platform::SmartThings, client(), oauth_config(&server));
    let err = flow.exchange_code("c").await.unwrap_err();
    assert!(matches!(err, GatewayError::InvalidCredentials { platform: Platform::SmartThings }));
}

#[tokio::test]
async fn probe_returns_first_host_answering_200() {
    let refusing = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&refusing)
        .await;
    let first_ok = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/hub"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&first_ok)
        .await;
    let second_ok = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&second_ok)
        .await;

    let probe = HostProbe::new(
        Platform::Hubitat,
        client(),
        "127.0.0.1:1",
        vec![
            refusing.address().to_string(),
            first_ok.address().to_string(),
            second_ok.address().to_string(),
        ],
        Duration::from_millis(500),
    )
    .with_path("/hub");

    let host = probe.locate().await.expect("a hub answers");
    assert_eq!(host, first_ok.address().to_string());
}

#[tokio::test]
async fn probe_with_no_responders_fails() {
    let probe = HostProbe::new(
        Platform::IRobot,
        client(),
        "127.0.0.1:1",
        vec!["127.0.0.1:2".into()],
        Duration::from_millis(200),
    );
    let err = probe.locate().await.unwrap_err();
    assert!(matches!(err, GatewayError::AuthenticationFailed { .. }));
}

#[tokio::test]
async fn bridge_locator_prefers_cloud_discovery() {
    let cloud = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/discover"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "001788fffe1234", "internalipaddress": "192.168.1.40"}
        ])))
        .mount(&cloud)
        .await;

    let probe = HostProbe::new(Platform::Hue, client(), "127.0.0.1:1", vec![], Duration::from_millis(100));
    let locator = BridgeLocator::new(Platform::Hue, client(), format!("{}/discover", cloud.uri()), probe);
    assert_eq!(locator.locate().await.unwrap(), "192.168.1.40");
}

#[tokio::test]
async fn bridge_locator_falls_back_to_probe_on_empty_list() {
    let cloud = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/discover"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&cloud)
        .await;
    let bridge = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/config"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "Hue Bridge"})))
        .mount(&bridge)
        .await;

    let probe = HostProbe::new(
        Platform::Hue,
        client(),
        "127.0.0.1:1",
        vec![bridge.address().to_string()],
        Duration::from_millis(500),
    )
    .with_path("/api/config");
    let locator = BridgeLocator::new(Platform::Hue, client(), format!("{}/discover", cloud.uri()), probe);
    assert_eq!(locator.locate().await.unwrap(), bridge.address().to_string());
}

#[tokio::test]
async fn pairing_retries_until_link_button_pressed() {
    let bridge = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"error": {"type": 101, "address": "", "description": "link button not pressed"}}
        ])))
        .up_to_n_times(2)
        .mount(&bridge)
        .await;
    Mock::given(method("POST"))
        .and(path("/api"))
        .and(body_string_contains("domus#test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"success": {"username": "hue-user-1"}}
        ])))
        .mount(&bridge)
        .await;

    let pairing = BridgePairing::new(Platform::Hue, client(), "domus#test", 3, Duration::from_millis(10));
    let user = pairing.pair(&bridge.address().to_string()).await.unwrap();
    assert_eq!(user, "hue-user-1");
}

#[tokio::test]
async fn pairing_gives_up_after_configured_attempts() {
    let bridge = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"error": {"type": 101, "description": "link button not pressed"}}
        ])))
        .expect(2)
        .mount(&bridge)
        .await;

    let pairing = BridgePairing::new(Platform::Hue, client(), "domus#test", 2, Duration::from_millis(5));
    match pairing.pair(&bridge.address().to_string()).await.unwrap_err() {
        GatewayError::AuthenticationFailed { reason } => assert_eq!(reason, "link button not pressed"),
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn api_key_validation_classifies_responses() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/lights/all"))
        .and(header("authorization", "Bearer good"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/lights/all"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let url = format!("{}/lights/all", server.uri());
    let ok = api_key::validate(Platform::Lifx, "good", client().get(&url).bearer_auth("good"))
        .await
        .unwrap();
    assert_eq!(ok.bearer(), Some("good"));

    let err = api_key::validate(Platform::Lifx, "bad", client().get(&url).bearer_auth("bad"))
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::InvalidCredentials { platform: Platform::Lifx }));
}

#[tokio::test]
async fn api_key_server_error_is_authentication_failed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;
    let err = api_key::validate(Platform::Wyze, "k", client().get(server.uri()))
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::AuthenticationFailed { .. }));
}
