// SPDX-FileCopyrightText: 2026 Domus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end adapter flows against mock platform backends.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use domus_auth::{BridgeLocator, BridgePairing, HostProbe};
use domus_config::DomusConfig;
use domus_core::{
    Command, Credentials, DeviceType, ErrorKind, GatewayError, Platform, PlatformAdapter,
    PlatformDevice, WebAuthSession,
};
use domus_platforms::{
    create_adapter, hubitat, AdapterContext, HubitatAdapter, HueAdapter, SimulatedAdapter,
};
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Approves every authorization request by echoing its state with a fixed code.
struct ApprovingSession;

#[async_trait]
impl WebAuthSession for ApprovingSession {
    async fn authorize(&self, url: &Url, callback_scheme: &str) -> Result<Url, GatewayError> {
        let state = url
            .query_pairs()
            .find(|(k, _)| k == "state")
            .map(|(_, v)| v.into_owned())
            .unwrap_or_default();
        Url::parse(&format!("{callback_scheme}://oauth-callback?code=granted&state={state}"))
            .map_err(|e| GatewayError::auth_failed(e.to_string()))
    }
}

fn context(config: DomusConfig) -> AdapterContext {
    AdapterContext::new(config, Arc::new(ApprovingSession)).unwrap()
}

fn client() -> reqwest::Client {
    reqwest::Client::new()
}

/// A probe whose only candidate is `host`; `127.0.0.1:1` refuses connections.
fn probe_for(platform: Platform, host: Option<String>, probe_path: &str) -> HostProbe {
    HostProbe::new(
        platform,
        client(),
        "127.0.0.1:1",
        host.into_iter().collect(),
        Duration::from_millis(500),
    )
    .with_path(probe_path)
}

#[tokio::test]
async fn lifx_key_discover_execute_and_status() {
    let server = MockServer::start().await;
    let lights = json!([{
        "id": "d073d5",
        "label": "Desk",
        "connected": true,
        "power": "off",
        "brightness": 0.5,
        "group": { "name": "Office" },
        "product": { "name": "LIFX A19" }
    }]);
    Mock::given(method("GET"))
        .and(path("/lights/all"))
        .and(header("authorization", "Bearer key-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&lights))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/lights/id:d073d5/state"))
        .and(body_partial_json(json!({ "power": "on", "brightness": 0.4 })))
        .respond_with(ResponseTemplate::new(207).set_body_json(json!({ "results": [] })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/lights/id:d073d5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": "d073d5", "label": "Desk", "connected": true, "power": "on", "brightness": 0.4
        }])))
        .mount(&server)
        .await;

    let mut config = DomusConfig::default();
    config.lifx.base_url = Some(server.uri());
    let adapter = create_adapter(Platform::Lifx, &context(config)).unwrap();

    let creds = adapter.authenticate_with_key("key-1").await.unwrap();
    let devices = adapter.discover(&creds).await.unwrap();
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].property("group"), Some("Office"));
    assert_eq!(devices[0].property("brightness"), Some("50"));

    adapter
        .execute(&Command::SetBrightness { value: 40 }, &devices[0], &creds)
        .await
        .unwrap();
    let status = adapter.fetch_status(&devices[0], &creds).await.unwrap();
    assert!(status.is_on);
    assert_eq!(status.brightness, Some(40));
    assert!(!status.simulated);
}

#[tokio::test]
async fn lifx_rejected_key_is_invalid_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/lights/all"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let mut config = DomusConfig::default();
    config.lifx.base_url = Some(server.uri());
    let adapter = create_adapter(Platform::Lifx, &context(config)).unwrap();

    let err = adapter.authenticate_with_key("wrong").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidCredentials);
}

#[tokio::test]
async fn hue_pairs_with_cloud_discovered_bridge() {
    let cloud = MockServer::start().await;
    let bridge = MockServer::start().await;
    let bridge_host = bridge.address().to_string();

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{ "id": "001788fffe", "internalipaddress": bridge_host }])),
        )
        .mount(&cloud)
        .await;
    Mock::given(method("POST"))
        .and(path("/api"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{ "success": { "username": "user-1" } }])),
        )
        .expect(1)
        .mount(&bridge)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/user-1/lights"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "1": { "name": "Ceiling", "state": { "on": true, "bri": 254, "reachable": true }, "modelid": "LCT015" }
        })))
        .mount(&bridge)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/user-1/lights/1/state"))
        .and(body_partial_json(json!({ "on": false })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{ "success": { "/lights/1/state/on": false } }])),
        )
        .expect(1)
        .mount(&bridge)
        .await;

    let adapter = HueAdapter::new(
        client(),
        BridgeLocator::new(Platform::Hue, client(), cloud.uri(), probe_for(Platform::Hue, None, "/api/config")),
        BridgePairing::new(Platform::Hue, client(), "domus#test", 1, Duration::from_millis(10)),
    );

    let creds = adapter.authenticate().await.unwrap();
    assert_eq!(creds.bridge_ip.as_deref(), Some(bridge_host.as_str()));
    assert_eq!(creds.user_id.as_deref(), Some("user-1"));

    let devices = adapter.discover(&creds).await.unwrap();
    assert_eq!(devices.len(), 1);
    assert!(devices[0].is_on);
    assert_eq!(devices[0].property("brightness"), Some("100"));

    // Toggle flips the cached on flag.
    adapter.execute(&Command::Toggle, &devices[0], &creds).await.unwrap();
}

#[tokio::test]
async fn hue_revoked_user_is_invalid_credentials() {
    let bridge = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/gone/lights"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "error": { "type": 1, "address": "/lights", "description": "unauthorized user" }
        }])))
        .mount(&bridge)
        .await;

    let adapter = HueAdapter::new(
        client(),
        BridgeLocator::new(Platform::Hue, client(), bridge.uri(), probe_for(Platform::Hue, None, "/api/config")),
        BridgePairing::new(Platform::Hue, client(), "domus#test", 1, Duration::from_millis(10)),
    );
    let creds = Credentials::new(Platform::Hue)
        .with_bridge_ip(bridge.address().to_string())
        .with_user_id("gone");

    let err = adapter.discover(&creds).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidCredentials);
}

#[tokio::test]
async fn hubitat_probe_then_token_then_execute() {
    let hub = MockServer::start().await;
    let host = hub.address().to_string();

    Mock::given(method("GET"))
        .and(path(hubitat::PROBE_PATH))
        .respond_with(ResponseTemplate::new(200))
        .mount(&hub)
        .await;
    Mock::given(method("GET"))
        .and(path("/apps/api/1/devices"))
        .and(query_param("access_token", "maker-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&hub)
        .await;
    Mock::given(method("GET"))
        .and(path("/apps/api/1/devices/all"))
        .and(query_param("access_token", "maker-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": "7",
            "name": "Generic Zigbee Bulb",
            "label": "Porch",
            "capabilities": ["Switch", "SwitchLevel"],
            "attributes": { "switch": "off", "level": "80" }
        }])))
        .mount(&hub)
        .await;
    Mock::given(method("GET"))
        .and(path("/apps/api/1/devices/7/on"))
        .and(query_param("access_token", "maker-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&hub)
        .await;

    let adapter = HubitatAdapter::new(
        client(),
        probe_for(Platform::Hubitat, Some(host.clone()), hubitat::PROBE_PATH),
        "1",
        Some("maker-token".into()),
        None,
    );

    let creds = adapter.authenticate().await.unwrap();
    assert_eq!(creds.local_ip.as_deref(), Some(host.as_str()));
    assert!(creds.access_token.is_some());

    let devices = adapter.discover(&creds).await.unwrap();
    assert_eq!(devices[0].device_type, DeviceType::Bulb);
    assert_eq!(devices[0].name, "Porch");
    assert_eq!(devices[0].property("brightness"), Some("80"));

    adapter.execute(&Command::Toggle, &devices[0], &creds).await.unwrap();
}

#[tokio::test]
async fn hubitat_without_token_yields_address_only_credentials() {
    let hub = MockServer::start().await;
    let host = hub.address().to_string();
    Mock::given(method("GET"))
        .and(path(hubitat::PROBE_PATH))
        .respond_with(ResponseTemplate::new(200))
        .mount(&hub)
        .await;

    let adapter = HubitatAdapter::new(
        client(),
        probe_for(Platform::Hubitat, Some(host.clone()), hubitat::PROBE_PATH),
        "1",
        None,
        None,
    );
    let creds = adapter.authenticate().await.unwrap();
    assert_eq!(creds.local_ip.as_deref(), Some(host.as_str()));
    assert!(creds.access_token.is_none());

    // Address-only credentials cannot list devices.
    let err = adapter.discover(&creds).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PlatformNotAuthenticated);
}

#[tokio::test]
async fn smartthings_oauth_then_missing_device() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "st-access",
            "refresh_token": "st-refresh",
            "expires_in": 86400
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/devices/gone/commands"))
        .and(header("authorization", "Bearer st-access"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let mut config = DomusConfig::default();
    config.smartthings.base_url = Some(server.uri());
    config.smartthings.token_url = Some(format!("{}/oauth/token", server.uri()));
    config.smartthings.client_id = Some("client-1".into());
    let adapter = create_adapter(Platform::SmartThings, &context(config)).unwrap();

    let creds = adapter.authenticate().await.unwrap();
    assert_eq!(creds.bearer(), Some("st-access"));
    assert_eq!(creds.refresh_secret(), Some("st-refresh"));
    assert!(creds.expires_at.is_some());

    let gone = PlatformDevice::new("gone", "Old Plug", DeviceType::HubDevice);
    let err = adapter.execute(&Command::TurnOn, &gone, &creds).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DeviceNotFound);
    assert!(err.to_string().contains("smartthings:gone"));
}

#[tokio::test]
async fn oauth_platform_without_client_id_is_a_config_error() {
    let adapter = create_adapter(Platform::Ecobee, &context(DomusConfig::default())).unwrap();
    let err = adapter.authenticate().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Config);
}

#[tokio::test]
async fn wyze_envelope_codes_are_classified() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/home_page/get_object_list"))
        .and(body_partial_json(json!({ "access_token": "good" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": "1",
            "msg": "",
            "data": { "device_list": [
                { "mac": "7C78B2", "nickname": "Bedroom", "product_type": "Light",
                  "product_model": "WLPA19", "conn_state": 1, "device_params": { "power_switch": 1 } },
                { "mac": "GW01", "nickname": "Gateway", "product_type": "Gateway" }
            ]}
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/home_page/get_object_list"))
        .and(body_partial_json(json!({ "access_token": "stale" })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "code": 2001, "msg": "AccessTokenError" })),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auto/run_action"))
        .and(body_partial_json(json!({ "instance_id": "7C78B2", "action_key": "power_off" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "code": "1", "data": {} })))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = DomusConfig::default();
    config.wyze.base_url = Some(server.uri());
    let adapter = create_adapter(Platform::Wyze, &context(config)).unwrap();

    let creds = adapter.authenticate_with_key("good").await.unwrap();
    let devices = adapter.discover(&creds).await.unwrap();
    // The gateway has no device type and is skipped.
    assert_eq!(devices.len(), 1);
    assert!(devices[0].is_on);

    adapter.execute(&Command::Toggle, &devices[0], &creds).await.unwrap();

    let err = adapter.authenticate_with_key("stale").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidCredentials);
}

#[tokio::test]
async fn unreachable_backend_is_a_network_error() {
    let mut config = DomusConfig::default();
    config.roborock.base_url = Some("http://127.0.0.1:1".into());
    let adapter = create_adapter(Platform::Roborock, &context(config)).unwrap();
    let creds = Credentials::new(Platform::Roborock).with_api_key("k");
    let vacuum = PlatformDevice::new("rr-1", "S7", DeviceType::Vacuum);

    let err = adapter.execute(&Command::StartCleaning, &vacuum, &creds).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NetworkError);
    assert!(err.is_transient());
}

#[tokio::test]
async fn simulated_platform_needs_no_backend() {
    let mut config = DomusConfig::default();
    config.simulation.platforms = vec![Platform::Nest];
    let adapter = create_adapter(Platform::Nest, &context(config)).unwrap();
    assert!(adapter.is_simulated());

    let creds = adapter.authenticate().await.unwrap();
    assert!(creds.is_valid());
    let devices = adapter.discover(&creds).await.unwrap();
    let thermostat = devices
        .iter()
        .find(|d| d.device_type == DeviceType::Thermostat)
        .unwrap();

    adapter
        .execute(&Command::SetTemperature { celsius: 21.5 }, thermostat, &creds)
        .await
        .unwrap();
    let status = adapter.fetch_status(thermostat, &creds).await.unwrap();
    assert_eq!(status.temperature, Some(21.5));
    assert!(status.simulated);
}

#[tokio::test]
async fn simulated_refresh_issues_new_expiry() {
    let adapter = SimulatedAdapter::new(Platform::Ring);
    let creds = adapter.authenticate().await.unwrap();
    let refreshed = adapter.refresh(&creds).await.unwrap();
    assert!(refreshed.expires_at.is_some());
    assert_eq!(refreshed.refresh_secret(), Some("simulated-refresh"));
}

#[tokio::test]
async fn nest_discover_execute_and_status() {
    let server = MockServer::start().await;
    let hallway = json!({
        "name": "enterprises/p1/devices/t1",
        "type": "sdm.devices.types.THERMOSTAT",
        "traits": {
            "sdm.devices.traits.Info": { "customName": "Hallway" },
            "sdm.devices.traits.Connectivity": { "status": "ONLINE" },
            "sdm.devices.traits.ThermostatMode": { "mode": "HEAT" },
            "sdm.devices.traits.Temperature": { "ambientTemperatureCelsius": 19.5 },
            "sdm.devices.traits.Humidity": { "ambientHumidityPercent": 41.0 }
        },
        "parentRelations": [{ "displayName": "Upstairs" }]
    });
    Mock::given(method("GET"))
        .and(path("/enterprises/p1/devices"))
        .and(header("authorization", "Bearer nest-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "devices": [
                hallway.clone(),
                { "name": "enterprises/p1/devices/lock", "type": "sdm.devices.types.LOCK" }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/enterprises/p1/devices/t1:executeCommand"))
        .and(body_partial_json(json!({
            "command": "sdm.devices.commands.ThermostatTemperatureSetpoint.SetHeat",
            "params": { "heatCelsius": 21.5 }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/enterprises/p1/devices/t1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&hallway))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = DomusConfig::default();
    config.nest.base_url = Some(server.uri());
    config.nest.project_id = Some("p1".into());
    let adapter = create_adapter(Platform::Nest, &context(config)).unwrap();
    let creds = Credentials::new(Platform::Nest).with_access_token("nest-token");

    let devices = adapter.discover(&creds).await.unwrap();
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].name, "Hallway");
    assert_eq!(devices[0].device_type, DeviceType::Thermostat);
    assert_eq!(devices[0].property("mode"), Some("HEAT"));

    adapter
        .execute(&Command::SetTemperature { celsius: 21.5 }, &devices[0], &creds)
        .await
        .unwrap();
    let status = adapter.fetch_status(&devices[0], &creds).await.unwrap();
    assert!(status.is_online);
    assert!(status.is_on);
    assert_eq!(status.mode.as_deref(), Some("HEAT"));
    assert_eq!(status.temperature, Some(19.5));
    assert_eq!(status.humidity, Some(41.0));
}

#[tokio::test]
async fn nest_without_project_is_a_config_error() {
    let adapter = create_adapter(Platform::Nest, &context(DomusConfig::default())).unwrap();
    let creds = Credentials::new(Platform::Nest).with_access_token("nest-token");
    let err = adapter.discover(&creds).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Config);
}

#[tokio::test]
async fn ecobee_discover_execute_and_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/thermostat"))
        .and(query_param("format", "json"))
        .and(header("authorization", "Bearer eco-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "thermostatList": [{
                "identifier": "3110",
                "name": "Upstairs",
                "runtime": { "connected": true, "actualTemperature": 720, "actualHumidity": 45 },
                "settings": { "hvacMode": "heat" }
            }],
            "status": { "code": 0, "message": "" }
        })))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/thermostat"))
        .and(body_partial_json(json!({
            "selection": { "selectionType": "thermostats", "selectionMatch": "3110" },
            "thermostat": { "settings": { "hvacMode": "cool" } }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": { "code": 0, "message": "" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = DomusConfig::default();
    config.ecobee.base_url = Some(server.uri());
    let adapter = create_adapter(Platform::Ecobee, &context(config)).unwrap();
    let creds = Credentials::new(Platform::Ecobee).with_access_token("eco-token");

    let devices = adapter.discover(&creds).await.unwrap();
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].native_id, "3110");
    assert_eq!(devices[0].name, "Upstairs");
    assert!(devices[0].is_online);

    adapter
        .execute(&Command::SetMode { mode: "COOL".into() }, &devices[0], &creds)
        .await
        .unwrap();
    let status = adapter.fetch_status(&devices[0], &creds).await.unwrap();
    assert_eq!(status.temperature, Some(22.2));
    assert_eq!(status.humidity, Some(45.0));
    assert_eq!(status.mode.as_deref(), Some("heat"));
}

#[tokio::test]
async fn ecobee_expired_token_status_is_invalid_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/thermostat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": { "code": 14, "message": "Authentication token has expired" }
        })))
        .mount(&server)
        .await;

    let mut config = DomusConfig::default();
    config.ecobee.base_url = Some(server.uri());
    let adapter = create_adapter(Platform::Ecobee, &context(config)).unwrap();
    let creds = Credentials::new(Platform::Ecobee).with_access_token("stale");
    let upstairs = PlatformDevice::new("3110", "Upstairs", DeviceType::Thermostat);

    let err = adapter.execute(&Command::TurnOff, &upstairs, &creds).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidCredentials);
}

#[tokio::test]
async fn ring_discover_execute_and_status() {
    let server = MockServer::start().await;
    let front_door = json!({
        "id": 12345,
        "description": "Front Door",
        "kind": "lpd_v1",
        "battery_life": "87",
        "alerts": { "connection": "online" }
    });
    Mock::given(method("GET"))
        .and(path("/ring_devices"))
        .and(header("authorization", "Bearer ring-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "doorbots": [front_door.clone()],
            "authorized_doorbots": [front_door],
            "stickup_cams": [{ "id": 678, "description": "Garage", "led_status": "on" }]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/snapshots"))
        .and(body_partial_json(json!({ "doorbot_ids": [12345], "refresh": true })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/doorbots/678/floodlight_light_off"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/doorbots/12345/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "device_health": { "battery_percentage": 86 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = DomusConfig::default();
    config.ring.base_url = Some(server.uri());
    let adapter = create_adapter(Platform::Ring, &context(config)).unwrap();
    let creds = Credentials::new(Platform::Ring).with_access_token("ring-token");

    let devices = adapter.discover(&creds).await.unwrap();
    assert_eq!(devices.len(), 2);
    let (door, garage) = (&devices[0], &devices[1]);
    assert_eq!(door.property("battery"), Some("87"));
    assert_eq!(door.property("family"), Some("doorbot"));
    assert_eq!(garage.property("family"), Some("stickup_cam"));
    assert!(garage.is_on);

    adapter.execute(&Command::TakePhoto, door, &creds).await.unwrap();
    adapter.execute(&Command::TurnOff, garage, &creds).await.unwrap();
    let status = adapter.fetch_status(door, &creds).await.unwrap();
    assert!(status.is_online);
    assert_eq!(status.battery, Some(86));
}

#[tokio::test]
async fn roborock_key_discover_execute_and_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/devices"))
        .and(header("authorization", "Bearer rr-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "devices": [{ "duid": "rr-1", "name": "S7", "online": true, "model": "roborock.vacuum.a15" }]
        })))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/devices/rr-1/command"))
        .and(body_partial_json(json!({ "method": "set_custom_mode", "params": [103] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": ["ok"] })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/devices/rr-1/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "state": 5, "battery": 80, "fan_power": 103
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = DomusConfig::default();
    config.roborock.base_url = Some(server.uri());
    let adapter = create_adapter(Platform::Roborock, &context(config)).unwrap();

    let creds = adapter.authenticate_with_key("rr-key").await.unwrap();
    let devices = adapter.discover(&creds).await.unwrap();
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].property("model"), Some("roborock.vacuum.a15"));

    adapter
        .execute(&Command::SetMode { mode: "turbo".into() }, &devices[0], &creds)
        .await
        .unwrap();
    let status = adapter.fetch_status(&devices[0], &creds).await.unwrap();
    assert!(status.is_cleaning);
    assert_eq!(status.battery, Some(80));
    assert_eq!(status.mode.as_deref(), Some("turbo"));
}

#[tokio::test]
async fn irobot_token_discover_execute_and_status() {
    let bridge = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/local/info/state"))
        .and(header("authorization", "Bearer roomba-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "Rosie",
            "mac": "aa:bb:cc",
            "sku": "R960020",
            "batPct": 76,
            "cleanMissionStatus": { "phase": "run" }
        })))
        .expect(3)
        .mount(&bridge)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/local/action/dock"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&bridge)
        .await;

    let mut config = DomusConfig::default();
    config.irobot.host = Some(bridge.address().to_string());
    config.irobot.token = Some("roomba-token".into());
    let adapter = create_adapter(Platform::IRobot, &context(config)).unwrap();

    let creds = adapter.authenticate().await.unwrap();
    assert_eq!(creds.host(), Some(bridge.address().to_string().as_str()));
    let devices = adapter.discover(&creds).await.unwrap();
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].native_id, "aa:bb:cc");
    assert_eq!(devices[0].property("model"), Some("R960020"));
    assert!(devices[0].is_on);

    adapter.execute(&Command::ReturnToBase, &devices[0], &creds).await.unwrap();
    let status = adapter.fetch_status(&devices[0], &creds).await.unwrap();
    assert!(status.is_cleaning);
    assert_eq!(status.battery, Some(76));
    assert_eq!(status.mode.as_deref(), Some("run"));
}
