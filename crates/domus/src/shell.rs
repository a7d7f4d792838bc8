// SPDX-FileCopyrightText: 2026 Domus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `domus shell` command implementation.
//!
//! Launches an interactive REPL over a live registry built from the
//! configured adapters. Snapshots are persisted to the configured JSON file
//! and reloaded on the next start.

use std::str::FromStr;
use std::sync::Arc;

use colored::Colorize;
use domus_config::DomusConfig;
use domus_core::{Action, AuthType, DeviceId, GatewayError, Platform, RoomId, SnapshotSink};
use domus_platforms::AdapterContext;
use domus_registry::Registry;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use serde_json::Value;
use tracing::{info, warn};

use crate::snapshot::JsonFileSink;
use crate::web_auth::TerminalWebAuth;

const HELP: &str = "\
commands:
  platforms                          auth state of every platform
  auth <platform> [key|token]        authenticate, then discover devices
  token <platform> <token> <host>    pair a local hub at a known address
  disconnect <platform>              drop a platform's credentials
  discover                           rediscover on every connected platform
  devices [platform]                 list devices
  exec <device> <action> [json]      run an action, e.g. exec lifx:d1 set-brightness {\"brightness\": 40}
  status <device>                    show the cached status
  refresh <device>                   read the status from the platform
  rename <device> <name>             rename a device
  room <device> [room]               assign or clear a room
  reset                              forget every device and credential
  quit                               leave the shell";

/// One parsed shell line.
#[derive(Debug, PartialEq)]
enum Input {
    Help,
    Platforms,
    Auth { platform: Platform, secret: Option<String> },
    Token { platform: Platform, token: String, host: String },
    Disconnect(Platform),
    Discover,
    Devices(Option<Platform>),
    Exec { id: DeviceId, action: Action, params: Option<Value> },
    Status(DeviceId),
    Refresh(DeviceId),
    Rename { id: DeviceId, name: String },
    Room { id: DeviceId, room: Option<RoomId> },
    Reset,
    Quit,
}

fn parse_platform(raw: Option<&str>) -> Result<Platform, String> {
    let raw = raw.ok_or("missing platform")?;
    Platform::from_str(raw).map_err(|_| format!("unknown platform `{raw}`"))
}

fn parse_device(raw: Option<&str>) -> Result<DeviceId, String> {
    raw.map(DeviceId::from).ok_or_else(|| "missing device id".to_string())
}

fn parse_input(line: &str) -> Result<Input, String> {
    let line = line.trim();
    let (command, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();
    let mut args = rest.split_whitespace();

    let input = match command {
        "help" | "?" => Input::Help,
        "platforms" => Input::Platforms,
        "auth" => Input::Auth {
            platform: parse_platform(args.next())?,
            secret: args.next().map(str::to_string),
        },
        "token" => {
            let platform = parse_platform(args.next())?;
            let token = args.next().ok_or("missing token")?.to_string();
            let host = args.next().ok_or("missing host")?.to_string();
            Input::Token { platform, token, host }
        }
        "disconnect" => Input::Disconnect(parse_platform(args.next())?),
        "discover" => Input::Discover,
        "devices" => Input::Devices(args.next().map(|p| parse_platform(Some(p))).transpose()?),
        "exec" => {
            let id = parse_device(args.next())?;
            let raw_action = args.next().ok_or("missing action")?;
            let action =
                Action::from_str(raw_action).map_err(|_| format!("unknown action `{raw_action}`"))?;
            let json = args.collect::<Vec<_>>().join(" ");
            let params = if json.is_empty() {
                None
            } else {
                Some(serde_json::from_str(&json).map_err(|e| format!("parameters are not JSON: {e}"))?)
            };
            Input::Exec { id, action, params }
        }
        "status" => Input::Status(parse_device(args.next())?),
        "refresh" => Input::Refresh(parse_device(args.next())?),
        "rename" => {
            let id = parse_device(args.next())?;
            let name = args.collect::<Vec<_>>().join(" ");
            if name.is_empty() {
                return Err("missing name".to_string());
            }
            Input::Rename { id, name }
        }
        "room" => Input::Room {
            id: parse_device(args.next())?,
            room: args.next().map(|r| RoomId(r.to_string())),
        },
        "reset" => Input::Reset,
        "quit" | "exit" => Input::Quit,
        other => return Err(format!("unknown command `{other}`; type `help`")),
    };
    Ok(input)
}

/// Key from the config for api-key platforms, used when none is typed.
fn configured_key(config: &DomusConfig, platform: Platform) -> Option<String> {
    match platform {
        Platform::Lifx => config.lifx.api_key.clone(),
        Platform::Roborock => config.roborock.api_key.clone(),
        Platform::Wyze => config.wyze.api_key.clone(),
        _ => None,
    }
}

/// Runs the `domus shell` interactive REPL.
pub async fn run_shell(config: DomusConfig) -> Result<(), GatewayError> {
    let context = AdapterContext::new(config.clone(), Arc::new(TerminalWebAuth))?;
    let adapters = domus_platforms::create_adapters(&context)?;

    let mut builder = Registry::builder().with_adapters(adapters);
    if let Some(path) = &config.gateway.snapshot_path {
        let sink = JsonFileSink::new(path);
        match sink.load().await {
            Ok(Some(snapshot)) => {
                info!(path = %sink.path().display(), devices = snapshot.devices.len(), "loaded registry snapshot");
                builder = builder.with_snapshot(snapshot);
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "ignoring unreadable registry snapshot"),
        }
        builder = builder.with_sink(Arc::new(sink) as Arc<dyn SnapshotSink>);
    }
    let registry = builder.build();

    let mut rl = DefaultEditor::new()
        .map_err(|e| GatewayError::Internal(format!("failed to initialize readline: {e}")))?;

    println!("{}", "domus shell".bold().green());
    println!("Type {} for commands, {} to exit.\n", "help".yellow(), "quit".yellow());

    let prompt = format!("{}> ", "domus".green());
    loop {
        match rl.readline(&prompt) {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(&line);

                let input = match parse_input(&line) {
                    Ok(input) => input,
                    Err(message) => {
                        eprintln!("{}: {message}", "error".red());
                        continue;
                    }
                };
                if input == Input::Quit {
                    break;
                }
                if let Err(e) = handle_input(&config, &registry, input).await {
                    eprintln!("{} [{}]: {e}", "error".red(), e.kind());
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("{}: {e}", "error".red());
                break;
            }
        }
    }

    println!("{}", "goodbye".dimmed());
    Ok(())
}

async fn handle_input(
    config: &DomusConfig,
    registry: &Registry,
    input: Input,
) -> Result<(), GatewayError> {
    match input {
        Input::Help => println!("{HELP}"),
        Input::Platforms => print_platforms(registry),
        Input::Auth { platform, secret } => {
            let secret = secret.or_else(|| configured_key(config, platform));
            if platform.auth_type() == AuthType::OAuth2 {
                println!("{}", format!("starting {} authorization", platform.display_name()).dimmed());
            }
            if platform.auth_type() == AuthType::Bridge {
                println!("{}", "press the link button on the bridge".yellow());
            }
            registry.authenticate(platform, secret.as_deref()).await?;
            println!(
                "{} {} connected, {} devices",
                "ok".green(),
                platform.display_name(),
                registry.devices_for_platform(platform).len()
            );
        }
        Input::Token { platform, token, host } => {
            registry.authenticate_with_token(platform, &token, &host).await?;
            println!("{} {} connected", "ok".green(), platform.display_name());
        }
        Input::Disconnect(platform) => {
            registry.disconnect(platform).await?;
            println!("{} {} disconnected", "ok".green(), platform.display_name());
        }
        Input::Discover => {
            let report = registry.discover_all().await?;
            println!("{} devices found", report.total());
            for (platform, reason) in &report.failed {
                println!("  {} {}: {reason}", "failed".red(), platform.display_name());
            }
        }
        Input::Devices(filter) => {
            let devices = match filter {
                Some(platform) => registry.devices_for_platform(platform),
                None => registry.devices(),
            };
            if devices.is_empty() {
                println!("{}", "no devices".dimmed());
            }
            for device in devices {
                let platform = device
                    .platform
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| "-".to_string());
                let power = if device.is_on { "on".green() } else { "off".dimmed() };
                let online = if device.is_online { "" } else { " (offline)" };
                println!(
                    "{:<32} {:<24} {:<12} {:<12} {power}{}",
                    device.id.to_string().bold(),
                    device.name,
                    device.device_type.to_string(),
                    platform,
                    online.red()
                );
            }
        }
        Input::Exec { id, action, params } => {
            registry.execute_params(&id, action, params.as_ref()).await?;
            println!("{} {action} on {id}", "ok".green());
        }
        Input::Status(id) => match registry.status_of(&id) {
            Some(status) => print_json(&status),
            None if registry.device_by_id(&id).is_some() => {
                println!("{}", "no status yet; try `refresh`".dimmed());
            }
            None => return Err(GatewayError::DeviceNotFound { id }),
        },
        Input::Refresh(id) => {
            let status = registry.refresh_status(&id).await?;
            print_json(&status);
        }
        Input::Rename { id, name } => {
            registry.rename_device(&id, name).await?;
            println!("{} renamed {id}", "ok".green());
        }
        Input::Room { id, room } => {
            registry.assign_room(&id, room).await?;
            println!("{} updated {id}", "ok".green());
        }
        Input::Reset => {
            registry.reset_all().await?;
            println!("{} registry cleared", "ok".green());
        }
        Input::Quit => {}
    }
    Ok(())
}

fn print_platforms(registry: &Registry) {
    for status in registry.platform_statuses() {
        let state = if status.is_connected() {
            status.auth_state.name().green()
        } else {
            status.auth_state.name().dimmed()
        };
        let simulated = if status.simulated { " [simulated]" } else { "" };
        println!(
            "{:<14} {:<18} {:>3} devices{}",
            status.platform.display_name(),
            state,
            status.device_count,
            simulated.yellow()
        );
        if let Some(reason) = &status.discovery_error {
            println!("  {} {reason}", "discovery failed:".red());
        }
    }
    if let Some(last) = registry.last_error() {
        println!("{} {last}", "last error:".dimmed());
    }
}

fn print_json(value: &impl serde::Serialize) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn auth_takes_an_optional_secret() {
        assert_eq!(
            parse_input("auth lifx abc123").unwrap(),
            Input::Auth {
                platform: Platform::Lifx,
                secret: Some("abc123".into())
            }
        );
        assert_eq!(
            parse_input("auth Hue").unwrap(),
            Input::Auth {
                platform: Platform::Hue,
                secret: None
            }
        );
    }

    #[test]
    fn exec_parses_action_and_json_params() {
        assert_eq!(
            parse_input(r#"exec lifx:d1 set-brightness {"brightness": 40}"#).unwrap(),
            Input::Exec {
                id: DeviceId::from("lifx:d1"),
                action: Action::SetBrightness,
                params: Some(json!({ "brightness": 40 })),
            }
        );
        assert_eq!(
            parse_input("exec hue:3 toggle").unwrap(),
            Input::Exec {
                id: DeviceId::from("hue:3"),
                action: Action::Toggle,
                params: None,
            }
        );
    }

    #[test]
    fn bad_input_is_explained() {
        assert!(parse_input("auth zigbee").unwrap_err().contains("unknown platform"));
        assert!(parse_input("exec d1 fly").unwrap_err().contains("unknown action"));
        assert!(parse_input("exec d1 set-volume {oops").unwrap_err().contains("JSON"));
        assert!(parse_input("token hubitat abc").unwrap_err().contains("missing host"));
        assert!(parse_input("dance").unwrap_err().contains("unknown command"));
    }

    #[test]
    fn rename_keeps_spaces_in_the_name() {
        assert_eq!(
            parse_input("rename lifx:d1 Desk   lamp").unwrap(),
            Input::Rename {
                id: DeviceId::from("lifx:d1"),
                name: "Desk lamp".into()
            }
        );
    }

    #[test]
    fn room_can_be_cleared() {
        assert_eq!(
            parse_input("room tv").unwrap(),
            Input::Room {
                id: DeviceId::from("tv"),
                room: None
            }
        );
    }

    #[test]
    fn configured_key_only_applies_to_key_platforms() {
        let mut config = DomusConfig::default();
        config.lifx.api_key = Some("from-config".into());
        assert_eq!(configured_key(&config, Platform::Lifx).as_deref(), Some("from-config"));
        assert_eq!(configured_key(&config, Platform::Hue), None);
    }
}
