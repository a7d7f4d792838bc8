// SPDX-FileCopyrightText: 2026 Domus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domus - a smart-home device control gateway.
//!
//! This is the binary entry point for the gateway.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod platforms;
mod shell;
mod snapshot;
mod web_auth;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use colored::Colorize;
use domus_config::DomusConfig;

/// Domus - a smart-home device control gateway.
#[derive(Parser, Debug)]
#[command(name = "domus", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// List supported platforms and how each authenticates.
    Platforms {
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// Validate the configuration and print the effective values.
    Config,
    /// Launch an interactive shell driving a live device registry.
    Shell,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => domus_config::load_and_validate_path(path),
        None => domus_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            domus_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.gateway.log_level);

    match cli.command {
        Some(Commands::Platforms { json }) => platforms::run_platforms(&config, json),
        Some(Commands::Config) => print_config(&config),
        Some(Commands::Shell) => {
            if let Err(e) = shell::run_shell(config).await {
                eprintln!("{}: {e}", "error".red());
                std::process::exit(1);
            }
        }
        None => {
            println!("domus: use --help for available commands");
        }
    }
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("domus={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}

fn print_config(config: &DomusConfig) {
    match toml::to_string_pretty(&redacted(config)) {
        Ok(rendered) => print!("{rendered}"),
        Err(e) => {
            eprintln!("{}: failed to render config: {e}", "error".red());
            std::process::exit(1);
        }
    }
}

/// Copy of the config with every secret replaced by a marker.
fn redacted(config: &DomusConfig) -> DomusConfig {
    const MARK: &str = "[REDACTED]";
    let hide = |value: &mut Option<String>| {
        if value.is_some() {
            *value = Some(MARK.to_string());
        }
    };

    let mut config = config.clone();
    for section in [
        &mut config.lifx,
        &mut config.roborock,
        &mut config.wyze,
    ] {
        hide(&mut section.api_key);
    }
    for section in [
        &mut config.nest,
        &mut config.smartthings,
        &mut config.ecobee,
        &mut config.ring,
    ] {
        hide(&mut section.client_secret);
    }
    hide(&mut config.hubitat.token);
    hide(&mut config.irobot.token);
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["domus", "--config", "/tmp/d.toml", "platforms", "--json"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/d.toml")));
        assert!(matches!(cli.command, Some(Commands::Platforms { json: true })));
    }

    #[test]
    fn redaction_hides_every_secret() {
        let config = domus_config::load_and_validate_str(
            r#"
            [lifx]
            api_key = "lifx-secret"

            [smartthings]
            client_id = "st-client"
            client_secret = "st-secret"

            [hubitat]
            token = "maker-secret"
            "#,
        )
        .unwrap();

        let rendered = toml::to_string_pretty(&redacted(&config)).unwrap();
        assert!(!rendered.contains("lifx-secret"));
        assert!(!rendered.contains("st-secret"));
        assert!(!rendered.contains("maker-secret"));
        assert!(rendered.contains("st-client"));
        assert!(rendered.contains("[REDACTED]"));
    }
}
