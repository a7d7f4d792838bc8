// SPDX-FileCopyrightText: 2026 Domus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `domus platforms` command implementation.

use std::io::IsTerminal;

use colored::Colorize;
use domus_config::DomusConfig;
use domus_core::{AuthType, Platform};
use serde::Serialize;

/// One row of `domus platforms --json`.
#[derive(Debug, Serialize)]
pub struct PlatformRow {
    pub id: Platform,
    pub name: &'static str,
    pub auth_type: AuthType,
    pub icon: &'static str,
    pub color: &'static str,
    pub simulated: bool,
}

pub fn platform_rows(config: &DomusConfig) -> Vec<PlatformRow> {
    Platform::all()
        .into_iter()
        .map(|platform| {
            let info = platform.info();
            PlatformRow {
                id: platform,
                name: info.display_name,
                auth_type: info.auth_type,
                icon: info.icon,
                color: info.color,
                simulated: config.simulation.platforms.contains(&platform),
            }
        })
        .collect()
}

/// Run the `domus platforms` command.
pub fn run_platforms(config: &DomusConfig, json: bool) {
    let rows = platform_rows(config);
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&rows).unwrap_or_else(|_| "[]".to_string())
        );
        return;
    }

    let use_color = std::io::stdout().is_terminal();
    for row in rows {
        let id = format!("{:<12}", row.id.to_string());
        let name = format!("{:<14}", row.name);
        let auth = format!("{:<14}", row.auth_type.to_string());
        let mode = if row.simulated { "simulated" } else { "live" };
        if use_color {
            let mode = if row.simulated { mode.yellow() } else { mode.green() };
            println!("{} {} {} {}", id.bold(), name, auth.dimmed(), mode);
        } else {
            println!("{id} {name} {auth} {mode}");
        }
    }
}
