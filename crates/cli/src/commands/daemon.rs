// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `incidentctl daemon start` — launch `incidentd` in the foreground.
//! `incidentctl` never embeds the daemon: it depends on `incident-core`,
//! `incident-runbook`, and `incident-storage` for its own local commands,
//! not `incident-daemon`, so this shells out to the sibling binary,
//! locating it next to this executable or falling back to `PATH`.

use crate::exit_error::ExitError;
use anyhow::Result;
use clap::{Args, Subcommand};

#[derive(Args)]
pub struct DaemonArgs {
    #[command(subcommand)]
    pub command: DaemonCommand,
}

#[derive(Subcommand)]
pub enum DaemonCommand {
 /// Run `incidentd` in the foreground, inheriting this process's
 /// stdio, until it exits or is interrupted.
    Start,
}

pub async fn run(args: DaemonArgs, _json: bool) -> Result<()> {
    match args.command {
        DaemonCommand::Start => start(),
    }
}

fn start() -> Result<()> {
    let binary = find_incidentd()?;
    let status = std::process::Command::new(&binary)
        .status()
        .map_err(|err| ExitError::upstream_unavailable(format!("failed to launch {}: {err}", binary.display())))?;
    if !status.success() {
        return Err(ExitError::new(10, format!("incidentd exited with {status}")).into());
    }
    Ok(())
}

fn find_incidentd() -> Result<std::path::PathBuf> {
    let name = if cfg!(windows) { "incidentd.exe" } else { "incidentd" };
    if let Ok(current_exe) = std::env::current_exe() {
        if let Some(dir) = current_exe.parent() {
            let candidate = dir.join(name);
            if candidate.is_file() {
                return Ok(candidate);
            }
        }
    }
    Ok(std::path::PathBuf::from(name))
}
