// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `incidentctl audit verify` — walk one tenant's hash-chained audit log,
//! entry by entry, and report whether it still links up. Reads the log
//! file directly; it does not go through `incidentd`, since a
//! compromised daemon is exactly the threat model this check exists for.

use crate::exit_error::ExitError;
use anyhow::Result;
use clap::{Args, Subcommand};
use incident_storage::audit::AuditLog;
use std::path::PathBuf;

#[derive(Args)]
pub struct AuditArgs {
 #[command(subcommand)]
 pub command: AuditCommand,
}

#[derive(Subcommand)]
pub enum AuditCommand {
 /// Verify the hash chain of a tenant's `audit.log` under `state_dir`.
 Verify {
 #[arg(long)]
 state_dir: PathBuf,
 #[arg(long)]
 tenant: String,
 },
}

pub async fn run(args: AuditArgs, json: bool) -> Result<()> {
 match args.command {
 AuditCommand::Verify { state_dir, tenant } => verify(&state_dir, &tenant, json),
 }
}

fn verify(state_dir: &std::path::Path, tenant: &str, json: bool) -> Result<()> {
 let path = state_dir.join(tenant).join("audit.log");
 match AuditLog::verify_chain(&path) {
 Ok(()) => {
 if json {
 println!("{}", serde_json::json!({"ok": true, "path": path.display().to_string()}));
 } else {
 println!("{} is intact", path.display());
 }
 Ok(())
 }
 Err(err) => Err(ExitError::rejected(format!("{}: {err}", path.display())).into()),
 }
}
