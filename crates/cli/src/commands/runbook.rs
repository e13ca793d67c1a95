// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `incidentctl runbook validate|approve|publish` — author a Runbook
//! Specification YAML file offline, then hand the approved
//! result to a running `incidentd` so its Matcher can see it.
//! `validate`/`approve` never talk to the daemon; `publish` is the one
//! subcommand here that does.

use crate::client::DaemonClient;
use crate::exit_error::ExitError;
use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use std::path::PathBuf;

#[derive(Args)]
pub struct RunbookArgs {
 #[command(subcommand)]
 pub command: RunbookCommand,
}

#[derive(Subcommand)]
pub enum RunbookCommand {
 /// Parse a runbook YAML file and run pre-approval validation, printing
 /// lint warnings without mutating anything.
 Validate {
 path: PathBuf,
 },
 /// Validate, then flip the runbook's status to `approved` and write
 /// the file back in place (or to `--out` if given).
 Approve {
 path: PathBuf,
 #[arg(long)]
 out: Option<PathBuf>,
 },
 /// Register an already-approved runbook file with a running `incidentd`
 /// so the Matcher can start candidate-scoring tickets against it.
 Publish {
 path: PathBuf,
 },
}

pub async fn run(args: RunbookArgs, json: bool) -> Result<()> {
 match args.command {
 RunbookCommand::Validate { path } => validate(&path, json),
 RunbookCommand::Approve { path, out } => approve(&path, out.as_deref(), json),
 RunbookCommand::Publish { path } => publish(&path, json).await,
 }
}

fn read_spec(path: &std::path::Path) -> Result<incident_core::RunbookSpec> {
 let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
 incident_runbook::parse(&raw).map_err(|err| ExitError::misuse(format!("{}: {err}", path.display())).into())
}

fn validate(path: &std::path::Path, json: bool) -> Result<()> {
 let spec = read_spec(path)?;
 match incident_runbook::validate(&spec) {
 Ok(warnings) => {
 if json {
 println!("{}", serde_json::json!({"ok": true, "warnings": warnings.iter().map(|w| w.message.clone()).collect::<Vec<_>>()}));
 } else {
 println!("{} is valid ({} step(s))", path.display(), spec.steps.len());
 for warning in &warnings {
 println!(" warning: step {:?}: {}", warning.step, warning.message);
 }
 }
 Ok(())
 }
 Err(err) => Err(ExitError::misuse(format!("{}: {err}", path.display())).into()),
 }
}

fn approve(path: &std::path::Path, out: Option<&std::path::Path>, json: bool) -> Result<()> {
 let spec = read_spec(path)?;
 let approved =
 incident_runbook::approve(spec).map_err(|err| ExitError::misuse(format!("{}: {err}", path.display())))?;
 let rendered = serde_yaml::to_string(&approved).context("serializing approved runbook")?;
 let target = out.unwrap_or(path);
 std::fs::write(target, &rendered).with_context(|| format!("writing {}", target.display()))?;
 if json {
 println!("{}", serde_json::json!({"runbook_id": approved.id.to_string(), "version": approved.version, "path": target.display().to_string()}));
 } else {
 println!("approved {} (version {}) -> {}", approved.id, approved.version, target.display());
 }
 Ok(())
}

/// Unlike `validate`/`approve`, `publish` reads back the *approved* form
/// `approve` wrote — a serialized `RunbookSpec`, status included — rather
/// than re-running it through the authoring grammar in `read_spec`, which
/// always resets `status` to `Draft` regardless of what's on disk.
fn read_approved_spec(path: &std::path::Path) -> Result<incident_core::RunbookSpec> {
 let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
 serde_yaml::from_str(&raw)
 .map_err(|err| ExitError::misuse(format!("{}: not a previously-approved runbook file: {err}", path.display())).into())
}

async fn publish(path: &std::path::Path, json: bool) -> Result<()> {
 let spec = read_approved_spec(path)?;
 if !spec.is_approved() {
 return Err(ExitError::misuse(format!("{}: runbook is not approved; run `incidentctl runbook approve` first", path.display())).into());
 }
 DaemonClient::new().post_no_body("/runbooks", &spec).await?;
 if json {
 println!("{}", serde_json::json!({"runbook_id": spec.id.to_string(), "version": spec.version}));
 } else {
 println!("published {} (version {})", spec.id, spec.version);
 }
 Ok(())
}
