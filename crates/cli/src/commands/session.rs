// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `incidentctl session show|list|cancel|approve` — the operator REST
//! surface's execution lifecycle endpoints, from the command
//! line instead of the web UI.

use crate::client::DaemonClient;
use anyhow::Result;
use clap::{Args, Subcommand};

#[derive(Args)]
pub struct SessionArgs {
 #[command(subcommand)]
 pub command: SessionCommand,
}

#[derive(Subcommand)]
pub enum SessionCommand {
 /// Show one session's current state and step list.
 Show {
 session_id: String,
 },
 /// List every session known for a tenant.
 List {
 #[arg(long)]
 tenant: String,
 },
 /// Replay events recorded for a session.
 Events {
 session_id: String,
 #[arg(long, default_value_t = 0)]
 since: u64,
 },
 /// Approve or reject a step awaiting human sign-off.
 Approve {
 session_id: String,
 #[arg(long)]
 step: usize,
 #[arg(long)]
 operator: String,
 #[arg(long)]
 reject: bool,
 #[arg(long)]
 notes: Option<String>,
 },
 /// Cancel a session; already-succeeded steps with a rollback command
 /// are rolled back in reverse order.
 Cancel {
 session_id: String,
 #[arg(long)]
 operator: String,
 #[arg(long)]
 reason: String,
 },
}

#[derive(serde::Serialize)]
struct ApproveRequest {
 step_index: usize,
 operator: String,
 approve: bool,
 notes: Option<String>,
}

#[derive(serde::Serialize)]
struct CancelRequest {
 operator: String,
 reason: String,
}

pub async fn run(args: SessionArgs, json: bool) -> Result<()> {
 let client = DaemonClient::new();
 match args.command {
 SessionCommand::Show { session_id } => {
 let view: serde_json::Value = client.get(&format!("/executions/{session_id}")).await?;
 print_value(&view, json);
 Ok(())
 }
 SessionCommand::List { tenant } => {
 let sessions: serde_json::Value =
 client.get(&format!("/executions?tenant_id={}", urlencoding(&tenant))).await?;
 print_value(&sessions, json);
 Ok(())
 }
 SessionCommand::Events { session_id, since } => {
 let events: serde_json::Value = client.get(&format!("/executions/{session_id}/events?since={since}")).await?;
 print_value(&events, json);
 Ok(())
 }
 SessionCommand::Approve { session_id, step, operator, reject, notes } => {
 let request = ApproveRequest { step_index: step, operator, approve: !reject, notes };
 client.post_no_body(&format!("/executions/{session_id}/approve"), &request).await?;
 if !json {
 println!("step {step} {}", if reject { "rejected" } else { "approved" });
 }
 Ok(())
 }
 SessionCommand::Cancel { session_id, operator, reason } => {
 let request = CancelRequest { operator, reason };
 client.post_no_body(&format!("/executions/{session_id}/cancel"), &request).await?;
 if !json {
 println!("session {session_id} cancellation requested");
 }
 Ok(())
 }
 }
}

fn print_value(value: &serde_json::Value, json: bool) {
 if json {
 println!("{value}");
 } else {
 println!("{}", serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string()));
 }
}

/// `reqwest::Client` doesn't build query strings for us here since the
/// whole path is a plain `&str`; tenant ids are `tnt-`-prefixed nanoids
/// with no characters that need escaping, but guard against surprises
/// from manually-typed input anyway.
fn urlencoding(raw: &str) -> String {
 raw.chars()
 .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~') { c.to_string() } else { format!("%{:02X}", c as u32) })
 .collect()
}
