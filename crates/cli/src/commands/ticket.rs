// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `incidentctl ticket ingest` — submit a normalized ticket to `incidentd`
//! and print whatever session the Matcher created for it.

use crate::client::DaemonClient;
use anyhow::Result;
use clap::{Args, Subcommand};
use std::collections::BTreeMap;

#[derive(Args)]
pub struct TicketArgs {
 #[command(subcommand)]
 pub command: TicketCommand,
}

#[derive(Subcommand)]
pub enum TicketCommand {
 /// Submit a ticket for matching and (if a runbook clears threshold)
 /// session creation.
 Ingest {
 #[arg(long)]
 tenant: String,
 #[arg(long)]
 source: String,
 #[arg(long)]
 external_id: String,
 #[arg(long, value_parser = ["critical", "high", "medium", "low"])]
 severity: String,
 #[arg(long)]
 summary: String,
 /// Repeatable `key=value` ticket signal (service, environment,
 /// ci_hint, or any other free-form match key).
 #[arg(long = "signal", value_parser = parse_kv)]
 signals: Vec<(String, String)>,
 /// Repeatable `key=value` runbook input binding.
 #[arg(long = "input", value_parser = parse_kv)]
 inputs: Vec<(String, String)>,
 #[arg(long)]
 idempotency_key: Option<String>,
 },
}

fn parse_kv(raw: &str) -> Result<(String, String), String> {
 raw.split_once('=').map(|(k, v)| (k.to_string(), v.to_string())).ok_or_else(|| format!("expected key=value, got {raw:?}"))
}

#[derive(serde::Serialize)]
struct IngestTicketRequest {
 tenant_id: String,
 external_id: String,
 source: String,
 severity: String,
 summary: String,
 signals: BTreeMap<String, String>,
 nonce: Option<String>,
 timestamp_ms: Option<u64>,
 idempotency_key: Option<String>,
 inputs: BTreeMap<String, String>,
}

#[derive(serde::Deserialize)]
struct IngestTicketResponse {
 ticket_id: String,
 session_id: String,
 matched_runbook: String,
 confidence: f64,
 degraded: bool,
}

pub async fn run(args: TicketArgs, json: bool) -> Result<()> {
 match args.command {
 TicketCommand::Ingest { tenant, source, external_id, severity, summary, signals, inputs, idempotency_key } => {
 let request = IngestTicketRequest {
 tenant_id: tenant,
 external_id,
 source,
 severity,
 summary,
 signals: signals.into_iter().collect(),
 // A locally-run `incidentctl ticket ingest` is a trusted
 // admin channel, not a vendor webhook; no source has a
 // signature secret configured for it, so nonce/timestamp
 // are unused (api.rs only requires them when one is).
 nonce: None,
 timestamp_ms: None,
 idempotency_key,
 inputs: inputs.into_iter().collect(),
 };
 let response: IngestTicketResponse = DaemonClient::new().post("/tickets", &request).await?;
 if json {
 println!(
 "{}",
 serde_json::json!({
 "ticket_id": response.ticket_id,
 "session_id": response.session_id,
 "matched_runbook": response.matched_runbook,
 "confidence": response.confidence,
 "degraded": response.degraded,
 })
 );
 } else {
 println!(
 "session {} created (runbook {}, confidence {:.2}{})",
 response.session_id,
 response.matched_runbook,
 response.confidence,
 if response.degraded { ", degraded match" } else { "" }
 );
 }
 Ok(())
 }
 }
}
