// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `incidentctl`: the operator control utility for the Execution
//! Orchestration Core . Talks HTTP to a running `incidentd`
//! for everything session/worker-shaped, and operates directly on local
//! files for runbook authoring and audit-log verification.

mod client;
mod commands;
mod exit_error;

use clap::{Parser, Subcommand};
use exit_error::ExitError;

#[derive(Parser)]
#[command(name = "incidentctl", about = "Operator control utility for the incident execution orchestrator")]
struct Cli {
 /// Emit machine-readable JSON instead of human-readable text.
 #[arg(long, global = true)]
 json: bool,

 #[command(subcommand)]
 command: Command,
}

#[derive(Subcommand)]
enum Command {
 /// Ticket ingestion and Matcher dispatch.
 Ticket(commands::ticket::TicketArgs),
 /// Execution session lifecycle.
 Session(commands::session::SessionArgs),
 /// Runbook YAML authoring.
 Runbook(commands::runbook::RunbookArgs),
 /// Live worker pool.
 Worker(commands::worker::WorkerArgs),
 /// Audit log integrity.
 Audit(commands::audit::AuditArgs),
 /// Daemon process management.
 Daemon(commands::daemon::DaemonArgs),
}

#[tokio::main]
async fn main() {
 let cli = Cli::parse();
 let result = match cli.command {
 Command::Ticket(args) => commands::ticket::run(args, cli.json).await,
 Command::Session(args) => commands::session::run(args, cli.json).await,
 Command::Runbook(args) => commands::runbook::run(args, cli.json).await,
 Command::Worker(args) => commands::worker::run(args, cli.json).await,
 Command::Audit(args) => commands::audit::run(args, cli.json).await,
 Command::Daemon(args) => commands::daemon::run(args, cli.json).await,
 };

 if let Err(err) = result {
 match err.downcast_ref::<ExitError>() {
 Some(exit_err) => {
 if !exit_err.message.is_empty() {
 eprintln!("error: {}", exit_err.message);
 }
 std::process::exit(exit_err.code);
 }
 None => {
 eprintln!("error: {err:#}");
 std::process::exit(1);
 }
 }
 }
}
