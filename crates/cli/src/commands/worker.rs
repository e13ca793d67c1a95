// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `incidentctl worker list` — the live `AgentWorker` pool, as seen by
//! whichever `incidentd` this CLI is pointed at.

use crate::client::DaemonClient;
use anyhow::Result;
use clap::{Args, Subcommand};

#[derive(Args)]
pub struct WorkerArgs {
    #[command(subcommand)]
    pub command: WorkerCommand,
}

#[derive(Subcommand)]
pub enum WorkerCommand {
 /// List registered workers and their current load.
    List,
}

pub async fn run(args: WorkerArgs, json: bool) -> Result<()> {
    match args.command {
        WorkerCommand::List => {
            let workers: Vec<serde_json::Value> = DaemonClient::new().get("/workers").await?;
            if json {
                println!("{}", serde_json::Value::Array(workers));
                return Ok(());
            }
            if workers.is_empty() {
                println!("no workers registered");
                return Ok(());
            }
            println!("{:<28} {:<10} {:>6} {:>6}", "WORKER", "STATE", "LOAD", "MAX");
            for worker in &workers {
                println!(
                    "{:<28} {:<10} {:>6} {:>6}",
                    worker.get("id").and_then(|v| v.as_str()).unwrap_or("?"),
                    worker.get("state").and_then(|v| v.as_str()).unwrap_or("?"),
                    worker.get("current_load").and_then(|v| v.as_u64()).unwrap_or(0),
                    worker.get("max_load").and_then(|v| v.as_u64()).unwrap_or(0),
                );
            }
            Ok(())
        }
    }
}
