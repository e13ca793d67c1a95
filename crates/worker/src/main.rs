// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `incident-worker`: connects outward to an `incidentd` instance,
//! registers its capability set, and executes steps the daemon claims
//! for it until the process is asked to shut down.

use incident_worker::{build_dispatcher, dispatch::Dispatcher, WorkerConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = WorkerConfig::from_env();
    tracing_subscriber::fmt().with_env_filter(EnvFilter::new(config.log_filter.clone())).init();

    tracing::info!(
        worker_id = %config.worker_id,
        daemon_addr = %config.daemon_addr,
        capabilities = ?config.capability_set,
        "starting incident-worker"
    );

    let dispatcher = build_dispatcher(config.clone())?;
    run(config, dispatcher).await
}

async fn run<S, C>(
    config: WorkerConfig,
    dispatcher: std::sync::Arc<Dispatcher<S, C>>,
) -> Result<(), Box<dyn std::error::Error>>
where
    S: incident_credentials::SecretsStore + 'static,
    C: incident_core::Clock + 'static,
{
    let mut backoff = std::time::Duration::from_secs(1);
    loop {
        match incident_worker::daemon_client::connect(&config).await {
            Ok(conn) => {
                backoff = std::time::Duration::from_secs(1);
                tracing::info!(daemon_addr = %config.daemon_addr, "connected to daemon");
                dispatcher.clone().run(conn.inbound, conn.outbound).await;
                tracing::warn!("daemon connection dropped, reconnecting");
            }
            Err(err) => {
                tracing::warn!(%err, delay_secs = backoff.as_secs(), "failed to connect to daemon, retrying");
            }
        }
        tokio::time::sleep(backoff).await;
        backoff = (backoff * 2).min(std::time::Duration::from_secs(30));
    }
}
