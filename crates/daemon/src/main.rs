// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `incidentd`: the Execution Orchestration Core daemon. Binds the
//! operator HTTP/WS surface and the worker wire listener,
//! loads `OrchestratorConfig`, and drives the timer wheel / heartbeat
//! sweep on a fixed tick until asked to shut down.

mod api;
mod coordinator;
mod env;
mod error;
mod listener;
mod registry;
mod timers;

use coordinator::Coordinator;
use incident_core::SystemClock;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
 tracing_subscriber::fmt().with_env_filter(EnvFilter::new(env::log_filter())).init();

 let config_path = env::config_path();
 let config = incident_core::OrchestratorConfig::load(&config_path)?;
 tracing::info!(config_path = %config_path.display(), listen_addr = %config.listen_addr, "starting incidentd");

 let coordinator = Arc::new(Coordinator::new(config, SystemClock));
 let worker_listen_addr = env::worker_listen_addr();

 let api_state = Arc::new(api::ApiState { coordinator: coordinator.clone(), nonces: Mutex::new(Default::default()) });
 let app = api::router(api_state);
 let http_listener = tokio::net::TcpListener::bind(&coordinator.config.listen_addr).await?;
 tracing::info!(addr = %coordinator.config.listen_addr, "operator API listening");

 let http_task = tokio::spawn(async move {
 if let Err(err) = axum::serve(http_listener, app).await {
 tracing::error!(%err, "operator API server exited");
 }
 });

 let wire_coordinator = coordinator.clone();
 let wire_task =
 tokio::spawn(async move { if let Err(err) = listener::serve(&worker_listen_addr, wire_coordinator).await {
 tracing::error!(%err, "worker wire listener exited");
 }});

 let tick_coordinator = coordinator.clone();
 let tick_ms = env::tick_interval_ms();
 let heartbeat_timeout_ms = coordinator.config.heartbeat_timeout_secs as u64 * 1_000;
 let tick_task = tokio::spawn(async move {
 let mut interval = tokio::time::interval(std::time::Duration::from_millis(tick_ms));
 loop {
 interval.tick().await;
 let now_ms = tick_coordinator.clock.epoch_ms();
 tick_coordinator.run_due_timers(now_ms).await;
 tick_coordinator.sweep_lost_workers(now_ms, heartbeat_timeout_ms).await;
 }
 });

 tokio::select! {
 _ = tokio::signal::ctrl_c() => {
 tracing::info!("received shutdown signal");
 }
 _ = http_task => {
 tracing::warn!("operator API task ended unexpectedly");
 }
 _ = wire_task => {
 tracing::warn!("worker wire listener task ended unexpectedly");
 }
 _ = tick_task => {
 tracing::warn!("lifecycle tick task ended unexpectedly");
 }
 }

 Ok(())
}
