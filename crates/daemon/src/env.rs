// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon binary itself.
//! `OrchestratorConfig::load` already layers `INCIDENTD_*` overrides onto
//! the TOML config for the scalars operators tune most often; what lives
//! here is the handful of purely-process-level knobs that have no business
//! living in a tenant-shared config file (where to find that file, how
//! verbose to log, whether to bind the admin HTTP surface at all).

use std::path::PathBuf;

const DEFAULT_CONFIG_PATH: &str = "/etc/incidentd/config.toml";

/// Path to the `OrchestratorConfig` TOML file.
pub fn config_path() -> PathBuf {
    std::env::var("INCIDENTD_CONFIG_PATH").map(PathBuf::from).unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Log filter directive passed to `tracing_subscriber::EnvFilter`, falling
/// back to `info` when unset.
pub fn log_filter() -> String {
    std::env::var("INCIDENTD_LOG").unwrap_or_else(|_| "info".to_string())
}

/// TCP bind address for the worker wire listener (distinct from
/// `OrchestratorConfig::listen_addr`, which is the operator HTTP surface).
pub fn worker_listen_addr() -> String {
    std::env::var("INCIDENTD_WORKER_LISTEN_ADDR").unwrap_or_else(|_| "127.0.0.1:8744".to_string())
}

/// Shared secret used to verify inbound webhook HMAC signatures, keyed by
/// source name (`INCIDENTD_WEBHOOK_SECRET_PAGERDUTY`, etc.). Absent means
/// that source is rejected outright rather than silently unauthenticated.
pub fn webhook_secret(source: &str) -> Option<String> {
    let key = format!("INCIDENTD_WEBHOOK_SECRET_{}", source.to_uppercase());
    std::env::var(key).ok()
}

/// How often the worker heartbeat sweep and timer wheel tick, in
/// milliseconds. Kept out of `OrchestratorConfig` since it is a scheduling
/// granularity, not a policy the operator reasons about per tenant.
pub fn tick_interval_ms() -> u64 {
    std::env::var("INCIDENTD_TICK_INTERVAL_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(1_000)
}

/// Interval between full per-tenant snapshots, in WAL events.
pub fn snapshot_every_n_events() -> u64 {
    std::env::var("INCIDENTD_SNAPSHOT_EVERY_N").ok().and_then(|v| v.parse().ok()).unwrap_or(500)
}
