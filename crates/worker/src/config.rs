// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the worker binary, in the
//! same spirit as `incident-daemon`'s `env` module: one place to look for
//! every `INCIDENT_WORKER_*` knob instead of scattered `std::env::var`
//! calls.

use incident_core::WorkerId;
use std::path::PathBuf;

/// Everything the worker needs to register and operate, gathered once at
/// startup. Unlike `OrchestratorConfig` this has no TOML file of its own:
/// a worker is deployed per-host/per-segment and its identity is simplest
/// to pin via the process environment (systemd unit, container env block).
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub worker_id: WorkerId,
    pub daemon_addr: String,
    pub network_segment: String,
    pub production_scoped: bool,
 /// Connector kinds this worker process can dispatch, e.g.
 /// `["ssh", "local"]`.
    pub capability_set: Vec<String>,
 /// Tenants this worker serves; empty means it registers but never
 /// receives an assignment (mirrors `AgentWorker::tenant_scope`'s
 /// documented boundary case).
    pub tenant_scope: Vec<String>,
    pub max_load: u32,
    pub heartbeat_interval_secs: u64,
    pub secrets_store_endpoint: String,
 /// Local snapshot of `CredentialReference` metadata this worker may be
 /// asked to resolve. Bootstrapped from a file rather than an admin API
 /// call, the same way `incident-daemon`'s registries are bootstrapped
 /// from operator-managed side tables.
    pub secrets_bootstrap_credentials_path: Option<PathBuf>,
    pub log_filter: String,
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn csv(value: &str) -> Vec<String> {
    value.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect()
}

impl WorkerConfig {
 /// Read every `INCIDENT_WORKER_*` variable, falling back to
 /// development-friendly defaults for everything but the worker's own
 /// identity.
    pub fn from_env() -> Self {
        Self {
            worker_id: env_var("INCIDENT_WORKER_ID").map(WorkerId::from_string).unwrap_or_else(WorkerId::new),
            daemon_addr: env_var("INCIDENT_WORKER_DAEMON_ADDR").unwrap_or_else(|| "127.0.0.1:8744".to_string()),
            network_segment: env_var("INCIDENT_WORKER_NETWORK_SEGMENT").unwrap_or_else(|| "default".to_string()),
            production_scoped: env_var("INCIDENT_WORKER_PRODUCTION_SCOPED")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
            capability_set: env_var("INCIDENT_WORKER_CAPABILITIES")
                .map(|v| csv(&v))
                .unwrap_or_else(|| vec!["local".to_string()]),
            tenant_scope: env_var("INCIDENT_WORKER_TENANT_SCOPE").map(|v| csv(&v)).unwrap_or_default(),
            max_load: env_var("INCIDENT_WORKER_MAX_LOAD").and_then(|v| v.parse().ok()).unwrap_or(4),
            heartbeat_interval_secs: env_var("INCIDENT_WORKER_HEARTBEAT_INTERVAL_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            secrets_store_endpoint: env_var("INCIDENT_WORKER_SECRETS_STORE_ENDPOINT")
                .unwrap_or_else(|| "http://127.0.0.1:8200".to_string()),
            secrets_bootstrap_credentials_path: env_var("INCIDENT_WORKER_BOOTSTRAP_CREDENTIALS_PATH")
                .map(PathBuf::from),
            log_filter: env_var("INCIDENT_WORKER_LOG").unwrap_or_else(|| "info".to_string()),
        }
    }
}
