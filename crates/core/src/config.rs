// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! OrchestratorConfig: typed configuration loaded from a TOML file and
//! layered with environment variable overrides on top of the scalars
//! operators tune most often.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Top-level execution posture: whether steps dispatch automatically once
/// policy clears them, or always wait for an explicit operator approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    Hil,
    Auto,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OrchestratorConfig {
    #[serde(default = "default_execution_mode")]
    pub execution_mode: ExecutionMode,
 /// Minimum match-signal score (0-100) for the Matcher to consider a
 /// runbook a candidate at all.
    #[serde(default = "default_match_minimum")]
    pub match_minimum: u32,
 /// Minimum match score for `ExecutionMode::Auto` to skip approval on
 /// steps the runbook itself did not mark `ApprovalRequirement::None`.
    #[serde(default = "default_auto_execute_threshold")]
    pub auto_execute_threshold: u32,
    #[serde(default = "default_heartbeat_interval_secs")]
    pub heartbeat_interval_secs: u32,
    #[serde(default = "default_heartbeat_timeout_secs")]
    pub heartbeat_timeout_secs: u32,
 /// Approval SLA in seconds, keyed by severity label (`"critical"`,
 /// `"high"`, `"medium"`, `"low"`), falling back to `default` if absent.
    #[serde(default)]
    pub approval_sla_secs: BTreeMap<String, u64>,
    #[serde(default = "default_max_concurrent_sessions_per_tenant")]
    pub max_concurrent_sessions_per_tenant: u32,
    #[serde(default = "default_credential_ttl_secs")]
    pub credential_ttl_secs: u32,
 /// Retention in days, keyed by event kind label; `"default"` applies to
 /// kinds with no explicit entry.
    #[serde(default)]
    pub retention_days: BTreeMap<String, u32>,
    pub secrets_store_endpoint: String,
    #[serde(default)]
    pub secrets_bootstrap_credentials_path: Option<PathBuf>,
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    pub socket_path: PathBuf,
    pub state_dir: PathBuf,
}

fn default_execution_mode() -> ExecutionMode {
    ExecutionMode::Hil
}
fn default_match_minimum() -> u32 {
    50
}
fn default_auto_execute_threshold() -> u32 {
    90
}
fn default_heartbeat_interval_secs() -> u32 {
    10
}
fn default_heartbeat_timeout_secs() -> u32 {
    30
}
fn default_max_concurrent_sessions_per_tenant() -> u32 {
    20
}
fn default_credential_ttl_secs() -> u32 {
    300
}
fn default_listen_addr() -> String {
    "127.0.0.1:8743".to_string()
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read { path: PathBuf, #[source] source: std::io::Error },
    #[error("failed to parse config file {path}: {source}")]
    Parse { path: PathBuf, #[source] source: toml::de::Error },
    #[error("invalid environment override {key}={value:?}: {reason}")]
    EnvOverride { key: String, value: String, reason: String },
}

impl OrchestratorConfig {
 /// Load from a TOML file, then apply `INCIDENTD_*` environment variable
 /// overrides for the scalar fields operators most often need to tweak
 /// without editing the file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        let mut config: OrchestratorConfig = toml::from_str(&contents)
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(value) = std::env::var("INCIDENTD_EXECUTION_MODE") {
            self.execution_mode = match value.as_str() {
                "auto" => ExecutionMode::Auto,
                "hil" => ExecutionMode::Hil,
                other => {
                    return Err(ConfigError::EnvOverride {
                        key: "INCIDENTD_EXECUTION_MODE".to_string(),
                        value: value.clone(),
                        reason: format!("expected \"hil\" or \"auto\", got {other:?}"),
                    });
                }
            };
        }
        if let Ok(value) = std::env::var("INCIDENTD_LISTEN_ADDR") {
            self.listen_addr = value;
        }
        if let Ok(value) = std::env::var("INCIDENTD_MATCH_MINIMUM") {
            self.match_minimum = value.parse().map_err(|_| ConfigError::EnvOverride {
                key: "INCIDENTD_MATCH_MINIMUM".to_string(),
                value: value.clone(),
                reason: "expected an integer".to_string(),
            })?;
        }
        Ok(())
    }

    pub fn approval_sla_secs_for(&self, severity: &str) -> u64 {
        self.approval_sla_secs
            .get(severity)
            .or_else(|| self.approval_sla_secs.get("default"))
            .copied()
            .unwrap_or(1_800)
    }

    pub fn retention_days_for(&self, event_kind: &str) -> u32 {
        self.retention_days
            .get(event_kind)
            .or_else(|| self.retention_days.get("default"))
            .copied()
            .unwrap_or(90)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
