// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! incident-worker: the Worker Runtime. Registers with a daemon, accepts
//! claimed steps, re-checks policy locally, fetches credentials, and
//! drives the connector for the lifetime of one step invocation.

pub mod config;
pub mod credentials;
pub mod daemon_client;
pub mod dispatch;
pub mod error;

pub use config::WorkerConfig;
pub use credentials::{CredentialCatalog, HttpSecretsStore};
pub use dispatch::Dispatcher;
pub use error::WorkerError;

use incident_connectors::{
 AzureRunCommandConnector, Connector, ConnectorRegistry, GcpIapConnector, LocalConnector, RestConnector,
 SshConnector, WinrmConnector,
};
use incident_core::SystemClock;
use incident_credentials::CredentialBroker;
use incident_policy::PolicyEngine;
use std::sync::Arc;

/// Build a `ConnectorRegistry` covering every capability this worker was
/// configured for. `database` is deliberately not included here: it needs
/// a pooled connection per target rather than a process-wide singleton,
/// which this registry shape doesn't model yet.
pub fn build_connector_registry(capability_set: &[String]) -> ConnectorRegistry {
 let mut registry = ConnectorRegistry::new();
 for capability in capability_set {
 let connector: Arc<dyn Connector> = match capability.as_str() {
 "local" => Arc::new(LocalConnector::default_whitelist()),
 "ssh" => Arc::new(SshConnector::new("/etc/incident-worker/known_hosts")),
 "winrm" => Arc::new(WinrmConnector::new()),
 "rest" => Arc::new(RestConnector::new()),
 "azure_run_command" => Arc::new(AzureRunCommandConnector::new("https://management.azure.com")),
 "gcp_iap" => Arc::new(GcpIapConnector::new("https://iap.googleapis.com")),
 "database" => {
 tracing::warn!(
 "skipping \"database\" capability: requires a per-target connection string this registry \
 doesn't carry yet"
 );
 continue;
 }
 other => {
 tracing::warn!(capability = other, "unknown connector capability, skipping");
 continue;
 }
 };
 registry.register(connector);
 }
 registry
}

/// Assemble a `Dispatcher` from a loaded `WorkerConfig`.
pub fn build_dispatcher(
 config: WorkerConfig,
) -> Result<Arc<Dispatcher<HttpSecretsStore, SystemClock>>, WorkerError> {
 let connectors = build_connector_registry(&config.capability_set);
 let credentials = CredentialCatalog::load_optional(config.secrets_bootstrap_credentials_path.as_ref())?;
 let store = Arc::new(HttpSecretsStore::new(config.secrets_store_endpoint.clone()));
 let broker = Arc::new(CredentialBroker::new(store, SystemClock));

 Ok(Arc::new(Dispatcher {
 config,
 connectors,
 credentials,
 broker,
 policy: PolicyEngine::default(),
 // Empty until a future registration-time extension hands this
 // worker its own static target list; `Dispatcher` falls back to
 // trusting each dispatched step's own target in that case.
 registered_targets: Vec::new(),
 in_flight: parking_lot::Mutex::new(std::collections::HashMap::new()),
 }))
}

#[cfg(test)]
mod tests {
 use super::*;

 #[test]
 fn registry_skips_database_and_unknown_capabilities() {
 let registry = build_connector_registry(&[
 "local".to_string(),
 "database".to_string(),
 "made_up".to_string(),
 ]);
 assert_eq!(registry.supported_kinds(), vec!["local"]);
 }
}
