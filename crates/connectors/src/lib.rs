// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! incident-connectors: the uniform `Connector` trait and
//! one implementation per infrastructure kind — SSH, WinRM, Azure Run
//! Command, GCP IAP, Database, REST, and Local. Output sanitization
//! (`redact`) is applied by every connector before a byte reaches an
//! `OutputSink`, never downstream.

pub mod azure_run_command;
pub mod database;
pub mod fake;
pub mod gcp_iap;
pub mod local;
pub mod redact;
pub mod rest;
pub mod ssh;
pub mod traits;
pub mod winrm;

pub use azure_run_command::AzureRunCommandConnector;
pub use database::DatabaseConnector;
pub use gcp_iap::GcpIapConnector;
pub use local::LocalConnector;
pub use rest::RestConnector;
pub use ssh::SshConnector;
pub use traits::{ChunkKind, Connector, ExecutionRequest, NullSink, OutputSink};
pub use winrm::WinrmConnector;

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeConnector;
#[cfg(any(test, feature = "test-support"))]
pub use traits::CollectingSink;

use std::collections::HashMap;
use std::sync::Arc;

/// Resolves a step's `connector_kind` tag to the `Connector` implementation
/// that handles it. The worker
/// owns one registry built once at startup from its configured connector
/// set; `kind` values not present here surface as
/// `FailureKind::NoCapableWorker` at the matching stage, before dispatch
/// ever reaches a connector.
#[derive(Default, Clone)]
pub struct ConnectorRegistry {
    connectors: HashMap<&'static str, Arc<dyn Connector>>,
}

impl ConnectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, connector: Arc<dyn Connector>) -> &mut Self {
        self.connectors.insert(connector.kind(), connector);
        self
    }

    pub fn get(&self, kind: &str) -> Option<Arc<dyn Connector>> {
        self.connectors.get(kind).cloned()
    }

    pub fn supported_kinds(&self) -> Vec<&'static str> {
        self.connectors.keys().copied().collect()
    }
}
