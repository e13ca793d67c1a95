// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! DaemonError: the coordinator's own error taxonomy, wrapping every
//! lower-layer error the daemon can hit so call sites have one thing to
//! match on instead of threading each crate's error type through.

use incident_core::{SessionId, TenantId};
use incident_storage::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    #[error("unknown tenant {0}")]
    UnknownTenant(TenantId),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Engine(#[from] incident_engine::EngineError),
    #[error(transparent)]
    Wal(#[from] incident_storage::WalError),
    #[error(transparent)]
    Audit(#[from] incident_storage::audit::AuditError),
    #[error(transparent)]
    Snapshot(#[from] incident_storage::snapshot::SnapshotError),
    #[error(transparent)]
    Config(#[from] incident_core::config::ConfigError),
    #[error("runbook {0} is not registered")]
    UnknownRunbook(incident_core::RunbookId),
    #[error("no infrastructure connection registered for the step's connector and the ticket's signals")]
    NoConnection,
    #[error("session {0} is not bound to a known tenant connection registry")]
    UnroutableSession(SessionId),
    #[error(transparent)]
    Wire(#[from] incident_wire::WireError),
    #[error("webhook rejected: {0}")]
    Webhook(#[from] incident_storage::nonce::NonceError),
    #[error("worker {0} is not currently registered")]
    UnknownWorker(incident_core::WorkerId),
}
