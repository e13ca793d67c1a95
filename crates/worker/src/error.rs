// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! WorkerError: the worker runtime's own error taxonomy, analogous to
//! `incident_daemon::error::DaemonError`.

use incident_core::{SessionId, WorkerId};

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error(transparent)]
    Wire(#[from] incident_wire::WireError),
    #[error("the daemon connection at {0} opened with a non-`Cancel`/`SessionCommand` frame")]
    UnexpectedFrame(String),
    #[error("connector {0:?} is not registered on this worker")]
    UnsupportedConnector(String),
    #[error(transparent)]
    Credential(#[from] incident_credentials::CredentialError),
    #[error("no infrastructure credential reference is known locally for {0}")]
    UnknownCredentialReference(incident_core::CredentialReferenceId),
    #[error("daemon connection for worker {0} closed")]
    ConnectionClosed(WorkerId),
    #[error("session {0} step {1} was claimed but the daemon never acknowledged it")]
    ClaimUnacknowledged(SessionId, usize),
    #[error("failed to read credential bootstrap file {path}: {source}")]
    BootstrapRead {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse credential bootstrap file {path}: {source}")]
    BootstrapParse {
        path: std::path::PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("secrets store request failed: {0}")]
    SecretsStoreTransport(String),
}
