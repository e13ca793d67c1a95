// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The uniform connector capability: establish a session to one target,
//! execute one command with a timeout, stream output, close.

use incident_core::{CredentialHandle, ExecutionResult};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Which stream a chunk of output came from, carried alongside each
/// `step.output` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkKind {
    Stdout,
    Stderr,
}

/// Receives streamed output chunks as a connector produces them. The
/// worker's implementation assigns the monotonically increasing per-step
/// chunk sequence number and forwards to the Event Bus; connectors only
/// know about kind + bytes.
pub trait OutputSink: Send {
    fn emit(&mut self, kind: ChunkKind, data: &str);
}

/// Discards all output; used by dry-run invocations and tests that only
/// care about the final `ExecutionResult`.
pub struct NullSink;

impl OutputSink for NullSink {
    fn emit(&mut self, _kind: ChunkKind, _data: &str) {}
}

/// Collects every chunk in order, for tests.
#[cfg(any(test, feature = "test-support"))]
#[derive(Default)]
pub struct CollectingSink {
    pub chunks: Vec<(ChunkKind, String)>,
}

#[cfg(any(test, feature = "test-support"))]
impl OutputSink for CollectingSink {
    fn emit(&mut self, kind: ChunkKind, data: &str) {
        self.chunks.push((kind, data.to_string()));
    }
}

/// One command invocation bound against a specific target. `command` is
/// already fully realized (placeholders substituted by `incident-runbook`,
/// each one shell-escaped as a single opaque token) — connectors never see
/// a template.
pub struct ExecutionRequest<'a> {
 /// Host/port, connection string, or cloud resource id, depending on
 /// connector kind.
    pub target: &'a str,
    pub command: &'a str,
    pub timeout: Duration,
 /// When set, the connector validates the command and target but does
 /// not perform the side-effecting call.
    pub dry_run: bool,
 /// Present only for connectors whose transport needs to authenticate;
 /// `None` for e.g. the local connector's whitelist-only execution.
    pub credential: Option<&'a CredentialHandle>,
 /// Re-checked by connectors that hold `credential` across a polling
 /// loop rather than one round trip (Azure Run Command, WinRM), so a
 /// mid-step `rotate` is caught instead of finishing the step on a
 /// revoked secret. Returns `false` once the Credential Broker has
 /// invalidated or expired the handle. `None` for connectors that never
 /// hold the credential past a single request.
    pub credential_still_valid: Option<&'a (dyn Fn() -> bool + Send + Sync)>,
 /// Carried from the runbook step's own declaration. `false` (the
 /// default) means `command`'s words must be split into argv and
 /// execve'd directly, each substituted placeholder as one opaque
 /// argument; `true` means the step explicitly opted into shell
 /// interpolation and the command should run through `/bin/sh -c` (or
 /// the connector's equivalent). Connectors that never shell out at all
 /// (REST, GCP IAP tunnel) can ignore this field.
    pub requires_shell: bool,
}

/// One infrastructure adapter. Implementations must never block the async
/// runtime on a connector I/O call — spawn_blocking or native async clients
/// only — and must honor `cancel` promptly: the worker enforces
/// `timeout_seconds` itself and expects `execute` to return (not hang) once
/// `cancel` is triggered.
#[async_trait::async_trait]
pub trait Connector: Send + Sync {
 /// Stable label used in `ExecutionResult`'s connector-class tag and in
 /// `AgentWorker::capabilities` matching.
    fn kind(&self) -> &'static str;

    async fn execute(
        &self,
        req: ExecutionRequest<'_>,
        sink: &mut dyn OutputSink,
        cancel: CancellationToken,
    ) -> ExecutionResult;
}
