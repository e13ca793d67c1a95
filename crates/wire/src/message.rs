// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Message bodies carried over the daemon⟷worker wire connection.

use incident_core::{
 BlastRadius, CredentialReferenceId, EventId, ExecutionResult, IdempotencyKey, OutputChannel, SessionId,
 WorkerId,
};
use serde::{Deserialize, Serialize};

/// Sent by the daemon to an assigned worker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum DaemonMessage {
 /// `session.command`: dispatch one step. Re-delivery with the same
 /// `idempotency_key` after a missed ACK must be answered with the
 /// original result, never a second execution.
 SessionCommand {
 session_id: SessionId,
 step_index: usize,
 attempt: u32,
 idempotency_key: IdempotencyKey,
 connector_kind: String,
 target: String,
 /// Environment tag of the resolved `InfrastructureConnection`
 /// (e.g. `"prod"`, `"staging"`), consulted by the worker's own
 /// Policy Engine re-check before it invokes the connector.
 environment: String,
 command: String,
 timeout_seconds: u32,
 dry_run: bool,
 /// A reference, never a materialized secret (the
 /// worker fetches its own handle from the Credential Broker and
 /// the daemon never sees or forwards the secret itself).
 credential_ref: Option<CredentialReferenceId>,
 blast_radius: BlastRadius,
 step_marked_destructive: bool,
 /// Whether `command` must run through a shell rather than being
 /// bound as argv directly.
 requires_shell: bool,
 approved_by_admin: bool,
 },
 /// Ask the worker to cancel an in-flight step, if it still owns it.
 Cancel { session_id: SessionId, step_index: usize },
}

impl DaemonMessage {
 pub fn session_id(&self) -> SessionId {
 match self {
 DaemonMessage::SessionCommand { session_id, .. } => *session_id,
 DaemonMessage::Cancel { session_id, .. } => *session_id,
 }
 }
}

/// Sent by a worker to the daemon.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum WorkerMessage {
 Register {
 worker_id: WorkerId,
 tenant_scope: Vec<String>,
 network_segment: String,
 capability_set: Vec<String>,
 max_load: u32,
 },
 Heartbeat { worker_id: WorkerId, load: u32 },
 /// Claim accepted within the ACK window (default 5s).
 Ack { session_id: SessionId, step_index: usize },
 /// Claim declined; the daemon re-delivers to another eligible worker.
 Nak { session_id: SessionId, step_index: usize, reason: String },
 /// One streamed chunk of a running step's stdout/stderr.
 StepOutput { session_id: SessionId, step_index: usize, chunk_seq: u64, channel: OutputChannel, data: String },
 /// `session.result`: terminal outcome of one claimed step.
 SessionResult {
 session_id: SessionId,
 step_index: usize,
 idempotency_key: IdempotencyKey,
 result: ExecutionResult,
 },
}

impl WorkerMessage {
 /// `None` for `Register`/`Heartbeat`, which are not scoped to a session.
 pub fn session_id(&self) -> Option<SessionId> {
 match self {
 WorkerMessage::Register { .. } | WorkerMessage::Heartbeat { .. } => None,
 WorkerMessage::Ack { session_id, .. }
 | WorkerMessage::Nak { session_id, .. }
 | WorkerMessage::StepOutput { session_id, .. }
 | WorkerMessage::SessionResult { session_id, .. } => Some(*session_id),
 }
 }
}

/// Marker carried alongside a forwarded `ExecutionEvent` on the operator
/// WebSocket fan-out, identifying the source event for replay cursors.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventAck {
 pub event_id: EventId,
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
