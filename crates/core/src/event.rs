// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! ExecutionEvent: the append-only fact stream that drives operator UI
//! fan-out, session replay, and the audit hash chain.

use crate::connector_result::ExecutionResult;
use crate::decision::Decision;
use crate::session::{PauseReason, SessionId};
use crate::tenant::TenantId;
use crate::worker::WorkerId;

crate::define_id! {
 /// Unique identifier for a single emitted event.
 pub struct EventId("evt-");
}

/// Which stream a `StepOutput` chunk came from. A copy of
/// `incident_connectors::ChunkKind` kept here (rather than depended on) so
/// `incident-core` never depends on the connector crate it is depended on
/// by; the worker converts at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputChannel {
 Stdout,
 Stderr,
}

/// The fact carried by an `ExecutionEvent`. Mirrors every state transition
/// the Session State Machine can make; nothing about a session's history is
/// knowable except through this stream.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum EventKind {
 SessionCreated { runbook_version: u32 },
 SessionAssigned { worker: WorkerId },
 StepDispatched { step_index: usize, worker: WorkerId, attempt: u32 },
 /// One chunk of streamed stdout/stderr. `chunk_seq` is monotonic per
 /// step, independent of the event's own session-wide
 /// `seq`.
 StepOutput { step_index: usize, chunk_seq: u64, channel: OutputChannel, data: String },
 StepCompleted { step_index: usize, result: ExecutionResult },
 StepFailed { step_index: usize, result: ExecutionResult },
 /// A transient/timeout failure is within the step's `RetryPolicy`
 /// budget and the step's blast radius permits auto-retry; the step is
 /// redispatched rather than failed. `attempt` is the attempt number
 /// about to run.
 StepRetrying { step_index: usize, attempt: u32, result: ExecutionResult },
 ApprovalRequested { step_index: usize },
 ApprovalDecided { step_index: usize, decision: Decision },
 /// The approval SLA timer fired before any resolution was recorded
 /// ; the session moves to `Paused`, not a terminal
 /// failure.
 ApprovalExpired { step_index: usize },
 ManualStepAcknowledged { step_index: usize, operator: String },
 RollbackStarted { failed_step_index: usize },
 RollbackStepCompleted { step_index: usize },
 RollbackStepFailed { step_index: usize, error: String },
 /// Non-fatal notice attached to a session's history. Emitted
 /// immediately before `SessionCompleted` when a runbook completes
 /// without ever dispatching a step (an empty `main`/`prechecks`/
 /// `postchecks` runbook), so the operator-facing history still shows
 /// why a session went straight to `completed`.
 Warning { message: String },
 SessionCompleted,
 SessionFailed { reason: String },
 SessionCancelled { operator: String, reason: String },
 /// Session moved to `Paused`; `reason` is always the same value as the
 /// session's `pause_reason` field at the moment this was emitted.
 SessionPaused { reason: PauseReason },
 WorkerLost { worker: WorkerId, reassigned_step_index: Option<usize> },
}

impl EventKind {
 /// Label used for `tracing` fields and the wire protocol topic.
 pub fn label(&self) -> &'static str {
 match self {
 EventKind::SessionCreated { .. } => "session_created",
 EventKind::SessionAssigned { .. } => "session_assigned",
 EventKind::StepDispatched { .. } => "step_dispatched",
 EventKind::StepOutput { .. } => "step_output",
 EventKind::StepCompleted { .. } => "step_completed",
 EventKind::StepFailed { .. } => "step_failed",
 EventKind::StepRetrying { .. } => "step_retrying",
 EventKind::ApprovalRequested { .. } => "approval_requested",
 EventKind::ApprovalDecided { .. } => "approval_decided",
 EventKind::ApprovalExpired { .. } => "approval_expired",
 EventKind::ManualStepAcknowledged { .. } => "manual_step_acknowledged",
 EventKind::RollbackStarted { .. } => "rollback_started",
 EventKind::RollbackStepCompleted { .. } => "rollback_step_completed",
 EventKind::RollbackStepFailed { .. } => "rollback_step_failed",
 EventKind::Warning { .. } => "warning",
 EventKind::SessionCompleted => "session_completed",
 EventKind::SessionFailed { .. } => "session_failed",
 EventKind::SessionCancelled { .. } => "session_cancelled",
 EventKind::SessionPaused { .. } => "session_paused",
 EventKind::WorkerLost { .. } => "worker_lost",
 }
 }
}

/// One entry in the append-only execution event log. `seq` is monotonic and
/// contiguous per session starting at 1; storage rejects any append that
/// would create a gap (see `incident-storage`).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ExecutionEvent {
 pub id: EventId,
 pub tenant_id: TenantId,
 pub session_id: SessionId,
 pub seq: u64,
 pub kind: EventKind,
 pub recorded_at_ms: u64,
}

#[cfg(any(test, feature = "test-support"))]
impl ExecutionEvent {
 pub fn test_new(session_id: SessionId, seq: u64, kind: EventKind) -> Self {
 Self {
 id: EventId::new(),
 tenant_id: TenantId::new(),
 session_id,
 seq,
 kind,
 recorded_at_ms: 1_000_000,
 }
 }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
