// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! ExecutionSession: one run of a bound runbook against a ticket, and the
//! state machine that governs it.

use crate::idempotency::IdempotencyKey;
use crate::runbook_spec::RunbookId;
use crate::tenant::TenantId;
use crate::ticket::TicketId;
use crate::worker::WorkerId;
use std::collections::BTreeMap;

crate::define_id! {
 /// Unique identifier for an execution session.
 pub struct SessionId("xsn-");
}

/// Whether a session's steps require operator sign-off (human-in-the-loop)
/// or may auto-execute once the Policy Engine clears them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationMode {
 Hil,
 Auto,
}

crate::simple_display! {
 ValidationMode {
 Hil => "hil",
 Auto => "auto",
 }
}

/// Why a session is sitting in `Paused`, recorded so an operator (and the
/// `advance` handler, which refuses to tick a paused session) can see the
/// reason without reading the event log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PauseReason {
 /// `approve_step` rejected the named step: the session
 /// waits for an explicit operator retry/cancel/rollback direction.
 ApprovalRejected,
 /// Heartbeat timeout fired on the assigned worker while a step was
 /// `Running`; the in-flight command's outcome is unknown, so
 /// reassignment requires operator confirmation (WorkerLost).
 WorkerLost,
 /// `record_step_result` was called by a worker that is not the current
 /// assignee, or for a step not in `Running`.
 ProtocolError,
 /// Programmer error inside the state machine handler; never silently
 /// failed (InternalError).
 InternalError,
}

crate::simple_display! {
 PauseReason {
 ApprovalRejected => "approval_rejected",
 WorkerLost => "worker_lost",
 ProtocolError => "protocol_error",
 InternalError => "internal_error",
 }
}

/// The execution session's own lifecycle status. Step-level status lives on
/// `ExecutionStep`; this tracks the session as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
 /// Bound to a runbook and ticket, no step dispatched yet.
 Created,
 /// Waiting on at least one pending `ApprovalTask`.
 AwaitingApproval,
 /// At least one step is dispatched or running.
 Running,
 /// A step failed and rollback of prior completed steps is in progress.
 RollingBack,
 /// Suspended pending operator action; `advance` is a no-op until an
 /// operator issues `cancel` or a resume. See `PauseReason` for why.
 Paused,
 /// All steps completed successfully.
 Completed,
 /// A step failed, was not retried further, and rollback (if any) has
 /// finished; the session did not reach a successful outcome.
 Failed,
 /// An operator rejected an approval or explicitly cancelled the session.
 Cancelled,
}

crate::simple_display! {
 SessionStatus {
 Created => "created",
 AwaitingApproval => "awaiting_approval",
 Running => "running",
 RollingBack => "rolling_back",
 Paused => "paused",
 Completed => "completed",
 Failed => "failed",
 Cancelled => "cancelled",
 }
}

impl SessionStatus {
 /// Whether the session has reached a status from which it cannot
 /// transition further.
 pub fn is_terminal(&self) -> bool {
 matches!(self, SessionStatus::Completed | SessionStatus::Failed | SessionStatus::Cancelled)
 }
}

/// One run of a `RunbookSpec` bound to a `Ticket`, for a given tenant.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ExecutionSession {
 pub id: SessionId,
 pub tenant_id: TenantId,
 pub ticket_id: TicketId,
 pub runbook_id: RunbookId,
 /// Runbook version bound at session creation; frozen even if the
 /// runbook is later revised or archived, so archival mid-session does
 /// not cancel the session.
 pub runbook_version: u32,
 pub validation_mode: ValidationMode,
 pub status: SessionStatus,
 /// Concrete values for the runbook's `declared_inputs`.
 pub inputs: BTreeMap<String, String>,
 /// Index of the step currently dispatched/running/awaiting approval, if
 /// any. `None` before the first step starts and after the session
 /// reaches a terminal status.
 pub current_step_index: Option<usize>,
 /// Caller-supplied dedup token propagated from ticket ingestion.
 /// Unique per (tenant, key) across sessions.
 pub idempotency_key: Option<IdempotencyKey>,
 /// The single worker currently responsible for the in-flight step, if
 /// any. At most one assigned worker at any time.
 pub assigned_worker: Option<WorkerId>,
 /// Count of prior assignment attempts abandoned because the assignee
 /// went offline or NAK'd, used to bound reassignment churn.
 pub assignment_retry_count: u32,
 /// Set whenever `status` is `Paused`; cleared on any transition out of
 /// it. `None` in every other status.
 pub pause_reason: Option<PauseReason>,
 /// Highest `ExecutionEvent::seq` emitted for this session so far; new
 /// events continue from `last_event_seq + 1`.
 pub last_event_seq: u64,
 pub created_at_ms: u64,
 pub updated_at_ms: u64,
}

impl ExecutionSession {
 pub fn is_active(&self) -> bool {
 !self.status.is_terminal()
 }
}

#[cfg(any(test, feature = "test-support"))]
crate::builder! {
 pub struct ExecutionSessionBuilder => ExecutionSession {
 computed { id: SessionId = SessionId::new() }
 set { tenant_id: TenantId = TenantId::new() }
 set { ticket_id: TicketId = TicketId::new() }
 set { runbook_id: RunbookId = RunbookId::new() }
 set { runbook_version: u32 = 1 }
 set { validation_mode: ValidationMode = ValidationMode::Hil }
 set { status: SessionStatus = SessionStatus::Created }
 set { inputs: BTreeMap<String, String> = Default::default() }
 option { current_step_index: usize = None }
 option { idempotency_key: IdempotencyKey = None }
 option { assigned_worker: WorkerId = None }
 set { assignment_retry_count: u32 = 0 }
 option { pause_reason: PauseReason = None }
 set { last_event_seq: u64 = 0 }
 set { created_at_ms: u64 = 1_000_000 }
 set { updated_at_ms: u64 = 1_000_000 }
 }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
