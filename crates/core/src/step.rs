// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! ExecutionStep: the per-step record of dispatch, approval, and outcome
//! within a session.

use crate::connector_result::ExecutionResult;
use crate::credential::CredentialReferenceId;
use crate::session::SessionId;
use crate::worker::WorkerId;

/// Lifecycle of a single step within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    AwaitingApproval,
    Dispatched,
    Running,
 /// Manual step awaiting an explicit operator acknowledgment event.
    AwaitingAcknowledgment,
    Completed,
    Failed,
 /// Rolled back after a later step in the same session failed.
    RolledBack,
 /// Approval was rejected or the session was cancelled before dispatch.
    Skipped,
}

crate::simple_display! {
    StepStatus {
        Pending => "pending",
        AwaitingApproval => "awaiting_approval",
        Dispatched => "dispatched",
        Running => "running",
        AwaitingAcknowledgment => "awaiting_acknowledgment",
        Completed => "completed",
        Failed => "failed",
        RolledBack => "rolled_back",
        Skipped => "skipped",
    }
}

impl StepStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StepStatus::Completed | StepStatus::Failed | StepStatus::RolledBack | StepStatus::Skipped
        )
    }
}

/// Record of one step's dispatch and outcome within a session. Indexed by
/// position in the bound runbook's step list (`ExecutionStep::index`), not
/// a randomly generated id: steps never outlive their session and are
/// always addressed as `(session_id, index)`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ExecutionStep {
    pub session_id: SessionId,
    pub index: usize,
    pub name: String,
    pub status: StepStatus,
 /// Template + bound inputs, fully realized and shell-escaped; `None`
 /// until the step is dispatched (manual steps never populate this).
    pub command: Option<String>,
 /// Credential handle reference resolved for this attempt; released and
 /// cleared once the step leaves `Running`.
    pub credential_ref: Option<CredentialReferenceId>,
    pub requires_approval: bool,
    pub approved_by: Option<String>,
    pub approved_at_ms: Option<u64>,
 /// Worker currently (or most recently) assigned to dispatch this step.
    pub assigned_worker: Option<WorkerId>,
    pub attempt: u32,
    pub result: Option<ExecutionResult>,
    pub rollback_executed: bool,
    pub rollback_result: Option<ExecutionResult>,
    pub dispatched_at_ms: Option<u64>,
    pub completed_at_ms: Option<u64>,
}

impl ExecutionStep {
    pub fn pending(session_id: SessionId, index: usize, name: impl Into<String>) -> Self {
        Self {
            session_id,
            index,
            name: name.into(),
            status: StepStatus::Pending,
            command: None,
            credential_ref: None,
            requires_approval: false,
            approved_by: None,
            approved_at_ms: None,
            assigned_worker: None,
            attempt: 0,
            result: None,
            rollback_executed: false,
            rollback_result: None,
            dispatched_at_ms: None,
            completed_at_ms: None,
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
crate::builder! {
    pub struct ExecutionStepBuilder => ExecutionStep {
        set { session_id: SessionId = SessionId::new() }
        set { index: usize = 0 }
        into { name: String = "restart-service" }
        set { status: StepStatus = StepStatus::Pending }
        option { command: String = None }
        option { credential_ref: CredentialReferenceId = None }
        set { requires_approval: bool = false }
        option { approved_by: String = None }
        option { approved_at_ms: u64 = None }
        option { assigned_worker: WorkerId = None }
        set { attempt: u32 = 0 }
        option { result: ExecutionResult = None }
        set { rollback_executed: bool = false }
        option { rollback_result: ExecutionResult = None }
        option { dispatched_at_ms: u64 = None }
        option { completed_at_ms: u64 = None }
    }
}

#[cfg(test)]
#[path = "step_tests.rs"]
mod tests;
