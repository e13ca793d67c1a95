// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! RuntimeError: the engine's own error taxonomy, composed into the
//! daemon's wider error picture.

use incident_core::{SessionId, WorkerId};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
 #[error("runbook {0} is not approved")]
 RunbookNotApproved(incident_core::RunbookId),
 #[error("session {0} has no step at index {1}")]
 NoSuchStep(SessionId, usize),
 #[error("record_step_result for session {session} step {step}: worker {got} is not the assignee {expected}")]
 ProtocolErrorWrongWorker { session: SessionId, step: usize, expected: WorkerId, got: WorkerId },
 #[error("record_step_result for session {session} step {step}: step is {status}, not running")]
 ProtocolErrorNotRunning { session: SessionId, step: usize, status: &'static str },
 #[error("approve_step for session {session} step {step}: step is {status}, not awaiting_approval")]
 ApprovalNotPending { session: SessionId, step: usize, status: &'static str },
 #[error("approve_step for session {session} step {step}: approval SLA already expired")]
 ApprovalExpired { session: SessionId, step: usize },
 #[error("session {0} is terminal; no further transitions accepted")]
 SessionTerminal(SessionId),
}
