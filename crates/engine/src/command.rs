// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command: the input half of the state machine's `(state, message) ->
//! (new_state, Vec<Effect>)` contract.

use incident_core::{DecisionKind, ExecutionResult, IdempotencyKey, WorkerId};

/// One request into a session's serial handler. The coordinator is
/// responsible for routing these to the right session's handler and for
/// never running two at once for the same `session_id`.
#[derive(Debug, Clone)]
pub enum Command {
 /// Idempotent tick (`advance`). `candidate_worker` is the
 /// best available worker for the current step's connector kind, chosen
 /// by the coordinator's worker pool before calling in; `None` if no
 /// eligible worker is currently available (advance becomes a no-op
 /// until a later tick supplies one).
 Advance { candidate_worker: Option<WorkerId> },
 /// The claiming worker's Policy Engine check denied the step before
 /// execution (step 1: "Deny → NAK with reason; State
 /// Machine marks step `failed`"). Distinct from `RecordStepResult`
 /// because the step never actually ran.
 PolicyDenied { worker: WorkerId, step_index: usize, reason: String },
 RecordStepResult { worker: WorkerId, step_index: usize, idempotency_key: IdempotencyKey, result: ExecutionResult },
 RecordRollbackResult { step_index: usize, result: ExecutionResult },
 ApproveStep { step_index: usize, operator: String, decision: DecisionKind, notes: Option<String> },
 ApprovalSlaExpired { step_index: usize },
 ManualStepAcknowledged { step_index: usize, operator: String },
 WorkerLost { worker: WorkerId },
 Cancel { operator: String, reason: String },
}
