// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Effect: every side effect the Session State Machine can request. Handlers
//! are pure functions of `(state, message) -> (new_state, Vec<Effect>)`; an
//! executor outside the state machine is the only thing that performs I/O.

use crate::credential::CredentialReferenceId;
use crate::event::ExecutionEvent;
use crate::runbook_spec::BlastRadius;
use crate::session::SessionId;
use crate::timer::TimerId;
use crate::worker::WorkerId;

/// A side effect requested by the state machine, to be carried out by the
/// runtime executor. Variants are data, never closures: every effect must
/// be serializable for logging and replayable for tests.
#[derive(Debug, Clone)]
pub enum Effect {
 /// Append to the execution event log and fan out to subscribed
 /// operator UI connections.
    EmitEvent(Box<ExecutionEvent>),
 /// Hand a bound command to a worker for dispatch. Carries the facts the
 /// worker's own Policy Engine re-check needs before it invokes the
 /// connector, and that live on the runbook step rather than the
 /// session: the engine itself never evaluates policy, it only forwards
 /// what a rule might ask about.
    DispatchCommand {
        session_id: SessionId,
        step_index: usize,
        worker: WorkerId,
        command: String,
        connector: String,
        timeout_seconds: u32,
        blast_radius: BlastRadius,
        step_marked_destructive: bool,
 /// Carried straight from the step's `CommandStep::requires_shell`, so
 /// the worker's connector invocation binds arguments or shells out to
 /// match what the runbook author declared.
        requires_shell: bool,
 /// Whether an operator's approval is already recorded for this
 /// step, standing in for the "approved_by_admin" claim a
 /// destructive dispatch requires.
        approved_by_admin: bool,
    },
 /// Request a credential handle from the broker; result arrives as a
 /// worker message.
    FetchCredential { session_id: SessionId, step_index: usize, reference: CredentialReferenceId },
 /// Release (and zeroize) a previously fetched credential handle.
    ReleaseCredential { reference: CredentialReferenceId },
 /// Arm a timer (approval SLA, step timeout, worker heartbeat deadline).
    SetTimer { id: TimerId, fire_at_ms: u64 },
    CancelTimer { id: TimerId },
 /// Call out to the ticket system's status-update API.
    UpdateTicketStatus { session_id: SessionId, status: String, note: Option<String> },
 /// Push a notification to a configured sink (email/chat webhook).
    Notify { message: String },
}

#[cfg(test)]
#[path = "effect_tests.rs"]
mod tests;
