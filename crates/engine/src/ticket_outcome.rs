// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Ticket Outcome Adapter: maps a session's terminal
//! (or still-running) state to the upstream ticketing system's status
//! vocabulary. Pure classification lives here; the actual outbound call
//! is the coordinator's job, built around `Effect::UpdateTicketStatus`
//! (which itself carries the session's `idempotency_key` indirectly, via
//! the session id the coordinator looks the key up from — the HTTP client
//! sends it as an `Idempotency-Key` header so repeat calls for the same
//! terminal outcome never double-post).

use incident_core::{Effect, PauseReason, SessionId, SessionStatus};

/// The upstream ticket status a session's outcome resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketOutcome {
 /// Session still running or awaiting approval; ticket stays open.
 InProgress,
 /// Session completed successfully.
 Resolved,
 /// Session paused or failed in a way that needs human attention;
 /// ticket is kept open but flagged for escalation rather than closed.
 Escalated,
 /// Session reached `failed`/`cancelled` with no further automated
 /// recourse; ticket is closed without being marked resolved.
 Closed,
}

impl TicketOutcome {
 /// Upstream status string written via `Effect::UpdateTicketStatus`.
 pub fn as_str(self) -> &'static str {
 match self {
 TicketOutcome::InProgress => "in_progress",
 TicketOutcome::Resolved => "resolved",
 TicketOutcome::Escalated => "escalated",
 TicketOutcome::Closed => "closed",
 }
 }
}

/// Classify a session's current state. `pause_reason` is only consulted
/// when `status` is `Paused`; ignored otherwise.
pub fn classify_outcome(status: SessionStatus, pause_reason: Option<PauseReason>) -> TicketOutcome {
 match status {
 SessionStatus::Created | SessionStatus::Running | SessionStatus::RollingBack | SessionStatus::AwaitingApproval => {
 TicketOutcome::InProgress
 }
 SessionStatus::Completed => TicketOutcome::Resolved,
 SessionStatus::Paused => match pause_reason {
 // A rejected approval is an operator's deliberate decision not
 // to proceed, not an incident needing further escalation.
 Some(PauseReason::ApprovalRejected) => TicketOutcome::Closed,
 _ => TicketOutcome::Escalated,
 },
 SessionStatus::Failed => TicketOutcome::Escalated,
 SessionStatus::Cancelled => TicketOutcome::Closed,
 }
}

/// Build the effect the coordinator issues once a session's outcome has
/// changed since the last write-back (the coordinator is responsible for
/// tracking the previously-posted `TicketOutcome` per session and calling
/// this only on a transition, keeping the adapter itself stateless).
pub fn to_effect(session_id: SessionId, outcome: TicketOutcome, note: Option<String>) -> Effect {
 Effect::UpdateTicketStatus { session_id, status: outcome.as_str().to_string(), note }
}

#[cfg(test)]
mod tests {
 use super::*;

 #[test]
 fn completed_session_resolves_ticket() {
 assert_eq!(classify_outcome(SessionStatus::Completed, None), TicketOutcome::Resolved);
 }

 #[test]
 fn running_session_stays_in_progress() {
 assert_eq!(classify_outcome(SessionStatus::Running, None), TicketOutcome::InProgress);
 }

 #[test]
 fn worker_lost_pause_escalates() {
 assert_eq!(classify_outcome(SessionStatus::Paused, Some(PauseReason::WorkerLost)), TicketOutcome::Escalated);
 }

 #[test]
 fn rejected_approval_pause_closes_without_escalation() {
 assert_eq!(
 classify_outcome(SessionStatus::Paused, Some(PauseReason::ApprovalRejected)),
 TicketOutcome::Closed
 );
 }

 #[test]
 fn failed_session_escalates() {
 assert_eq!(classify_outcome(SessionStatus::Failed, None), TicketOutcome::Escalated);
 }

 #[test]
 fn cancelled_session_closes() {
 assert_eq!(classify_outcome(SessionStatus::Cancelled, None), TicketOutcome::Closed);
 }

 #[test]
 fn to_effect_carries_status_string() {
 let effect = to_effect(SessionId::new(), TicketOutcome::Resolved, None);
 match effect {
 Effect::UpdateTicketStatus { status, .. } => assert_eq!(status, "resolved"),
 _ => panic!("expected UpdateTicketStatus"),
 }
 }
}
