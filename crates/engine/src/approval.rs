// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Approval Gate's escalation policy.
//!
//! Requesting and resolving an approval is already handled by
//! [`crate::statemachine`] (it owns `ApprovalTask` state and the
//! `approval_sla` timer). What lives here is the one piece the state
//! machine deliberately leaves to the coordinator: deciding *who* gets
//! notified when a step enters `awaiting_approval`, and again if its SLA
//! expires without a decision. Kept pure and separate so the escalation
//! channel list can change without touching transition logic.

use incident_core::{ApprovalTask, Effect, SessionId};

/// Where an approval request's notification goes, and what it escalates
/// to if the SLA clock runs out first.
#[derive(Debug, Clone)]
pub struct EscalationPolicy {
 /// Notification channel used when a step first becomes
 /// `awaiting_approval`, e.g. `"slack:#incident-approvals"`.
 pub primary_channel: String,
 /// Additional channel notified only once the SLA has actually expired,
 /// escalating before the session pauses; empty means no further
 /// escalation beyond the session pause itself.
 pub escalation_channel: Option<String>,
}

/// Build the `Effect::Notify` for a freshly requested approval. Called by
/// the coordinator right after `statemachine::transition` returns the
/// `ApprovalRequested` event/timer pair for a step.
pub fn escalation_effects(policy: &EscalationPolicy, session_id: SessionId, task: &ApprovalTask) -> Vec<Effect> {
 vec![Effect::Notify {
 message: format!(
 "{} session {session_id} step {} awaiting {}approval (sla {})",
 policy.primary_channel,
 task.step_index,
 if task.requires_two_person { "two-person " } else { "" },
 task.sla_deadline_ms,
 ),
 }]
}

/// Build the `Effect::Notify` for an approval whose SLA has expired
/// unresolved. The session pause itself is emitted by
/// `statemachine::approval_sla_expired`; this only adds the operator
/// escalation on top of it, if one is configured.
pub fn expiry_escalation_effects(policy: &EscalationPolicy, session_id: SessionId, task: &ApprovalTask) -> Vec<Effect> {
 let Some(channel) = &policy.escalation_channel else {
 return Vec::new();
 };
 vec![Effect::Notify {
 message: format!(
 "{channel} approval SLA expired for session {session_id} step {} (requested {})",
 task.step_index, task.requested_at_ms,
 ),
 }]
}

#[cfg(test)]
mod tests {
 use super::*;
 use incident_core::SessionId;

 fn task() -> ApprovalTask {
 ApprovalTask {
 session_id: SessionId::new(),
 step_index: 1,
 requires_two_person: false,
 approved_by: Vec::new(),
 resolution: None,
 requested_at_ms: 1_000,
 sla_deadline_ms: 2_000,
 }
 }

 #[test]
 fn escalation_effects_emits_one_notify() {
 let policy = EscalationPolicy { primary_channel: "slack:#ops".to_string(), escalation_channel: None };
 let effects = escalation_effects(&policy, SessionId::new(), &task());
 assert_eq!(effects.len(), 1);
 }

 #[test]
 fn expiry_escalation_is_empty_without_a_configured_channel() {
 let policy = EscalationPolicy { primary_channel: "slack:#ops".to_string(), escalation_channel: None };
 let effects = expiry_escalation_effects(&policy, SessionId::new(), &task());
 assert!(effects.is_empty());
 }

 #[test]
 fn expiry_escalation_fires_when_channel_configured() {
 let policy = EscalationPolicy {
 primary_channel: "slack:#ops".to_string(),
 escalation_channel: Some("pagerduty:oncall".to_string()),
 };
 let effects = expiry_escalation_effects(&policy, SessionId::new(), &task());
 assert_eq!(effects.len(), 1);
 }
}
