// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Approval Gate types: a pending operator decision and its resolution.

use crate::session::SessionId;

/// An operator's resolution of a pending `ApprovalTask`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionKind {
    Approve,
    Reject,
}

crate::simple_display! {
    DecisionKind {
        Approve => "approve",
        Reject => "reject",
    }
}

/// A recorded operator decision on an `ApprovalTask`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Decision {
    pub kind: DecisionKind,
    pub operator: String,
    pub reason: Option<String>,
    pub decided_at_ms: u64,
}

/// A step awaiting operator sign-off before dispatch. Two-person-rule
/// runbooks require two distinct `approved_by` operators before the task
/// resolves; a single `Reject` resolves it immediately.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ApprovalTask {
    pub session_id: SessionId,
    pub step_index: usize,
    pub requires_two_person: bool,
    pub approved_by: Vec<String>,
    pub resolution: Option<Decision>,
    pub requested_at_ms: u64,
 /// Deadline after which the session's configured SLA timer fires.
    pub sla_deadline_ms: u64,
}

impl ApprovalTask {
    pub fn is_resolved(&self) -> bool {
        self.resolution.is_some()
    }

    pub fn is_satisfied(&self) -> bool {
        if self.requires_two_person {
            self.approved_by.len() >= 2
        } else {
            !self.approved_by.is_empty()
        }
    }

 /// Record an approval from `operator`. Returns the resolved `Decision`
 /// if this approval satisfies the requirement, idempotently ignoring a
 /// repeat approval from the same operator.
    pub fn record_approval(&mut self, operator: impl Into<String>, now_ms: u64) -> Option<Decision> {
        let operator = operator.into();
        if !self.approved_by.contains(&operator) {
            self.approved_by.push(operator.clone());
        }
        if self.is_satisfied() && self.resolution.is_none() {
            let decision =
                Decision { kind: DecisionKind::Approve, operator, reason: None, decided_at_ms: now_ms };
            self.resolution = Some(decision.clone());
            return Some(decision);
        }
        None
    }

    pub fn record_rejection(
        &mut self,
        operator: impl Into<String>,
        reason: impl Into<String>,
        now_ms: u64,
    ) -> Decision {
        let decision = Decision {
            kind: DecisionKind::Reject,
            operator: operator.into(),
            reason: Some(reason.into()),
            decided_at_ms: now_ms,
        };
        self.resolution = Some(decision.clone());
        decision
    }
}

#[cfg(any(test, feature = "test-support"))]
crate::builder! {
    pub struct ApprovalTaskBuilder => ApprovalTask {
        set { session_id: SessionId = SessionId::new() }
        set { step_index: usize = 0 }
        set { requires_two_person: bool = false }
        set { approved_by: Vec<String> = Vec::new() }
        option { resolution: Decision = None }
        set { requested_at_ms: u64 = 1_000_000 }
        set { sla_deadline_ms: u64 = 1_600_000 }
    }
}

#[cfg(test)]
#[path = "decision_tests.rs"]
mod tests;
