// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::event::{EventKind, ExecutionEvent};
use crate::runbook_spec::{CommandStep, RunbookSpec, StepDefinition};
use crate::session::{ExecutionSession, SessionId};
use crate::tenant::TenantId;

// ── Proptest strategies ─────────────────────────────────────────────────

/// Proptest strategies for core state machine types.
pub mod strategies {
    use crate::step::StepStatus;
    use proptest::prelude::*;

    pub fn arb_step_status() -> impl Strategy<Value = StepStatus> {
        prop_oneof![
            Just(StepStatus::Pending),
            Just(StepStatus::AwaitingApproval),
            Just(StepStatus::Dispatched),
            Just(StepStatus::Running),
            Just(StepStatus::AwaitingAcknowledgment),
            Just(StepStatus::Completed),
            Just(StepStatus::Failed),
            Just(StepStatus::RolledBack),
            Just(StepStatus::Skipped),
        ]
    }
}

// ── Fixture builders ─────────────────────────────────────────────────────

/// A minimal, fully-approved single-step runbook suitable for happy-path
/// scenario tests.
pub fn single_step_runbook(command_template: &str) -> RunbookSpec {
    RunbookSpec::builder()
        .steps(vec![StepDefinition::Command(CommandStep::test_default(
            "run",
            command_template,
        ))])
        .build()
}

/// A session bound to `runbook` for a fresh tenant/ticket.
pub fn session_for(runbook: &RunbookSpec) -> ExecutionSession {
    ExecutionSession::builder()
        .tenant_id(TenantId::new())
        .runbook_id(runbook.id)
        .runbook_version(runbook.version)
        .build()
}

pub fn session_created_event(session_id: SessionId, seq: u64) -> ExecutionEvent {
    ExecutionEvent::test_new(session_id, seq, EventKind::SessionCreated { runbook_version: 1 })
}
