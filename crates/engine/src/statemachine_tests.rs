// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use incident_core::test_support::{session_for, single_step_runbook};
use incident_core::{CommandStep, ExecutionStep, RunbookStatus, StepDefinition, TicketId};

fn two_step_runbook() -> RunbookSpec {
    RunbookSpec::builder()
        .status(RunbookStatus::Approved)
        .steps(vec![
            StepDefinition::Command(CommandStep::test_default("first", "echo {host}")),
            StepDefinition::Command(CommandStep::test_default("second", "echo done")),
        ])
        .declared_inputs(vec!["host".to_string()])
        .build()
}

fn inputs_with_host() -> BTreeMap<String, String> {
    let mut inputs = BTreeMap::new();
    inputs.insert("host".to_string(), "web-01".to_string());
    inputs
}

fn harness(runbook: &RunbookSpec, mode: ValidationMode) -> (ExecutionSession, Vec<ExecutionStep>) {
    let (session, steps, _effects) = create_session(
        TenantId::new(),
        TicketId::new(),
        runbook,
        mode,
        inputs_with_host(),
        None,
        1_000,
    )
    .expect("runbook is approved");
    (session, steps)
}

#[test]
fn create_session_rejects_unapproved_runbook() {
    let runbook = RunbookSpec::builder().status(RunbookStatus::Draft).build();
    let err = create_session(
        TenantId::new(),
        TicketId::new(),
        &runbook,
        ValidationMode::Auto,
        BTreeMap::new(),
        None,
        1_000,
    )
    .unwrap_err();
    assert!(matches!(err, EngineError::RunbookNotApproved(_)));
}

#[test]
fn create_session_forces_hil_for_destructive_runbook() {
    let mut runbook = single_step_runbook("rm -rf {path}");
    if let StepDefinition::Command(step) = &mut runbook.steps[0] {
        step.blast_radius = BlastRadius::Destructive;
    }
    let (session, _steps) = harness(&runbook, ValidationMode::Auto);
    assert_eq!(session.validation_mode, ValidationMode::Hil);
}

#[test]
fn auto_execute_happy_path_dispatches_without_approval() {
    let runbook = two_step_runbook();
    let (mut session, mut steps) = harness(&runbook, ValidationMode::Auto);
    let mut approvals = HashMap::new();
    let mut ctx = SessionContext { session: &mut session, steps: &mut steps, runbook: &runbook, approvals: &mut approvals };

    let worker = WorkerId::new();
    let effects = transition(&mut ctx, Command::Advance { candidate_worker: Some(worker) }, 2_000, 60_000).unwrap();

    assert_eq!(ctx.steps[0].status, StepStatus::Dispatched);
    assert_eq!(ctx.session.status, SessionStatus::Running);
    assert!(effects.iter().any(|e| matches!(e, Effect::DispatchCommand { step_index: 0, .. })));
    assert!(effects.iter().any(|e| matches!(e, Effect::SetTimer { .. })));
}

#[test]
fn hil_mode_requests_approval_before_dispatch() {
    let runbook = single_step_runbook("echo hi");
    let session = session_for(&runbook);
    let mut steps = vec![ExecutionStep::pending(session.id, 0, "run")];
    steps[0].requires_approval = true;
    let mut session = session;
    let mut approvals = HashMap::new();
    let mut ctx =
        SessionContext { session: &mut session, steps: &mut steps, runbook: &runbook, approvals: &mut approvals };

    let effects = transition(&mut ctx, Command::Advance { candidate_worker: None }, 1_000, 60_000).unwrap();

    assert_eq!(ctx.steps[0].status, StepStatus::AwaitingApproval);
    assert_eq!(ctx.session.status, SessionStatus::AwaitingApproval);
    assert!(ctx.approvals.contains_key(&0));
    assert!(effects.iter().any(|e| matches!(e, Effect::SetTimer { .. })));
}

#[test]
fn approve_step_resumes_to_dispatch_on_next_advance() {
    let runbook = single_step_runbook("echo hi");
    let mut session = session_for(&runbook);
    let mut steps = vec![ExecutionStep::pending(session.id, 0, "run")];
    steps[0].requires_approval = true;
    let mut approvals = HashMap::new();
    {
        let mut ctx =
            SessionContext { session: &mut session, steps: &mut steps, runbook: &runbook, approvals: &mut approvals };
        transition(&mut ctx, Command::Advance { candidate_worker: None }, 1_000, 60_000).unwrap();
    }

    let mut ctx =
        SessionContext { session: &mut session, steps: &mut steps, runbook: &runbook, approvals: &mut approvals };
    let effects = transition(
        &mut ctx,
        Command::ApproveStep { step_index: 0, operator: "alice".to_string(), decision: DecisionKind::Approve, notes: None },
        1_500,
        60_000,
    )
    .unwrap();
    assert_eq!(ctx.steps[0].status, StepStatus::Pending);
    assert!(ctx.approvals.is_empty());
    assert!(effects.iter().any(|e| matches!(e, Effect::CancelTimer { .. })));

    let worker = WorkerId::new();
    transition(&mut ctx, Command::Advance { candidate_worker: Some(worker) }, 1_600, 60_000).unwrap();
    assert_eq!(ctx.steps[0].status, StepStatus::Dispatched);
}

#[test]
fn reject_step_pauses_session_with_approval_rejected() {
    let runbook = single_step_runbook("echo hi");
    let mut session = session_for(&runbook);
    let mut steps = vec![ExecutionStep::pending(session.id, 0, "run")];
    steps[0].requires_approval = true;
    let mut approvals = HashMap::new();
    {
        let mut ctx =
            SessionContext { session: &mut session, steps: &mut steps, runbook: &runbook, approvals: &mut approvals };
        transition(&mut ctx, Command::Advance { candidate_worker: None }, 1_000, 60_000).unwrap();
    }
    let mut ctx =
        SessionContext { session: &mut session, steps: &mut steps, runbook: &runbook, approvals: &mut approvals };
    transition(
        &mut ctx,
        Command::ApproveStep {
            step_index: 0,
            operator: "alice".to_string(),
            decision: DecisionKind::Reject,
            notes: Some("not now".to_string()),
        },
        1_500,
        60_000,
    )
    .unwrap();

    assert_eq!(ctx.steps[0].status, StepStatus::Skipped);
    assert_eq!(ctx.session.status, SessionStatus::Paused);
    assert_eq!(ctx.session.pause_reason, Some(PauseReason::ApprovalRejected));
}

#[test]
fn approval_sla_expiry_pauses_session() {
    let runbook = single_step_runbook("echo hi");
    let mut session = session_for(&runbook);
    let mut steps = vec![ExecutionStep::pending(session.id, 0, "run")];
    steps[0].requires_approval = true;
    let mut approvals = HashMap::new();
    {
        let mut ctx =
            SessionContext { session: &mut session, steps: &mut steps, runbook: &runbook, approvals: &mut approvals };
        transition(&mut ctx, Command::Advance { candidate_worker: None }, 1_000, 60_000).unwrap();
    }
    let mut ctx =
        SessionContext { session: &mut session, steps: &mut steps, runbook: &runbook, approvals: &mut approvals };
    transition(&mut ctx, Command::ApprovalSlaExpired { step_index: 0 }, 61_000, 60_000).unwrap();

    assert_eq!(ctx.session.status, SessionStatus::Paused);
    assert_eq!(ctx.session.pause_reason, Some(PauseReason::ApprovalRejected));
    assert!(ctx.approvals.is_empty());
}

#[test]
fn record_step_result_rejects_wrong_worker() {
    let runbook = two_step_runbook();
    let (mut session, mut steps) = harness(&runbook, ValidationMode::Auto);
    let mut approvals = HashMap::new();
    let assigned = WorkerId::new();
    {
        let mut ctx =
            SessionContext { session: &mut session, steps: &mut steps, runbook: &runbook, approvals: &mut approvals };
        transition(&mut ctx, Command::Advance { candidate_worker: Some(assigned) }, 2_000, 60_000).unwrap();
    }
    let mut ctx =
        SessionContext { session: &mut session, steps: &mut steps, runbook: &runbook, approvals: &mut approvals };
    let impostor = WorkerId::new();
    let err = transition(
        &mut ctx,
        Command::RecordStepResult {
            worker: impostor,
            step_index: 0,
            idempotency_key: IdempotencyKey::new("xsn-1:0:1").unwrap(),
            result: ExecutionResult::ok(0, "", 10),
        },
        2_100,
        60_000,
    )
    .unwrap_err();
    assert!(matches!(err, EngineError::ProtocolErrorWrongWorker { .. }));
}

#[test]
fn duplicate_step_result_delivery_is_idempotent() {
    let runbook = two_step_runbook();
    let (mut session, mut steps) = harness(&runbook, ValidationMode::Auto);
    let mut approvals = HashMap::new();
    let worker = WorkerId::new();
    {
        let mut ctx =
            SessionContext { session: &mut session, steps: &mut steps, runbook: &runbook, approvals: &mut approvals };
        transition(&mut ctx, Command::Advance { candidate_worker: Some(worker) }, 2_000, 60_000).unwrap();
    }
    let key = IdempotencyKey::new("xsn-1:0:1").unwrap();
    let mut ctx =
        SessionContext { session: &mut session, steps: &mut steps, runbook: &runbook, approvals: &mut approvals };
    let cmd = || Command::RecordStepResult {
        worker,
        step_index: 0,
        idempotency_key: key.clone(),
        result: ExecutionResult::ok(0, "ok", 10),
    };
    let first = transition(&mut ctx, cmd(), 2_100, 60_000).unwrap();
    assert!(!first.is_empty());
    let second = transition(&mut ctx, cmd(), 2_200, 60_000).unwrap();
    assert!(second.is_empty());
    assert_eq!(ctx.steps[0].status, StepStatus::Completed);
}

#[test]
fn transient_failure_retries_within_budget_for_medium_blast_radius() {
    let runbook = RunbookSpec::builder()
        .status(RunbookStatus::Approved)
        .steps(vec![StepDefinition::Command({
            let mut s = CommandStep::test_default("flaky", "echo {host}");
            s.blast_radius = incident_core::BlastRadius::Medium;
            s.retry = incident_core::RetryPolicy { max_attempts: 2, backoff_initial_ms: 0, backoff_multiplier: 1 };
            s
        })])
        .declared_inputs(vec!["host".to_string()])
        .build();
    let (mut session, mut steps) = harness(&runbook, ValidationMode::Auto);
    let mut approvals = HashMap::new();
    let worker = WorkerId::new();
    let mut ctx =
        SessionContext { session: &mut session, steps: &mut steps, runbook: &runbook, approvals: &mut approvals };
    transition(&mut ctx, Command::Advance { candidate_worker: Some(worker) }, 1_000, 60_000).unwrap();
    assert_eq!(ctx.steps[0].attempt, 1);

    let key = IdempotencyKey::new("xsn-1:0:1").unwrap();
    let effects = transition(
        &mut ctx,
        Command::RecordStepResult {
            worker,
            step_index: 0,
            idempotency_key: key,
            result: ExecutionResult::failed(incident_core::FailureKind::Transient, "connection reset", 5),
        },
        1_100,
        60_000,
    )
    .unwrap();

    // Redispatched, not failed: attempt bumped to 2, status back to
    // `Dispatched`, and a `StepRetrying` event precedes the new dispatch.
    assert_eq!(ctx.steps[0].status, StepStatus::Dispatched);
    assert_eq!(ctx.steps[0].attempt, 2);
    assert!(effects.iter().any(|e| matches!(
        e,
        Effect::EmitEvent(event) if matches!(event.kind, incident_core::EventKind::StepRetrying { .. })
    )));
    assert!(effects.iter().any(|e| matches!(e, Effect::DispatchCommand { .. })));
}

#[test]
fn transient_failure_fails_outright_once_retry_budget_exhausted() {
    let runbook = RunbookSpec::builder()
        .status(RunbookStatus::Approved)
        .steps(vec![StepDefinition::Command({
            let mut s = CommandStep::test_default("flaky", "echo {host}");
            s.blast_radius = incident_core::BlastRadius::Medium;
            s.retry = incident_core::RetryPolicy::none();
            s
        })])
        .declared_inputs(vec!["host".to_string()])
        .build();
    let (mut session, mut steps) = harness(&runbook, ValidationMode::Auto);
    let mut approvals = HashMap::new();
    let worker = WorkerId::new();
    let mut ctx =
        SessionContext { session: &mut session, steps: &mut steps, runbook: &runbook, approvals: &mut approvals };
    transition(&mut ctx, Command::Advance { candidate_worker: Some(worker) }, 1_000, 60_000).unwrap();

    let key = IdempotencyKey::new("xsn-1:0:1").unwrap();
    transition(
        &mut ctx,
        Command::RecordStepResult {
            worker,
            step_index: 0,
            idempotency_key: key,
            result: ExecutionResult::failed(incident_core::FailureKind::Transient, "connection reset", 5),
        },
        1_100,
        60_000,
    )
    .unwrap();

    assert_eq!(ctx.steps[0].status, StepStatus::Failed);
}

#[test]
fn destructive_step_never_auto_retries_on_transient_failure() {
    let runbook = RunbookSpec::builder()
        .status(RunbookStatus::Approved)
        .steps(vec![StepDefinition::Command({
            let mut s = CommandStep::test_default("wipe", "echo {host}");
            s.blast_radius = incident_core::BlastRadius::Destructive;
            s.approval = incident_core::ApprovalRequirement::TwoPerson;
            s.retry = incident_core::RetryPolicy { max_attempts: 5, backoff_initial_ms: 0, backoff_multiplier: 1 };
            s
        })])
        .declared_inputs(vec!["host".to_string()])
        .build();
    let (mut session, mut steps) = harness(&runbook, ValidationMode::Hil);
    let mut approvals = HashMap::new();
    let worker = WorkerId::new();
    let mut ctx =
        SessionContext { session: &mut session, steps: &mut steps, runbook: &runbook, approvals: &mut approvals };
    transition(&mut ctx, Command::Advance { candidate_worker: None }, 1_000, 60_000).unwrap();
    transition(
        &mut ctx,
        Command::ApproveStep {
            step_index: 0,
            operator: "alice".to_string(),
            decision: DecisionKind::Approve,
            notes: None,
        },
        1_100,
        60_000,
    )
    .unwrap();
    transition(
        &mut ctx,
        Command::ApproveStep {
            step_index: 0,
            operator: "bob".to_string(),
            decision: DecisionKind::Approve,
            notes: None,
        },
        1_150,
        60_000,
    )
    .unwrap();
    transition(&mut ctx, Command::Advance { candidate_worker: Some(worker) }, 1_200, 60_000).unwrap();

    let key = IdempotencyKey::new("xsn-1:0:1").unwrap();
    transition(
        &mut ctx,
        Command::RecordStepResult {
            worker,
            step_index: 0,
            idempotency_key: key,
            result: ExecutionResult::failed(incident_core::FailureKind::Transient, "connection reset", 5),
        },
        1_300,
        60_000,
    )
    .unwrap();

    assert_eq!(ctx.steps[0].status, StepStatus::Failed);
}

#[test]
fn two_step_runbook_completes_session_after_last_step() {
    let runbook = two_step_runbook();
    let (mut session, mut steps) = harness(&runbook, ValidationMode::Auto);
    let mut approvals = HashMap::new();
    let worker = WorkerId::new();
    let key = IdempotencyKey::new("xsn-1:0:1").unwrap();

    {
        let mut ctx =
            SessionContext { session: &mut session, steps: &mut steps, runbook: &runbook, approvals: &mut approvals };
        transition(&mut ctx, Command::Advance { candidate_worker: Some(worker) }, 2_000, 60_000).unwrap();
        transition(
            &mut ctx,
            Command::RecordStepResult { worker, step_index: 0, idempotency_key: key, result: ExecutionResult::ok(0, "ok", 10) },
            2_100,
            60_000,
        )
        .unwrap();
        transition(&mut ctx, Command::Advance { candidate_worker: Some(worker) }, 2_200, 60_000).unwrap();
    }
    assert_eq!(steps[1].status, StepStatus::Dispatched);

    let key2 = IdempotencyKey::new("xsn-1:1:1").unwrap();
    let mut ctx =
        SessionContext { session: &mut session, steps: &mut steps, runbook: &runbook, approvals: &mut approvals };
    transition(
        &mut ctx,
        Command::RecordStepResult { worker, step_index: 1, idempotency_key: key2, result: ExecutionResult::ok(0, "ok", 10) },
        2_300,
        60_000,
    )
    .unwrap();
    transition(&mut ctx, Command::Advance { candidate_worker: Some(worker) }, 2_400, 60_000).unwrap();

    assert_eq!(ctx.session.status, SessionStatus::Completed);
}

#[test]
fn zero_step_runbook_completes_immediately_with_warning() {
    let runbook = RunbookSpec::builder().status(RunbookStatus::Approved).steps(vec![]).build();
    let (mut session, mut steps) = harness(&runbook, ValidationMode::Auto);
    let mut approvals = HashMap::new();
    let mut ctx =
        SessionContext { session: &mut session, steps: &mut steps, runbook: &runbook, approvals: &mut approvals };

    let effects = transition(&mut ctx, Command::Advance { candidate_worker: None }, 1_000, 60_000).unwrap();

    assert_eq!(ctx.session.status, SessionStatus::Completed);
    let kinds: Vec<&incident_core::EventKind> = effects
        .iter()
        .map(|e| match e {
            Effect::EmitEvent(event) => &event.kind,
            other => panic!("expected EmitEvent, got {other:?}"),
        })
        .collect();
    assert!(matches!(kinds[0], incident_core::EventKind::Warning { .. }));
    assert!(matches!(kinds[1], incident_core::EventKind::SessionCompleted));
}

#[test]
fn failed_step_with_rollback_template_enters_rolling_back() {
    let runbook2 = RunbookSpec::builder()
        .status(RunbookStatus::Approved)
        .steps(vec![
            StepDefinition::Command({
                let mut s = CommandStep::test_default("risky", "echo hi");
                s.rollback_command_template = Some("echo undo".to_string());
                s
            }),
            StepDefinition::Command(CommandStep::test_default("next", "echo next")),
        ])
        .build();
    let (mut session, mut steps) = harness(&runbook2, ValidationMode::Auto);
    let mut approvals = HashMap::new();
    let worker = WorkerId::new();
    {
        let mut ctx =
            SessionContext { session: &mut session, steps: &mut steps, runbook: &runbook2, approvals: &mut approvals };
        transition(&mut ctx, Command::Advance { candidate_worker: Some(worker) }, 2_000, 60_000).unwrap();
        transition(
            &mut ctx,
            Command::RecordStepResult {
                worker,
                step_index: 0,
                idempotency_key: IdempotencyKey::new("xsn-1:0:1").unwrap(),
                result: ExecutionResult::ok(0, "ok", 10),
            },
            2_100,
            60_000,
        )
        .unwrap();
        transition(&mut ctx, Command::Advance { candidate_worker: Some(worker) }, 2_200, 60_000).unwrap();
        transition(
            &mut ctx,
            Command::RecordStepResult {
                worker,
                step_index: 1,
                idempotency_key: IdempotencyKey::new("xsn-1:1:1").unwrap(),
                result: ExecutionResult::failed(FailureKind::CommandFailed, "boom", 10),
            },
            2_300,
            60_000,
        )
        .unwrap();
    }
    assert_eq!(steps[1].status, StepStatus::Failed);

    let mut ctx =
        SessionContext { session: &mut session, steps: &mut steps, runbook: &runbook2, approvals: &mut approvals };
    let effects = transition(&mut ctx, Command::Advance { candidate_worker: Some(worker) }, 2_400, 60_000).unwrap();
    assert_eq!(ctx.session.status, SessionStatus::RollingBack);
    assert!(effects.iter().any(|e| matches!(e, Effect::DispatchCommand { step_index: 0, .. })));

    transition(
        &mut ctx,
        Command::RecordRollbackResult { step_index: 0, result: ExecutionResult::ok(0, "undone", 5) },
        2_500,
        60_000,
    )
    .unwrap();
    assert_eq!(ctx.steps[0].status, StepStatus::RolledBack);
    assert_eq!(ctx.session.status, SessionStatus::Failed);
}

#[test]
fn worker_lost_pauses_session_for_its_own_assignee_only() {
    let runbook = two_step_runbook();
    let (mut session, mut steps) = harness(&runbook, ValidationMode::Auto);
    let mut approvals = HashMap::new();
    let worker = WorkerId::new();
    {
        let mut ctx =
            SessionContext { session: &mut session, steps: &mut steps, runbook: &runbook, approvals: &mut approvals };
        transition(&mut ctx, Command::Advance { candidate_worker: Some(worker) }, 2_000, 60_000).unwrap();
    }
    let mut ctx =
        SessionContext { session: &mut session, steps: &mut steps, runbook: &runbook, approvals: &mut approvals };
    let unrelated = WorkerId::new();
    transition(&mut ctx, Command::WorkerLost { worker: unrelated }, 2_100, 60_000).unwrap();
    assert_eq!(ctx.session.status, SessionStatus::Running);

    transition(&mut ctx, Command::WorkerLost { worker }, 2_200, 60_000).unwrap();
    assert_eq!(ctx.session.status, SessionStatus::Paused);
    assert_eq!(ctx.session.pause_reason, Some(PauseReason::WorkerLost));
}

#[test]
fn policy_denied_fails_the_claimed_step() {
    let runbook = two_step_runbook();
    let (mut session, mut steps) = harness(&runbook, ValidationMode::Auto);
    let mut approvals = HashMap::new();
    let worker = WorkerId::new();
    {
        let mut ctx =
            SessionContext { session: &mut session, steps: &mut steps, runbook: &runbook, approvals: &mut approvals };
        transition(&mut ctx, Command::Advance { candidate_worker: Some(worker) }, 2_000, 60_000).unwrap();
    }
    let mut ctx =
        SessionContext { session: &mut session, steps: &mut steps, runbook: &runbook, approvals: &mut approvals };
    transition(
        &mut ctx,
        Command::PolicyDenied { worker, step_index: 0, reason: "target in maintenance window".to_string() },
        2_100,
        60_000,
    )
    .unwrap();
    assert_eq!(ctx.steps[0].status, StepStatus::Failed);
    assert_eq!(ctx.steps[0].result.as_ref().unwrap().failure_kind, Some(FailureKind::CommandFailed));
}

#[test]
fn cancel_skips_pending_step_and_terminates_session() {
    let runbook = two_step_runbook();
    let (mut session, mut steps) = harness(&runbook, ValidationMode::Hil);
    let mut approvals = HashMap::new();
    let mut ctx =
        SessionContext { session: &mut session, steps: &mut steps, runbook: &runbook, approvals: &mut approvals };
    transition(&mut ctx, Command::Advance { candidate_worker: None }, 2_000, 60_000).unwrap();
    assert_eq!(ctx.steps[0].status, StepStatus::AwaitingApproval);

    transition(
        &mut ctx,
        Command::Cancel { operator: "bob".to_string(), reason: "incident resolved manually".to_string() },
        2_100,
        60_000,
    )
    .unwrap();
    assert_eq!(ctx.session.status, SessionStatus::Cancelled);
    assert!(ctx.approvals.is_empty());
}

#[test]
fn terminal_session_rejects_further_commands() {
    let runbook = single_step_runbook("echo hi");
    let mut session = session_for(&runbook);
    session.status = SessionStatus::Completed;
    let mut steps = vec![ExecutionStep::pending(session.id, 0, "run")];
    let mut approvals = HashMap::new();
    let mut ctx =
        SessionContext { session: &mut session, steps: &mut steps, runbook: &runbook, approvals: &mut approvals };
    let err = transition(&mut ctx, Command::Advance { candidate_worker: None }, 1_000, 60_000).unwrap_err();
    assert!(matches!(err, EngineError::SessionTerminal(_)));
}

#[test]
fn manual_step_waits_for_explicit_acknowledgment() {
    let runbook = RunbookSpec::builder()
        .status(RunbookStatus::Approved)
        .steps(vec![StepDefinition::Manual(incident_core::ManualStep {
            name: "confirm-with-customer".to_string(),
            instructions: "call the customer back".to_string(),
            timeout_seconds: 300,
        })])
        .build();
    let (mut session, mut steps) = harness(&runbook, ValidationMode::Auto);
    let mut approvals = HashMap::new();
    let mut ctx =
        SessionContext { session: &mut session, steps: &mut steps, runbook: &runbook, approvals: &mut approvals };
    transition(&mut ctx, Command::Advance { candidate_worker: None }, 2_000, 60_000).unwrap();
    assert_eq!(ctx.steps[0].status, StepStatus::AwaitingAcknowledgment);

    transition(
        &mut ctx,
        Command::ManualStepAcknowledged { step_index: 0, operator: "carol".to_string() },
        2_100,
        60_000,
    )
    .unwrap();
    assert_eq!(ctx.steps[0].status, StepStatus::Completed);

    transition(&mut ctx, Command::Advance { candidate_worker: None }, 2_200, 60_000).unwrap();
    assert_eq!(ctx.session.status, SessionStatus::Completed);
}
