// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Session State Machine: a pure
//! `(state, Command) -> Vec<Effect>` handler. Nothing in this module
//! performs I/O; the coordinator executes the returned `Effect`s.

use crate::command::Command;
use crate::error::EngineError;
use incident_core::{
 ApprovalTask, BlastRadius, DecisionKind, Effect, EventId, ExecutionEvent, ExecutionResult, ExecutionSession,
 ExecutionStep, FailureKind, IdempotencyKey, PauseReason, RunbookSpec, SessionStatus, StepDefinition, StepStatus,
 TenantId, TicketId, TimerId, ValidationMode, WorkerId,
};
use std::collections::{BTreeMap, HashMap};

/// Mutable borrows the transition function needs, gathered in one place so
/// every handler has the same signature. Lives only as long as the
/// coordinator's per-session handler call; none of it is held across calls.
pub struct SessionContext<'a> {
 pub session: &'a mut ExecutionSession,
 pub steps: &'a mut Vec<ExecutionStep>,
 pub runbook: &'a RunbookSpec,
 /// Pending approval tasks keyed by step index. Reconstructed from a
 /// fresh SLA deadline on daemon restart if a step is still
 /// `awaiting_approval` when the WAL replay completes.
 pub approvals: &'a mut HashMap<usize, ApprovalTask>,
}

/// Placeholder assignee recorded against `ExecutionStep`/`ExecutionEvent`
/// fields that expect a `WorkerId` even for manual steps, which have no
/// real worker dispatched to them.
fn manual_step_worker() -> WorkerId {
 WorkerId::from_string("operator")
}

fn step_requires_approval(def: &StepDefinition, mode: ValidationMode) -> bool {
 match def {
 StepDefinition::Manual(_) => false,
 StepDefinition::Command(cmd) => match cmd.approval {
 incident_core::ApprovalRequirement::Single | incident_core::ApprovalRequirement::TwoPerson => true,
 incident_core::ApprovalRequirement::None => mode == ValidationMode::Hil,
 },
 }
}

fn requires_two_person(def: &StepDefinition) -> bool {
 matches!(
 def,
 StepDefinition::Command(incident_core::CommandStep { approval: incident_core::ApprovalRequirement::TwoPerson, .. })
 ) || def.is_destructive()
}

/// Bind a runbook to a ticket/tenant and compute the session's initial
/// steps (`create_session`). Does not dispatch anything; the
/// caller issues `Command::Advance` next.
#[allow(clippy::too_many_arguments)]
pub fn create_session(
 tenant_id: TenantId,
 ticket_id: TicketId,
 runbook: &RunbookSpec,
 mode: ValidationMode,
 inputs: BTreeMap<String, String>,
 idempotency_key: Option<IdempotencyKey>,
 now_ms: u64,
) -> Result<(ExecutionSession, Vec<ExecutionStep>, Vec<Effect>), EngineError> {
 if !runbook.is_approved() {
 return Err(EngineError::RunbookNotApproved(runbook.id));
 }
 // Destructive runbooks always run human-in-the-loop regardless of the
 // caller's requested mode ("mode is consistent with blast
 // radius; destructive forces per_step").
 let effective_mode =
 if runbook.max_blast_radius() == BlastRadius::Destructive { ValidationMode::Hil } else { mode };

 let session = ExecutionSession {
 id: incident_core::SessionId::new(),
 tenant_id,
 ticket_id,
 runbook_id: runbook.id,
 runbook_version: runbook.version,
 validation_mode: effective_mode,
 status: SessionStatus::Created,
 inputs,
 current_step_index: None,
 idempotency_key,
 assigned_worker: None,
 assignment_retry_count: 0,
 pause_reason: None,
 last_event_seq: 1,
 created_at_ms: now_ms,
 updated_at_ms: now_ms,
 };

 let steps = runbook
 .steps
 .iter()
 .enumerate()
 .map(|(index, def)| {
 let mut step = ExecutionStep::pending(session.id, index, def.name());
 step.requires_approval = step_requires_approval(def, effective_mode);
 step
 })
 .collect();

 let event = ExecutionEvent {
 id: EventId::new(),
 tenant_id,
 session_id: session.id,
 seq: 1,
 kind: incident_core::EventKind::SessionCreated { runbook_version: runbook.version },
 recorded_at_ms: now_ms,
 };

 Ok((session, steps, vec![Effect::EmitEvent(Box::new(event))]))
}

fn next_seq(session: &mut ExecutionSession) -> u64 {
 session.last_event_seq += 1;
 session.last_event_seq
}

fn emit(ctx: &mut SessionContext, kind: incident_core::EventKind, now_ms: u64, effects: &mut Vec<Effect>) {
 let seq = next_seq(ctx.session);
 effects.push(Effect::EmitEvent(Box::new(ExecutionEvent {
 id: EventId::new(),
 tenant_id: ctx.session.tenant_id,
 session_id: ctx.session.id,
 seq,
 kind,
 recorded_at_ms: now_ms,
 })));
}

fn pause(ctx: &mut SessionContext, reason: PauseReason, now_ms: u64, effects: &mut Vec<Effect>) {
 ctx.session.status = SessionStatus::Paused;
 ctx.session.pause_reason = Some(reason);
 ctx.session.updated_at_ms = now_ms;
 emit(ctx, incident_core::EventKind::SessionPaused { reason }, now_ms, effects);
}

/// The Session State Machine's single entry point. Enforces the invariant
/// that a session in a terminal state accepts nothing further.
pub fn transition(
 ctx: &mut SessionContext,
 command: Command,
 now_ms: u64,
 approval_sla_ms: u64,
) -> Result<Vec<Effect>, EngineError> {
 if ctx.session.status.is_terminal() {
 return Err(EngineError::SessionTerminal(ctx.session.id));
 }
 let mut effects = Vec::new();
 match command {
 Command::Advance { candidate_worker } => advance(ctx, candidate_worker, now_ms, approval_sla_ms, &mut effects)?,
 Command::PolicyDenied { worker, step_index, reason } => {
 policy_denied(ctx, worker, step_index, reason, now_ms, &mut effects)?
 }
 Command::RecordStepResult { worker, step_index, idempotency_key, result } => {
 record_step_result(ctx, worker, step_index, idempotency_key, result, now_ms, &mut effects)?
 }
 Command::RecordRollbackResult { step_index, result } => {
 record_rollback_result(ctx, step_index, result, now_ms, &mut effects)?
 }
 Command::ApproveStep { step_index, operator, decision, notes } => {
 approve_step(ctx, step_index, operator, decision, notes, now_ms, &mut effects)?
 }
 Command::ApprovalSlaExpired { step_index } => approval_sla_expired(ctx, step_index, now_ms, &mut effects)?,
 Command::ManualStepAcknowledged { step_index, operator } => {
 manual_step_acknowledged(ctx, step_index, operator, now_ms, &mut effects)?
 }
 Command::WorkerLost { worker } => worker_lost(ctx, worker, now_ms, &mut effects)?,
 Command::Cancel { operator, reason } => cancel(ctx, operator, reason, now_ms, &mut effects)?,
 }
 Ok(effects)
}

/// The step-progression algorithm. Loops locally so a cascade of
/// already-satisfied steps (e.g. a just-completed step followed by more
/// steps that need no new action) resolves within a single call, making
/// the tick idempotent.
fn advance(
 ctx: &mut SessionContext,
 candidate_worker: Option<WorkerId>,
 now_ms: u64,
 approval_sla_ms: u64,
 effects: &mut Vec<Effect>,
) -> Result<(), EngineError> {
 if matches!(ctx.session.status, SessionStatus::Paused | SessionStatus::AwaitingApproval) {
 return Ok(());
 }
 if ctx.session.status == SessionStatus::RollingBack {
 return advance_rollback(ctx, now_ms, effects);
 }

 let mut index = match ctx.session.current_step_index {
 Some(i) => i,
 None => 0,
 };

 loop {
 let Some(def) = ctx.runbook.step(index).cloned() else {
 ctx.session.status = SessionStatus::Completed;
 ctx.session.current_step_index = None;
 ctx.session.updated_at_ms = now_ms;
 if ctx.runbook.steps.is_empty() {
 emit(
 ctx,
 incident_core::EventKind::Warning {
 message: "runbook has no prechecks, main steps, or postchecks; completed without executing anything"
 .to_string(),
 },
 now_ms,
 effects,
 );
 }
 emit(ctx, incident_core::EventKind::SessionCompleted, now_ms, effects);
 return Ok(());
 };
 ctx.session.current_step_index = Some(index);
 let status = ctx.steps[index].status;

 match status {
 StepStatus::Pending => {
 if ctx.steps[index].requires_approval {
 request_approval(ctx, index, &def, now_ms, approval_sla_ms, effects);
 return Ok(());
 }
 // Manual steps need no worker to dispatch; a `Command` step
 // waits for the coordinator's worker pool to supply one.
 // `StepDispatched` requires a worker id regardless, so
 // manual steps carry this sentinel rather than a real one.
 let worker = match (&def, candidate_worker) {
 (StepDefinition::Manual(_), _) => manual_step_worker(),
 (StepDefinition::Command(_), Some(worker)) => worker,
 (StepDefinition::Command(_), None) => return Ok(()),
 };
 dispatch_step(ctx, index, &def, worker, now_ms, effects);
 return Ok(());
 }
 StepStatus::Dispatched | StepStatus::Running | StepStatus::AwaitingAcknowledgment => {
 return Ok(());
 }
 StepStatus::Completed => {
 index += 1;
 continue;
 }
 StepStatus::Skipped => {
 index += 1;
 continue;
 }
 StepStatus::Failed => {
 return begin_rollback(ctx, index, now_ms, effects);
 }
 StepStatus::AwaitingApproval | StepStatus::RolledBack => {
 return Ok(());
 }
 }
 }
}

fn request_approval(
 ctx: &mut SessionContext,
 index: usize,
 def: &StepDefinition,
 now_ms: u64,
 approval_sla_ms: u64,
 effects: &mut Vec<Effect>,
) {
 ctx.steps[index].status = StepStatus::AwaitingApproval;
 ctx.session.status = SessionStatus::AwaitingApproval;
 ctx.session.updated_at_ms = now_ms;
 let deadline = now_ms + approval_sla_ms;
 ctx.approvals.insert(
 index,
 ApprovalTask {
 session_id: ctx.session.id,
 step_index: index,
 requires_two_person: requires_two_person(def),
 approved_by: Vec::new(),
 resolution: None,
 requested_at_ms: now_ms,
 sla_deadline_ms: deadline,
 },
 );
 emit(ctx, incident_core::EventKind::ApprovalRequested { step_index: index }, now_ms, effects);
 effects.push(Effect::SetTimer { id: TimerId::approval_sla(ctx.session.id, index), fire_at_ms: deadline });
}

fn dispatch_step(
 ctx: &mut SessionContext,
 index: usize,
 def: &StepDefinition,
 worker: WorkerId,
 now_ms: u64,
 effects: &mut Vec<Effect>,
) {
 let attempt = ctx.steps[index].attempt + 1;
 ctx.steps[index].attempt = attempt;
 ctx.steps[index].assigned_worker = Some(worker);
 ctx.steps[index].dispatched_at_ms = Some(now_ms);
 ctx.session.assigned_worker = Some(worker);
 ctx.session.status = SessionStatus::Running;
 ctx.session.updated_at_ms = now_ms;

 match def {
 StepDefinition::Manual(_) => {
 ctx.steps[index].status = StepStatus::AwaitingAcknowledgment;
 }
 StepDefinition::Command(cmd) => {
 ctx.steps[index].status = StepStatus::Dispatched;
 ctx.steps[index].command = Some(bind_command(&cmd.command_template, &ctx.session.inputs));
 effects.push(Effect::DispatchCommand {
 session_id: ctx.session.id,
 step_index: index,
 worker,
 command: ctx.steps[index].command.clone().unwrap_or_default(),
 connector: cmd.connector.clone(),
 timeout_seconds: cmd.timeout_seconds,
 blast_radius: cmd.blast_radius,
 step_marked_destructive: cmd.blast_radius == BlastRadius::Destructive,
 requires_shell: cmd.requires_shell,
 approved_by_admin: ctx.steps[index].approved_by.is_some(),
 });
 effects.push(Effect::SetTimer {
 id: TimerId::step_timeout(ctx.session.id, index, attempt),
 fire_at_ms: now_ms + cmd.timeout_seconds as u64 * 1_000,
 });
 }
 }
 emit(
 ctx,
 incident_core::EventKind::StepDispatched { step_index: index, worker, attempt },
 now_ms,
 effects,
 );
}

/// Binds `{placeholder}` tokens via `incident-runbook`'s shell-escaping
/// substitution. A bind failure here means the runbook passed validation
/// with a template referencing an input the session never supplied, which
/// `create_session` should have caught; dispatch the raw template rather
/// than panic, and let the connector's own failure surface the problem.
fn bind_command(template: &str, inputs: &BTreeMap<String, String>) -> String {
 match incident_runbook::bind(template, inputs) {
 Ok(bound) => bound,
 Err(err) => {
 tracing::warn!(%err, template, "command template binding failed, dispatching unbound");
 template.to_string()
 }
 }
}

fn policy_denied(
 ctx: &mut SessionContext,
 worker: WorkerId,
 step_index: usize,
 reason: String,
 now_ms: u64,
 effects: &mut Vec<Effect>,
) -> Result<(), EngineError> {
 let step =
 ctx.steps.get_mut(step_index).ok_or(EngineError::NoSuchStep(ctx.session.id, step_index))?;
 if step.assigned_worker != Some(worker) {
 return Err(EngineError::ProtocolErrorWrongWorker {
 session: ctx.session.id,
 step: step_index,
 expected: step.assigned_worker.unwrap_or(worker),
 got: worker,
 });
 }
 let result = ExecutionResult::failed(FailureKind::CommandFailed, reason, 0);
 step.status = StepStatus::Failed;
 step.result = Some(result.clone());
 step.completed_at_ms = Some(now_ms);
 emit(ctx, incident_core::EventKind::StepFailed { step_index, result }, now_ms, effects);
 Ok(())
}

fn record_step_result(
 ctx: &mut SessionContext,
 worker: WorkerId,
 step_index: usize,
 idempotency_key: IdempotencyKey,
 result: ExecutionResult,
 now_ms: u64,
 effects: &mut Vec<Effect>,
) -> Result<(), EngineError> {
 let step =
 ctx.steps.get_mut(step_index).ok_or(EngineError::NoSuchStep(ctx.session.id, step_index))?;

 if step.status == StepStatus::Completed || step.status == StepStatus::Failed {
 // Duplicate delivery of the same claim : return the
 // prior outcome, never re-execute or re-emit.
 let _ = idempotency_key;
 return Ok(());
 }
 if step.assigned_worker != Some(worker) {
 return Err(EngineError::ProtocolErrorWrongWorker {
 session: ctx.session.id,
 step: step_index,
 expected: step.assigned_worker.unwrap_or(worker),
 got: worker,
 });
 }
 if step.status != StepStatus::Dispatched && step.status != StepStatus::Running {
 return Err(EngineError::ProtocolErrorNotRunning {
 session: ctx.session.id,
 step: step_index,
 status: status_label(step.status),
 });
 }

 effects.push(Effect::CancelTimer { id: TimerId::step_timeout(ctx.session.id, step_index, step.attempt) });

 if result.success {
 step.result = Some(result.clone());
 step.completed_at_ms = Some(now_ms);
 step.status = StepStatus::Completed;
 emit(ctx, incident_core::EventKind::StepCompleted { step_index, result }, now_ms, effects);
 ctx.session.updated_at_ms = now_ms;
 return Ok(());
 }

 if let Some(retry_attempt) = retry_eligible(ctx, step_index, &result) {
 let def = ctx.runbook.step(step_index).cloned().expect("step_index bound to this runbook's steps");
 emit(
 ctx,
 incident_core::EventKind::StepRetrying { step_index, attempt: retry_attempt, result: result.clone() },
 now_ms,
 effects,
 );
 dispatch_step(ctx, step_index, &def, worker, now_ms, effects);
 return Ok(());
 }

 let step = &mut ctx.steps[step_index];
 step.result = Some(result.clone());
 step.completed_at_ms = Some(now_ms);
 step.status = StepStatus::Failed;
 emit(ctx, incident_core::EventKind::StepFailed { step_index, result }, now_ms, effects);
 ctx.session.updated_at_ms = now_ms;
 Ok(())
}

/// Whether a just-failed step should be redispatched instead of failed
/// outright: the failure kind is retryable, the step's blast radius is no
/// higher than `Medium`, and the step has attempts remaining under its
/// `RetryPolicy`. Returns the attempt number the redispatch will run as.
fn retry_eligible(ctx: &SessionContext, step_index: usize, result: &ExecutionResult) -> Option<u32> {
 let retryable = result.failure_kind.map(|k| k.is_retryable()).unwrap_or(false);
 if !retryable {
 return None;
 }
 let StepDefinition::Command(cmd) = ctx.runbook.step(step_index)? else { return None };
 if cmd.blast_radius > BlastRadius::Medium {
 return None;
 }
 let attempts_used = ctx.steps[step_index].attempt;
 if attempts_used >= cmd.retry.max_attempts {
 return None;
 }
 Some(attempts_used + 1)
}

fn status_label(status: StepStatus) -> &'static str {
 match status {
 StepStatus::Pending => "pending",
 StepStatus::AwaitingApproval => "awaiting_approval",
 StepStatus::Dispatched => "dispatched",
 StepStatus::Running => "running",
 StepStatus::AwaitingAcknowledgment => "awaiting_acknowledgment",
 StepStatus::Completed => "completed",
 StepStatus::Failed => "failed",
 StepStatus::RolledBack => "rolled_back",
 StepStatus::Skipped => "skipped",
 }
}

fn approve_step(
 ctx: &mut SessionContext,
 step_index: usize,
 operator: String,
 decision: DecisionKind,
 notes: Option<String>,
 now_ms: u64,
 effects: &mut Vec<Effect>,
) -> Result<(), EngineError> {
 {
 let step = ctx.steps.get(step_index).ok_or(EngineError::NoSuchStep(ctx.session.id, step_index))?;
 if step.status != StepStatus::AwaitingApproval {
 return Err(EngineError::ApprovalNotPending {
 session: ctx.session.id,
 step: step_index,
 status: status_label(step.status),
 });
 }
 }
 let Some(task) = ctx.approvals.get_mut(&step_index) else {
 return Err(EngineError::ApprovalExpired { session: ctx.session.id, step: step_index });
 };

 match decision {
 DecisionKind::Reject => {
 let decision = task.record_rejection(operator, notes.unwrap_or_default(), now_ms);
 effects.push(Effect::CancelTimer { id: TimerId::approval_sla(ctx.session.id, step_index) });
 ctx.steps[step_index].status = StepStatus::Skipped;
 emit(ctx, incident_core::EventKind::ApprovalDecided { step_index, decision }, now_ms, effects);
 ctx.approvals.remove(&step_index);
 pause(ctx, PauseReason::ApprovalRejected, now_ms, effects);
 }
 DecisionKind::Approve => {
 ctx.steps[step_index].approved_by = Some(operator.clone());
 ctx.steps[step_index].approved_at_ms = Some(now_ms);
 if let Some(resolved) = task.record_approval(operator, now_ms) {
 effects.push(Effect::CancelTimer { id: TimerId::approval_sla(ctx.session.id, step_index) });
 ctx.steps[step_index].status = StepStatus::Pending;
 ctx.session.status = SessionStatus::Running;
 emit(
 ctx,
 incident_core::EventKind::ApprovalDecided { step_index, decision: resolved },
 now_ms,
 effects,
 );
 ctx.approvals.remove(&step_index);
 }
 }
 }
 Ok(())
}

fn approval_sla_expired(
 ctx: &mut SessionContext,
 step_index: usize,
 now_ms: u64,
 effects: &mut Vec<Effect>,
) -> Result<(), EngineError> {
 if ctx.approvals.remove(&step_index).is_none() {
 // Already resolved before the timer fired; nothing to do.
 return Ok(());
 }
 emit(ctx, incident_core::EventKind::ApprovalExpired { step_index }, now_ms, effects);
 pause(ctx, PauseReason::ApprovalRejected, now_ms, effects);
 Ok(())
}

fn manual_step_acknowledged(
 ctx: &mut SessionContext,
 step_index: usize,
 operator: String,
 now_ms: u64,
 effects: &mut Vec<Effect>,
) -> Result<(), EngineError> {
 let step =
 ctx.steps.get_mut(step_index).ok_or(EngineError::NoSuchStep(ctx.session.id, step_index))?;
 if step.status != StepStatus::AwaitingAcknowledgment {
 return Err(EngineError::ProtocolErrorNotRunning {
 session: ctx.session.id,
 step: step_index,
 status: status_label(step.status),
 });
 }
 step.status = StepStatus::Completed;
 step.completed_at_ms = Some(now_ms);
 emit(
 ctx,
 incident_core::EventKind::ManualStepAcknowledged { step_index, operator },
 now_ms,
 effects,
 );
 Ok(())
}

fn worker_lost(
 ctx: &mut SessionContext,
 worker: WorkerId,
 now_ms: u64,
 effects: &mut Vec<Effect>,
) -> Result<(), EngineError> {
 if ctx.session.assigned_worker != Some(worker) {
 return Ok(());
 }
 let reassigned_step_index = ctx.session.current_step_index;
 emit(ctx, incident_core::EventKind::WorkerLost { worker, reassigned_step_index }, now_ms, effects);
 pause(ctx, PauseReason::WorkerLost, now_ms, effects);
 Ok(())
}

fn cancel(
 ctx: &mut SessionContext,
 operator: String,
 reason: String,
 now_ms: u64,
 effects: &mut Vec<Effect>,
) -> Result<(), EngineError> {
 for (index, approval) in ctx.approvals.drain() {
 let _ = approval;
 effects.push(Effect::CancelTimer { id: TimerId::approval_sla(ctx.session.id, index) });
 }
 if let Some(index) = ctx.session.current_step_index {
 if let Some(step) = ctx.steps.get_mut(index) {
 if matches!(step.status, StepStatus::Pending | StepStatus::AwaitingApproval) {
 step.status = StepStatus::Skipped;
 }
 if matches!(step.status, StepStatus::Dispatched | StepStatus::Running) {
 if let Some(worker) = step.assigned_worker {
 effects.push(Effect::DispatchCommand {
 session_id: ctx.session.id,
 step_index: index,
 worker,
 command: String::new(),
 connector: "cancel".to_string(),
 timeout_seconds: 0,
 blast_radius: BlastRadius::Low,
 step_marked_destructive: false,
 requires_shell: false,
 approved_by_admin: false,
 });
 }
 }
 }
 }
 ctx.session.status = SessionStatus::Cancelled;
 ctx.session.updated_at_ms = now_ms;
 emit(
 ctx,
 incident_core::EventKind::SessionCancelled { operator: operator.clone(), reason: reason.clone() },
 now_ms,
 effects,
 );
 let _ = begin_rollback_if_any(ctx, now_ms, effects);
 Ok(())
}

/// Entered when the current step is terminally `Failed` (step
/// 4). Starts iterating prior completed steps in reverse for any with a
/// rollback command.
fn begin_rollback(
 ctx: &mut SessionContext,
 failed_step_index: usize,
 now_ms: u64,
 effects: &mut Vec<Effect>,
) -> Result<(), EngineError> {
 ctx.session.status = SessionStatus::RollingBack;
 ctx.session.updated_at_ms = now_ms;
 emit(ctx, incident_core::EventKind::RollbackStarted { failed_step_index }, now_ms, effects);
 advance_rollback(ctx, now_ms, effects)
}

fn begin_rollback_if_any(
 ctx: &mut SessionContext,
 now_ms: u64,
 effects: &mut Vec<Effect>,
) -> Result<(), EngineError> {
 let has_candidate = rollback_candidate(ctx).is_some();
 if !has_candidate {
 return Ok(());
 }
 let failed_step_index = ctx.session.current_step_index.unwrap_or(0);
 ctx.session.status = SessionStatus::RollingBack;
 emit(ctx, incident_core::EventKind::RollbackStarted { failed_step_index }, now_ms, effects);
 advance_rollback(ctx, now_ms, effects)
}

fn rollback_candidate(ctx: &SessionContext) -> Option<usize> {
 ctx.steps
 .iter()
 .enumerate()
 .rev()
 .find(|(_, step)| {
 step.status == StepStatus::Completed
 && matches!(
 ctx.runbook.step(step.index),
 Some(StepDefinition::Command(c)) if c.rollback_command_template.is_some()
 )
 })
 .map(|(i, _)| i)
}

fn advance_rollback(ctx: &mut SessionContext, now_ms: u64, effects: &mut Vec<Effect>) -> Result<(), EngineError> {
 let Some(index) = rollback_candidate(ctx) else {
 ctx.session.status = SessionStatus::Failed;
 ctx.session.updated_at_ms = now_ms;
 emit(
 ctx,
 incident_core::EventKind::SessionFailed { reason: "rollback complete".to_string() },
 now_ms,
 effects,
 );
 return Ok(());
 };

 let Some(StepDefinition::Command(cmd)) = ctx.runbook.step(index) else {
 unreachable_no_rollback(ctx, index);
 return Ok(());
 };
 let Some(template) = cmd.rollback_command_template.clone() else {
 unreachable_no_rollback(ctx, index);
 return Ok(());
 };
 let Some(worker) = ctx.steps[index].assigned_worker else {
 // No worker recorded for this step; mark it rolled back with no
 // effect so the loop can make progress rather than stall forever.
 ctx.steps[index].status = StepStatus::RolledBack;
 return Ok(());
 };
 let command = bind_command(&template, &ctx.session.inputs);
 let blast_radius = cmd.blast_radius;
 let connector = cmd.connector.clone();
 let timeout_seconds = cmd.timeout_seconds;
 let requires_shell = cmd.requires_shell;
 effects.push(Effect::DispatchCommand {
 session_id: ctx.session.id,
 step_index: index,
 worker,
 command,
 connector,
 timeout_seconds,
 blast_radius,
 step_marked_destructive: blast_radius == BlastRadius::Destructive,
 requires_shell,
 approved_by_admin: ctx.steps[index].approved_by.is_some(),
 });
 Ok(())
}

fn unreachable_no_rollback(ctx: &mut SessionContext, index: usize) {
 // `rollback_candidate` only selects steps whose runbook step carries a
 // rollback template, so reaching here means the runbook shape changed
 // mid-session; sessions are bound to a fixed runbook version, so this
 // should not occur.
 ctx.steps[index].status = StepStatus::RolledBack;
}

fn record_rollback_result(
 ctx: &mut SessionContext,
 step_index: usize,
 result: ExecutionResult,
 now_ms: u64,
 effects: &mut Vec<Effect>,
) -> Result<(), EngineError> {
 let step =
 ctx.steps.get_mut(step_index).ok_or(EngineError::NoSuchStep(ctx.session.id, step_index))?;
 step.rollback_result = Some(result.clone());
 step.rollback_executed = result.success;
 step.status = StepStatus::RolledBack;

 if result.success {
 emit(ctx, incident_core::EventKind::RollbackStepCompleted { step_index }, now_ms, effects);
 } else {
 emit(
 ctx,
 incident_core::EventKind::RollbackStepFailed { step_index, error: result.stderr_excerpt.clone() },
 now_ms,
 effects,
 );
 }
 // Rollback continues even if this step's rollback failed.
 advance_rollback(ctx, now_ms, effects)
}

#[cfg(test)]
#[path = "statemachine_tests.rs"]
mod tests;
