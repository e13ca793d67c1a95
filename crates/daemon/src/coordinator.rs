// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! TenantRuntime + Coordinator: the executor side of the Session State
//! Machine's `(state, Command) -> Vec<Effect>` contract. `incident-engine`
//! never performs I/O; every `Effect` it returns is carried out here against
//! the WAL, the audit log, the timer wheel, and the worker wire connection.
//!
//! A tenant's whole runtime is serialized behind one `tokio::sync::Mutex`
//! (single-writer-per-tenant, stronger than strictly per-session but far
//! simpler to reason about) rather than one lock per session, matching
//! the way `incident_storage::TenantStore` already assumes one handle per
//! tenant with no concurrent callers.

use crate::env;
use crate::error::DaemonError;
use crate::registry::{ConnectionRegistry, RunbookRegistry, WorkerRegistry};
use crate::timers::TimerWheel;
use incident_core::{
 ApprovalTask, Clock, Effect, EventId, EventKind, ExecutionEvent, ExecutionResult, ExecutionStep, FailureKind,
 IdempotencyKey, OrchestratorConfig, OutputChannel, SessionId, SessionStatus, TenantId, Ticket, TimerKind,
 ValidationMode, WorkerId,
};
use incident_engine::{statemachine, Command, SessionContext};
use incident_storage::audit::AuditLog;
use incident_storage::snapshot;
use incident_storage::wal::Wal;
use incident_storage::TenantStore;
use incident_wire::{DaemonMessage, WorkerMessage};
use parking_lot::Mutex as SyncMutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};

/// Per-session facts the pure engine types have no room for: the ticket
/// signals used to resolve an `InfrastructureConnection` at dispatch time,
/// and the approval SLA fixed once at session creation (ties
/// the SLA to the ticket's severity, not to whatever config is live on a
/// later tick).
#[derive(Debug, Clone, Default)]
pub struct SessionMeta {
 pub ci_hint: Option<String>,
 pub service: Option<String>,
 pub environment: Option<String>,
 pub approval_sla_ms: u64,
}

impl SessionMeta {
 fn from_ticket(ticket: &Ticket, approval_sla_ms: u64) -> Self {
 Self {
 ci_hint: ticket.signals.get("ci_hint").cloned(),
 service: ticket.signals.get("service").cloned(),
 environment: ticket.signals.get("environment").cloned(),
 approval_sla_ms,
 }
 }
}

/// One tenant's durable state plus the dispatch metadata the Session State
/// Machine doesn't own: pending `ApprovalTask`s (keyed by session, then step)
/// and each session's `SessionMeta`.
pub struct TenantRuntime {
 pub tenant_id: TenantId,
 pub store: TenantStore,
 pub wal: Wal,
 pub audit: AuditLog,
 approvals: HashMap<SessionId, HashMap<usize, ApprovalTask>>,
 session_meta: HashMap<SessionId, SessionMeta>,
 events_since_snapshot: u64,
 snapshot_path: PathBuf,
}

impl TenantRuntime {
 /// Open (or create) a tenant's on-disk state. Loads the newest snapshot
 /// if one exists, then replays the WAL tail written since it. A tenant
 /// with no snapshot yet (never having reached `env::snapshot_every_n_events`
 /// live events) replays its whole WAL. A fold failure during replay is
 /// logged and skipped rather than aborting startup, on the assumption
 /// that a single malformed historical event shouldn't take the whole
 /// tenant offline.
 pub fn open(tenant_id: TenantId, state_dir: &Path) -> Result<Self, DaemonError> {
 let tenant_dir = state_dir.join(tenant_id.to_string());
 std::fs::create_dir_all(&tenant_dir)
 .map_err(|source| DaemonError::Wal(incident_storage::WalError::Open { path: tenant_dir.clone(), source }))?;
 let wal_path = tenant_dir.join("events.wal");
 let snapshot_path = tenant_dir.join("snapshot.zst");
 let audit_path = tenant_dir.join("audit.log");

 let mut store = TenantStore::new(tenant_id);
 let mut up_to_seq = 0;
 if let Some((seq, state)) = snapshot::read_snapshot(&snapshot_path)? {
 store.load_materialized_state(state);
 up_to_seq = seq;
 }

 let mut wal = Wal::open(&wal_path, up_to_seq)?;
 while let Some(entry) = wal.next_unprocessed()? {
 if entry.seq > up_to_seq {
 if let Err(err) = store.apply_event(&entry.event) {
 tracing::warn!(
 %err,
 wal_seq = entry.seq,
 "WAL-tail replay could not fold event into the loaded snapshot, skipping"
 );
 }
 }
 wal.mark_processed(entry.seq);
 }

 let audit = AuditLog::open(&audit_path)?;

 Ok(Self {
 tenant_id,
 store,
 wal,
 audit,
 approvals: HashMap::new(),
 session_meta: HashMap::new(),
 events_since_snapshot: 0,
 snapshot_path,
 })
 }

 fn set_session_meta(&mut self, session_id: SessionId, meta: SessionMeta) {
 self.session_meta.insert(session_id, meta);
 }

 pub fn session_meta(&self, session_id: SessionId) -> Option<SessionMeta> {
 self.session_meta.get(&session_id).cloned()
 }

 fn approvals_for(&mut self, session_id: SessionId) -> &mut HashMap<usize, ApprovalTask> {
 self.approvals.entry(session_id).or_default()
 }

 fn maybe_snapshot(&mut self) -> Result<(), DaemonError> {
 self.events_since_snapshot += 1;
 if self.events_since_snapshot >= env::snapshot_every_n_events() {
 snapshot::write_snapshot(&self.snapshot_path, self.wal.write_seq(), self.store.materialized_state())?;
 self.events_since_snapshot = 0;
 }
 Ok(())
 }
}

/// Entries worth a hash-chained audit record in addition to the
/// `ExecutionEvent` they already produced: approvals, cancellations, and
/// the facts an incident post-mortem is most likely to ask for.
fn audit_entry_for(kind: &EventKind, session_id: SessionId) -> Option<(String, String, String)> {
 match kind {
 EventKind::ApprovalDecided { step_index, decision } => Some((
 format!("operator:{}", decision.operator),
 "approval_decided".to_string(),
 format!("session {session_id} step {step_index}: {}", decision.kind),
 )),
 EventKind::ApprovalExpired { step_index } => Some((
 "system:approval_sla".to_string(),
 "approval_expired".to_string(),
 format!("session {session_id} step {step_index}"),
 )),
 EventKind::SessionCancelled { operator, reason } => Some((
 format!("operator:{operator}"),
 "session_cancelled".to_string(),
 format!("session {session_id}: {reason}"),
 )),
 EventKind::WorkerLost { worker, .. } => Some((
 "system:heartbeat_sweep".to_string(),
 "worker_lost".to_string(),
 format!("session {session_id} worker {worker}"),
 )),
 EventKind::SessionCompleted => {
 Some(("system:engine".to_string(), "session_completed".to_string(), session_id.to_string()))
 }
 EventKind::SessionFailed { reason } => Some((
 "system:engine".to_string(),
 "session_failed".to_string(),
 format!("session {session_id}: {reason}"),
 )),
 _ => None,
 }
}

/// Coordinates every tenant's Session State Machine, the live worker pool,
/// and the timer wheel. One per daemon process.
pub struct Coordinator<C: Clock> {
 pub config: OrchestratorConfig,
 pub clock: C,
 tenants: SyncMutex<HashMap<TenantId, Arc<Mutex<TenantRuntime>>>>,
 pub runbooks: RunbookRegistry,
 pub connections: ConnectionRegistry,
 pub workers: WorkerRegistry,
 pub timers: TimerWheel,
 /// Every session's owning tenant. Neither `SessionId` nor `TimerId`
 /// encode a tenant, so this is the only way a fired timer or an inbound
 /// worker message addressed only by `session_id` gets routed to the
 /// right `TenantRuntime`.
 session_tenant: SyncMutex<HashMap<SessionId, TenantId>>,
 pub events: broadcast::Sender<ExecutionEvent>,
}

impl<C: Clock> Coordinator<C> {
 pub fn new(config: OrchestratorConfig, clock: C) -> Self {
 let (events, _rx) = broadcast::channel(1024);
 Self {
 config,
 clock,
 tenants: SyncMutex::new(HashMap::new()),
 runbooks: RunbookRegistry::new(),
 connections: ConnectionRegistry::new(),
 workers: WorkerRegistry::new(),
 timers: TimerWheel::new(),
 session_tenant: SyncMutex::new(HashMap::new()),
 events,
 }
 }

 #[allow(clippy::expect_used)]
 async fn tenant(&self, tenant_id: TenantId) -> Result<Arc<Mutex<TenantRuntime>>, DaemonError> {
 if let Some(rt) = self.tenants.lock().get(&tenant_id) {
 return Ok(rt.clone());
 }
 let runtime = TenantRuntime::open(tenant_id, &self.config.state_dir)?;
 let handle = Arc::new(Mutex::new(runtime));
 self.tenants.lock().entry(tenant_id).or_insert_with(|| handle.clone());
 Ok(self.tenants.lock().get(&tenant_id).expect("just inserted").clone())
 }

 /// Run a read-only closure against a tenant's runtime without exposing
 /// the lock or the `TenantRuntime` type to callers outside this module.
 pub async fn with_tenant<R>(&self, tenant_id: TenantId, f: impl FnOnce(&TenantRuntime) -> R) -> Result<R, DaemonError> {
 let rt = self.tenant(tenant_id).await?;
 let guard = rt.lock().await;
 Ok(f(&guard))
 }

 fn tenant_of(&self, session_id: SessionId) -> Result<TenantId, DaemonError> {
 self.session_tenant.lock().get(&session_id).copied().ok_or(DaemonError::UnroutableSession(session_id))
 }

 /// Bind a runbook to a ticket and register the new session, then issue
 /// the first `Advance` so it starts making progress immediately instead
 /// of waiting for the next worker-pick tick.
 pub async fn create_session(
 &self,
 tenant_id: TenantId,
 ticket: &Ticket,
 runbook: &incident_core::RunbookSpec,
 mode: ValidationMode,
 inputs: std::collections::BTreeMap<String, String>,
 idempotency_key: Option<IdempotencyKey>,
 ) -> Result<SessionId, DaemonError> {
 let now_ms = self.clock.epoch_ms();
 let (session, steps, effects) =
 statemachine::create_session(tenant_id, ticket.id, runbook, mode, inputs, idempotency_key, now_ms)?;
 let session_id = session.id;
 let approval_sla_ms = self.config.approval_sla_secs_for(&ticket.severity.to_string()) * 1_000;

 let rt = self.tenant(tenant_id).await?;
 {
 let mut guard = rt.lock().await;
 guard.store.create_session(session, steps.clone())?;
 guard.set_session_meta(session_id, SessionMeta::from_ticket(ticket, approval_sla_ms));
 self.session_tenant.lock().insert(session_id, tenant_id);
 self.apply_effects(&mut guard, tenant_id, session_id, &steps, effects).await?;
 }
 self.dispatch_command(tenant_id, session_id, Command::Advance { candidate_worker: None }).await?;
 Ok(session_id)
 }

 /// The only entry point into a tenant's sessions after creation: run one
 /// `Command` through `incident_engine::transition` and execute the
 /// `Effect`s it returns. Never call `transition` directly outside this
 /// module (, single writer per tenant).
 pub async fn dispatch_command(
 &self,
 tenant_id: TenantId,
 session_id: SessionId,
 command: Command,
 ) -> Result<(), DaemonError> {
 let rt = self.tenant(tenant_id).await?;
 let mut guard = rt.lock().await;
 let now_ms = self.clock.epoch_ms();

 let mut session = guard.store.session(session_id)?.clone();
 let mut steps = guard.store.steps(session_id)?.to_vec();
 let runbook = self
 .runbooks
 .get_version(session.runbook_id, session.runbook_version)
 .ok_or(DaemonError::UnknownRunbook(session.runbook_id))?;
 let approval_sla_ms = guard.session_meta(session_id).map(|m| m.approval_sla_ms).unwrap_or(1_800_000);

 let effects = {
 let approvals = guard.approvals_for(session_id);
 let mut ctx = SessionContext { session: &mut session, steps: &mut steps, runbook: &runbook, approvals };
 statemachine::transition(&mut ctx, command, now_ms, approval_sla_ms)?
 };

 guard.store.put_session(session)?;
 for step in &steps {
 guard.store.put_step(session_id, step.clone())?;
 }

 self.apply_effects(&mut guard, tenant_id, session_id, &steps, effects).await?;
 Ok(())
 }

 async fn apply_effects(
 &self,
 rt: &mut TenantRuntime,
 tenant_id: TenantId,
 session_id: SessionId,
 steps: &[ExecutionStep],
 effects: Vec<Effect>,
 ) -> Result<(), DaemonError> {
 for effect in effects {
 match effect {
 Effect::EmitEvent(event) => {
 rt.wal.append(&event)?;
 rt.wal.flush()?;
 if let Some((actor, action, detail)) = audit_entry_for(&event.kind, session_id) {
 rt.audit.append(actor, action, detail, event.recorded_at_ms)?;
 }
 let _ = self.events.send((*event).clone());
 rt.maybe_snapshot()?;
 }
 Effect::DispatchCommand {
 session_id,
 step_index,
 worker,
 command,
 connector,
 timeout_seconds,
 blast_radius,
 step_marked_destructive,
 requires_shell,
 approved_by_admin,
 } => {
 self.dispatch_to_worker(
 rt,
 tenant_id,
 session_id,
 step_index,
 worker,
 command,
 connector,
 timeout_seconds,
 blast_radius,
 step_marked_destructive,
 requires_shell,
 approved_by_admin,
 steps,
 )
 .await?;
 }
 Effect::FetchCredential { .. } | Effect::ReleaseCredential { .. } => {
 // `statemachine::transition` never emits either today:
 // credential resolution happens worker-side, against
 // the `credential_ref` already carried on
 // `DaemonMessage::SessionCommand`. Logged rather than
 // silently ignored so a future engine change that does
 // start emitting one is noticed in practice.
 tracing::debug!(%session_id, "credential effect reached the coordinator unexpectedly");
 }
 Effect::SetTimer { id, fire_at_ms } => self.timers.set(id, session_id, fire_at_ms),
 Effect::CancelTimer { id } => self.timers.cancel(id),
 Effect::UpdateTicketStatus { session_id, status, note } => {
 tracing::info!(
 %session_id,
 %status,
 note = note.as_deref().unwrap_or(""),
 "ticket status update (no ticketing adapter configured)"
 );
 }
 Effect::Notify { message } => tracing::info!(%message, "notification"),
 }
 }
 Ok(())
 }

 #[allow(clippy::too_many_arguments)]
 #[allow(clippy::expect_used)]
 async fn dispatch_to_worker(
 &self,
 rt: &mut TenantRuntime,
 tenant_id: TenantId,
 session_id: SessionId,
 step_index: usize,
 worker: WorkerId,
 command: String,
 connector: String,
 timeout_seconds: u32,
 blast_radius: incident_core::BlastRadius,
 step_marked_destructive: bool,
 requires_shell: bool,
 approved_by_admin: bool,
 steps: &[ExecutionStep],
 ) -> Result<(), DaemonError> {
 if connector == "cancel" {
 self.workers.send(worker, DaemonMessage::Cancel { session_id, step_index }).await;
 return Ok(());
 }
 let meta = rt.session_meta(session_id).unwrap_or_default();
 let connection = self
 .connections
 .resolve(tenant_id, &connector, meta.ci_hint.as_deref(), meta.service.as_deref(), meta.environment.as_deref())
 .ok_or(DaemonError::NoConnection)?;
 let attempt = steps.get(step_index).map(|s| s.attempt).unwrap_or(1);
 let idempotency_key = IdempotencyKey::new(format!("dispatch:{session_id}:{step_index}:{attempt}"))
 .expect("generated idempotency key is always well under the length cap");

 self.workers.mark_busy(worker, session_id, step_index);
 let delivered = self
 .workers
 .send(
 worker,
 DaemonMessage::SessionCommand {
 session_id,
 step_index,
 attempt,
 idempotency_key,
 connector_kind: connector,
 target: connection.target,
 environment: connection.environment,
 command,
 timeout_seconds,
 dry_run: false,
 credential_ref: connection.credential_ref,
 blast_radius,
 step_marked_destructive,
 requires_shell,
 approved_by_admin,
 },
 )
 .await;
 if !delivered {
 self.workers.mark_idle(worker);
 tracing::warn!(%worker, %session_id, step_index, "dispatch failed, worker channel closed; deferring to the heartbeat sweep");
 }
 Ok(())
 }

 /// Route one inbound worker message. `Register`/`Heartbeat` are handled
 /// directly by the listener against `WorkerRegistry` (it owns the
 /// per-connection channel this registry needs, which this coordinator
 /// method has no access to); every session-scoped variant lands here.
 pub async fn handle_worker_message(&self, msg: WorkerMessage) -> Result<(), DaemonError> {
 match msg {
 WorkerMessage::Register { .. } | WorkerMessage::Heartbeat { .. } => Ok(()),
 WorkerMessage::Ack { session_id, step_index } => {
 tracing::debug!(%session_id, step_index, "worker acknowledged claim");
 Ok(())
 }
 WorkerMessage::Nak { session_id, step_index, reason } => {
 let tenant_id = self.tenant_of(session_id)?;
 let worker = self
 .step_assigned_worker(tenant_id, session_id, step_index)
 .await
 .ok_or(DaemonError::UnroutableSession(session_id))?;
 self.dispatch_command(tenant_id, session_id, Command::PolicyDenied { worker, step_index, reason }).await
 }
 WorkerMessage::StepOutput { session_id, step_index, chunk_seq, channel, data } => {
 let tenant_id = self.tenant_of(session_id)?;
 self.emit_step_output(tenant_id, session_id, step_index, chunk_seq, channel, data).await
 }
 WorkerMessage::SessionResult { session_id, step_index, idempotency_key, result } => {
 let tenant_id = self.tenant_of(session_id)?;
 let worker = self
 .step_assigned_worker(tenant_id, session_id, step_index)
 .await
 .ok_or(DaemonError::UnroutableSession(session_id))?;
 self.workers.mark_idle(worker);
 let command = if self.session_is_rolling_back(tenant_id, session_id).await {
 Command::RecordRollbackResult { step_index, result }
 } else {
 Command::RecordStepResult { worker, step_index, idempotency_key, result }
 };
 self.dispatch_command(tenant_id, session_id, command).await
 }
 }
 }

 async fn step_assigned_worker(&self, tenant_id: TenantId, session_id: SessionId, step_index: usize) -> Option<WorkerId> {
 let rt = self.tenant(tenant_id).await.ok()?;
 let guard = rt.lock().await;
 guard.store.step(session_id, step_index).ok()?.assigned_worker
 }

 async fn session_is_rolling_back(&self, tenant_id: TenantId, session_id: SessionId) -> bool {
 let Ok(rt) = self.tenant(tenant_id).await else { return false };
 let guard = rt.lock().await;
 guard.store.session(session_id).map(|s| s.status == SessionStatus::RollingBack).unwrap_or(false)
 }

 /// `StepOutput` is never folded by the Session State Machine (it carries
 /// no decision-relevant fact); the coordinator appends and fans it out
 /// directly rather than round-tripping it through `transition`.
 async fn emit_step_output(
 &self,
 tenant_id: TenantId,
 session_id: SessionId,
 step_index: usize,
 chunk_seq: u64,
 channel: OutputChannel,
 data: String,
 ) -> Result<(), DaemonError> {
 let rt = self.tenant(tenant_id).await?;
 let mut guard = rt.lock().await;
 let now_ms = self.clock.epoch_ms();
 let mut session = guard.store.session(session_id)?.clone();
 session.last_event_seq += 1;
 let event = ExecutionEvent {
 id: EventId::new(),
 tenant_id,
 session_id,
 seq: session.last_event_seq,
 kind: EventKind::StepOutput { step_index, chunk_seq, channel, data },
 recorded_at_ms: now_ms,
 };
 guard.store.put_session(session)?;
 guard.wal.append(&event)?;
 guard.wal.flush()?;
 let _ = self.events.send(event);
 guard.maybe_snapshot()?;
 Ok(())
 }

 /// Translate every timer the wheel reports due into the `Command` it
 /// represents and run it. Called once per lifecycle tick.
 #[allow(clippy::expect_used)]
 pub async fn run_due_timers(&self, now_ms: u64) {
 for (session_id, timer_id) in self.timers.due(now_ms) {
 let Ok(tenant_id) = self.tenant_of(session_id) else {
 tracing::warn!(%session_id, %timer_id, "fired timer for a session with no known tenant");
 continue;
 };
 let Some(kind) = timer_id.kind() else { continue };
 let command = match kind {
 TimerKind::ApprovalSla { step_index, .. } => Command::ApprovalSlaExpired { step_index },
 TimerKind::StepTimeout { step_index, attempt, .. } => {
 let Some(worker) = self.step_assigned_worker(tenant_id, session_id, step_index).await else {
 continue;
 };
 let key = IdempotencyKey::new(format!("timeout:{session_id}:{step_index}:{attempt}"))
 .expect("generated idempotency key is always well under the length cap");
 Command::RecordStepResult {
 worker,
 step_index,
 idempotency_key: key,
 result: ExecutionResult::failed(FailureKind::Timeout, "step timeout fired", 0),
 }
 }
 TimerKind::WorkerHeartbeat { .. } => {
 // Never armed by this coordinator; a fired one would mean a
 // stale wire format or a future code path that needs this
 // arm filled in.
 tracing::warn!(%timer_id, "unexpected worker-heartbeat timer fired");
 continue;
 }
 };
 if let Err(err) = self.dispatch_command(tenant_id, session_id, command).await {
 tracing::warn!(%session_id, %err, "timer-triggered command failed");
 }
 }
 }

 /// Sweep workers past their heartbeat deadline and pause whatever
 /// session each was mid-dispatching (worker-heartbeat-loss
 /// scenario). Called on the same tick as `run_due_timers`, not via a
 /// scheduled per-worker timer.
 pub async fn sweep_lost_workers(&self, now_ms: u64, timeout_ms: u64) {
 for worker_id in self.workers.sweep_lost(now_ms, timeout_ms) {
 let Some(worker) = self.workers.get(worker_id) else { continue };
 let Some((session_id, _)) = worker.current_assignment else { continue };
 let Ok(tenant_id) = self.tenant_of(session_id) else { continue };
 if let Err(err) = self.dispatch_command(tenant_id, session_id, Command::WorkerLost { worker: worker_id }).await {
 tracing::warn!(%session_id, %err, "worker-lost command failed");
 }
 }
 }

 pub fn register_session_tenant(&self, session_id: SessionId, tenant_id: TenantId) {
 self.session_tenant.lock().insert(session_id, tenant_id);
 }

 /// The tenant a session belongs to, for API handlers that only have a
 /// `SessionId` off the request path. `None` for a session this daemon
 /// process has never seen: unknown id, or a tenant never opened since
 /// restart.
 pub fn tenant_of_session(&self, session_id: SessionId) -> Option<TenantId> {
 self.session_tenant.lock().get(&session_id).copied()
 }

 /// Path to a tenant's event WAL, for the `GET .../events?since=` replay
 /// handler, which reads directly off disk rather than through
 /// `with_tenant` (it needs every entry, not just the materialized state).
 pub fn wal_path(&self, tenant_id: TenantId) -> PathBuf {
 self.config.state_dir.join(tenant_id.to_string()).join("events.wal")
 }
}
