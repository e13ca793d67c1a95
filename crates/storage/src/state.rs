// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! MaterializedState: the per-tenant read model the Session State Machine
//! writes through and every reader (operator REST/WS, metrics, CLI) reads
//! snapshots of. `TenantStore` is the only handle that can reach it, and a
//! `TenantStore` is permanently bound to one `TenantId` at construction —
//! there is no method on this module that can be called without a tenant
//! context, and no method takes a second tenant id to compare against (the
//! "storage layer, not application code alone" enforcement point in
//!).

use incident_core::{
 EventKind, ExecutionEvent, ExecutionSession, ExecutionStep, IdempotencyKey, SessionId, SessionStatus,
 StepStatus, TenantId,
};
use std::collections::HashMap;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
 #[error("session {0} not found")]
 SessionNotFound(SessionId),
 #[error("step {0}/{1} not found")]
 StepNotFound(SessionId, usize),
 #[error("idempotency key already bound to session {0}")]
 IdempotencyCollision(SessionId),
 #[error("event for session {event_tenant} rejected: store is scoped to tenant {store_tenant}")]
 TenantMismatch { store_tenant: TenantId, event_tenant: TenantId },
 #[error("event seq {got} is not contiguous with last applied seq {expected}")]
 NonContiguousSeq { expected: u64, got: u64 },
}

/// In-memory, per-tenant fold of every live `ExecutionSession` and its
/// `ExecutionStep`s. Full records are adopted at creation time (via
/// [`MaterializedState::adopt_session`]) since `ExecutionEvent` payloads
/// alone don't carry enough to reconstruct a session from nothing — on
/// restart the daemon loads the latest [`crate::snapshot`] first and only
/// then replays the WAL tail through [`MaterializedState::apply_event`]
/// for the deltas since that snapshot.
#[derive(Debug, Default, Clone, serde::Serialize, serde::Deserialize)]
pub struct MaterializedState {
 sessions: HashMap<SessionId, ExecutionSession>,
 steps: HashMap<SessionId, Vec<ExecutionStep>>,
 idempotency_index: HashMap<IdempotencyKey, SessionId>,
 last_applied_seq: HashMap<SessionId, u64>,
}

impl MaterializedState {
 pub fn new() -> Self {
 Self::default()
 }

 pub fn adopt_session(&mut self, session: ExecutionSession, steps: Vec<ExecutionStep>) {
 if let Some(key) = session.idempotency_key.clone() {
 self.idempotency_index.insert(key, session.id);
 }
 self.steps.insert(session.id, steps);
 self.sessions.insert(session.id, session);
 }

 pub fn session(&self, id: SessionId) -> Option<&ExecutionSession> {
 self.sessions.get(&id)
 }

 pub fn steps(&self, id: SessionId) -> Option<&[ExecutionStep]> {
 self.steps.get(&id).map(|v| v.as_slice())
 }

 pub fn sessions(&self) -> impl Iterator<Item = &ExecutionSession> {
 self.sessions.values()
 }

 pub fn active_session_count(&self) -> usize {
 self.sessions.values().filter(|s| s.is_active()).count()
 }

 pub fn session_by_idempotency_key(&self, key: &IdempotencyKey) -> Option<SessionId> {
 self.idempotency_index.get(key).copied()
 }

 /// Overwrite the session record after the state machine computes a new
 /// one. The session id is immutable so this can never change which
 /// session a given idempotency key indexes to.
 pub fn put_session(&mut self, session: ExecutionSession) {
 self.sessions.insert(session.id, session);
 }

 pub fn put_step(&mut self, session_id: SessionId, step: ExecutionStep) {
 let steps = self.steps.entry(session_id).or_default();
 if let Some(slot) = steps.get_mut(step.index) {
 *slot = step;
 } else {
 steps.push(step);
 }
 }

 /// Fold one `ExecutionEvent` into the already-adopted session/step
 /// record. Requires the session to already be present (via
 /// `adopt_session`, either from the initial creation or from a loaded
 /// snapshot); used during WAL-tail replay on daemon restart.
 pub fn apply_event(&mut self, event: &ExecutionEvent) -> Result<(), StorageError> {
 let last = self.last_applied_seq.get(&event.session_id).copied().unwrap_or(0);
 if event.seq != last + 1 {
 return Err(StorageError::NonContiguousSeq { expected: last + 1, got: event.seq });
 }
 self.last_applied_seq.insert(event.session_id, event.seq);

 let Some(session) = self.sessions.get_mut(&event.session_id) else {
 // A session-creation event for a session this process hasn't
 // adopted yet (e.g. the snapshot predates it); nothing to fold
 // against until `adopt_session` runs.
 return Ok(());
 };
 session.last_event_seq = event.seq;

 match &event.kind {
 EventKind::SessionCreated { .. } => {}
 EventKind::SessionAssigned { worker } => session.assigned_worker = Some(*worker),
 EventKind::StepDispatched { step_index, .. } => {
 session.status = SessionStatus::Running;
 session.current_step_index = Some(*step_index);
 self.set_step_status(event.session_id, *step_index, StepStatus::Running);
 }
 EventKind::StepOutput { .. } => {}
 EventKind::Warning { .. } => {}
 EventKind::StepCompleted { step_index, result } => {
 self.set_step_result(event.session_id, *step_index, result.clone(), StepStatus::Completed);
 }
 EventKind::StepFailed { step_index, result } => {
 self.set_step_result(event.session_id, *step_index, result.clone(), StepStatus::Failed);
 }
 EventKind::StepRetrying { step_index, .. } => {
 self.set_step_status(event.session_id, *step_index, StepStatus::Dispatched);
 }
 EventKind::ApprovalRequested { step_index } => {
 session.status = SessionStatus::AwaitingApproval;
 self.set_step_status(event.session_id, *step_index, StepStatus::AwaitingApproval);
 }
 EventKind::ApprovalDecided { step_index, decision } => {
 if decision.kind == incident_core::DecisionKind::Approve {
 self.set_step_status(event.session_id, *step_index, StepStatus::Pending);
 } else {
 self.set_step_status(event.session_id, *step_index, StepStatus::Skipped);
 }
 }
 EventKind::ApprovalExpired { .. } => {
 session.status = SessionStatus::Paused;
 session.pause_reason = Some(incident_core::PauseReason::ApprovalRejected);
 }
 EventKind::ManualStepAcknowledged { step_index, .. } => {
 self.set_step_status(event.session_id, *step_index, StepStatus::Completed);
 }
 EventKind::RollbackStarted { .. } => session.status = SessionStatus::RollingBack,
 EventKind::RollbackStepCompleted { step_index } => {
 self.mark_rollback(event.session_id, *step_index, true);
 }
 EventKind::RollbackStepFailed { step_index, .. } => {
 self.mark_rollback(event.session_id, *step_index, false);
 }
 EventKind::SessionCompleted => session.status = SessionStatus::Completed,
 EventKind::SessionFailed { .. } => session.status = SessionStatus::Failed,
 EventKind::SessionCancelled { .. } => session.status = SessionStatus::Cancelled,
 EventKind::SessionPaused { reason } => {
 session.status = SessionStatus::Paused;
 session.pause_reason = Some(*reason);
 }
 EventKind::WorkerLost { .. } => {
 session.status = SessionStatus::Paused;
 session.pause_reason = Some(incident_core::PauseReason::WorkerLost);
 }
 }
 Ok(())
 }

 fn set_step_status(&mut self, session_id: SessionId, index: usize, status: StepStatus) {
 if let Some(step) = self.steps.get_mut(&session_id).and_then(|s| s.get_mut(index)) {
 step.status = status;
 }
 }

 fn set_step_result(
 &mut self,
 session_id: SessionId,
 index: usize,
 result: incident_core::ExecutionResult,
 status: StepStatus,
 ) {
 if let Some(step) = self.steps.get_mut(&session_id).and_then(|s| s.get_mut(index)) {
 step.status = status;
 step.result = Some(result);
 }
 }

 fn mark_rollback(&mut self, session_id: SessionId, index: usize, succeeded: bool) {
 if let Some(step) = self.steps.get_mut(&session_id).and_then(|s| s.get_mut(index)) {
 step.rollback_executed = succeeded;
 if succeeded {
 step.status = StepStatus::RolledBack;
 }
 }
 }
}

/// A handle permanently scoped to one tenant. Every method implicitly
/// filters to `tenant_id`; there is no way to ask it about another
/// tenant's data.
pub struct TenantStore {
 tenant_id: TenantId,
 state: MaterializedState,
}

impl TenantStore {
 pub fn new(tenant_id: TenantId) -> Self {
 Self { tenant_id, state: MaterializedState::new() }
 }

 pub fn tenant_id(&self) -> TenantId {
 self.tenant_id
 }

 fn check_tenant(&self, session: &ExecutionSession) -> Result<(), StorageError> {
 if session.tenant_id != self.tenant_id {
 return Err(StorageError::TenantMismatch { store_tenant: self.tenant_id, event_tenant: session.tenant_id });
 }
 Ok(())
 }

 pub fn create_session(
 &mut self,
 session: ExecutionSession,
 steps: Vec<ExecutionStep>,
 ) -> Result<(), StorageError> {
 self.check_tenant(&session)?;
 if let Some(key) = &session.idempotency_key {
 if let Some(existing) = self.state.session_by_idempotency_key(key) {
 return Err(StorageError::IdempotencyCollision(existing));
 }
 }
 self.state.adopt_session(session, steps);
 Ok(())
 }

 pub fn session(&self, id: SessionId) -> Result<&ExecutionSession, StorageError> {
 self.state.session(id).ok_or(StorageError::SessionNotFound(id))
 }

 pub fn steps(&self, id: SessionId) -> Result<&[ExecutionStep], StorageError> {
 self.state.steps(id).ok_or(StorageError::SessionNotFound(id))
 }

 pub fn step(&self, id: SessionId, index: usize) -> Result<&ExecutionStep, StorageError> {
 self.steps(id)?.get(index).ok_or(StorageError::StepNotFound(id, index))
 }

 pub fn sessions(&self) -> impl Iterator<Item = &ExecutionSession> {
 self.state.sessions()
 }

 pub fn active_session_count(&self) -> usize {
 self.state.active_session_count()
 }

 pub fn session_by_idempotency_key(&self, key: &IdempotencyKey) -> Option<SessionId> {
 self.state.session_by_idempotency_key(key)
 }

 pub fn put_session(&mut self, session: ExecutionSession) -> Result<(), StorageError> {
 self.check_tenant(&session)?;
 self.state.put_session(session);
 Ok(())
 }

 pub fn put_step(&mut self, session_id: SessionId, step: ExecutionStep) -> Result<(), StorageError> {
 self.session(session_id)?;
 self.state.put_step(session_id, step);
 Ok(())
 }

 pub fn apply_event(&mut self, event: &ExecutionEvent) -> Result<(), StorageError> {
 if event.tenant_id != self.tenant_id {
 return Err(StorageError::TenantMismatch { store_tenant: self.tenant_id, event_tenant: event.tenant_id });
 }
 self.state.apply_event(event)
 }

 pub fn materialized_state(&self) -> &MaterializedState {
 &self.state
 }

 pub fn load_materialized_state(&mut self, state: MaterializedState) {
 self.state = state;
 }
}

#[cfg(test)]
mod tests {
 use super::*;
 use incident_core::{ExecutionStep, RunbookId, TicketId};

 fn session_for(tenant: TenantId) -> ExecutionSession {
 ExecutionSession::builder()
 .tenant_id(tenant)
 .ticket_id(TicketId::new())
 .runbook_id(RunbookId::new())
 .build()
 }

 #[test]
 fn create_and_fetch_roundtrips() {
 let tenant = TenantId::new();
 let mut store = TenantStore::new(tenant);
 let session = session_for(tenant);
 let id = session.id;
 store.create_session(session, vec![ExecutionStep::pending(id, 0, "precheck")]).unwrap();
 assert_eq!(store.session(id).unwrap().id, id);
 assert_eq!(store.steps(id).unwrap().len(), 1);
 }

 #[test]
 fn cross_tenant_session_is_rejected() {
 let store_tenant = TenantId::new();
 let mut store = TenantStore::new(store_tenant);
 let other_session = session_for(TenantId::new());
 let err = store.create_session(other_session, vec![]).unwrap_err();
 assert!(matches!(err, StorageError::TenantMismatch { .. }));
 }

 #[test]
 fn idempotency_key_collision_returns_existing_session() {
 let tenant = TenantId::new();
 let mut store = TenantStore::new(tenant);
 let key = IdempotencyKey::new("pagerduty:evt-1").unwrap();
 let mut first = session_for(tenant);
 first.idempotency_key = Some(key.clone());
 let first_id = first.id;
 store.create_session(first, vec![]).unwrap();

 let mut second = session_for(tenant);
 second.idempotency_key = Some(key);
 let err = store.create_session(second, vec![]).unwrap_err();
 assert!(matches!(err, StorageError::IdempotencyCollision(id) if id == first_id));
 }

 #[test]
 fn unknown_session_lookup_errors() {
 let store = TenantStore::new(TenantId::new());
 assert!(matches!(store.session(SessionId::new()), Err(StorageError::SessionNotFound(_))));
 }
}
