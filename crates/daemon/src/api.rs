// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The operator-facing HTTP/WS surface: webhook ticket
//! ingestion, execution lifecycle control, and event streaming. This is
//! the only place in the daemon that talks HTTP; everything it does is a
//! thin translation into `Coordinator` calls.

use crate::coordinator::Coordinator;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use axum::Router;
use hmac::{Hmac, Mac};
use incident_core::{
 Clock, DecisionKind, IdempotencyKey, RunbookSpec, Severity, SessionId, Ticket, TicketId, ValidationMode,
};
use incident_engine::{matcher, Command, MatcherInput, RunbookHistory};
use incident_storage::nonce::NonceTable;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Everything an API handler needs beyond the coordinator itself: state
/// that has no business living on `Coordinator` because it's a property of
/// this one HTTP surface, not of orchestration.
pub struct ApiState<C: Clock + 'static> {
 pub coordinator: Arc<Coordinator<C>>,
 pub nonces: Mutex<NonceTable>,
}

pub fn router<C: Clock + 'static>(state: Arc<ApiState<C>>) -> Router {
 Router::new()
 .route("/healthz", get(healthz))
 .route("/tickets", post(ingest_ticket::<C>))
 .route("/runbooks", get(list_runbooks::<C>).post(register_runbook::<C>))
 .route("/executions", get(list_executions::<C>))
 .route("/executions/{id}", get(get_execution::<C>))
 .route("/executions/{id}/events", get(get_events::<C>))
 .route("/executions/{id}/approve", post(approve_execution::<C>))
 .route("/executions/{id}/cancel", post(cancel_execution::<C>))
 .route("/executions/{id}/ws", get(stream_execution::<C>))
 .route("/workers", get(list_workers::<C>))
 .with_state(state)
}

async fn healthz() -> &'static str {
 "ok"
}

#[derive(Debug, thiserror::Error)]
enum ApiError {
 #[error("unknown tenant")]
 UnknownTenant,
 #[error("no approved runbook matched this ticket's signals")]
 NoMatch,
 #[error(transparent)]
 Daemon(#[from] crate::error::DaemonError),
 #[error("webhook rejected: {0}")]
 Webhook(#[from] incident_storage::nonce::NonceError),
 #[error("webhook signature invalid")]
 BadSignature,
 #[error("missing or invalid {0} header")]
 MissingHeader(&'static str),
 #[error("runbook is not approved; approve it with `incidentctl runbook approve` before publishing")]
 RunbookNotApproved,
}

impl IntoResponse for ApiError {
 fn into_response(self) -> axum::response::Response {
 let status = match &self {
 ApiError::UnknownTenant | ApiError::NoMatch => StatusCode::NOT_FOUND,
 ApiError::Webhook(_) | ApiError::BadSignature | ApiError::MissingHeader(_) => StatusCode::UNAUTHORIZED,
 ApiError::RunbookNotApproved => StatusCode::UNPROCESSABLE_ENTITY,
 ApiError::Daemon(_) => StatusCode::INTERNAL_SERVER_ERROR,
 };
 (status, self.to_string()).into_response()
 }
}

// ── Ticket ingestion ────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct IngestTicketRequest {
 tenant_id: incident_core::TenantId,
 external_id: String,
 source: String,
 severity: Severity,
 summary: String,
 #[serde(default)]
 signals: BTreeMap<String, String>,
 /// `(nonce, timestamp_ms)`; required for sources with a configured
 /// webhook secret, ignored otherwise (e.g. `incidentctl ticket ingest`
 /// talking over a trusted local admin channel).
 nonce: Option<String>,
 timestamp_ms: Option<u64>,
 #[serde(default)]
 idempotency_key: Option<String>,
 #[serde(default)]
 inputs: BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
struct IngestTicketResponse {
 ticket_id: TicketId,
 session_id: SessionId,
 matched_runbook: incident_core::RunbookId,
 confidence: f64,
 degraded: bool,
}

/// `POST /tickets`: verify the inbound signature (if the source has one
/// configured), check replay protection, run the Matcher, and create a
/// session against the best candidate. A ticket that fails to match any
/// approved runbook is reported to the caller, not silently dropped — the
/// upstream system is expected to retry or page a human.
async fn ingest_ticket<C: Clock + 'static>(
 State(state): State<Arc<ApiState<C>>>,
 headers: axum::http::HeaderMap,
 body: axum::body::Bytes,
) -> Result<Json<IngestTicketResponse>, ApiError> {
 let req: IngestTicketRequest = serde_json::from_slice(&body).map_err(|_| ApiError::MissingHeader("body"))?;

 let now_ms = state.coordinator.clock.epoch_ms();
 if let Some(secret) = crate::env::webhook_secret(&req.source) {
 verify_signature(&headers, &body, &secret)?;
 let nonce = req.nonce.as_deref().ok_or(ApiError::MissingHeader("nonce"))?;
 let timestamp_ms = req.timestamp_ms.ok_or(ApiError::MissingHeader("timestamp_ms"))?;
 state.nonces.lock().check_and_record(&req.source, nonce, timestamp_ms, now_ms)?;
 }

 let ticket = Ticket {
 id: TicketId::new(),
 tenant_id: req.tenant_id,
 external_id: req.external_id,
 source: req.source,
 severity: req.severity,
 summary: req.summary,
 signals: req.signals,
 status: incident_core::TicketStatus::Open,
 created_at_ms: now_ms,
 };

 let candidates: Vec<(RunbookSpec, RunbookHistory)> = state
 .coordinator
 .runbooks
 .approved_candidates()
 .into_iter()
 .map(|spec| (spec, RunbookHistory::default()))
 .collect();
 let config = &state.coordinator.config;
 let scored = matcher::match_runbooks(
 &MatcherInput { ticket: &ticket },
 &candidates,
 config.match_minimum as f64 / 100.0,
 config.auto_execute_threshold as f64 / 100.0,
 );
 let best = scored.into_iter().next().ok_or(ApiError::NoMatch)?;
 let runbook = state.coordinator.runbooks.get_version(best.runbook_id, 0).or_else(|| {
 state.coordinator.runbooks.latest_approved(best.runbook_id)
 }).ok_or(ApiError::NoMatch)?;

 let mode = if config.execution_mode == incident_core::config::ExecutionMode::Auto && best.clears_auto_execute_threshold {
 ValidationMode::Auto
 } else {
 ValidationMode::Hil
 };
 let idempotency_key = req.idempotency_key.and_then(|k| IdempotencyKey::new(k).ok());

 let session_id = state
 .coordinator
 .create_session(req.tenant_id, &ticket, &runbook, mode, req.inputs, idempotency_key)
 .await?;

 Ok(Json(IngestTicketResponse {
 ticket_id: ticket.id,
 session_id,
 matched_runbook: best.runbook_id,
 confidence: best.confidence,
 degraded: best.degraded,
 }))
}

#[allow(clippy::expect_used)]
fn verify_signature(headers: &axum::http::HeaderMap, body: &[u8], secret: &str) -> Result<(), ApiError> {
 let provided = headers
 .get("x-incident-signature")
 .and_then(|v| v.to_str().ok())
 .ok_or(ApiError::MissingHeader("x-incident-signature"))?;
 let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("hmac accepts keys of any length");
 mac.update(body);
 let expected = hex::encode(mac.finalize().into_bytes());
 if expected.as_bytes() != provided.as_bytes() {
 return Err(ApiError::BadSignature);
 }
 Ok(())
}

// ── Runbook catalog ─────────────────────────────────────────────────────

/// `POST /runbooks`: register an approved runbook version into the
/// in-memory catalog (`RunbookRegistry`). The registry holds no disk
/// persistence of its own; an operator re-publishes whatever runbooks
/// matter after every daemon restart, the same way they would
/// re-register infrastructure connections. Draft or archived specs are
/// rejected — only `incidentctl runbook approve` output belongs here.
async fn register_runbook<C: Clock + 'static>(
 State(state): State<Arc<ApiState<C>>>,
 Json(spec): Json<RunbookSpec>,
) -> Result<StatusCode, ApiError> {
 if !spec.is_approved() {
 return Err(ApiError::RunbookNotApproved);
 }
 state.coordinator.runbooks.put(spec);
 Ok(StatusCode::CREATED)
}

/// `GET /runbooks`: the latest version of every runbook known to this
/// daemon process, approved or not, for operator inspection.
async fn list_runbooks<C: Clock + 'static>(State(state): State<Arc<ApiState<C>>>) -> Json<Vec<RunbookSpec>> {
 Json(state.coordinator.runbooks.all_latest())
}

// ── Execution lifecycle ─────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ExecutionView {
 session: incident_core::ExecutionSession,
 steps: Vec<incident_core::ExecutionStep>,
}

#[derive(Debug, Deserialize)]
struct ListExecutionsQuery {
 tenant_id: incident_core::TenantId,
}

/// `GET /executions?tenant_id=...`: every session this daemon process has
/// loaded for the tenant, newest state first. Used by `incidentctl session
/// list`; there is no cross-tenant listing (tenant isolation).
async fn list_executions<C: Clock + 'static>(
 State(state): State<Arc<ApiState<C>>>,
 Query(query): Query<ListExecutionsQuery>,
) -> Result<Json<Vec<incident_core::ExecutionSession>>, ApiError> {
 let sessions = state
 .coordinator
 .with_tenant(query.tenant_id, |rt| {
 let mut sessions: Vec<_> = rt.store.sessions().cloned().collect();
 sessions.sort_by_key(|s| s.created_at_ms);
 sessions
 })
 .await?;
 Ok(Json(sessions))
}

async fn get_execution<C: Clock + 'static>(
 State(state): State<Arc<ApiState<C>>>,
 Path(id): Path<SessionId>,
) -> Result<Json<ExecutionView>, ApiError> {
 let tenant_id = state.coordinator.tenant_of_session(id).ok_or(ApiError::UnknownTenant)?;
 let view = state
 .coordinator
 .with_tenant(tenant_id, |rt| {
 rt.store.session(id).ok().map(|session| ExecutionView {
 session: session.clone(),
 steps: rt.store.steps(id).map(|s| s.to_vec()).unwrap_or_default(),
 })
 })
 .await?
 .ok_or(ApiError::UnknownTenant)?;
 Ok(Json(view))
}

#[derive(Debug, Deserialize)]
struct EventsQuery {
 #[serde(default)]
 since: u64,
}

async fn get_events<C: Clock + 'static>(
 State(state): State<Arc<ApiState<C>>>,
 Path(id): Path<SessionId>,
 Query(query): Query<EventsQuery>,
) -> Result<Json<Vec<incident_core::ExecutionEvent>>, ApiError> {
 let tenant_id = state.coordinator.tenant_of_session(id).ok_or(ApiError::UnknownTenant)?;
 let wal_path = state.coordinator.wal_path(tenant_id);
 let mut matching = Vec::new();
 incident_storage::wal::Wal::replay_all(&wal_path, |entry| {
 if entry.event.session_id == id && entry.seq > query.since {
 matching.push(entry.event);
 }
 })
 .map_err(crate::error::DaemonError::from)?;
 matching.sort_by_key(|e| e.seq);
 Ok(Json(matching))
}

#[derive(Debug, Deserialize)]
struct ApproveRequest {
 step_index: usize,
 operator: String,
 approve: bool,
 notes: Option<String>,
}

async fn approve_execution<C: Clock + 'static>(
 State(state): State<Arc<ApiState<C>>>,
 Path(id): Path<SessionId>,
 Json(req): Json<ApproveRequest>,
) -> Result<StatusCode, ApiError> {
 let tenant_id = state.coordinator.tenant_of_session(id).ok_or(ApiError::UnknownTenant)?;
 let decision = if req.approve { DecisionKind::Approve } else { DecisionKind::Reject };
 state
 .coordinator
 .dispatch_command(
 tenant_id,
 id,
 Command::ApproveStep { step_index: req.step_index, operator: req.operator, decision, notes: req.notes },
 )
 .await?;
 Ok(StatusCode::ACCEPTED)
}

#[derive(Debug, Deserialize)]
struct CancelRequest {
 operator: String,
 reason: String,
}

async fn cancel_execution<C: Clock + 'static>(
 State(state): State<Arc<ApiState<C>>>,
 Path(id): Path<SessionId>,
 Json(req): Json<CancelRequest>,
) -> Result<StatusCode, ApiError> {
 let tenant_id = state.coordinator.tenant_of_session(id).ok_or(ApiError::UnknownTenant)?;
 state
 .coordinator
 .dispatch_command(tenant_id, id, Command::Cancel { operator: req.operator, reason: req.reason })
 .await?;
 Ok(StatusCode::ACCEPTED)
}

#[derive(Debug, Serialize)]
struct WorkerView {
 id: incident_core::WorkerId,
 state: String,
 current_load: u32,
 max_load: u32,
}

async fn list_workers<C: Clock + 'static>(State(state): State<Arc<ApiState<C>>>) -> Json<Vec<WorkerView>> {
 Json(
 state
 .coordinator
 .workers
 .list()
 .into_iter()
 .map(|w| WorkerView {
 id: w.id,
 state: format!("{:?}", w.state),
 current_load: w.current_load,
 max_load: w.max_load,
 })
 .collect(),
 )
}

/// `GET /executions/{id}/ws`: every subsequent `ExecutionEvent` for this
/// session, as the coordinator's broadcast fan-out produces them. No
/// backfill — callers needing history call `GET .../events` first.
async fn stream_execution<C: Clock + 'static>(
 State(state): State<Arc<ApiState<C>>>,
 Path(id): Path<SessionId>,
 ws: axum::extract::ws::WebSocketUpgrade,
) -> axum::response::Response {
 let rx = state.coordinator.events.subscribe();
 ws.on_upgrade(move |socket| forward_events(socket, rx, id))
}

async fn forward_events(
 mut socket: WebSocket,
 mut rx: tokio::sync::broadcast::Receiver<incident_core::ExecutionEvent>,
 session_id: SessionId,
) {
 loop {
 match rx.recv().await {
 Ok(event) if event.session_id == session_id => {
 let Ok(payload) = serde_json::to_string(&event) else { continue };
 if socket.send(Message::Text(payload.into())).await.is_err() {
 break;
 }
 }
 Ok(_) => continue,
 Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
 Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
 }
 }
}
