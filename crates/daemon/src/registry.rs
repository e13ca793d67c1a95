// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory catalogs the coordinator consults but never mutates through
//! the Session State Machine: the runbook catalog (shared across tenants —
//! a runbook is a reusable artifact, tenancy is enforced at the session and
//! connection layer instead), each tenant's registered infrastructure
//! connections, and the live worker pool. None of these are
//! `ExecutionEvent`-sourced; they are operator-managed side tables, kept in
//! memory and rebuilt from their own admin API calls on restart. Loading
//! them from disk instead is a deliberately deferred improvement.

use incident_core::{AgentWorker, ConnectionId, InfrastructureConnection, RunbookId, RunbookSpec, TenantId, WorkerId, WorkerState};
use incident_wire::DaemonMessage;
use parking_lot::RwLock;
use std::collections::HashMap;
use tokio::sync::mpsc;

/// Every version of every runbook ever registered, keyed by id. Approving a
/// new version does not remove the old one: sessions already bound to it
/// (`ExecutionSession::runbook_version`) must still be able to resolve it.
#[derive(Default)]
pub struct RunbookRegistry {
    versions: RwLock<HashMap<RunbookId, Vec<RunbookSpec>>>,
}

impl RunbookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, spec: RunbookSpec) {
        let mut versions = self.versions.write();
        let entry = versions.entry(spec.id).or_default();
        if let Some(slot) = entry.iter_mut().find(|s| s.version == spec.version) {
            *slot = spec;
        } else {
            entry.push(spec);
        }
    }

 /// The exact version a session was bound to at creation time.
    pub fn get_version(&self, id: RunbookId, version: u32) -> Option<RunbookSpec> {
        self.versions.read().get(&id)?.iter().find(|s| s.version == version).cloned()
    }

 /// Highest version currently in `Approved` status, for new session
 /// creation and Matcher candidacy.
    pub fn latest_approved(&self, id: RunbookId) -> Option<RunbookSpec> {
        self.versions
            .read()
            .get(&id)?
            .iter()
            .filter(|s| s.is_approved())
            .max_by_key(|s| s.version)
            .cloned()
    }

 /// Every runbook's latest version, approved or not, for listing.
    pub fn all_latest(&self) -> Vec<RunbookSpec> {
        self.versions.read().values().filter_map(|v| v.iter().max_by_key(|s| s.version)).cloned().collect()
    }

 /// Every approved runbook (latest version only) — the Matcher's
 /// candidate pool.
    pub fn approved_candidates(&self) -> Vec<RunbookSpec> {
        self.versions
            .read()
            .values()
            .filter_map(|v| v.iter().filter(|s| s.is_approved()).max_by_key(|s| s.version))
            .cloned()
            .collect()
    }
}

/// Infrastructure connections registered per tenant, resolved against a
/// step's `connector` kind plus the owning session's ticket signals.
#[derive(Default)]
pub struct ConnectionRegistry {
    by_tenant: RwLock<HashMap<TenantId, Vec<InfrastructureConnection>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, connection: InfrastructureConnection) {
        let mut by_tenant = self.by_tenant.write();
        let entry = by_tenant.entry(connection.tenant_id).or_default();
        if let Some(slot) = entry.iter_mut().find(|c| c.id == connection.id) {
            *slot = connection;
        } else {
            entry.push(connection);
        }
    }

    pub fn remove(&self, tenant_id: TenantId, id: ConnectionId) {
        if let Some(entry) = self.by_tenant.write().get_mut(&tenant_id) {
            entry.retain(|c| c.id != id);
        }
    }

    pub fn list(&self, tenant_id: TenantId) -> Vec<InfrastructureConnection> {
        self.by_tenant.read().get(&tenant_id).cloned().unwrap_or_default()
    }

 /// Resolve the single connection a step should dispatch against, given
 /// the step's declared connector kind and the owning ticket's signals.
 /// Ambiguous matches (more than one connection agrees) resolve to the
 /// first registered, matching the Matcher's own "first wins on tie"
 /// posture rather than erroring out mid-dispatch.
    pub fn resolve(
        &self,
        tenant_id: TenantId,
        connector_kind: &str,
        ci_hint: Option<&str>,
        service: Option<&str>,
        environment: Option<&str>,
    ) -> Option<InfrastructureConnection> {
        self.by_tenant
            .read()
            .get(&tenant_id)?
            .iter()
            .find(|c| c.connector_kind == connector_kind && c.matches_signals(ci_hint, service, environment))
            .cloned()
    }

 /// Every target name registered for a tenant, consulted by the Policy
 /// Engine's network-egress rule before dispatch.
    pub fn registered_targets(&self, tenant_id: TenantId) -> Vec<String> {
        self.by_tenant.read().get(&tenant_id).map(|v| v.iter().map(|c| c.target.clone()).collect()).unwrap_or_default()
    }
}

/// The live worker pool: registration, heartbeats, and the outbound wire
/// channel to each connected worker. Global rather than per-tenant since a
/// worker's `tenant_scope` can span several tenants at once.
#[derive(Default)]
pub struct WorkerRegistry {
    workers: RwLock<HashMap<WorkerId, AgentWorker>>,
    channels: RwLock<HashMap<WorkerId, mpsc::Sender<DaemonMessage>>>,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, worker: AgentWorker, channel: mpsc::Sender<DaemonMessage>) {
        let id = worker.id;
        self.workers.write().insert(id, worker);
        self.channels.write().insert(id, channel);
    }

    pub fn deregister(&self, id: WorkerId) {
        self.workers.write().remove(&id);
        self.channels.write().remove(&id);
    }

    pub fn heartbeat(&self, id: WorkerId, load: u32, now_ms: u64) -> bool {
        let mut workers = self.workers.write();
        let Some(worker) = workers.get_mut(&id) else { return false };
        worker.current_load = load;
        worker.last_heartbeat_ms = now_ms;
        if worker.state == WorkerState::Lost {
            worker.state = WorkerState::Idle;
        }
        true
    }

    pub fn get(&self, id: WorkerId) -> Option<AgentWorker> {
        self.workers.read().get(&id).cloned()
    }

    pub fn list(&self) -> Vec<AgentWorker> {
        self.workers.read().values().cloned().collect()
    }

 /// Workers that have missed their heartbeat deadline and are not
 /// already marked `Lost`; transitions them to `Lost` as a side effect so
 /// a repeated sweep tick doesn't re-report the same worker.
    pub fn sweep_lost(&self, now_ms: u64, timeout_ms: u64) -> Vec<WorkerId> {
        let mut workers = self.workers.write();
        let mut lost = Vec::new();
        for worker in workers.values_mut() {
            if worker.state != WorkerState::Lost && worker.has_missed_heartbeat(now_ms, timeout_ms) {
                worker.state = WorkerState::Lost;
                lost.push(worker.id);
            }
        }
        lost
    }

 /// Best available worker for `tenant_id`/`connector_kind`: idle, under
 /// its load cap, scoped to the tenant, and supporting the connector.
 /// Ties broken by lowest current load.
    pub fn pick_worker(&self, tenant_id: TenantId, connector_kind: &str) -> Option<WorkerId> {
        self.workers
            .read()
            .values()
            .filter(|w| w.is_available() && w.serves_tenant(tenant_id) && w.supports(connector_kind))
            .min_by_key(|w| w.current_load)
            .map(|w| w.id)
    }

    pub fn mark_busy(&self, id: WorkerId, session_id: incident_core::SessionId, step_index: usize) {
        if let Some(worker) = self.workers.write().get_mut(&id) {
            worker.state = WorkerState::Busy;
            worker.current_load += 1;
            worker.current_assignment = Some((session_id, step_index));
        }
    }

    pub fn mark_idle(&self, id: WorkerId) {
        if let Some(worker) = self.workers.write().get_mut(&id) {
            worker.state = WorkerState::Idle;
            worker.current_load = worker.current_load.saturating_sub(1);
            worker.current_assignment = None;
        }
    }

    pub async fn send(&self, id: WorkerId, message: DaemonMessage) -> bool {
        let sender = self.channels.read().get(&id).cloned();
        match sender {
            Some(sender) => sender.send(message).await.is_ok(),
            None => false,
        }
    }
}
