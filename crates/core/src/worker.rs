// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! AgentWorker: a registered worker process capable of dispatching steps
//! against one or more connector types.

use crate::tenant::TenantId;

crate::define_id! {
 /// Unique identifier for a registered worker process.
 pub struct WorkerId("wkr-");
}

/// Liveness/availability of a registered worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
 /// Registered and heartbeating, not currently assigned a step.
 Idle,
 /// Currently dispatching one step.
 Busy,
 /// Missed its heartbeat deadline; its in-flight step is reassignable.
 Lost,
 /// Explicitly deregistered (graceful shutdown).
 Drained,
}

crate::simple_display! {
 WorkerState {
 Idle => "idle",
 Busy => "busy",
 Lost => "lost",
 Drained => "drained",
 }
}

/// A process capable of executing steps against specific connector types,
/// registered with the daemon over mTLS and tracked via heartbeat.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AgentWorker {
 pub id: WorkerId,
 pub hostname: String,
 /// Connector types this worker can dispatch, e.g. `["ssh", "local"]`.
 pub capabilities: Vec<String>,
 /// Tenants this worker may serve; empty means it was registered with no
 /// scope and therefore never receives an assignment (/// boundary case).
 pub tenant_scope: Vec<TenantId>,
 /// Network segment the worker registered from, e.g. `"prod-vpc"`,
 /// `"corp-default"`; consulted by the Policy Engine's production-scope
 /// rule.
 pub network_segment: String,
 pub production_scoped: bool,
 pub max_load: u32,
 pub current_load: u32,
 pub state: WorkerState,
 pub last_heartbeat_ms: u64,
 /// Step currently assigned, if `state` is `Busy`.
 pub current_assignment: Option<(crate::session::SessionId, usize)>,
}

impl AgentWorker {
 pub fn supports(&self, connector: &str) -> bool {
 self.capabilities.iter().any(|c| c == connector)
 }

 pub fn serves_tenant(&self, tenant_id: TenantId) -> bool {
 self.tenant_scope.iter().any(|t| *t == tenant_id)
 }

 pub fn is_available(&self) -> bool {
 matches!(self.state, WorkerState::Idle) && self.current_load < self.max_load
 }

 pub fn has_missed_heartbeat(&self, now_ms: u64, timeout_ms: u64) -> bool {
 now_ms.saturating_sub(self.last_heartbeat_ms) > timeout_ms
 }
}

#[cfg(any(test, feature = "test-support"))]
crate::builder! {
 pub struct AgentWorkerBuilder => AgentWorker {
 computed { id: WorkerId = WorkerId::new() }
 into { hostname: String = "worker-1.internal" }
 set { capabilities: Vec<String> = vec!["local".to_string()] }
 set { tenant_scope: Vec<TenantId> = Vec::new() }
 into { network_segment: String = "default" }
 set { production_scoped: bool = false }
 set { max_load: u32 = 1 }
 set { current_load: u32 = 0 }
 set { state: WorkerState = WorkerState::Idle }
 set { last_heartbeat_ms: u64 = 1_000_000 }
 option { current_assignment: (crate::session::SessionId, usize) = None }
 }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
