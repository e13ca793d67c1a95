// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tenant: the isolation boundary for every other record in the system.

crate::define_id! {
 /// Unique identifier for a tenant.
    pub struct TenantId("tnt-");
}

/// A customer organization. Every `ExecutionSession`, `CredentialReference`,
/// `Ticket`, and `InfrastructureConnection` is scoped to exactly one tenant,
/// and no storage query may cross tenant boundaries.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Tenant {
    pub id: TenantId,
    pub name: String,
 /// Per-tenant cap on concurrently-active execution sessions.
    pub max_concurrent_sessions: u32,
    pub active: bool,
}

impl Tenant {
    pub fn new(name: impl Into<String>, max_concurrent_sessions: u32) -> Self {
        Self { id: TenantId::new(), name: name.into(), max_concurrent_sessions, active: true }
    }
}

#[cfg(any(test, feature = "test-support"))]
crate::builder! {
    pub struct TenantBuilder => Tenant {
        into { name: String = "acme" }
        set { max_concurrent_sessions: u32 = 10 }
        set { active: bool = true }
        computed { id: TenantId = TenantId::new() }
    }
}

#[cfg(test)]
#[path = "tenant_tests.rs"]
mod tests;
