// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! InfrastructureConnection: a tenant-registered mapping from a ticket's
//! `ci_hint`/`service`/`environment` signals to a concrete connector
//! target and credential reference (Data Model).
//!
//! Runbook steps carry only a `connector` kind and a `command_template`;
//! the concrete host/resource id a step runs against comes from resolving
//! the owning session's ticket signals against this table, once, when the
//! coordinator builds the step's dispatch. A target absent from this table
//! is also rejected independently by the Policy Engine's
//! registered-targets rule, so a stale or missing
//! connection fails closed rather than silently matching nothing.

use crate::credential::CredentialReferenceId;
use crate::tenant::TenantId;

crate::define_id! {
 /// Unique identifier for a registered infrastructure connection.
 pub struct ConnectionId("cxn-");
}

/// One destination a runbook step may be dispatched against.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct InfrastructureConnection {
 pub id: ConnectionId,
 pub tenant_id: TenantId,
 /// Matched against a ticket's `ci_hint` or `service` signal.
 pub name: String,
 pub environment: String,
 pub connector_kind: String,
 /// Host/port, connection string, or cloud resource id passed to the
 /// connector as `ExecutionRequest::target`.
 pub target: String,
 pub credential_ref: Option<CredentialReferenceId>,
}

impl InfrastructureConnection {
 /// `environment`, when given, must match exactly; `ci_hint`/`service`
 /// match against `name` (either is sufficient).
 pub fn matches_signals(&self, ci_hint: Option<&str>, service: Option<&str>, environment: Option<&str>) -> bool {
 if let Some(env) = environment {
 if env != self.environment {
 return false;
 }
 }
 ci_hint.is_some_and(|h| h == self.name) || service.is_some_and(|s| s == self.name)
 }
}

#[cfg(any(test, feature = "test-support"))]
crate::builder! {
 pub struct InfrastructureConnectionBuilder => InfrastructureConnection {
 computed { id: ConnectionId = ConnectionId::new() }
 set { tenant_id: TenantId = TenantId::new() }
 into { name: String = "billing-db" }
 into { environment: String = "staging" }
 into { connector_kind: String = "ssh" }
 into { target: String = "db-staging-01" }
 option { credential_ref: CredentialReferenceId = None }
 }
}

#[cfg(test)]
mod tests {
 use super::*;

 #[test]
 fn matches_on_ci_hint_and_environment() {
 let conn = InfrastructureConnection::builder().name("billing-db").environment("prod").build();
 assert!(conn.matches_signals(Some("billing-db"), None, Some("prod")));
 assert!(!conn.matches_signals(Some("billing-db"), None, Some("staging")));
 assert!(!conn.matches_signals(Some("other-db"), None, Some("prod")));
 }

 #[test]
 fn matches_on_service_when_ci_hint_absent() {
 let conn = InfrastructureConnection::builder().name("billing-db").build();
 assert!(conn.matches_signals(None, Some("billing-db"), None));
 }

 #[test]
 fn no_signal_means_no_match() {
 let conn = InfrastructureConnection::builder().build();
 assert!(!conn.matches_signals(None, None, None));
 }
}
