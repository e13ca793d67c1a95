// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ticket: the inbound trigger that causes a runbook to be matched and run.

use crate::tenant::TenantId;

crate::define_id! {
 /// Unique identifier for an inbound ticket.
    pub struct TicketId("tkt-");
}

/// Severity as reported by the upstream monitoring/ticketing system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

crate::simple_display! {
    Severity {
        Low => "low",
        Medium => "medium",
        High => "high",
        Critical => "critical",
    }
}

/// Lifecycle of a ticket as tracked by the orchestration core (distinct from
/// the upstream ticketing system's own status field, which is written back
/// to via the Ticket Outcome Adapter).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
 /// Received, not yet matched to a runbook.
    Open,
 /// Matched and bound to exactly one execution session.
    Bound,
 /// Session completed successfully; outcome written back.
    Resolved,
 /// Session failed or was cancelled; outcome written back.
    Closed,
}

crate::simple_display! {
    TicketStatus {
        Open => "open",
        Bound => "bound",
        Resolved => "resolved",
        Closed => "closed",
    }
}

/// An inbound incident ticket, normalized from whatever upstream system
/// raised it (webhook ingestion applies the normalization before this type
/// is ever constructed).
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Ticket {
    pub id: TicketId,
    pub tenant_id: TenantId,
 /// Identifier of the ticket in the upstream system, e.g. `"INC-4821"`.
    pub external_id: String,
 /// Name of the upstream source, e.g. `"pagerduty"`, `"servicenow"`.
    pub source: String,
    pub severity: Severity,
    pub summary: String,
 /// Free-form signal labels used by the Matcher (host, service, alert
 /// fingerprint, etc.) to select a candidate runbook.
    pub signals: std::collections::BTreeMap<String, String>,
    pub status: TicketStatus,
    pub created_at_ms: u64,
}

impl Ticket {
    pub fn is_open(&self) -> bool {
        matches!(self.status, TicketStatus::Open)
    }
}

#[cfg(any(test, feature = "test-support"))]
crate::builder! {
    pub struct TicketBuilder => Ticket {
        computed { id: TicketId = TicketId::new() }
        set { tenant_id: TenantId = TenantId::new() }
        into { external_id: String = "INC-0001" }
        into { source: String = "pagerduty" }
        set { severity: Severity = Severity::Medium }
        into { summary: String = "disk usage above threshold" }
        set { signals: std::collections::BTreeMap<String, String> = Default::default() }
        set { status: TicketStatus = TicketStatus::Open }
        set { created_at_ms: u64 = 1_000_000 }
    }
}

#[cfg(test)]
#[path = "ticket_tests.rs"]
mod tests;
