// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Input snapshot the Policy Engine evaluates one step against.

use incident_core::BlastRadius;

/// Everything a policy rule might need to know about one step dispatch
/// attempt, gathered by the Worker Runtime before invoking the connector:
/// the step's realized command, target, environment, the invoking
/// worker, blast radius, and approver role if present.
pub struct PolicyContext<'a> {
 pub command: &'a str,
 pub connector: &'a str,
 /// The bound infrastructure target, e.g. a hostname or cloud resource id.
 pub target: &'a str,
 /// Environment tag of the target connection, e.g. `"prod"`, `"staging"`.
 pub environment: &'a str,
 pub blast_radius: BlastRadius,
 /// Network segment the invoking worker was registered from.
 pub worker_segment: &'a str,
 /// Whether the worker is scoped to serve the production environment.
 pub worker_is_production_scoped: bool,
 /// Targets this tenant has explicitly registered an
 /// `InfrastructureConnection` for; egress elsewhere is denied.
 pub registered_targets: &'a [String],
 /// Whether the step was authored with an explicit `approved_by_admin`
 /// claim (destructive steps require this in addition to
 /// two-person approval).
 pub has_admin_claim: bool,
 /// Whether the runbook step itself was authored as destructive. A
 /// destructive *command* on a non-destructive step is always denied
 /// (lexicon rule); a destructive *step* still needs two-person
 /// approval, handled by the Approval Gate once policy returns
 /// `RequireTwoPersonApproval`.
 pub step_marked_destructive: bool,
}
