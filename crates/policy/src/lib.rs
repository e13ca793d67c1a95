// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! incident-policy: the Policy Engine.
//!
//! Rules are declarative predicates evaluated in a fixed order; the first
//! rule that returns a conclusive (non-`Allow`) verdict wins. The engine
//! never touches storage or the network — it is a pure function of
//! [`PolicyContext`] so it can be unit tested exhaustively and invoked
//! identically from the worker runtime and from `incidentctl policy check`.

mod context;
mod lexicon;

pub use context::PolicyContext;
pub use lexicon::DestructiveLexicon;

use incident_core::{BlastRadius, PolicyDecision};

/// One named rule in the fixed evaluation order. Kept as a plain function
/// pointer (not a trait object) since rules never hold state beyond what
/// [`PolicyEngine`] already owns and are passed explicitly.
type Rule = fn(&PolicyEngine, &PolicyContext) -> Option<PolicyDecision>;

/// Ordered, mandatory rule set plus tenant-configurable extras (additional
/// destructive-command patterns, additional registered targets are passed
/// in via the context instead of the engine so they can vary per call
/// without rebuilding the engine).
pub struct PolicyEngine {
 lexicon: DestructiveLexicon,
 rules: Vec<Rule>,
}

impl Default for PolicyEngine {
 fn default() -> Self {
 Self::new(DestructiveLexicon::default_lexicon())
 }
}

impl PolicyEngine {
 pub fn new(lexicon: DestructiveLexicon) -> Self {
 Self {
 lexicon,
 rules: vec![
 rule_production_credential_scope,
 rule_network_egress,
 rule_destructive_lexicon,
 rule_destructive_blast_radius,
 ],
 }
 }

 /// Evaluate every rule in order against `ctx`; the first non-`Allow`
 /// verdict wins. Falls through to `Allow` if nothing fires.
 pub fn evaluate(&self, ctx: &PolicyContext) -> PolicyDecision {
 for rule in &self.rules {
 if let Some(decision) = rule(self, ctx) {
 tracing::debug!(
 target = ctx.target,
 connector = ctx.connector,
 decision = ?decision,
 "policy rule fired"
 );
 return decision;
 }
 }
 PolicyDecision::Allow
 }
}

/// "Production credentials are accessible only from workers scoped to
/// production."
fn rule_production_credential_scope(_engine: &PolicyEngine, ctx: &PolicyContext) -> Option<PolicyDecision> {
 if ctx.environment == "prod" && !ctx.worker_is_production_scoped {
 return Some(PolicyDecision::DenyWithReason(format!(
 "worker in segment {:?} is not scoped to serve production targets",
 ctx.worker_segment
 )));
 }
 None
}

/// "Network egress from the worker is allowed only to registered targets."
fn rule_network_egress(_engine: &PolicyEngine, ctx: &PolicyContext) -> Option<PolicyDecision> {
 if !ctx.registered_targets.iter().any(|t| t == ctx.target) {
 return Some(PolicyDecision::DenyWithReason(format!(
 "target {:?} is not a registered infrastructure connection for this tenant",
 ctx.target
 )));
 }
 None
}

/// "Any command matching the destructive command lexicon is denied unless
/// the step is explicitly marked destructive and approved."
fn rule_destructive_lexicon(engine: &PolicyEngine, ctx: &PolicyContext) -> Option<PolicyDecision> {
 let hit = engine.lexicon.matches(ctx.command)?;
 if ctx.step_marked_destructive {
 // Deferred to rule_destructive_blast_radius: a destructive step may
 // legitimately contain a destructive command, gated by two-person
 // approval rather than an outright deny.
 return None;
 }
 Some(PolicyDecision::DenyWithReason(format!(
 "command matches destructive lexicon ({hit}) but step is not marked destructive"
 )))
}

/// "Destructive commands require a two-person approval and an explicit
/// `approved_by_admin` claim."
fn rule_destructive_blast_radius(_engine: &PolicyEngine, ctx: &PolicyContext) -> Option<PolicyDecision> {
 if ctx.blast_radius != BlastRadius::Destructive {
 return None;
 }
 if !ctx.has_admin_claim {
 return Some(PolicyDecision::DenyWithReason(
 "destructive step requires an explicit approved_by_admin claim".to_string(),
 ));
 }
 Some(PolicyDecision::RequireTwoPersonApproval)
}

#[cfg(test)]
mod tests {
 use super::*;

 fn base_ctx<'a>(command: &'a str, target: &'a str, registered: &'a [String]) -> PolicyContext<'a> {
 PolicyContext {
 command,
 connector: "ssh",
 target,
 environment: "staging",
 blast_radius: BlastRadius::Low,
 worker_segment: "default",
 worker_is_production_scoped: false,
 registered_targets: registered,
 has_admin_claim: false,
 step_marked_destructive: false,
 }
 }

 #[test]
 fn allows_benign_registered_command() {
 let engine = PolicyEngine::default();
 let registered = vec!["db-staging-01".to_string()];
 let ctx = base_ctx("systemctl restart app", "db-staging-01", &registered);
 assert_eq!(engine.evaluate(&ctx), PolicyDecision::Allow);
 }

 #[test]
 fn denies_unregistered_target() {
 let engine = PolicyEngine::default();
 let registered = vec!["db-staging-01".to_string()];
 let ctx = base_ctx("systemctl restart app", "shadow-host", &registered);
 assert!(matches!(engine.evaluate(&ctx), PolicyDecision::DenyWithReason(_)));
 }

 #[test]
 fn denies_production_from_unscoped_worker() {
 let engine = PolicyEngine::default();
 let registered = vec!["db-prod-01".to_string()];
 let mut ctx = base_ctx("systemctl restart app", "db-prod-01", &registered);
 ctx.environment = "prod";
 assert!(matches!(engine.evaluate(&ctx), PolicyDecision::DenyWithReason(_)));
 }

 #[test]
 fn allows_production_from_scoped_worker() {
 let engine = PolicyEngine::default();
 let registered = vec!["db-prod-01".to_string()];
 let mut ctx = base_ctx("systemctl restart app", "db-prod-01", &registered);
 ctx.environment = "prod";
 ctx.worker_is_production_scoped = true;
 assert_eq!(engine.evaluate(&ctx), PolicyDecision::Allow);
 }

 #[test]
 fn denies_destructive_lexicon_on_non_destructive_step() {
 let engine = PolicyEngine::default();
 let registered = vec!["db-prod-01".to_string()];
 let ctx = base_ctx("DROP TABLE accounts", "db-prod-01", &registered);
 assert!(matches!(engine.evaluate(&ctx), PolicyDecision::DenyWithReason(_)));
 }

 #[test]
 fn destructive_step_without_admin_claim_is_denied() {
 let engine = PolicyEngine::default();
 let registered = vec!["db-prod-01".to_string()];
 let mut ctx = base_ctx("DROP TABLE accounts", "db-prod-01", &registered);
 ctx.step_marked_destructive = true;
 ctx.blast_radius = BlastRadius::Destructive;
 assert!(matches!(engine.evaluate(&ctx), PolicyDecision::DenyWithReason(_)));
 }

 #[test]
 fn destructive_step_with_admin_claim_requires_two_person() {
 let engine = PolicyEngine::default();
 let registered = vec!["db-prod-01".to_string()];
 let mut ctx = base_ctx("DROP TABLE accounts", "db-prod-01", &registered);
 ctx.step_marked_destructive = true;
 ctx.blast_radius = BlastRadius::Destructive;
 ctx.has_admin_claim = true;
 assert_eq!(engine.evaluate(&ctx), PolicyDecision::RequireTwoPersonApproval);
 }

 #[test]
 fn first_matching_deny_wins_over_later_rules() {
 // Unregistered target AND destructive lexicon both fire; egress
 // check is earlier in fixed order and must win.
 let engine = PolicyEngine::default();
 let registered: Vec<String> = vec![];
 let ctx = base_ctx("DROP TABLE accounts", "shadow-host", &registered);
 match engine.evaluate(&ctx) {
 PolicyDecision::DenyWithReason(reason) => assert!(reason.contains("registered")),
 other => panic!("expected a registered-target deny, got {other:?}"),
 }
 }
}
