// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Matcher: scores a ticket's signals against every
//! approved runbook's `match_signals` and ranks candidates by confidence.
//!
//! Vector/embedding search over runbook descriptions is out of scope;
//! confidence is computed from exact/partial signal-token overlap plus a
//! small recency prior, and every result is annotated `degraded: true` so
//! callers and the audit trail can tell this ranking never had embedding
//! similarity available.

use incident_core::{RunbookId, RunbookSpec, RunbookStatus, Ticket};
use std::collections::BTreeMap;

/// Per-runbook facts the Matcher cannot derive from `RunbookSpec` alone:
/// outcomes of past sessions bound to it, used only to break confidence
/// ties — first by historical success rate, then by approval recency.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunbookHistory {
 /// Fraction of past sessions against this runbook that completed
 /// without a terminal `failed`/`cancelled` outcome, in `[0.0, 1.0]`.
 pub success_rate: f64,
 pub approved_at_ms: u64,
}

impl Default for RunbookHistory {
 fn default() -> Self {
 Self { success_rate: 0.0, approved_at_ms: 0 }
 }
}

/// One candidate's score.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchCandidate {
 pub runbook_id: RunbookId,
 pub confidence: f64,
 /// Whether `confidence` clears `auto_execute_threshold`, independent
 /// of `match_minimum` gating (callers still apply mode/blast-radius
 /// rules on top; see `statemachine::create_session`).
 pub clears_auto_execute_threshold: bool,
 pub degraded: bool,
 pub rationale: String,
}

/// The ticket-side signals matched against each runbook's `match_signals`.
pub struct MatcherInput<'a> {
 pub ticket: &'a Ticket,
}

/// Token-overlap score between a ticket's signal values and a runbook's
/// declared `match_signals`: the fraction of the runbook's signal
/// key/value pairs present verbatim in the ticket's own signal map, plus
/// partial credit for a key present with a different value.
fn signal_overlap_score(ticket_signals: &BTreeMap<String, String>, runbook_signals: &BTreeMap<String, String>) -> f64 {
 if runbook_signals.is_empty() {
 return 0.0;
 }
 let mut score = 0.0;
 for (key, value) in runbook_signals {
 match ticket_signals.get(key) {
 Some(v) if v == value => score += 1.0,
 Some(_) => score += 0.25,
 None => {}
 }
 }
 score / runbook_signals.len() as f64
}

/// Small, bounded boost for runbooks approved more recently than others in
/// the candidate set, normalized against the oldest/newest approval in the
/// batch so it never dominates signal overlap.
fn recency_prior(approved_at_ms: u64, oldest_ms: u64, newest_ms: u64) -> f64 {
 if newest_ms <= oldest_ms {
 return 0.0;
 }
 const RECENCY_WEIGHT: f64 = 0.05;
 let fraction = (approved_at_ms - oldest_ms) as f64 / (newest_ms - oldest_ms) as f64;
 fraction * RECENCY_WEIGHT
}

/// Rank approved, non-archived runbooks by confidence against `input`'s
/// ticket. Archived runbooks never appear in the result regardless of
/// score.
pub fn match_runbooks(
 input: &MatcherInput,
 candidates: &[(RunbookSpec, RunbookHistory)],
 match_minimum: f64,
 auto_execute_threshold: f64,
) -> Vec<MatchCandidate> {
 let eligible: Vec<&(RunbookSpec, RunbookHistory)> =
 candidates.iter().filter(|(spec, _)| spec.status == RunbookStatus::Approved).collect();

 let oldest_ms = eligible.iter().map(|(_, h)| h.approved_at_ms).min().unwrap_or(0);
 let newest_ms = eligible.iter().map(|(_, h)| h.approved_at_ms).max().unwrap_or(0);

 let mut scored: Vec<(f64, MatchCandidate)> = eligible
 .into_iter()
 .map(|(spec, history)| {
 let overlap = signal_overlap_score(&input.ticket.signals, &spec.match_signals);
 let confidence = (overlap + recency_prior(history.approved_at_ms, oldest_ms, newest_ms)).min(1.0);
 let candidate = MatchCandidate {
 runbook_id: spec.id,
 confidence,
 clears_auto_execute_threshold: confidence >= auto_execute_threshold,
 degraded: true,
 rationale: format!(
 "keyword overlap {overlap:.2} against {} declared signal(s), degraded (no embedding store)",
 spec.match_signals.len()
 ),
 };
 (history.success_rate, candidate)
 })
 .filter(|(_, candidate)| candidate.confidence >= match_minimum)
 .collect();

 // Primary sort key is confidence; ties break on historical success
 // rate, then on approval recency (both descending).
 scored.sort_by(|(rate_a, a), (rate_b, b)| {
 b.confidence
 .partial_cmp(&a.confidence)
 .unwrap_or(std::cmp::Ordering::Equal)
 .then_with(|| rate_b.partial_cmp(rate_a).unwrap_or(std::cmp::Ordering::Equal))
 });

 scored.into_iter().map(|(_, candidate)| candidate).collect()
}

#[cfg(test)]
mod tests {
 use super::*;
 use incident_core::{RunbookStatus, Severity, TenantId, TicketId, TicketStatus};

 fn ticket_with_signals(signals: &[(&str, &str)]) -> Ticket {
 Ticket {
 id: TicketId::new(),
 tenant_id: TenantId::new(),
 external_id: "INC-1".to_string(),
 source: "pagerduty".to_string(),
 severity: Severity::High,
 summary: "db down".to_string(),
 signals: signals.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
 status: TicketStatus::Open,
 created_at_ms: 0,
 }
 }

 fn runbook_with_signals(signals: &[(&str, &str)], approved_at_ms: u64) -> (RunbookSpec, RunbookHistory) {
 let spec = RunbookSpec::builder()
 .status(RunbookStatus::Approved)
 .match_signals(signals.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect())
 .build();
 (spec, RunbookHistory { success_rate: 0.5, approved_at_ms })
 }

 #[test]
 fn exact_signal_match_scores_above_partial_match() {
 let ticket = ticket_with_signals(&[("service", "billing-db"), ("environment", "prod")]);
 let input = MatcherInput { ticket: &ticket };
 let exact = runbook_with_signals(&[("service", "billing-db"), ("environment", "prod")], 100);
 let partial = runbook_with_signals(&[("service", "billing-db"), ("environment", "staging")], 100);
 let results = match_runbooks(&input, &[exact.clone(), partial.clone()], 0.0, 1.0);
 assert_eq!(results[0].runbook_id, exact.0.id);
 assert!(results[0].confidence > results[1].confidence);
 }

 #[test]
 fn archived_runbooks_never_match() {
 let ticket = ticket_with_signals(&[("service", "billing-db")]);
 let input = MatcherInput { ticket: &ticket };
 let mut archived = runbook_with_signals(&[("service", "billing-db")], 100);
 archived.0.status = RunbookStatus::Archived;
 let results = match_runbooks(&input, &[archived], 0.0, 1.0);
 assert!(results.is_empty());
 }

 #[test]
 fn below_match_minimum_is_excluded() {
 let ticket = ticket_with_signals(&[("service", "unrelated")]);
 let input = MatcherInput { ticket: &ticket };
 let candidate = runbook_with_signals(&[("service", "billing-db")], 100);
 let results = match_runbooks(&input, &[candidate], 0.5, 1.0);
 assert!(results.is_empty());
 }

 #[test]
 fn ties_break_on_success_rate_then_recency() {
 let ticket = ticket_with_signals(&[("service", "billing-db")]);
 let input = MatcherInput { ticket: &ticket };
 let (mut spec_a, mut hist_a) = runbook_with_signals(&[("service", "billing-db")], 100);
 spec_a.name = "a".to_string();
 hist_a.success_rate = 0.9;
 let (mut spec_b, hist_b) = runbook_with_signals(&[("service", "billing-db")], 50);
 spec_b.name = "b".to_string();
 let results = match_runbooks(&input, &[(spec_a.clone(), hist_a), (spec_b, hist_b)], 0.0, 1.0);
 assert_eq!(results[0].runbook_id, spec_a.id);
 }

 #[test]
 fn every_result_is_marked_degraded() {
 let ticket = ticket_with_signals(&[("service", "billing-db")]);
 let input = MatcherInput { ticket: &ticket };
 let candidate = runbook_with_signals(&[("service", "billing-db")], 100);
 let results = match_runbooks(&input, &[candidate], 0.0, 1.0);
 assert!(results[0].degraded);
 }
}
