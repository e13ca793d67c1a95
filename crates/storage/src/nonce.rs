// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Webhook replay-prevention window. Ticket ingestion rejects a webhook
//! whose `(source, nonce)` pair has already been seen within the rolling
//! window, and independently rejects any timestamp older than five
//! minutes.

use std::collections::HashMap;

/// How long a seen nonce is remembered before it is eligible for pruning.
/// Replays older than this are rejected outright.
pub const REPLAY_WINDOW_MS: u64 = 5 * 60 * 1_000;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NonceError {
 #[error("webhook timestamp is {age_ms}ms old, outside the {window_ms}ms replay window")]
 Stale { age_ms: u64, window_ms: u64 },
 #[error("nonce {nonce:?} already used for source {source:?}")]
 Replayed { source: String, nonce: String },
}

/// In-memory table of `(source, nonce) -> first_seen_at_ms`, pruned
/// lazily on insert. One table per daemon process; durability is not
/// required since a restarted daemon re-admitting a stale replay only
/// matters within the five-minute window a restart is unlikely to race.
#[derive(Default)]
pub struct NonceTable {
 seen: HashMap<(String, String), u64>,
}

impl NonceTable {
 pub fn new() -> Self {
 Self::default()
 }

 /// Validate `timestamp_ms` is within the replay window of `now_ms` and
 /// that `(source, nonce)` has not been recorded before, then record it.
 pub fn check_and_record(
 &mut self,
 source: &str,
 nonce: &str,
 timestamp_ms: u64,
 now_ms: u64,
 ) -> Result<(), NonceError> {
 let age_ms = now_ms.saturating_sub(timestamp_ms);
 if age_ms > REPLAY_WINDOW_MS {
 return Err(NonceError::Stale { age_ms, window_ms: REPLAY_WINDOW_MS });
 }
 let key = (source.to_string(), nonce.to_string());
 if self.seen.contains_key(&key) {
 return Err(NonceError::Replayed { source: source.to_string(), nonce: nonce.to_string() });
 }
 self.seen.insert(key, now_ms);
 self.prune(now_ms);
 Ok(())
 }

 /// Drop entries older than the replay window; called after every
 /// insert so the table never grows unbounded on a long-lived daemon.
 fn prune(&mut self, now_ms: u64) {
 self.seen.retain(|_, seen_at| now_ms.saturating_sub(*seen_at) <= REPLAY_WINDOW_MS);
 }

 pub fn len(&self) -> usize {
 self.seen.len()
 }

 pub fn is_empty(&self) -> bool {
 self.seen.is_empty()
 }
}

#[cfg(test)]
mod tests {
 use super::*;

 #[test]
 fn first_use_of_nonce_succeeds() {
 let mut table = NonceTable::new();
 assert!(table.check_and_record("pagerduty", "evt-1", 1_000, 1_000).is_ok());
 }

 #[test]
 fn replayed_nonce_is_rejected() {
 let mut table = NonceTable::new();
 table.check_and_record("pagerduty", "evt-1", 1_000, 1_000).unwrap();
 let err = table.check_and_record("pagerduty", "evt-1", 1_000, 1_500).unwrap_err();
 assert!(matches!(err, NonceError::Replayed { .. }));
 }

 #[test]
 fn same_nonce_different_source_is_allowed() {
 let mut table = NonceTable::new();
 table.check_and_record("pagerduty", "evt-1", 1_000, 1_000).unwrap();
 assert!(table.check_and_record("servicenow", "evt-1", 1_000, 1_000).is_ok());
 }

 #[test]
 fn stale_timestamp_is_rejected() {
 let mut table = NonceTable::new();
 let err = table.check_and_record("pagerduty", "evt-1", 0, REPLAY_WINDOW_MS + 1).unwrap_err();
 assert!(matches!(err, NonceError::Stale { .. }));
 }

 #[test]
 fn pruning_forgets_entries_outside_the_window() {
 let mut table = NonceTable::new();
 table.check_and_record("pagerduty", "evt-1", 0, 0).unwrap();
 table.check_and_record("pagerduty", "evt-2", REPLAY_WINDOW_MS + 100, REPLAY_WINDOW_MS + 100).unwrap();
 assert_eq!(table.len(), 1);
 }
}
