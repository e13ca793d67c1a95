// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CredentialBroker: the single narrow fetch/release contract through
//! which raw secret material ever exists in process memory.

use crate::error::CredentialError;
use crate::store::SecretsStore;
use incident_core::{Clock, CredentialHandle, CredentialReference, CredentialReferenceId};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Hard cap on requested TTL regardless of what the caller asks for:
/// credentials are fetched through the broker with a TTL of five minutes
/// or less.
pub const MAX_TTL_SECONDS: u32 = 300;

struct ActiveLease {
 reference_id: CredentialReferenceId,
}

/// Holds exactly one outstanding lease per credential reference at a
/// time: credentials are never shared across steps or sessions, fetch is
/// per step. A second fetch for a reference already leased is refused
/// rather than silently overwriting the first step's lease.
pub struct CredentialBroker<S: SecretsStore, C: Clock> {
 store: Arc<S>,
 clock: C,
 active: Mutex<HashMap<CredentialReferenceId, ActiveLease>>,
 revoked: Mutex<HashSet<CredentialReferenceId>>,
}

impl<S: SecretsStore, C: Clock> CredentialBroker<S, C> {
 pub fn new(store: Arc<S>, clock: C) -> Self {
 Self { store, clock, active: Mutex::new(HashMap::new()), revoked: Mutex::new(HashSet::new()) }
 }

 /// Materialize a short-lived handle for exactly one step invocation.
 pub fn fetch(
 &self,
 reference: &CredentialReference,
 ttl_seconds: u32,
 ) -> Result<CredentialHandle, CredentialError> {
 if ttl_seconds > MAX_TTL_SECONDS {
 return Err(CredentialError::TtlExceeded { requested_secs: ttl_seconds, max_secs: MAX_TTL_SECONDS });
 }
 {
 let mut revoked = self.revoked.lock();
 revoked.remove(&reference.id);
 }
 if self.active.lock().contains_key(&reference.id) {
 return Err(CredentialError::NotFound(format!(
 "reference {} already has an outstanding lease",
 reference.id
 )));
 }
 let secret = self.store.fetch_secret(reference)?;
 let now_ms = self.clock.epoch_ms();
 let handle = CredentialHandle {
 reference_id: reference.id,
 secret: zeroize::Zeroizing::new(secret),
 issued_at_ms: now_ms,
 expires_at_ms: now_ms + (ttl_seconds as u64) * 1_000,
 };
 self.active.lock().insert(reference.id, ActiveLease { reference_id: reference.id });
 tracing::info!(credential_ref = %reference.id, ttl_seconds, "credential fetched");
 Ok(handle)
 }

 /// Confirm a previously-fetched handle is still usable, i.e. hasn't
 /// been invalidated by a `rotate` event and hasn't outlived its TTL.
 /// The dispatch loop calls this immediately before handing the handle
 /// to a connector, and wraps it in a closure long-polling connectors
 /// re-check on every iteration so a rotation mid-step is caught rather
 /// than finishing on a revoked secret.
 pub fn check(&self, handle: &CredentialHandle) -> Result<(), CredentialError> {
 if self.revoked.lock().contains(&handle.reference_id) {
 return Err(CredentialError::Invalidated);
 }
 let now_ms = self.clock.epoch_ms();
 if handle.is_expired(now_ms) {
 return Err(CredentialError::Expired { expires_at_ms: handle.expires_at_ms, now_ms });
 }
 Ok(())
 }

 /// Release a handle: wipe its secret material (via `Drop` on
 /// `Zeroizing`) and free the lease slot so the reference can be
 /// fetched again.
 pub fn release(&self, handle: CredentialHandle) {
 self.active.lock().remove(&handle.reference_id);
 tracing::info!(credential_ref = %handle.reference_id, "credential released");
 drop(handle); // secret zeroized here
 }

 /// Invalidate every outstanding lease for `reference_id` in response to
 /// a `rotate` event from the secrets store. In-flight steps already
 /// holding the handle complete with the credential they have; any
 /// subsequent `check` call for that reference fails with
 /// [`CredentialError::Invalidated`] until the next successful `fetch`.
 pub fn rotate(&self, reference_id: CredentialReferenceId) {
 self.revoked.lock().insert(reference_id);
 tracing::warn!(credential_ref = %reference_id, "credential rotated; outstanding leases invalidated");
 }

 pub fn has_outstanding_lease(&self, reference_id: CredentialReferenceId) -> bool {
 self.active.lock().contains_key(&reference_id)
 }
}

#[cfg(test)]
#[path = "broker_tests.rs"]
mod tests;
