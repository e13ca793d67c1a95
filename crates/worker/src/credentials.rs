// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker-local knowledge of `CredentialReference` metadata, and the real
//! `SecretsStore` implementation that talks to an external secrets service
//! over HTTP.
//!
//! The wire protocol only ever carries a [`CredentialReferenceId`]
//! (the daemon never sees secret material, and doesn't hold
//! the reference's `store_path`/`ttl_seconds` either — those live with
//! whichever worker is configured to reach that store). A worker therefore
//! needs its own small id -> `CredentialReference` table, bootstrapped
//! from a local file the same way `incident-daemon`'s registries are
//! rebuilt from operator-managed side tables on restart.

use crate::error::WorkerError;
use incident_core::{CredentialReference, CredentialReferenceId};
use incident_credentials::{CredentialError, SecretsStore};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Id -> reference lookup, loaded once at startup and otherwise immutable
/// for the life of the process. A reference absent here cannot be
/// fetched; the dispatch loop fails that step instead of guessing.
#[derive(Debug, Clone, Default)]
pub struct CredentialCatalog {
 by_id: HashMap<CredentialReferenceId, CredentialReference>,
}

impl CredentialCatalog {
 pub fn empty() -> Self {
 Self::default()
 }

 /// Load a JSON array of `CredentialReference` from `path`. Missing
 /// file is not an error: a worker with no bootstrap path configured
 /// (or nothing mounted yet) simply can't resolve credentialed steps.
 pub fn load_from_file(path: &Path) -> Result<Self, WorkerError> {
 let raw = std::fs::read_to_string(path)
 .map_err(|source| WorkerError::BootstrapRead { path: path.to_path_buf(), source })?;
 let refs: Vec<CredentialReference> = serde_json::from_str(&raw)
 .map_err(|source| WorkerError::BootstrapParse { path: path.to_path_buf(), source })?;
 Ok(Self { by_id: refs.into_iter().map(|r| (r.id, r)).collect() })
 }

 pub fn load_optional(path: Option<&PathBuf>) -> Result<Self, WorkerError> {
 match path {
 Some(path) => Self::load_from_file(path),
 None => Ok(Self::empty()),
 }
 }

 pub fn get(&self, id: CredentialReferenceId) -> Option<&CredentialReference> {
 self.by_id.get(&id)
 }

 pub fn resolve(&self, id: CredentialReferenceId) -> Result<&CredentialReference, WorkerError> {
 self.get(id).ok_or(WorkerError::UnknownCredentialReference(id))
 }

 #[cfg(test)]
 pub(crate) fn single(reference: CredentialReference) -> Self {
 let mut by_id = HashMap::new();
 by_id.insert(reference.id, reference);
 Self { by_id }
 }
}

/// `SecretsStore` over HTTP: `GET {endpoint}/secrets/{store_path}` returns
/// the raw secret body as plain text. Built on `reqwest::blocking` because
/// `SecretsStore::fetch_secret` is a synchronous trait method (the broker
/// is shared with non-async callers); invoke it via
/// `tokio::task::spawn_blocking` from async dispatch code.
pub struct HttpSecretsStore {
 endpoint: String,
 client: reqwest::blocking::Client,
}

impl HttpSecretsStore {
 #[allow(clippy::expect_used)]
 pub fn new(endpoint: impl Into<String>) -> Self {
 Self {
 endpoint: endpoint.into(),
 client: reqwest::blocking::Client::builder()
 .timeout(std::time::Duration::from_secs(10))
 .build()
 .expect("building the secrets store HTTP client with static config cannot fail"),
 }
 }
}

impl SecretsStore for HttpSecretsStore {
 fn fetch_secret(&self, reference: &CredentialReference) -> Result<String, CredentialError> {
 let url = format!("{}/secrets/{}", self.endpoint.trim_end_matches('/'), reference.store_path);
 let response = self
 .client
 .get(&url)
 .send()
 .map_err(|e| CredentialError::StoreUnavailable(e.to_string()))?;
 if !response.status().is_success() {
 return Err(CredentialError::StoreUnavailable(format!(
 "secrets store returned {} for {}",
 response.status(),
 reference.store_path
 )));
 }
 response.text().map_err(|e| CredentialError::StoreUnavailable(e.to_string()))
 }
}

#[cfg(test)]
mod tests {
 use super::*;

 #[test]
 fn catalog_resolves_known_reference_and_rejects_unknown() {
 let reference = CredentialReference::builder()
 .name("db-prod")
 .store_path("db/prod/readonly")
 .ttl_seconds(60)
 .build();
 let mut by_id = HashMap::new();
 by_id.insert(reference.id, reference.clone());
 let catalog = CredentialCatalog { by_id };

 assert_eq!(catalog.resolve(reference.id).unwrap().store_path, "db/prod/readonly");
 assert!(matches!(
 catalog.resolve(incident_core::CredentialReferenceId::new()),
 Err(WorkerError::UnknownCredentialReference(_))
 ));
 }

 #[test]
 fn load_optional_with_no_path_is_empty() {
 let catalog = CredentialCatalog::load_optional(None).unwrap();
 assert!(catalog.get(incident_core::CredentialReferenceId::new()).is_none());
 }
}
