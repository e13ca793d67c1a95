// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The external secrets store boundary. The broker never holds raw secret
//! material outside of a fetch call's return value, and nothing upstream
//! of the broker (policy, engine, storage) ever sees a [`SecretsStore`]
//! reference at all.

use crate::error::CredentialError;
use incident_core::CredentialReference;

/// External secrets store (e.g. Vault, AWS Secrets Manager). Implemented
/// against the real store in the worker binary; a fake in-memory
/// implementation backs tests.
pub trait SecretsStore: Send + Sync {
    fn fetch_secret(&self, reference: &CredentialReference) -> Result<String, CredentialError>;
}

/// In-memory store for tests and local development, gated behind
/// `test-support` so production builds never link it by accident.
#[cfg(any(test, feature = "test-support"))]
pub struct FakeSecretsStore {
    secrets: parking_lot::Mutex<std::collections::HashMap<String, String>>,
    unavailable: std::sync::atomic::AtomicBool,
}

#[cfg(any(test, feature = "test-support"))]
impl FakeSecretsStore {
    pub fn new() -> Self {
        Self {
            secrets: parking_lot::Mutex::new(std::collections::HashMap::new()),
            unavailable: std::sync::atomic::AtomicBool::new(false),
        }
    }

    pub fn set(&self, store_path: impl Into<String>, secret: impl Into<String>) {
        self.secrets.lock().insert(store_path.into(), secret.into());
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, std::sync::atomic::Ordering::SeqCst);
    }
}

#[cfg(any(test, feature = "test-support"))]
impl Default for FakeSecretsStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "test-support"))]
impl SecretsStore for FakeSecretsStore {
    fn fetch_secret(&self, reference: &CredentialReference) -> Result<String, CredentialError> {
        if self.unavailable.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(CredentialError::StoreUnavailable(reference.store_path.clone()));
        }
        self.secrets
            .lock()
            .get(&reference.store_path)
            .cloned()
            .ok_or_else(|| CredentialError::NotFound(reference.store_path.clone()))
    }
}
