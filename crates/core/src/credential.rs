// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CredentialReference: a pointer to a secret held in an external store,
//! never the secret material itself. Materialization into a short-lived
//! `CredentialHandle` is the Credential Broker's job (`incident-credentials`).

use crate::tenant::TenantId;

crate::define_id! {
 /// Unique identifier for a credential reference record.
    pub struct CredentialReferenceId("crf-");
}

/// A tenant-scoped pointer to a secret in the configured secrets store.
/// Holds no secret material; only the lookup coordinates.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CredentialReference {
    pub id: CredentialReferenceId,
    pub tenant_id: TenantId,
    pub name: String,
 /// Opaque path/key within `secrets_store_endpoint`.
    pub store_path: String,
    pub ttl_seconds: u32,
}

/// A materialized, time-boxed credential handed to a connector for the
/// duration of exactly one step invocation. `secret` is zeroized on drop;
/// never logged, never persisted, never serialized.
#[derive(Clone)]
pub struct CredentialHandle {
    pub reference_id: CredentialReferenceId,
    pub secret: zeroize::Zeroizing<String>,
    pub issued_at_ms: u64,
    pub expires_at_ms: u64,
}

impl CredentialHandle {
    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms >= self.expires_at_ms
    }
}

impl std::fmt::Debug for CredentialHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialHandle")
            .field("reference_id", &self.reference_id)
            .field("secret", &"<redacted>")
            .field("issued_at_ms", &self.issued_at_ms)
            .field("expires_at_ms", &self.expires_at_ms)
            .finish()
    }
}

#[cfg(any(test, feature = "test-support"))]
crate::builder! {
    pub struct CredentialReferenceBuilder => CredentialReference {
        computed { id: CredentialReferenceId = CredentialReferenceId::new() }
        set { tenant_id: TenantId = TenantId::new() }
        into { name: String = "ssh-bastion-key" }
        into { store_path: String = "secret/data/bastion" }
        set { ttl_seconds: u32 = 300 }
    }
}

#[cfg(test)]
#[path = "credential_tests.rs"]
mod tests;
