// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

/// Failure modes the Credential Broker classifies; the worker maps any
/// variant here onto a step failure with reason `credential_error` or
/// `credential_invalidated`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CredentialError {
 #[error("secrets store unavailable: {0}")]
 StoreUnavailable(String),
 #[error("no active handle for credential reference {0}")]
 NotFound(String),
 #[error("requested ttl {requested_secs}s exceeds the {max_secs}s cap")]
 TtlExceeded { requested_secs: u32, max_secs: u32 },
 #[error("credential handle expired at {expires_at_ms}, now {now_ms}")]
 Expired { expires_at_ms: u64, now_ms: u64 },
 /// Emitted to any step still holding a handle when a `rotate` event
 /// invalidates its reference.
 #[error("credential invalidated by rotation")]
 Invalidated,
}
