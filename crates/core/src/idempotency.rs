// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! IdempotencyKey: a client-supplied deduplication token for ticket
//! ingestion, so re-delivery of the same webhook never binds a second
//! session to the same incident.

/// A caller-supplied key, scoped to `(tenant, source)`, used to deduplicate
/// ticket ingestion. Unlike the `define_id!` types, this is never generated
/// by us: it is supplied by the upstream system (or derived from its event
/// id) and accepted as opaque bytes up to a reasonable length.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    pub const MAX_LEN: usize = 256;

    pub fn new(raw: impl Into<String>) -> Result<Self, IdempotencyKeyError> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(IdempotencyKeyError::Empty);
        }
        if raw.len() > Self::MAX_LEN {
            return Err(IdempotencyKeyError::TooLong(raw.len()));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdempotencyKeyError {
    #[error("idempotency key must not be empty")]
    Empty,
    #[error("idempotency key too long: {0} bytes (max {max})", max = IdempotencyKey::MAX_LEN)]
    TooLong(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_key_rejected() {
        assert_eq!(IdempotencyKey::new(""), Err(IdempotencyKeyError::Empty));
    }

    #[test]
    fn oversized_key_rejected() {
        let raw = "a".repeat(IdempotencyKey::MAX_LEN + 1);
        assert!(matches!(IdempotencyKey::new(raw), Err(IdempotencyKeyError::TooLong(_))));
    }

    #[test]
    fn valid_key_roundtrips() {
        let key = IdempotencyKey::new("pagerduty:evt-123").unwrap();
        assert_eq!(key.as_str(), "pagerduty:evt-123");
    }
}
