use super::*;

#[test]
fn handle_expiry_is_inclusive() {
    let handle = CredentialHandle {
        reference_id: CredentialReferenceId::new(),
        secret: zeroize::Zeroizing::new("s3cr3t".to_string()),
        issued_at_ms: 0,
        expires_at_ms: 1_000,
    };
    assert!(!handle.is_expired(999));
    assert!(handle.is_expired(1_000));
}

#[test]
fn debug_format_redacts_secret() {
    let handle = CredentialHandle {
        reference_id: CredentialReferenceId::new(),
        secret: zeroize::Zeroizing::new("s3cr3t".to_string()),
        issued_at_ms: 0,
        expires_at_ms: 1_000,
    };
    let formatted = format!("{handle:?}");
    assert!(!formatted.contains("s3cr3t"));
    assert!(formatted.contains("<redacted>"));
}
