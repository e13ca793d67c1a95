use super::*;
use crate::store::FakeSecretsStore;
use incident_core::{CredentialReferenceBuilder, FakeClock};

fn broker() -> (CredentialBroker<FakeSecretsStore, FakeClock>, Arc<FakeSecretsStore>) {
    let store = Arc::new(FakeSecretsStore::new());
    let clock = FakeClock::new();
    clock.set_epoch_ms(1_000_000);
    (CredentialBroker::new(store.clone(), clock), store)
}

#[test]
fn fetch_returns_handle_with_secret_material() {
    let (broker, store) = broker();
    let reference = CredentialReferenceBuilder::default().build();
    store.set(&reference.store_path, "s3cr3t");
    let handle = broker.fetch(&reference, 60).expect("fetch succeeds");
    assert_eq!(&*handle.secret, "s3cr3t");
    assert_eq!(handle.expires_at_ms, 1_000_000 + 60_000);
}

#[test]
fn fetch_rejects_ttl_above_cap() {
    let (broker, store) = broker();
    let reference = CredentialReferenceBuilder::default().build();
    store.set(&reference.store_path, "s3cr3t");
    let err = broker.fetch(&reference, 600).unwrap_err();
    assert!(matches!(err, CredentialError::TtlExceeded { .. }));
}

#[test]
fn second_fetch_while_leased_is_refused() {
    let (broker, store) = broker();
    let reference = CredentialReferenceBuilder::default().build();
    store.set(&reference.store_path, "s3cr3t");
    let _first = broker.fetch(&reference, 60).expect("first fetch succeeds");
    let err = broker.fetch(&reference, 60).unwrap_err();
    assert!(matches!(err, CredentialError::NotFound(_)));
}

#[test]
fn release_frees_the_lease_slot() {
    let (broker, store) = broker();
    let reference = CredentialReferenceBuilder::default().build();
    store.set(&reference.store_path, "s3cr3t");
    let first = broker.fetch(&reference, 60).expect("first fetch succeeds");
    broker.release(first);
    assert!(broker.fetch(&reference, 60).is_ok());
}

#[test]
fn rotate_invalidates_outstanding_handle() {
    let (broker, store) = broker();
    let reference = CredentialReferenceBuilder::default().build();
    store.set(&reference.store_path, "s3cr3t");
    let handle = broker.fetch(&reference, 60).expect("fetch succeeds");
    broker.rotate(reference.id);
    assert_eq!(broker.check(&handle), Err(CredentialError::Invalidated));
}

#[test]
fn check_fails_once_expired() {
    let (broker, store) = broker();
    let reference = CredentialReferenceBuilder::default().build();
    store.set(&reference.store_path, "s3cr3t");
    let handle = broker.fetch(&reference, 60).expect("fetch succeeds");
    assert!(broker.check(&handle).is_ok());
    // Re-fetch with a clock advanced past expiry isn't representative of
    // broker internals directly, so construct the expiry check via a fresh
    // handle with the same reference but an already-past expires_at_ms.
    let mut expired = handle.clone();
    expired.expires_at_ms = 0;
    assert!(matches!(broker.check(&expired), Err(CredentialError::Expired { .. })));
}

#[test]
fn store_unavailable_surfaces_as_credential_error() {
    let (broker, store) = broker();
    let reference = CredentialReferenceBuilder::default().build();
    store.set_unavailable(true);
    let err = broker.fetch(&reference, 60).unwrap_err();
    assert!(matches!(err, CredentialError::StoreUnavailable(_)));
}
