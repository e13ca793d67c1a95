use super::*;
use crate::config::WorkerConfig;
use incident_core::{CredentialReference, FakeClock, IdempotencyKey, SessionId};
use incident_credentials::FakeSecretsStore;
use incident_policy::PolicyEngine;
use std::sync::Arc;

fn test_config() -> WorkerConfig {
    WorkerConfig {
        worker_id: incident_core::WorkerId::new(),
        daemon_addr: "127.0.0.1:0".to_string(),
        network_segment: "default".to_string(),
        production_scoped: false,
        capability_set: vec!["fake".to_string()],
        tenant_scope: vec![],
        max_load: 4,
        heartbeat_interval_secs: 10,
        secrets_store_endpoint: "http://127.0.0.1:0".to_string(),
        secrets_bootstrap_credentials_path: None,
        log_filter: "info".to_string(),
    }
}

fn dispatcher_with(
    connector: incident_connectors::FakeConnector,
    registered_targets: Vec<String>,
) -> Arc<Dispatcher<FakeSecretsStore, FakeClock>> {
    let mut connectors = ConnectorRegistry::new();
    connectors.register(Arc::new(connector));

    let store = Arc::new(FakeSecretsStore::new());
    let broker = Arc::new(incident_credentials::CredentialBroker::new(store, FakeClock::new()));

    Arc::new(Dispatcher {
        config: test_config(),
        connectors,
        credentials: CredentialCatalog::empty(),
        broker,
        policy: PolicyEngine::default(),
        registered_targets,
        in_flight: parking_lot::Mutex::new(std::collections::HashMap::new()),
    })
}

fn base_command(session_id: SessionId, target: &str) -> SessionCommandFields {
    SessionCommandFields {
        session_id,
        step_index: 0,
        idempotency_key: IdempotencyKey::new("xsn:0:1").unwrap(),
        connector_kind: "fake".to_string(),
        target: target.to_string(),
        environment: "staging".to_string(),
        command: "echo hi".to_string(),
        timeout_seconds: 5,
        dry_run: false,
        credential_ref: None,
        blast_radius: incident_core::BlastRadius::Low,
        step_marked_destructive: false,
        requires_shell: false,
        approved_by_admin: false,
    }
}

#[tokio::test]
async fn unregistered_target_naks_without_executing() {
    let connector = incident_connectors::FakeConnector::new("fake", vec![]);
    let dispatcher = dispatcher_with(connector, vec!["other-host".to_string()]);
    let (tx, mut rx) = tokio::sync::mpsc::channel(8);
    let session_id = SessionId::new();
    dispatcher.handle_session_command(base_command(session_id, "web-01"), tx).await;

    match rx.recv().await {
        Some(WorkerMessage::Nak { reason, .. }) => assert!(reason.contains("registered")),
        other => panic!("expected a Nak, got {other:?}"),
    }
}

#[tokio::test]
async fn allowed_command_acks_executes_and_reports_result() {
    let connector =
        incident_connectors::FakeConnector::new("fake", vec![ExecutionResult::ok(0, "done", 5)]);
    let dispatcher = dispatcher_with(connector, vec!["web-01".to_string()]);
    let (tx, mut rx) = tokio::sync::mpsc::channel(8);
    let session_id = SessionId::new();
    dispatcher.handle_session_command(base_command(session_id, "web-01"), tx).await;

    assert!(matches!(rx.recv().await, Some(WorkerMessage::Ack { .. })));
    match rx.recv().await {
        Some(WorkerMessage::SessionResult { result, .. }) => assert!(result.success),
        other => panic!("expected a SessionResult, got {other:?}"),
    }
}

#[tokio::test]
async fn credential_rotated_mid_execution_fails_the_step() {
    let store = Arc::new(FakeSecretsStore::new());
    let broker = Arc::new(incident_credentials::CredentialBroker::new(store, FakeClock::new()));
    let reference = CredentialReference::builder().name("db-prod").build();

    let rotate_broker = broker.clone();
    let reference_id = reference.id;
    let connector = incident_connectors::FakeConnector::requiring_valid_credential(
        "fake",
        vec![ExecutionResult::ok(0, "done", 5)],
        move || rotate_broker.rotate(reference_id),
    );
    let mut connectors = ConnectorRegistry::new();
    connectors.register(Arc::new(connector));

    let dispatcher = Arc::new(Dispatcher {
        config: test_config(),
        connectors,
        credentials: CredentialCatalog::single(reference.clone()),
        broker,
        policy: PolicyEngine::default(),
        registered_targets: vec!["web-01".to_string()],
        in_flight: parking_lot::Mutex::new(std::collections::HashMap::new()),
    });

    let (tx, mut rx) = tokio::sync::mpsc::channel(8);
    let session_id = SessionId::new();
    let mut cmd = base_command(session_id, "web-01");
    cmd.credential_ref = Some(reference.id);
    dispatcher.handle_session_command(cmd, tx).await;

    assert!(matches!(rx.recv().await, Some(WorkerMessage::Ack { .. })));
    match rx.recv().await {
        Some(WorkerMessage::SessionResult { result, .. }) => {
            assert!(!result.success);
            assert_eq!(result.failure_kind, Some(incident_core::FailureKind::CredentialUnavailable));
        }
        other => panic!("expected a SessionResult, got {other:?}"),
    }
}

#[tokio::test]
async fn destructive_lexicon_without_marked_step_is_denied() {
    let connector = incident_connectors::FakeConnector::new("fake", vec![]);
    let dispatcher = dispatcher_with(connector, vec!["web-01".to_string()]);
    let (tx, mut rx) = tokio::sync::mpsc::channel(8);
    let session_id = SessionId::new();
    let mut cmd = base_command(session_id, "web-01");
    cmd.command = "DROP TABLE accounts".to_string();
    dispatcher.handle_session_command(cmd, tx).await;

    match rx.recv().await {
        Some(WorkerMessage::Nak { .. }) => {}
        other => panic!("expected a Nak, got {other:?}"),
    }
}
