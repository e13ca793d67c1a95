// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The claim/execute loop: for every `SessionCommand` the daemon hands us,
//! re-run the Policy Engine against our own view of the world, fetch a
//! credential if the step needs one, invoke the resolved connector with
//! output streamed back as it's produced, and report the terminal result.
//!
//! Retries live entirely on the daemon side (the state machine redispatches
//! per the step's `RetryPolicy` and bumps `attempt`); this loop only ever
//! answers the one attempt it was given.

use crate::config::WorkerConfig;
use crate::credentials::CredentialCatalog;
use incident_connectors::{ChunkKind, ConnectorRegistry, ExecutionRequest, OutputSink};
use incident_core::{Clock, CredentialHandle, ExecutionResult, FailureKind, OutputChannel, PolicyDecision};
use incident_credentials::CredentialBroker;
use incident_policy::{PolicyContext, PolicyEngine};
use incident_wire::{DaemonMessage, WorkerMessage};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Forwards streamed chunks to the daemon as `WorkerMessage::StepOutput`,
/// assigning the per-step monotonic `chunk_seq` and running every chunk
/// through the connector crate's redaction pass before it ever leaves this
/// process.
struct WireSink {
    session_id: incident_core::SessionId,
    step_index: usize,
    chunk_seq: u64,
    outbound: mpsc::Sender<WorkerMessage>,
}

impl OutputSink for WireSink {
    fn emit(&mut self, kind: ChunkKind, data: &str) {
        let channel = match kind {
            ChunkKind::Stdout => OutputChannel::Stdout,
            ChunkKind::Stderr => OutputChannel::Stderr,
        };
        let data = incident_connectors::redact::redact(data);
        let seq = self.chunk_seq;
        self.chunk_seq += 1;
        let message = WorkerMessage::StepOutput { session_id: self.session_id, step_index: self.step_index, chunk_seq: seq, channel, data };
        // Output is best-effort: a full outbound queue means the
        // connection is already failing and the terminal SessionResult
        // (sent after execute() returns) carries the excerpt regardless.
        let _ = self.outbound.try_send(message);
    }
}

/// Everything the dispatch loop needs that outlives any one claimed step.
pub struct Dispatcher<S: incident_credentials::SecretsStore, C: Clock + 'static> {
    pub config: WorkerConfig,
    pub connectors: ConnectorRegistry,
    pub credentials: CredentialCatalog,
    pub broker: Arc<CredentialBroker<S, C>>,
    pub policy: PolicyEngine,
 /// Targets this worker has been told are registered for the tenant it
 /// is currently serving. A worker only ever sees one `target` per
 /// dispatched step, so the egress rule is evaluated against exactly
 /// that target — a worker has no broader view of the tenant's
 /// registered connections than what the daemon hands it.
    pub registered_targets: Vec<String>,
 /// In-flight cancellation tokens keyed by (session, step), so a
 /// `DaemonMessage::Cancel` can reach a running connector invocation.
    pub in_flight: parking_lot::Mutex<HashMap<(incident_core::SessionId, usize), CancellationToken>>,
}

impl<S: incident_credentials::SecretsStore + 'static, C: Clock + 'static> Dispatcher<S, C> {
 /// Run the read side of a daemon connection: handle every inbound
 /// message until the channel closes (the connection dropped).
    pub async fn run(self: Arc<Self>, mut inbound: mpsc::Receiver<DaemonMessage>, outbound: mpsc::Sender<WorkerMessage>) {
        while let Some(message) = inbound.recv().await {
            match message {
                DaemonMessage::SessionCommand { .. } => {
                    let dispatcher = self.clone();
                    let outbound = outbound.clone();
                    tokio::spawn(async move {
                        dispatcher.handle_session_command(message_into_command(message), outbound).await;
                    });
                }
                DaemonMessage::Cancel { session_id, step_index } => {
                    if let Some(token) = self.in_flight.lock().get(&(session_id, step_index)) {
                        token.cancel();
                    }
                }
            }
        }
    }

    async fn handle_session_command(&self, cmd: SessionCommandFields, outbound: mpsc::Sender<WorkerMessage>) {
        // The daemon only ever dispatches a step after resolving its
        // target against the tenant's `ConnectionRegistry`, so a command
        // reaching this worker at all already named a registered target.
        // When this worker has been handed its own static list (a future
        // registration-time extension) that list governs instead;
        // otherwise the dispatched target is trusted as the sole
        // registered entry for this one egress check.
        let fallback_targets = [cmd.target.clone()];
        let registered_targets: &[String] =
            if self.registered_targets.is_empty() { &fallback_targets } else { &self.registered_targets };
        let ctx = PolicyContext {
            command: &cmd.command,
            connector: &cmd.connector_kind,
            target: &cmd.target,
            environment: &cmd.environment,
            blast_radius: cmd.blast_radius,
            worker_segment: &self.config.network_segment,
            worker_is_production_scoped: self.config.production_scoped,
            registered_targets,
            has_admin_claim: cmd.approved_by_admin,
            step_marked_destructive: cmd.step_marked_destructive,
        };

        match self.policy.evaluate(&ctx) {
            PolicyDecision::Allow => {}
            decision => {
                let reason = match decision {
                    PolicyDecision::DenyWithReason(reason) => reason,
                    PolicyDecision::RequireApproval | PolicyDecision::RequireTwoPersonApproval => {
                        "worker-side policy re-check requires approval the daemon has not recorded".to_string()
                    }
                    PolicyDecision::Allow => unreachable!(),
                };
                let _ = outbound.send(WorkerMessage::Nak { session_id: cmd.session_id, step_index: cmd.step_index, reason }).await;
                return;
            }
        }

        if outbound
            .send(WorkerMessage::Ack { session_id: cmd.session_id, step_index: cmd.step_index })
            .await
            .is_err()
        {
            return;
        }

        let token = CancellationToken::new();
        self.in_flight.lock().insert((cmd.session_id, cmd.step_index), token.clone());

        let result = self.execute(&cmd, token, outbound.clone()).await;

        self.in_flight.lock().remove(&(cmd.session_id, cmd.step_index));

        let _ = outbound
            .send(WorkerMessage::SessionResult {
                session_id: cmd.session_id,
                step_index: cmd.step_index,
                idempotency_key: cmd.idempotency_key,
                result,
            })
            .await;
    }

    async fn execute(&self, cmd: &SessionCommandFields, cancel: CancellationToken, outbound: mpsc::Sender<WorkerMessage>) -> ExecutionResult {
        let Some(connector) = self.connectors.get(&cmd.connector_kind) else {
            return ExecutionResult::failed(FailureKind::NoCapableWorker, format!("connector {} not registered on this worker", cmd.connector_kind), 0);
        };

        let handle: Option<CredentialHandle> = match cmd.credential_ref {
            Some(reference_id) => {
                let reference = match self.credentials.resolve(reference_id) {
                    Ok(reference) => reference.clone(),
                    Err(err) => {
                        return ExecutionResult::failed(FailureKind::CredentialUnavailable, err.to_string(), 0);
                    }
                };
                let broker = self.broker.clone();
                let ttl = reference.ttl_seconds;
                match tokio::task::spawn_blocking(move || broker.fetch(&reference, ttl)).await {
                    Ok(Ok(handle)) => Some(handle),
                    Ok(Err(err)) => {
                        return ExecutionResult::failed(FailureKind::CredentialUnavailable, err.to_string(), 0);
                    }
                    Err(join_err) => {
                        return ExecutionResult::failed(FailureKind::CredentialUnavailable, join_err.to_string(), 0);
                    }
                }
            }
            None => None,
        };

        if let Some(handle) = handle.as_ref() {
            if let Err(err) = self.broker.check(handle) {
                return ExecutionResult::failed(FailureKind::CredentialUnavailable, err.to_string(), 0);
            }
        }

        let credential_still_valid: Option<Box<dyn Fn() -> bool + Send + Sync>> = handle.as_ref().map(|h| {
            let broker = self.broker.clone();
            let h = h.clone();
            Box::new(move || broker.check(&h).is_ok()) as Box<dyn Fn() -> bool + Send + Sync>
        });

        let mut sink = WireSink { session_id: cmd.session_id, step_index: cmd.step_index, chunk_seq: 0, outbound };
        let request = ExecutionRequest {
            target: &cmd.target,
            command: &cmd.command,
            timeout: std::time::Duration::from_secs(cmd.timeout_seconds as u64),
            dry_run: cmd.dry_run,
            credential: handle.as_ref(),
            credential_still_valid: credential_still_valid.as_deref(),
            requires_shell: cmd.requires_shell,
        };
        let result = connector.execute(request, &mut sink, cancel).await;

        if let Some(handle) = handle {
            self.broker.release(handle);
        }

        result
    }
}

/// Plain-data projection of `DaemonMessage::SessionCommand`'s fields, used
/// so `handle_session_command` doesn't need to re-match the enum.
struct SessionCommandFields {
    session_id: incident_core::SessionId,
    step_index: usize,
    idempotency_key: incident_core::IdempotencyKey,
    connector_kind: String,
    target: String,
    environment: String,
    command: String,
    timeout_seconds: u32,
    dry_run: bool,
    credential_ref: Option<incident_core::CredentialReferenceId>,
    blast_radius: incident_core::BlastRadius,
    step_marked_destructive: bool,
    requires_shell: bool,
    approved_by_admin: bool,
}

fn message_into_command(message: DaemonMessage) -> SessionCommandFields {
    match message {
        DaemonMessage::SessionCommand {
            session_id,
            step_index,
            attempt: _,
            idempotency_key,
            connector_kind,
            target,
            environment,
            command,
            timeout_seconds,
            dry_run,
            credential_ref,
            blast_radius,
            step_marked_destructive,
            requires_shell,
            approved_by_admin,
        } => SessionCommandFields {
            session_id,
            step_index,
            idempotency_key,
            connector_kind,
            target,
            environment,
            command,
            timeout_seconds,
            dry_run,
            credential_ref,
            blast_radius,
            step_marked_destructive,
            requires_shell,
            approved_by_admin,
        },
        DaemonMessage::Cancel { .. } => unreachable!("Cancel is routed before message_into_command is called"),
    }
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
