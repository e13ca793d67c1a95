// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! TCP listener for the daemon⟷worker wire connection. One task per
//! connection: a reader loop decoding `WorkerMessage` frames and a
//! `tokio::sync::mpsc` writer fed by `WorkerRegistry::send`, so a slow or
//! wedged worker can never block another worker's dispatch.

use crate::coordinator::Coordinator;
use incident_core::{AgentWorker, Clock, TenantId, WorkerState};
use incident_wire::{read_frame, write_frame, DaemonMessage, WireError, WorkerMessage};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

/// Bind `addr` and serve worker connections until the process exits. Each
/// accepted connection gets its own reader/writer task pair; a connection
/// drop deregisters the worker rather than leaving it claimable forever.
pub async fn serve<C: Clock + 'static>(addr: &str, coordinator: Arc<Coordinator<C>>) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "worker wire listener bound");
    loop {
        let (socket, peer) = listener.accept().await?;
        socket.set_nodelay(true).ok();
        let coordinator = coordinator.clone();
        tokio::spawn(async move {
            if let Err(err) = handle_connection(socket, coordinator).await {
                tracing::warn!(%peer, %err, "worker connection ended");
            }
        });
    }
}

async fn handle_connection<C: Clock + 'static>(
    socket: tokio::net::TcpStream,
    coordinator: Arc<Coordinator<C>>,
) -> Result<(), WireError> {
    let (mut reader, writer) = socket.into_split();

    // The first frame on a new connection must be a `Register`; anything
    // else is a protocol violation and the connection is dropped.
    let first: WorkerMessage = read_frame(&mut reader).await?;
    let WorkerMessage::Register { worker_id, tenant_scope, network_segment, capability_set, max_load } = first else {
        tracing::warn!("worker connection opened with a non-Register frame");
        return Ok(());
    };

    let (tx, rx) = mpsc::channel::<DaemonMessage>(256);
    let worker = AgentWorker {
        id: worker_id,
        hostname: worker_id.to_string(),
        capabilities: capability_set,
        tenant_scope: tenant_scope.iter().map(|s| TenantId::from_string(s)).collect(),
        network_segment,
        production_scoped: false,
        max_load,
        current_load: 0,
        state: WorkerState::Idle,
        last_heartbeat_ms: coordinator.clock.epoch_ms(),
        current_assignment: None,
    };
    coordinator.workers.register(worker, tx);
    tracing::info!(%worker_id, "worker registered");

    let write_task = tokio::spawn(write_loop(writer, rx));

    let result = read_loop(&mut reader, worker_id, &coordinator).await;

    coordinator.workers.deregister(worker_id);
    write_task.abort();
    tracing::info!(%worker_id, "worker deregistered");
    result
}

async fn write_loop<W: AsyncWrite + Unpin>(mut writer: W, mut rx: mpsc::Receiver<DaemonMessage>) {
    while let Some(message) = rx.recv().await {
        if let Err(err) = write_frame(&mut writer, &message).await {
            tracing::warn!(%err, "failed to write to worker, closing connection");
            break;
        }
    }
}

async fn read_loop<R: AsyncRead + Unpin, C: Clock + 'static>(
    reader: &mut R,
    worker_id: incident_core::WorkerId,
    coordinator: &Arc<Coordinator<C>>,
) -> Result<(), WireError> {
    loop {
        let message: WorkerMessage = read_frame(reader).await?;
        match &message {
            WorkerMessage::Heartbeat { worker_id, load } => {
                coordinator.workers.heartbeat(*worker_id, *load, coordinator.clock.epoch_ms());
            }
            WorkerMessage::Register { .. } => {
                tracing::warn!(%worker_id, "ignoring re-Register on an already-registered connection");
            }
            _ => {
                if let Err(err) = coordinator.handle_worker_message(message.clone()).await {
                    tracing::warn!(%worker_id, %err, "failed to route worker message");
                }
            }
        }
    }
}
