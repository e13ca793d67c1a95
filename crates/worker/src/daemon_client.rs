// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The worker's half of the daemon⟷worker wire connection: connect,
//! `Register`, heartbeat on an interval, and hand every decoded
//! `DaemonMessage` to the dispatch loop. Mirrors
//! `incident-daemon::listener`'s reader/writer task-pair shape from the
//! other side of the socket.

use crate::config::WorkerConfig;
use crate::error::WorkerError;
use incident_wire::{read_frame, write_frame, DaemonMessage, WorkerMessage};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::mpsc;

/// A live connection to the daemon: a sender half for outbound
/// `WorkerMessage`s and a receiver half for inbound `DaemonMessage`s. The
/// actual socket read/write loops run as spawned tasks so a stalled
/// connector invocation never blocks heartbeats or vice versa.
pub struct DaemonConnection {
    pub outbound: mpsc::Sender<WorkerMessage>,
    pub inbound: mpsc::Receiver<DaemonMessage>,
}

/// Connect to the daemon, send the initial `Register`, and spawn the
/// heartbeat/read/write tasks. Returns once registration is sent;
/// callers drive the dispatch loop off `inbound`.
pub async fn connect(config: &WorkerConfig) -> Result<DaemonConnection, WorkerError> {
    let stream = TcpStream::connect(&config.daemon_addr).await.map_err(incident_wire::WireError::Io)?;
    stream.set_nodelay(true).ok();
    let (mut reader, writer) = stream.into_split();

    let (outbound_tx, outbound_rx) = mpsc::channel::<WorkerMessage>(256);
    let (inbound_tx, inbound_rx) = mpsc::channel::<DaemonMessage>(256);

    outbound_tx
        .send(WorkerMessage::Register {
            worker_id: config.worker_id,
            tenant_scope: config.tenant_scope.clone(),
            network_segment: config.network_segment.clone(),
            capability_set: config.capability_set.clone(),
            max_load: config.max_load,
        })
        .await
        .map_err(|_| WorkerError::ConnectionClosed(config.worker_id))?;

    tokio::spawn(write_loop(writer, outbound_rx));
    tokio::spawn(heartbeat_loop(
        config.worker_id,
        config.heartbeat_interval_secs,
        outbound_tx.clone(),
    ));
    let worker_id = config.worker_id;
    tokio::spawn(async move {
        if let Err(err) = read_loop(&mut reader, &inbound_tx).await {
            tracing::warn!(%worker_id, %err, "daemon connection read loop ended");
        }
    });

    Ok(DaemonConnection { outbound: outbound_tx, inbound: inbound_rx })
}

async fn write_loop<W: AsyncWrite + Unpin>(mut writer: W, mut rx: mpsc::Receiver<WorkerMessage>) {
    while let Some(message) = rx.recv().await {
        if let Err(err) = write_frame(&mut writer, &message).await {
            tracing::warn!(%err, "failed to write to daemon, closing connection");
            break;
        }
    }
}

async fn heartbeat_loop(worker_id: incident_core::WorkerId, interval_secs: u64, tx: mpsc::Sender<WorkerMessage>) {
    let mut ticker = tokio::time::interval(std::time::Duration::from_secs(interval_secs.max(1)));
    loop {
        ticker.tick().await;
        // `load` is reported by the dispatch loop via a shared counter in
        // a fuller build; a fixed 0 here is refined once that wiring
        // lands.
        if tx.send(WorkerMessage::Heartbeat { worker_id, load: 0 }).await.is_err() {
            break;
        }
    }
}

async fn read_loop<R: AsyncRead + Unpin>(
    reader: &mut R,
    inbound: &mpsc::Sender<DaemonMessage>,
) -> Result<(), WorkerError> {
    loop {
        let message: DaemonMessage = read_frame(reader).await?;
        if inbound.send(message).await.is_err() {
            return Ok(());
        }
    }
}
