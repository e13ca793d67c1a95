// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic full snapshots of a tenant's [`crate::state::MaterializedState`],
//! zstd-compressed on disk. On restart the daemon loads the newest snapshot
//! and then replays only the WAL tail written after it, instead of folding
//! the whole tenant history from `seq` 1 on every boot.

use crate::state::MaterializedState;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("failed to write snapshot {path}: {source}")]
    Write { path: PathBuf, #[source] source: io::Error },
    #[error("failed to read snapshot {path}: {source}")]
    Read { path: PathBuf, #[source] source: io::Error },
    #[error("failed to compress snapshot: {0}")]
    Compress(#[source] io::Error),
    #[error("failed to decompress snapshot: {0}")]
    Decompress(#[source] io::Error),
    #[error("failed to serialize snapshot: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to deserialize snapshot: {0}")]
    Decode(#[source] serde_json::Error),
}

/// On-disk header recording the WAL `seq` the snapshot was taken at, so the
/// caller knows where to resume replay from.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct SnapshotFile {
 /// Highest WAL seq folded into `state` at the time of the snapshot.
    up_to_seq: u64,
    state: MaterializedState,
}

/// Write `state` (taken at `up_to_seq`) to `path` as zstd-compressed JSON.
/// Writes to a sibling `.tmp` file first and renames over `path`, so a crash
/// mid-write never leaves a corrupt snapshot in place of a good one.
pub fn write_snapshot(path: &Path, up_to_seq: u64, state: &MaterializedState) -> Result<(), SnapshotError> {
    let tmp_path = path.with_extension("tmp");
    let file = File::create(&tmp_path).map_err(|source| SnapshotError::Write { path: tmp_path.clone(), source })?;
    let payload = SnapshotFile { up_to_seq, state: state.clone() };
    let json = serde_json::to_vec(&payload).map_err(SnapshotError::Encode)?;
    let mut encoder =
        zstd::Encoder::new(BufWriter::new(file), 0).map_err(SnapshotError::Compress)?;
    io::Write::write_all(&mut encoder, &json).map_err(SnapshotError::Compress)?;
    encoder.finish().map_err(SnapshotError::Compress)?;
    fs::rename(&tmp_path, path).map_err(|source| SnapshotError::Write { path: path.to_path_buf(), source })?;
    Ok(())
}

/// Load a snapshot written by [`write_snapshot`]. Returns `None` if no
/// snapshot exists yet (a fresh tenant replays the WAL from the start).
pub fn read_snapshot(path: &Path) -> Result<Option<(u64, MaterializedState)>, SnapshotError> {
    if !path.exists() {
        return Ok(None);
    }
    let file = File::open(path).map_err(|source| SnapshotError::Read { path: path.to_path_buf(), source })?;
    let mut decoder = zstd::Decoder::new(BufReader::new(file)).map_err(SnapshotError::Decompress)?;
    let mut json = Vec::new();
    io::Read::read_to_end(&mut decoder, &mut json).map_err(SnapshotError::Decompress)?;
    let payload: SnapshotFile = serde_json::from_slice(&json).map_err(SnapshotError::Decode)?;
    Ok(Some((payload.up_to_seq, payload.state)))
}
