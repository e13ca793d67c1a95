// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only write-ahead log for `ExecutionEvent`s, one file per tenant.
//! `open`/`append`/`flush`/`next_unprocessed`/`mark_processed` make recovery
//! on daemon restart a single linear replay: every session's event history
//! is reconstructible from nothing but this file plus
//! `state::MaterializedState::apply_event`.

use incident_core::ExecutionEvent;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum WalError {
 #[error("failed to open WAL file {path}: {source}")]
 Open { path: PathBuf, #[source] source: io::Error },
 #[error("failed to append to WAL: {0}")]
 Append(#[source] io::Error),
 #[error("failed to read WAL entry: {0}")]
 Read(#[source] io::Error),
 #[error("corrupt WAL entry at seq {seq}: {source}")]
 Corrupt { seq: u64, #[source] source: serde_json::Error },
}

/// One append-only line: the event plus the byte offset where it starts,
/// recorded so `next_unprocessed` can resume without rescanning from zero.
#[derive(Debug, Clone)]
pub struct WalEntry {
 pub seq: u64,
 pub event: ExecutionEvent,
}

/// A single tenant's event log. Not `Sync`: callers serialize access the
/// same way the Session State Machine already serializes per `session_id`
///, so one `Wal` per tenant is only ever touched by that
/// tenant's single-writer handler.
pub struct Wal {
 file: File,
 path: PathBuf,
 write_seq: u64,
 processed_seq: u64,
 read_cursor: u64,
}

impl Wal {
 /// Open (creating if absent) the WAL at `path`. `known_write_seq` seeds
 /// `write_seq` when the file is freshly created; on an existing file
 /// the true value is derived by scanning to EOF.
 pub fn open(path: &Path, known_write_seq: u64) -> Result<Self, WalError> {
 let existed = path.exists();
 let file = OpenOptions::new()
 .create(true)
 .read(true)
 .append(true)
 .open(path)
 .map_err(|source| WalError::Open { path: path.to_path_buf(), source })?;

 let mut wal = Self {
 file,
 path: path.to_path_buf(),
 write_seq: known_write_seq,
 processed_seq: 0,
 read_cursor: 0,
 };
 if existed {
 wal.rescan()?;
 }
 Ok(wal)
 }

 fn rescan(&mut self) -> Result<(), WalError> {
 let mut reader = BufReader::new(
 File::open(&self.path).map_err(|source| WalError::Open { path: self.path.clone(), source })?,
 );
 let mut line = String::new();
 let mut max_seq = 0;
 loop {
 line.clear();
 let n = reader.read_line(&mut line).map_err(WalError::Read)?;
 if n == 0 {
 break;
 }
 let trimmed = line.trim_end();
 if trimmed.is_empty() {
 continue;
 }
 let entry: StoredLine =
 serde_json::from_str(trimmed).map_err(|source| WalError::Corrupt { seq: max_seq, source })?;
 max_seq = entry.seq;
 }
 self.write_seq = max_seq;
 Ok(())
 }

 pub fn write_seq(&self) -> u64 {
 self.write_seq
 }

 pub fn processed_seq(&self) -> u64 {
 self.processed_seq
 }

 /// Append one event, returning the seq it was assigned. Seq is
 /// strictly monotonic and contiguous per WAL.
 #[allow(clippy::expect_used)]
 pub fn append(&mut self, event: &ExecutionEvent) -> Result<u64, WalError> {
 let seq = self.write_seq + 1;
 let line = StoredLine { seq, event: event.clone() };
 let json = serde_json::to_string(&line).expect("ExecutionEvent always serializes");
 writeln!(self.file, "{json}").map_err(WalError::Append)?;
 self.write_seq = seq;
 Ok(seq)
 }

 pub fn flush(&mut self) -> Result<(), WalError> {
 self.file.flush().map_err(WalError::Append)
 }

 /// Read the next entry past the replay cursor without advancing
 /// `processed_seq` (the caller marks processed explicitly once the
 /// entry has been folded into `MaterializedState` and any side effects
 /// are safely replayable).
 pub fn next_unprocessed(&mut self) -> Result<Option<WalEntry>, WalError> {
 let mut file = File::open(&self.path).map_err(|source| WalError::Open { path: self.path.clone(), source })?;
 file.seek(SeekFrom::Start(self.read_cursor)).map_err(WalError::Read)?;
 let mut reader = BufReader::new(file);
 let mut line = String::new();
 let n = reader.read_line(&mut line).map_err(WalError::Read)?;
 if n == 0 {
 return Ok(None);
 }
 self.read_cursor += n as u64;
 let trimmed = line.trim_end();
 let stored: StoredLine =
 serde_json::from_str(trimmed).map_err(|source| WalError::Corrupt { seq: 0, source })?;
 Ok(Some(WalEntry { seq: stored.seq, event: stored.event }))
 }

 pub fn mark_processed(&mut self, seq: u64) {
 self.processed_seq = self.processed_seq.max(seq);
 }

 /// Replay every entry from the start of the file, invoking `f` for
 /// each in seq order. Used on daemon startup to rebuild
 /// `state::MaterializedState` before accepting new work.
 pub fn replay_all(path: &Path, mut f: impl FnMut(WalEntry)) -> Result<u64, WalError> {
 if !path.exists() {
 return Ok(0);
 }
 let file = File::open(path).map_err(|source| WalError::Open { path: path.to_path_buf(), source })?;
 let mut reader = BufReader::new(file);
 let mut line = String::new();
 let mut max_seq = 0;
 loop {
 line.clear();
 let n = reader.read_line(&mut line).map_err(WalError::Read)?;
 if n == 0 {
 break;
 }
 let trimmed = line.trim_end();
 if trimmed.is_empty() {
 continue;
 }
 let stored: StoredLine =
 serde_json::from_str(trimmed).map_err(|source| WalError::Corrupt { seq: max_seq, source })?;
 max_seq = stored.seq;
 f(WalEntry { seq: stored.seq, event: stored.event });
 }
 Ok(max_seq)
 }
}

#[derive(serde::Serialize, serde::Deserialize)]
struct StoredLine {
 seq: u64,
 event: ExecutionEvent,
}

#[cfg(test)]
#[path = "wal_tests.rs"]
mod tests;
