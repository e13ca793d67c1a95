// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hash-chained audit log. Every privileged action — approval decisions,
//! credential fetches, policy denials, cancel requests — appends one entry
//! here in addition to whatever `ExecutionEvent` it also produced, so the
//! audit trail survives even if the event log's retention window has
//! expired.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("failed to open audit log {path}: {source}")]
    Open { path: PathBuf, #[source] source: io::Error },
    #[error("failed to append to audit log: {0}")]
    Append(#[source] io::Error),
    #[error("corrupt audit log entry: {0}")]
    Corrupt(#[source] serde_json::Error),
    #[error("hash chain broken at seq {seq}: expected prev_hash {expected}, found {found}")]
    ChainBroken { seq: u64, expected: String, found: String },
}

/// One append-only audit record. `prev_hash` is the hash of the entry
/// immediately before it (the genesis entry uses an all-zero hash), and
/// `hash` is `sha256(prev_hash || canonical_json(seq, actor, action, detail,
/// recorded_at_ms))`, letting `verify_chain` detect tampering anywhere in
/// the file without needing an external Merkle store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub seq: u64,
    pub actor: String,
    pub action: String,
    pub detail: String,
    pub recorded_at_ms: u64,
    pub prev_hash: String,
    pub hash: String,
}

const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000";

fn compute_hash(seq: u64, actor: &str, action: &str, detail: &str, recorded_at_ms: u64, prev_hash: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(prev_hash.as_bytes());
    hasher.update(seq.to_le_bytes());
    hasher.update(actor.as_bytes());
    hasher.update(action.as_bytes());
    hasher.update(detail.as_bytes());
    hasher.update(recorded_at_ms.to_le_bytes());
    format!("{:x}", hasher.finalize())
}

/// One tenant's append-only audit log. Like [`crate::wal::Wal`], single
/// writer per tenant, serialized by the state machine's per-session
/// handler.
pub struct AuditLog {
    file: File,
    path: PathBuf,
    seq: u64,
    last_hash: String,
}

impl AuditLog {
    pub fn open(path: &Path) -> Result<Self, AuditError> {
        let existed = path.exists();
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)
            .map_err(|source| AuditError::Open { path: path.to_path_buf(), source })?;
        let mut log = Self { file, path: path.to_path_buf(), seq: 0, last_hash: GENESIS_HASH.to_string() };
        if existed {
            let entries = log.read_all()?;
            if let Some(last) = entries.last() {
                log.seq = last.seq;
                log.last_hash = last.hash.clone();
            }
        }
        Ok(log)
    }

    #[allow(clippy::expect_used)]
    pub fn append(
        &mut self,
        actor: impl Into<String>,
        action: impl Into<String>,
        detail: impl Into<String>,
        recorded_at_ms: u64,
    ) -> Result<AuditEntry, AuditError> {
        let actor = actor.into();
        let action = action.into();
        let detail = detail.into();
        let seq = self.seq + 1;
        let hash = compute_hash(seq, &actor, &action, &detail, recorded_at_ms, &self.last_hash);
        let entry = AuditEntry {
            seq,
            actor,
            action,
            detail,
            recorded_at_ms,
            prev_hash: self.last_hash.clone(),
            hash: hash.clone(),
        };
        let json = serde_json::to_string(&entry).expect("AuditEntry always serializes");
        writeln!(self.file, "{json}").map_err(AuditError::Append)?;
        self.file.flush().map_err(AuditError::Append)?;
        self.seq = seq;
        self.last_hash = hash;
        Ok(entry)
    }

    fn read_all(&self) -> Result<Vec<AuditEntry>, AuditError> {
        read_entries(&self.path)
    }

 /// Walk the file from disk and confirm every entry's hash matches its
 /// predecessor's; called by `incidentctl audit verify`.
    pub fn verify_chain(path: &Path) -> Result<(), AuditError> {
        let entries = read_entries(path)?;
        let mut prev_hash = GENESIS_HASH.to_string();
        for entry in entries {
            if entry.prev_hash != prev_hash {
                return Err(AuditError::ChainBroken { seq: entry.seq, expected: prev_hash, found: entry.prev_hash });
            }
            let recomputed =
                compute_hash(entry.seq, &entry.actor, &entry.action, &entry.detail, entry.recorded_at_ms, &prev_hash);
            if recomputed != entry.hash {
                return Err(AuditError::ChainBroken { seq: entry.seq, expected: recomputed, found: entry.hash });
            }
            prev_hash = entry.hash;
        }
        Ok(())
    }
}

fn read_entries(path: &Path) -> Result<Vec<AuditEntry>, AuditError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let file = File::open(path).map_err(|source| AuditError::Open { path: path.to_path_buf(), source })?;
    let reader = BufReader::new(file);
    let mut entries = Vec::new();
    for line in reader.lines() {
        let line = line.map_err(AuditError::Append)?;
        if line.trim().is_empty() {
            continue;
        }
        entries.push(serde_json::from_str(&line).map_err(AuditError::Corrupt)?);
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn append_chains_hashes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("audit.log");
        let mut log = AuditLog::open(&path).unwrap();
        let e1 = log.append("operator:alice", "approve_step", "session xsn-1 step 0", 1_000).unwrap();
        let e2 = log.append("operator:bob", "cancel", "session xsn-1", 2_000).unwrap();
        assert_eq!(e2.prev_hash, e1.hash);
        assert!(AuditLog::verify_chain(&path).is_ok());
    }

    #[test]
    fn reopen_continues_chain() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("audit.log");
        {
            let mut log = AuditLog::open(&path).unwrap();
            log.append("operator:alice", "approve_step", "detail", 1_000).unwrap();
        }
        let mut log = AuditLog::open(&path).unwrap();
        let e2 = log.append("operator:bob", "cancel", "detail", 2_000).unwrap();
        assert_eq!(e2.seq, 2);
        assert!(AuditLog::verify_chain(&path).is_ok());
    }

    #[test]
    fn tampered_entry_breaks_chain() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("audit.log");
        {
            let mut log = AuditLog::open(&path).unwrap();
            log.append("operator:alice", "approve_step", "detail", 1_000).unwrap();
            log.append("operator:bob", "cancel", "detail", 2_000).unwrap();
        }
        let contents = std::fs::read_to_string(&path).unwrap();
        let tampered = contents.replace("\"detail\"", "\"detail_tampered\"");
        std::fs::write(&path, tampered).unwrap();
        assert!(AuditLog::verify_chain(&path).is_err());
    }

    #[test]
    fn empty_log_verifies_clean() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("audit.log");
        assert!(AuditLog::verify_chain(&path).is_ok());
    }
}
