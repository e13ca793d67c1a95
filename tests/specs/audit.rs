// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `incidentctl audit verify` against hash-chained audit log fixtures built
//! directly through `incident_storage::audit::AuditLog`.

use crate::support;
use incident_storage::audit::AuditLog;

fn fixture_state_dir(tenant: &str) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let tenant_dir = dir.path().join(tenant);
    std::fs::create_dir_all(&tenant_dir).unwrap();
    let audit_path = tenant_dir.join("audit.log");
    let mut log = AuditLog::open(&audit_path).unwrap();
    log.append("operator:alice", "approve_step", "session xsn-1 step 0", 1_000).unwrap();
    log.append("operator:bob", "cancel", "session xsn-1", 2_000).unwrap();
    (dir, audit_path)
}

#[test]
fn verify_reports_an_intact_chain() {
    let (dir, _audit_path) = fixture_state_dir("tenant-acme");

    let expected = format!("{}/tenant-acme/audit.log is intact\n", dir.path().display());
    support::cli()
        .args(&["audit", "verify", "--state-dir", dir.path().to_str().unwrap(), "--tenant", "tenant-acme"])
        .passes()
        .stdout_eq(&expected);
}

#[test]
fn verify_reports_a_tampered_chain_as_broken() {
    let (dir, audit_path) = fixture_state_dir("tenant-acme");
    let contents = std::fs::read_to_string(&audit_path).unwrap();
    let tampered = contents.replace("\"cancel\"", "\"cancel_tampered\"");
    std::fs::write(&audit_path, tampered).unwrap();

    support::cli()
        .args(&["audit", "verify", "--state-dir", dir.path().to_str().unwrap(), "--tenant", "tenant-acme"])
        .fails()
        .exit_code(20);
}

#[test]
fn verify_treats_a_missing_log_as_intact_and_empty() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("tenant-new")).unwrap();

    support::cli()
        .args(&["audit", "verify", "--state-dir", dir.path().to_str().unwrap(), "--tenant", "tenant-new"])
        .passes()
        .stdout_has("is intact");
}
