// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `incidentctl runbook validate|approve` against fixture YAML files.

use crate::support::{self, EMPTY_STEPS_RUNBOOK, VALID_RUNBOOK};

#[test]
fn validate_accepts_a_well_formed_runbook() {
    let dir = tempfile::tempdir().unwrap();
    let path = support::write_fixture(dir.path(), "restart.yaml", VALID_RUNBOOK);

    support::cli()
        .args(&["runbook", "validate", path.to_str().unwrap()])
        .passes()
        .stdout_has("is valid (3 step(s))");
}

#[test]
fn validate_rejects_a_runbook_with_no_steps() {
    let dir = tempfile::tempdir().unwrap();
    let path = support::write_fixture(dir.path(), "empty.yaml", EMPTY_STEPS_RUNBOOK);

    support::cli()
        .args(&["runbook", "validate", path.to_str().unwrap()])
        .fails()
        .exit_code(2);
}

#[test]
fn approve_flips_status_and_writes_back_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let path = support::write_fixture(dir.path(), "restart.yaml", VALID_RUNBOOK);

    support::cli()
        .args(&["runbook", "approve", path.to_str().unwrap()])
        .passes()
        .stdout_has("approved rbk-restart-service");

    let rewritten = std::fs::read_to_string(&path).unwrap();
    let spec: incident_core::RunbookSpec = serde_yaml::from_str(&rewritten).unwrap();
    assert_eq!(spec.status, incident_core::RunbookStatus::Approved);
}

#[test]
fn approve_writes_to_out_path_when_given() {
    let dir = tempfile::tempdir().unwrap();
    let path = support::write_fixture(dir.path(), "restart.yaml", VALID_RUNBOOK);
    let out = dir.path().join("restart.approved.yaml");

    support::cli()
        .args(&["runbook", "approve", path.to_str().unwrap(), "--out", out.to_str().unwrap()])
        .passes();

    assert!(out.is_file());
    let original = std::fs::read_to_string(&path).unwrap();
    let spec: incident_core::RunbookSpec = serde_yaml::from_str(&original).unwrap();
    assert_eq!(spec.status, incident_core::RunbookStatus::Draft);
}

#[test]
fn publish_rejects_a_file_that_was_never_approved() {
    let dir = tempfile::tempdir().unwrap();
    let path = support::write_fixture(dir.path(), "restart.yaml", VALID_RUNBOOK);

    // VALID_RUNBOOK is authoring-grammar YAML, not an approved spec
    // dump, so `publish` must reject it before ever dialing a daemon.
    support::cli()
        .args(&["runbook", "publish", path.to_str().unwrap()])
        .fails()
        .exit_code(2);
}

#[test]
fn publish_of_an_approved_runbook_fails_closed_with_no_daemon_running() {
    let dir = tempfile::tempdir().unwrap();
    let path = support::write_fixture(dir.path(), "restart.yaml", VALID_RUNBOOK);
    support::cli().args(&["runbook", "approve", path.to_str().unwrap()]).passes();

    support::cli()
        .args(&["runbook", "publish", path.to_str().unwrap()])
        .fails()
        .exit_code(10);
}

#[test]
fn validate_rejects_a_runbook_with_an_unknown_risk_level() {
    let dir = tempfile::tempdir().unwrap();
    let bad = VALID_RUNBOOK.replace("risk: medium", "risk: catastrophic");
    let path = support::write_fixture(dir.path(), "bad_risk.yaml", &bad);

    support::cli()
        .args(&["runbook", "validate", path.to_str().unwrap()])
        .fails()
        .exit_code(2);
}
