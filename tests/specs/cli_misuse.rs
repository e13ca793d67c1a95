// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Misuse of `incidentctl` itself (bad subcommands, missing required
//! arguments) exits 2, via clap's own error path (exit codes).

use crate::support;

#[test]
fn no_subcommand_is_a_misuse_error() {
 support::cli().args(&[]).fails().exit_code(2);
}

#[test]
fn unknown_subcommand_is_a_misuse_error() {
 support::cli().args(&["frobnicate"]).fails().exit_code(2);
}

#[test]
fn runbook_validate_without_a_path_is_a_misuse_error() {
 support::cli().args(&["runbook", "validate"]).fails().exit_code(2);
}

#[test]
fn session_approve_without_required_flags_is_a_misuse_error() {
 support::cli().args(&["session", "approve", "xsn-does-not-matter"]).fails().exit_code(2);
}

#[test]
fn audit_verify_without_tenant_is_a_misuse_error() {
 let dir = tempfile::tempdir().unwrap();
 support::cli()
 .args(&["audit", "verify", "--state-dir", dir.path().to_str().unwrap()])
 .fails()
 .exit_code(2);
}
