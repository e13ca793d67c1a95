// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

//! Shared helpers for the `incidentctl` integration specs.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Resolve the `incidentctl` binary next to this test binary, the way
/// `cargo test` lays out `target/debug/`.
fn incidentctl_binary() -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    let standard = manifest_dir.join("target/debug/incidentctl");
    if standard.exists() {
        return standard;
    }
    if let Ok(exe) = std::env::current_exe() {
        if let Some(debug_dir) = exe.parent().and_then(|d| d.parent()) {
            let fallback = debug_dir.join("incidentctl");
            if fallback.exists() {
                return fallback;
            }
        }
    }
    standard
}

/// Fluent builder mirroring the shape of `incidentctl` invocations under test.
pub struct CliBuilder {
    args: Vec<String>,
}

pub fn cli() -> CliBuilder {
    CliBuilder { args: Vec::new() }
}

impl CliBuilder {
    pub fn args(mut self, args: &[&str]) -> Self {
        self.args.extend(args.iter().map(|s| s.to_string()));
        self
    }

    fn command(self) -> Command {
        let mut cmd = Command::new(incidentctl_binary());
        cmd.args(&self.args);
        cmd
    }

    pub fn passes(self) -> RunAssert {
        let mut cmd = self.command();
        let output = cmd.output().expect("command should run");
        assert!(
            output.status.success(),
            "expected command to pass, got exit code {:?}\nstdout: {}\nstderr: {}",
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        RunAssert { output }
    }

    pub fn fails(self) -> RunAssert {
        let mut cmd = self.command();
        let output = cmd.output().expect("command should run");
        assert!(
            !output.status.success(),
            "expected command to fail, but it passed\nstdout: {}\nstderr: {}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        RunAssert { output }
    }
}

/// Result of a CLI run for chaining assertions.
pub struct RunAssert {
    output: Output,
}

impl RunAssert {
    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.output.stdout).into_owned()
    }

    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.output.stderr).into_owned()
    }

    pub fn code(&self) -> Option<i32> {
        self.output.status.code()
    }

    pub fn exit_code(self, expected: i32) -> Self {
        assert_eq!(self.code(), Some(expected), "stdout: {}\nstderr: {}", self.stdout(), self.stderr());
        self
    }

    pub fn stdout_has(self, expected: &str) -> Self {
        let stdout = self.stdout();
        assert!(stdout.contains(expected), "stdout does not contain {expected:?}\nstdout: {stdout}");
        self
    }

    pub fn stderr_has(self, expected: &str) -> Self {
        let stderr = self.stderr();
        assert!(stderr.contains(expected), "stderr does not contain {expected:?}\nstderr: {stderr}");
        self
    }

 /// Exact stdout match, with a readable diff on mismatch. Prefer this
 /// over `stdout_has` for single-line machine-readable output, where a
 /// substring match would miss a format regression.
    pub fn stdout_eq(self, expected: &str) -> Self {
        similar_asserts::assert_eq!(self.stdout(), expected);
        self
    }
}

/// Write `contents` to `dir/name` and return the full path.
pub fn write_fixture(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).expect("fixture writes");
    path
}

pub const VALID_RUNBOOK: &str = r#"
runbook_id: rbk-restart-service
version: "1.0.0"
title: Restart a stuck service
service: checkout
env: prod
risk: medium
description: Restarts the checkout service and confirms it comes back healthy.
inputs:
  - name: host
    type: string
    required: true
prechecks:
  - name: confirm service is unhealthy
    command: "curl -fsS http://{host}/healthz"
steps:
  - name: restart service
    command: "systemctl restart checkout"
    rollback_command: "systemctl start checkout"
    timeout_seconds: 60
postchecks:
  - name: confirm service recovered
    command: "curl -fsS http://{host}/healthz"
    expected_output: "ok"
"#;

pub const EMPTY_STEPS_RUNBOOK: &str = r#"
runbook_id: rbk-empty
version: "1.0.0"
title: No-op
risk: low
"#;
