// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SSH connector: shells out to the system `ssh` client rather than
//! embedding a protocol implementation, the same approach the pack's
//! closest example uses for its SSH execution backend (key material is
//! never passed on the command line: it is written to a mode-0600 temp
//! file for the duration of one invocation and removed immediately after).

use crate::redact::redact;
use crate::traits::{ChunkKind, Connector, ExecutionRequest, OutputSink};
use incident_core::{ExecutionResult, FailureKind};
use std::io::Write;
use std::process::Stdio;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

/// `target` is expected in `user@host[:port]` form. Host-key checking is
/// mandatory: a `known_hosts` path must be supplied, never
/// `StrictHostKeyChecking=no` — host key verification is never disabled.
pub struct SshConnector {
    known_hosts_path: String,
    connect_timeout: std::time::Duration,
}

impl SshConnector {
    pub fn new(known_hosts_path: impl Into<String>) -> Self {
        Self {
            known_hosts_path: known_hosts_path.into(),
            connect_timeout: std::time::Duration::from_secs(10),
        }
    }

    fn parse_target(target: &str) -> (String, Option<u16>) {
        match target.rsplit_once(':') {
            Some((host, port)) if port.chars().all(|c| c.is_ascii_digit()) => {
                (host.to_string(), port.parse().ok())
            }
            _ => (target.to_string(), None),
        }
    }
}

#[async_trait::async_trait]
impl Connector for SshConnector {
    fn kind(&self) -> &'static str {
        "ssh"
    }

    async fn execute(
        &self,
        req: ExecutionRequest<'_>,
        sink: &mut dyn OutputSink,
        cancel: CancellationToken,
    ) -> ExecutionResult {
        let started = Instant::now();

        let Some(credential) = req.credential else {
            return ExecutionResult::failed(
                FailureKind::CredentialUnavailable,
                "ssh connector requires a credential handle",
                started.elapsed().as_millis() as u64,
            );
        };

        let mut key_file = match tempfile::NamedTempFile::new() {
            Ok(f) => f,
            Err(e) => {
                return ExecutionResult::failed(
                    FailureKind::Transient,
                    format!("failed to allocate key material temp file: {e}"),
                    started.elapsed().as_millis() as u64,
                );
            }
        };
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Err(e) = std::fs::set_permissions(
                key_file.path(),
                std::fs::Permissions::from_mode(0o600),
            ) {
                return ExecutionResult::failed(
                    FailureKind::Transient,
                    format!("failed to set key file permissions: {e}"),
                    started.elapsed().as_millis() as u64,
                );
            }
        }
        if let Err(e) = key_file.write_all(credential.secret.as_bytes()) {
            return ExecutionResult::failed(
                FailureKind::Transient,
                format!("failed to stage key material: {e}"),
                started.elapsed().as_millis() as u64,
            );
        }

        let (host, port) = Self::parse_target(req.target);

        if req.dry_run {
            return ExecutionResult::ok(0, "(dry run)", started.elapsed().as_millis() as u64);
        }

        let mut args: Vec<String> = vec![
            "-o".into(),
            "BatchMode=yes".into(),
            "-o".into(),
            format!("UserKnownHostsFile={}", self.known_hosts_path),
            "-o".into(),
            "StrictHostKeyChecking=yes".into(),
            "-o".into(),
            format!("ConnectTimeout={}", self.connect_timeout.as_secs()),
            "-i".into(),
            key_file.path().display().to_string(),
        ];
        if let Some(port) = port {
            args.push("-p".into());
            args.push(port.to_string());
        }
        args.push(host);
        args.push(req.command.to_string());

        let mut child = match Command::new("ssh")
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                return ExecutionResult::failed(
                    FailureKind::Transient,
                    format!("failed to spawn ssh: {e}"),
                    started.elapsed().as_millis() as u64,
                );
            }
        };

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let mut stdout_excerpt = String::new();
        let mut stderr_excerpt = String::new();

        let timeout_fut = tokio::time::sleep(req.timeout);
        tokio::pin!(timeout_fut);

        let status = tokio::select! {
            status = child.wait() => status,
            _ = &mut timeout_fut => {
                let _ = child.start_kill();
                return ExecutionResult::failed(FailureKind::Timeout, "step exceeded timeout_seconds", started.elapsed().as_millis() as u64);
            }
            _ = cancel.cancelled() => {
                let _ = child.start_kill();
                return ExecutionResult::failed(FailureKind::Cancelled, "cancelled", started.elapsed().as_millis() as u64);
            }
        };

        if let Some(out) = stdout {
            let mut lines = BufReader::new(out).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let sanitized = redact(&line);
                sink.emit(ChunkKind::Stdout, &sanitized);
                stdout_excerpt.push_str(&sanitized);
                stdout_excerpt.push('\n');
            }
        }
        if let Some(err) = stderr {
            let mut lines = BufReader::new(err).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let sanitized = redact(&line);
                sink.emit(ChunkKind::Stderr, &sanitized);
                stderr_excerpt.push_str(&sanitized);
                stderr_excerpt.push('\n');
            }
        }

        let duration_ms = started.elapsed().as_millis() as u64;
        match status {
            Ok(exit) if exit.success() => {
                ExecutionResult::ok(exit.code().unwrap_or(0), stdout_excerpt, duration_ms)
            }
            Ok(exit) => {
                // ssh itself exits 255 on connection-level failure (auth,
                // host-key mismatch, unreachable host); anything else is the
                // remote command's own exit code.
                let kind = if exit.code() == Some(255) {
                    FailureKind::Transient
                } else {
                    FailureKind::CommandFailed
                };
                ExecutionResult {
                    success: false,
                    exit_code: exit.code(),
                    stdout_excerpt,
                    stderr_excerpt,
                    failure_kind: Some(kind),
                    duration_ms,
                }
            }
            Err(e) => ExecutionResult::failed(
                FailureKind::Transient,
                format!("wait failed: {e}"),
                duration_ms,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_target_splits_host_and_port() {
        assert_eq!(
            SshConnector::parse_target("10.0.0.5:2222"),
            ("10.0.0.5".to_string(), Some(2222))
        );
    }

    #[test]
    fn parse_target_without_port() {
        assert_eq!(
            SshConnector::parse_target("db-primary.internal"),
            ("db-primary.internal".to_string(), None)
        );
    }

    #[tokio::test]
    async fn missing_credential_fails_fast() {
        let connector = SshConnector::new("/dev/null");
        let mut sink = crate::traits::NullSink;
        let req = ExecutionRequest {
            target: "example.invalid",
            command: "uptime",
            timeout: std::time::Duration::from_secs(1),
            dry_run: false,
            credential: None,
            credential_still_valid: None,
            requires_shell: false,
        };
        let result = connector.execute(req, &mut sink, CancellationToken::new()).await;
        assert!(!result.success);
        assert_eq!(result.failure_kind, Some(FailureKind::CredentialUnavailable));
    }
}
