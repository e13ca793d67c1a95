// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local connector: runs a command on the worker's own host, restricted to
//! a defined whitelist of health and diagnostic commands on the worker's
//! own host.
//!
//! By default `req.command` is split into argv and execve'd directly: each
//! placeholder `incident-runbook` substituted arrives as one opaque
//! argument, never re-interpreted for globbing, pipelines, or redirection.
//! A step that declares `requires_shell` instead runs through `/bin/sh -c`,
//! exactly as every step did before that flag existed.

use crate::redact::redact;
use crate::traits::{ChunkKind, Connector, ExecutionRequest, OutputSink};
use incident_core::{ExecutionResult, FailureKind};
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

/// Matches the realized command's first whitespace-delimited token against
/// an allowed program name. This is deliberately coarse — the whitelist
/// exists to keep the local connector to health/diagnostic use, not to be
/// a general sandboxing layer (that is the job of `incident-policy`'s
/// lexicon and the sandbox profile applied per environment).
pub struct LocalConnector {
    allowed_programs: Vec<String>,
}

impl LocalConnector {
    pub fn new(allowed_programs: Vec<String>) -> Self {
        Self { allowed_programs }
    }

    pub fn default_whitelist() -> Self {
        Self::new(vec![
            "echo".to_string(),
            "uptime".to_string(),
            "df".to_string(),
            "free".to_string(),
            "ps".to_string(),
            "systemctl".to_string(),
            "ping".to_string(),
        ])
    }

    fn program_allowed(&self, command: &str) -> bool {
        let program = command.split_whitespace().next().unwrap_or("");
        self.allowed_programs.iter().any(|p| p == program)
    }
}

#[async_trait::async_trait]
impl Connector for LocalConnector {
    fn kind(&self) -> &'static str {
        "local"
    }

    async fn execute(
        &self,
        req: ExecutionRequest<'_>,
        sink: &mut dyn OutputSink,
        cancel: CancellationToken,
    ) -> ExecutionResult {
        let started = Instant::now();
        if !self.program_allowed(req.command) {
            tracing::warn!(command = req.command, "local connector refused non-whitelisted command");
            return ExecutionResult::failed(
                FailureKind::CommandFailed,
                "command is not in the local connector whitelist",
                started.elapsed().as_millis() as u64,
            );
        }
        if req.dry_run {
            return ExecutionResult::ok(0, "(dry run)", started.elapsed().as_millis() as u64);
        }

        let mut command = if req.requires_shell {
            let mut c = Command::new("/bin/sh");
            c.arg("-c").arg(req.command);
            c
        } else {
            let argv = match shell_words::split(req.command) {
                Ok(argv) if !argv.is_empty() => argv,
                Ok(_) => {
                    return ExecutionResult::failed(
                        FailureKind::CommandFailed,
                        "bound command is empty",
                        started.elapsed().as_millis() as u64,
                    );
                }
                Err(e) => {
                    return ExecutionResult::failed(
                        FailureKind::CommandFailed,
                        format!("failed to split command into arguments: {e}"),
                        started.elapsed().as_millis() as u64,
                    );
                }
            };
            let mut c = Command::new(&argv[0]);
            c.args(&argv[1..]);
            c
        };

        let mut child = match command
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                return ExecutionResult::failed(
                    FailureKind::CommandFailed,
                    format!("failed to spawn: {e}"),
                    started.elapsed().as_millis() as u64,
                );
            }
        };

        let mut stdout_excerpt = String::new();
        let mut stderr_excerpt = String::new();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let timeout_fut = tokio::time::sleep(req.timeout);
        tokio::pin!(timeout_fut);

        let result = tokio::select! {
            status = child.wait() => status,
            _ = &mut timeout_fut => {
                let _ = child.start_kill();
                tokio::time::sleep(std::time::Duration::from_millis(200)).await;
                let _ = child.kill().await;
                return ExecutionResult::failed(FailureKind::Timeout, "step exceeded timeout_seconds", started.elapsed().as_millis() as u64);
            }
            _ = cancel.cancelled() => {
                let _ = child.start_kill();
                tokio::time::sleep(std::time::Duration::from_millis(200)).await;
                let _ = child.kill().await;
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
        match result {
            Ok(status) if status.success() => {
                ExecutionResult::ok(status.code().unwrap_or(0), stdout_excerpt, duration_ms)
            }
            Ok(status) => ExecutionResult {
                success: false,
                exit_code: status.code(),
                stdout_excerpt,
                stderr_excerpt,
                failure_kind: Some(FailureKind::CommandFailed),
                duration_ms,
            },
            Err(e) => ExecutionResult::failed(FailureKind::CommandFailed, format!("wait failed: {e}"), duration_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{CollectingSink, NullSink};

    fn req<'a>(command: &'a str) -> ExecutionRequest<'a> {
        ExecutionRequest {
            target: "localhost",
            command,
            timeout: std::time::Duration::from_secs(5),
            dry_run: false,
            credential: None,
            credential_still_valid: None,
            requires_shell: false,
        }
    }

    fn req_shell(command: &str) -> ExecutionRequest<'_> {
        let mut r = req(command);
        r.requires_shell = true;
        r
    }

    #[tokio::test]
    async fn rejects_command_outside_whitelist() {
        let connector = LocalConnector::default_whitelist();
        let mut sink = NullSink;
        let result = connector.execute(req("rm -rf /"), &mut sink, CancellationToken::new()).await;
        assert!(!result.success);
        assert_eq!(result.failure_kind, Some(FailureKind::CommandFailed));
    }

    #[tokio::test]
    async fn runs_whitelisted_command() {
        let connector = LocalConnector::default_whitelist();
        let mut sink = CollectingSink::default();
        let result = connector.execute(req("echo hello"), &mut sink, CancellationToken::new()).await;
        assert!(result.success);
        assert!(result.stdout_excerpt.contains("hello"));
    }

    #[tokio::test]
    async fn dry_run_never_spawns() {
        let connector = LocalConnector::default_whitelist();
        let mut sink = NullSink;
        let mut request = req("echo hello");
        request.dry_run = true;
        let result = connector.execute(request, &mut sink, CancellationToken::new()).await;
        assert!(result.success);
        assert_eq!(result.stdout_excerpt, "(dry run)");
    }

    #[tokio::test]
    async fn argv_mode_does_not_interpret_shell_metacharacters() {
        let connector = LocalConnector::default_whitelist();
        let mut sink = CollectingSink::default();
        let result = connector.execute(req("echo hi; echo bye"), &mut sink, CancellationToken::new()).await;
        assert!(result.success);
        assert_eq!(result.stdout_excerpt.trim(), "hi; echo bye");
    }

    #[tokio::test]
    async fn argv_mode_passes_a_spaced_placeholder_as_one_argument() {
        let connector = LocalConnector::default_whitelist();
        let mut sink = CollectingSink::default();
        let result = connector.execute(req("echo 'prod-db restart'"), &mut sink, CancellationToken::new()).await;
        assert!(result.success);
        assert_eq!(result.stdout_excerpt.trim(), "prod-db restart");
    }

    #[tokio::test]
    async fn requires_shell_step_keeps_shell_interpolation() {
        let connector = LocalConnector::default_whitelist();
        let mut sink = CollectingSink::default();
        let result = connector.execute(req_shell("echo hi; echo bye"), &mut sink, CancellationToken::new()).await;
        assert!(result.success);
        let lines: Vec<&str> = result.stdout_excerpt.lines().collect();
        assert_eq!(lines, vec!["hi", "bye"]);
    }

    #[tokio::test]
    async fn argv_mode_rejects_an_unparsable_command() {
        let connector = LocalConnector::default_whitelist();
        let mut sink = NullSink;
        let result = connector.execute(req("echo 'unterminated"), &mut sink, CancellationToken::new()).await;
        assert!(!result.success);
        assert_eq!(result.failure_kind, Some(FailureKind::CommandFailed));
    }

    #[tokio::test]
    async fn timeout_fails_the_step() {
        let connector = LocalConnector::new(vec!["sleep".to_string()]);
        let mut sink = NullSink;
        let mut request = req("sleep 5");
        request.timeout = std::time::Duration::from_millis(50);
        let result = connector.execute(request, &mut sink, CancellationToken::new()).await;
        assert!(!result.success);
        assert_eq!(result.failure_kind, Some(FailureKind::Timeout));
    }

    #[tokio::test]
    async fn cancellation_fails_the_step() {
        let connector = LocalConnector::new(vec!["sleep".to_string()]);
        let mut sink = NullSink;
        let request = req("sleep 5");
        let cancel = CancellationToken::new();
        let cancel_clone = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            cancel_clone.cancel();
        });
        let result = connector.execute(request, &mut sink, cancel).await;
        assert!(!result.success);
        assert_eq!(result.failure_kind, Some(FailureKind::Cancelled));
    }
}
