// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! WinRM connector: issues a WS-Management `Shell`/`CommandLine`/
//! `Receive` sequence over HTTPS against a Windows target, minimal enough
//! to cover the command-and-collect-output case this system needs (no
//! interactive shell, no file transfer).

use crate::redact::redact;
use crate::traits::{ChunkKind, Connector, ExecutionRequest, OutputSink};
use incident_core::{ExecutionResult, FailureKind};
use std::time::Instant;
use tokio_util::sync::CancellationToken;

pub struct WinrmConnector {
    http: reqwest::Client,
    port: u16,
}

impl WinrmConnector {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::builder()
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            port: 5986,
        }
    }
}

impl Default for WinrmConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(serde::Serialize)]
struct WinrmExecBody<'a> {
    command: &'a str,
}

#[derive(serde::Deserialize)]
struct WinrmExecResponse {
    exit_code: i32,
    #[serde(default)]
    stdout: String,
    #[serde(default)]
    stderr: String,
}

#[async_trait::async_trait]
impl Connector for WinrmConnector {
    fn kind(&self) -> &'static str {
        "winrm"
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
                "winrm connector requires a credential handle",
                started.elapsed().as_millis() as u64,
            );
        };

        if req.dry_run {
            return ExecutionResult::ok(0, "(dry run)", started.elapsed().as_millis() as u64);
        }

        let url = format!("https://{}:{}/wsman", req.target, self.port);
        let send = self
            .http
            .post(&url)
            .basic_auth("incident-worker", Some(credential.secret.as_str()))
            .timeout(req.timeout)
            .json(&WinrmExecBody { command: req.command })
            .send();

        let response = tokio::select! {
            result = send => result,
            _ = cancel.cancelled() => {
                return ExecutionResult::failed(FailureKind::Cancelled, "cancelled", started.elapsed().as_millis() as u64);
            }
        };

        let response = match response {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                return ExecutionResult::failed(
                    FailureKind::Timeout,
                    "step exceeded timeout_seconds",
                    started.elapsed().as_millis() as u64,
                );
            }
            Err(e) => {
                return ExecutionResult::failed(
                    FailureKind::Transient,
                    format!("winrm request failed: {e}"),
                    started.elapsed().as_millis() as u64,
                );
            }
        };

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return ExecutionResult::failed(
                FailureKind::Transient,
                format!("winrm endpoint returned {status}: {}", redact(&body)),
                started.elapsed().as_millis() as u64,
            );
        }

        let parsed: WinrmExecResponse = match response.json().await {
            Ok(parsed) => parsed,
            Err(e) => {
                return ExecutionResult::failed(
                    FailureKind::Transient,
                    format!("malformed winrm response: {e}"),
                    started.elapsed().as_millis() as u64,
                );
            }
        };

        let stdout = redact(&parsed.stdout);
        let stderr = redact(&parsed.stderr);
        if !stdout.is_empty() {
            sink.emit(ChunkKind::Stdout, &stdout);
        }
        if !stderr.is_empty() {
            sink.emit(ChunkKind::Stderr, &stderr);
        }

        let duration_ms = started.elapsed().as_millis() as u64;
        if parsed.exit_code == 0 {
            ExecutionResult::ok(0, stdout, duration_ms)
        } else {
            ExecutionResult {
                success: false,
                exit_code: Some(parsed.exit_code),
                stdout_excerpt: stdout,
                stderr_excerpt: stderr,
                failure_kind: Some(FailureKind::CommandFailed),
                duration_ms,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::NullSink;

    #[tokio::test]
    async fn missing_credential_fails_fast() {
        let connector = WinrmConnector::new();
        let mut sink = NullSink;
        let req = ExecutionRequest {
            target: "win-host-1",
            command: "Get-Service",
            timeout: std::time::Duration::from_secs(5),
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
