// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! GCP IAP connector: invokes `compute.instances.getGuestAttributes`-style
//! shell execution through the GCE guest agent via the IAP-tunneled REST
//! surface. We speak the tunnel's REST facade directly rather than
//! shelling out to `gcloud`, since the worker environment cannot assume an
//! interactive gcloud install.

use crate::redact::redact;
use crate::traits::{Connector, ExecutionRequest, OutputSink};
use incident_core::{ExecutionResult, FailureKind};
use std::time::Instant;
use tokio_util::sync::CancellationToken;

pub struct GcpIapConnector {
    http: reqwest::Client,
    tunnel_base: String,
}

impl GcpIapConnector {
    pub fn new(tunnel_base: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::builder()
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            tunnel_base: tunnel_base.into(),
        }
    }
}

#[derive(serde::Deserialize)]
struct ExecResponse {
    exit_code: i32,
    #[serde(default)]
    stdout: String,
    #[serde(default)]
    stderr: String,
}

#[async_trait::async_trait]
impl Connector for GcpIapConnector {
    fn kind(&self) -> &'static str {
        "gcp_iap"
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
                "gcp iap connector requires an identity token credential",
                started.elapsed().as_millis() as u64,
            );
        };

        if req.dry_run {
            return ExecutionResult::ok(0, "(dry run)", started.elapsed().as_millis() as u64);
        }

        let url = format!("{}/instances/{}/exec", self.tunnel_base, req.target);
        let send = self
            .http
            .post(&url)
            .bearer_auth(credential.secret.as_str())
            .timeout(req.timeout)
            .json(&serde_json::json!({ "command": req.command }))
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
                    format!("iap tunnel request failed: {e}"),
                    started.elapsed().as_millis() as u64,
                );
            }
        };

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return ExecutionResult::failed(
                FailureKind::Transient,
                format!("iap tunnel returned {status}: {}", redact(&body)),
                started.elapsed().as_millis() as u64,
            );
        }

        let parsed: ExecResponse = match response.json().await {
            Ok(parsed) => parsed,
            Err(e) => {
                return ExecutionResult::failed(
                    FailureKind::Transient,
                    format!("malformed iap tunnel response: {e}"),
                    started.elapsed().as_millis() as u64,
                );
            }
        };

        let stdout = redact(&parsed.stdout);
        let stderr = redact(&parsed.stderr);
        if !stdout.is_empty() {
            sink.emit(crate::traits::ChunkKind::Stdout, &stdout);
        }
        if !stderr.is_empty() {
            sink.emit(crate::traits::ChunkKind::Stderr, &stderr);
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
        let connector = GcpIapConnector::new("https://iap.example.internal");
        let mut sink = NullSink;
        let req = ExecutionRequest {
            target: "instance-1",
            command: "uptime",
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

    #[tokio::test]
    async fn dry_run_short_circuits() {
        let connector = GcpIapConnector::new("https://iap.example.internal");
        let mut sink = NullSink;
        let handle = incident_core::CredentialHandle {
            reference_id: incident_core::CredentialReferenceId::new(),
            secret: zeroize::Zeroizing::new("tok".to_string()),
            issued_at_ms: 0,
            expires_at_ms: 1,
        };
        let req = ExecutionRequest {
            target: "instance-1",
            command: "uptime",
            timeout: std::time::Duration::from_secs(5),
            dry_run: true,
            credential: Some(&handle),
            credential_still_valid: None,
            requires_shell: false,
        };
        let result = connector.execute(req, &mut sink, CancellationToken::new()).await;
        assert!(result.success);
    }
}
