// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! REST connector: invokes one HTTP endpoint as a remediation step (e.g.
//! "call the load balancer's drain API"). `command` is a realized JSON
//! envelope of the form `{"method":"POST","url":"...","body":"..."}` so
//! the runbook author controls method/url/body through the same
//! template-binding path every other connector uses.

use crate::redact::redact;
use crate::traits::{ChunkKind, Connector, ExecutionRequest, OutputSink};
use incident_core::{ExecutionResult, FailureKind};
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Caps response body size rendered into the event log.
const MAX_BODY_BYTES: usize = 64 * 1024;

#[derive(serde::Deserialize)]
struct RestEnvelope {
    method: String,
    url: String,
    #[serde(default)]
    body: Option<String>,
}

pub struct RestConnector {
    http: reqwest::Client,
}

impl RestConnector {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::builder()
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        }
    }
}

impl Default for RestConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Connector for RestConnector {
    fn kind(&self) -> &'static str {
        "rest"
    }

    async fn execute(
        &self,
        req: ExecutionRequest<'_>,
        sink: &mut dyn OutputSink,
        cancel: CancellationToken,
    ) -> ExecutionResult {
        let started = Instant::now();

        let envelope: RestEnvelope = match serde_json::from_str(req.command) {
            Ok(envelope) => envelope,
            Err(e) => {
                return ExecutionResult::failed(
                    FailureKind::CommandFailed,
                    format!("malformed rest step envelope: {e}"),
                    started.elapsed().as_millis() as u64,
                );
            }
        };

        let method = match envelope.method.to_uppercase().parse::<reqwest::Method>() {
            Ok(method) => method,
            Err(_) => {
                return ExecutionResult::failed(
                    FailureKind::CommandFailed,
                    format!("unsupported http method: {}", envelope.method),
                    started.elapsed().as_millis() as u64,
                );
            }
        };

        if req.dry_run {
            return ExecutionResult::ok(
                0,
                format!("(dry run) {} {}", envelope.method, envelope.url),
                started.elapsed().as_millis() as u64,
            );
        }

        let mut builder = self.http.request(method, &envelope.url).timeout(req.timeout);
        if let Some(credential) = req.credential {
            builder = builder.bearer_auth(credential.secret.as_str());
        }
        if let Some(body) = envelope.body {
            builder = builder.body(body);
        }

        let send = builder.send();
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
                    format!("request failed: {e}"),
                    started.elapsed().as_millis() as u64,
                );
            }
        };

        let status = response.status();
        let mut body = response.text().await.unwrap_or_default();
        if body.len() > MAX_BODY_BYTES {
            body.truncate(MAX_BODY_BYTES);
            body.push_str("... truncated");
        }
        let sanitized = redact(&body);
        sink.emit(ChunkKind::Stdout, &sanitized);

        let duration_ms = started.elapsed().as_millis() as u64;
        if status.is_success() {
            ExecutionResult::ok(status.as_u16() as i32, sanitized, duration_ms)
        } else {
            ExecutionResult {
                success: false,
                exit_code: Some(status.as_u16() as i32),
                stdout_excerpt: String::new(),
                stderr_excerpt: sanitized,
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
    async fn malformed_envelope_fails_fast() {
        let connector = RestConnector::new();
        let mut sink = NullSink;
        let req = ExecutionRequest {
            target: "lb-1",
            command: "not json",
            timeout: std::time::Duration::from_secs(5),
            dry_run: false,
            credential: None,
            credential_still_valid: None,
            requires_shell: false,
        };
        let result = connector.execute(req, &mut sink, CancellationToken::new()).await;
        assert!(!result.success);
        assert_eq!(result.failure_kind, Some(FailureKind::CommandFailed));
    }

    #[tokio::test]
    async fn dry_run_does_not_send() {
        let connector = RestConnector::new();
        let mut sink = NullSink;
        let req = ExecutionRequest {
            target: "lb-1",
            command: r#"{"method":"POST","url":"https://example.invalid/drain"}"#,
            timeout: std::time::Duration::from_secs(5),
            dry_run: true,
            credential: None,
            credential_still_valid: None,
            requires_shell: false,
        };
        let result = connector.execute(req, &mut sink, CancellationToken::new()).await;
        assert!(result.success);
        assert!(result.stdout_excerpt.contains("dry run"));
    }
}
