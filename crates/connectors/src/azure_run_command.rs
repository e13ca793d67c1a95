// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Azure Run Command connector: submits a `RunShellScript` extension
//! invocation against an Azure VM resource id and polls for completion.
//! Azure rejects a second invocation while one is in flight with a 409
//! conflict — that maps to `FailureKind::TargetBusy` rather than
//! `Transient` so the engine surfaces an actionable message instead of
//! retrying into the same conflict.

use crate::redact::redact;
use crate::traits::{ChunkKind, Connector, ExecutionRequest, OutputSink};
use incident_core::{ExecutionResult, FailureKind};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

const API_VERSION: &str = "2024-07-01";
const POLL_INTERVAL: Duration = Duration::from_secs(3);

pub struct AzureRunCommandConnector {
    http: reqwest::Client,
    management_base: String,
}

impl AzureRunCommandConnector {
    pub fn new(management_base: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::builder()
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            management_base: management_base.into(),
        }
    }

    fn run_command_url(&self, vm_resource_id: &str) -> String {
        format!(
            "{}{}/runCommand?api-version={}",
            self.management_base, vm_resource_id, API_VERSION
        )
    }
}

#[async_trait::async_trait]
impl Connector for AzureRunCommandConnector {
    fn kind(&self) -> &'static str {
        "azure_run_command"
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
                "azure run command connector requires a bearer token credential",
                started.elapsed().as_millis() as u64,
            );
        };

        if req.dry_run {
            return ExecutionResult::ok(0, "(dry run)", started.elapsed().as_millis() as u64);
        }

        let body = serde_json::json!({
            "commandId": "RunShellScript",
            "script": [req.command],
        });

        let submit = self
            .http
            .post(self.run_command_url(req.target))
            .bearer_auth(credential.secret.as_str())
            .json(&body)
            .send();

        let submit_result = tokio::select! {
            result = submit => result,
            _ = cancel.cancelled() => {
                return ExecutionResult::failed(FailureKind::Cancelled, "cancelled", started.elapsed().as_millis() as u64);
            }
        };

        let response = match submit_result {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                return ExecutionResult::failed(
                    FailureKind::Timeout,
                    "timed out submitting run command",
                    started.elapsed().as_millis() as u64,
                );
            }
            Err(e) => {
                return ExecutionResult::failed(
                    FailureKind::Transient,
                    format!("failed to submit run command: {e}"),
                    started.elapsed().as_millis() as u64,
                );
            }
        };

        if response.status().as_u16() == 409 {
            tracing::warn!(target = req.target, "azure run command rejected: target busy");
            return ExecutionResult::failed(
                FailureKind::TargetBusy,
                "a run command is already in progress on this target",
                started.elapsed().as_millis() as u64,
            );
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return ExecutionResult::failed(
                FailureKind::Transient,
                format!("run command submission failed: {status} {}", redact(&body)),
                started.elapsed().as_millis() as u64,
            );
        }

        let operation_url = response
            .headers()
            .get("Azure-AsyncOperation")
            .or_else(|| response.headers().get("Location"))
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let Some(operation_url) = operation_url else {
            return ExecutionResult::failed(
                FailureKind::Transient,
                "run command response carried no polling location",
                started.elapsed().as_millis() as u64,
            );
        };

        self.poll_until_complete(&operation_url, credential, req.credential_still_valid, req.timeout, sink, cancel, started)
            .await
    }
}

impl AzureRunCommandConnector {
    async fn poll_until_complete(
        &self,
        operation_url: &str,
        credential: &incident_core::CredentialHandle,
        credential_still_valid: Option<&(dyn Fn() -> bool + Send + Sync)>,
        timeout: Duration,
        sink: &mut dyn OutputSink,
        cancel: CancellationToken,
        started: Instant,
    ) -> ExecutionResult {
        let deadline = started + timeout;
        loop {
            if Instant::now() >= deadline {
                return ExecutionResult::failed(
                    FailureKind::Timeout,
                    "step exceeded timeout_seconds while polling run command",
                    started.elapsed().as_millis() as u64,
                );
            }
            if cancel.is_cancelled() {
                return ExecutionResult::failed(
                    FailureKind::Cancelled,
                    "cancelled",
                    started.elapsed().as_millis() as u64,
                );
            }
            if let Some(still_valid) = credential_still_valid {
                if !still_valid() {
                    return ExecutionResult::failed(
                        FailureKind::CredentialUnavailable,
                        "credential rotated or expired while polling run command",
                        started.elapsed().as_millis() as u64,
                    );
                }
            }

            let poll = self
                .http
                .get(operation_url)
                .bearer_auth(credential.secret.as_str())
                .send()
                .await;

            let response = match poll {
                Ok(response) => response,
                Err(_) => {
                    tokio::time::sleep(POLL_INTERVAL).await;
                    continue;
                }
            };

            let status: PollStatus = match response.json().await {
                Ok(status) => status,
                Err(_) => {
                    tokio::time::sleep(POLL_INTERVAL).await;
                    continue;
                }
            };

            match status.status.as_str() {
                "InProgress" | "Running" | "Accepted" => {
                    tokio::time::sleep(POLL_INTERVAL).await;
                    continue;
                }
                "Succeeded" => {
                    let stdout = status.extract_output("StdOut");
                    let stderr = status.extract_output("StdErr");
                    let sanitized_stdout = redact(&stdout);
                    let sanitized_stderr = redact(&stderr);
                    if !sanitized_stdout.is_empty() {
                        sink.emit(ChunkKind::Stdout, &sanitized_stdout);
                    }
                    if !sanitized_stderr.is_empty() {
                        sink.emit(ChunkKind::Stderr, &sanitized_stderr);
                    }
                    return ExecutionResult {
                        success: true,
                        exit_code: Some(0),
                        stdout_excerpt: sanitized_stdout,
                        stderr_excerpt: sanitized_stderr,
                        failure_kind: None,
                        duration_ms: started.elapsed().as_millis() as u64,
                    };
                }
                _ => {
                    let stderr = redact(&status.extract_output("StdErr"));
                    return ExecutionResult {
                        success: false,
                        exit_code: None,
                        stdout_excerpt: String::new(),
                        stderr_excerpt: stderr,
                        failure_kind: Some(FailureKind::CommandFailed),
                        duration_ms: started.elapsed().as_millis() as u64,
                    };
                }
            }
        }
    }
}

#[derive(serde::Deserialize)]
struct PollStatus {
    status: String,
    #[serde(default)]
    properties: Option<PollProperties>,
}

#[derive(serde::Deserialize)]
struct PollProperties {
    #[serde(default)]
    output: Option<PollOutput>,
}

#[derive(serde::Deserialize)]
struct PollOutput {
    #[serde(default)]
    value: Vec<PollOutputValue>,
}

#[derive(serde::Deserialize)]
struct PollOutputValue {
    code: String,
    message: String,
}

impl PollStatus {
    fn extract_output(&self, code_contains: &str) -> String {
        self.properties
            .as_ref()
            .and_then(|p| p.output.as_ref())
            .map(|o| {
                o.value
                    .iter()
                    .filter(|v| v.code.contains(code_contains))
                    .map(|v| v.message.clone())
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_command_url_includes_api_version() {
        let connector = AzureRunCommandConnector::new("https://management.azure.com");
        let url = connector.run_command_url("/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Compute/virtualMachines/vm1");
        assert!(url.contains("runCommand"));
        assert!(url.contains(API_VERSION));
    }
}
