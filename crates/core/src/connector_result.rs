// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The outcome of one connector invocation, and the error taxonomy
//! connectors classify failures into so the engine can decide retry vs.
//! rollback vs. hard failure.

/// Coarse classification of why a step did not succeed. Connectors map
/// their native errors onto this taxonomy; the engine's retry/rollback
/// logic only ever looks at `FailureKind`, never a connector-specific error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
 /// Connection/auth/transport failure; eligible for retry per the step's
 /// `RetryPolicy`.
 Transient,
 /// Command ran but exit code or expected-output check failed.
 CommandFailed,
 /// Step ran longer than `timeout_seconds`.
 Timeout,
 /// Could not obtain a credential handle.
 CredentialUnavailable,
 /// No worker with the required capability was available.
 NoCapableWorker,
 /// Worker was lost (heartbeat missed) mid-dispatch.
 WorkerLost,
 /// Operator cancelled the session while this step was in flight.
 Cancelled,
 /// The target rejected the command because a prior invocation on the
 /// same target is still in progress (e.g. Azure Run Command's
 /// "extension busy" conflict). Distinct from `Transient` so the engine
 /// surfaces an actionable message instead of auto-retrying into
 /// another conflict.
 TargetBusy,
}

crate::simple_display! {
 FailureKind {
 Transient => "transient",
 CommandFailed => "command_failed",
 Timeout => "timeout",
 CredentialUnavailable => "credential_unavailable",
 NoCapableWorker => "no_capable_worker",
 WorkerLost => "worker_lost",
 Cancelled => "cancelled",
 TargetBusy => "target_busy",
 }
}

impl FailureKind {
 /// Whether a step that failed this way should be retried (subject to
 /// the step's remaining attempt budget) rather than failing the session
 /// outright.
 pub fn is_retryable(&self) -> bool {
 matches!(self, FailureKind::Transient | FailureKind::Timeout)
 }
}

/// The result of dispatching one step to a connector.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ExecutionResult {
 pub success: bool,
 pub exit_code: Option<i32>,
 pub stdout_excerpt: String,
 pub stderr_excerpt: String,
 pub failure_kind: Option<FailureKind>,
 pub duration_ms: u64,
}

impl ExecutionResult {
 pub fn ok(exit_code: i32, stdout: impl Into<String>, duration_ms: u64) -> Self {
 Self {
 success: true,
 exit_code: Some(exit_code),
 stdout_excerpt: stdout.into(),
 stderr_excerpt: String::new(),
 failure_kind: None,
 duration_ms,
 }
 }

 pub fn failed(kind: FailureKind, stderr: impl Into<String>, duration_ms: u64) -> Self {
 Self {
 success: false,
 exit_code: None,
 stdout_excerpt: String::new(),
 stderr_excerpt: stderr.into(),
 failure_kind: Some(kind),
 duration_ms,
 }
 }
}

#[cfg(test)]
#[path = "connector_result_tests.rs"]
mod tests;
