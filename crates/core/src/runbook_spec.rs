// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runbook Specification: the declarative, versioned description of what an
//! execution session does. Parsed from YAML by `incident-runbook`; this
//! module only owns the in-memory shape and its invariants.

use std::collections::BTreeMap;

crate::define_id! {
 /// Unique identifier for a runbook specification.
    pub struct RunbookId("rbk-");
}

/// How destructive a step's failure mode is, used by the Policy Engine to
/// decide whether auto-execution is permitted at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlastRadius {
 /// Read-only or fully reversible (e.g. restart a single stateless pod).
    Low,
 /// Reversible with a rollback command, affects one host/service.
    Medium,
 /// Affects multiple hosts, a shared resource, or has no rollback.
    High,
 /// Irreversible or affects the whole tenant's footprint.
    Destructive,
}

crate::simple_display! {
    BlastRadius {
        Low => "low",
        Medium => "medium",
        High => "high",
        Destructive => "destructive",
    }
}

/// When a step requires sign-off before dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalRequirement {
 /// Never requires approval (subject to Policy Engine override).
    None,
 /// Requires exactly one operator approval.
    Single,
 /// Requires two distinct operators to approve (two-person rule).
    TwoPerson,
}

crate::simple_display! {
    ApprovalRequirement {
        None => "none",
        Single => "single",
        TwoPerson => "two_person",
    }
}

/// Retry behavior for a transient connector failure.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_initial_ms: u64,
    pub backoff_multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 1, backoff_initial_ms: 0, backoff_multiplier: 1 }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self::default()
    }

 /// Delay before the given attempt number (1-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> std::time::Duration {
        if attempt <= 1 {
            return std::time::Duration::ZERO;
        }
        let exp = self.backoff_multiplier.saturating_pow(attempt - 1).max(1);
        std::time::Duration::from_millis(self.backoff_initial_ms.saturating_mul(exp as u64))
    }
}

/// How the connector should judge whether a command step succeeded, beyond
/// a zero exit code.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ExpectedOutput {
 /// Exit code alone is authoritative.
    None,
 /// Stdout must contain this substring.
    LiteralSubstring { value: String },
 /// Stdout must match this regular expression.
    Regex { pattern: String },
}

/// A step dispatched to a connector (SSH/WinRM/Azure Run Command/GCP
/// IAP/Database/REST/Local).
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CommandStep {
    pub name: String,
 /// Which `InfrastructureConnection` connector type this targets, e.g.
 /// `"ssh"`, `"winrm"`, `"azure_run_command"`, `"gcp_iap"`, `"database"`,
 /// `"rest"`, `"local"`.
    pub connector: String,
 /// `{placeholder}`-templated command line, bound against session inputs
 /// at dispatch time.
    pub command_template: String,
    pub expected_output: ExpectedOutput,
 /// `{placeholder}`-templated rollback command, run if the session is
 /// rolled back after this step completed.
    pub rollback_command_template: Option<String>,
    pub timeout_seconds: u32,
    pub retry: RetryPolicy,
    pub blast_radius: BlastRadius,
    pub approval: ApprovalRequirement,
 /// Whether this step's bound command must run through a shell rather
 /// than execve'd directly with the template's words as argv. `false`
 /// (the default) binds arguments: each `{placeholder}` substitutes as
 /// one opaque value, never re-interpreted for globbing, pipes, or
 /// redirection. Set this only for a step whose command genuinely needs
 /// shell features (pipelines, `&&`, redirection) — it widens the
 /// step's effective blast radius regardless of the declared
 /// `blast_radius`, since a shell reinterprets every substituted value.
    #[serde(default)]
    pub requires_shell: bool,
}

/// A step that cannot be automated and requires an operator to perform an
/// out-of-band action and explicitly acknowledge completion.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ManualStep {
    pub name: String,
    pub instructions: String,
    pub timeout_seconds: u32,
}

/// A single step in a runbook's ordered step list.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum StepDefinition {
    Command(CommandStep),
    Manual(ManualStep),
}

impl StepDefinition {
    pub fn name(&self) -> &str {
        match self {
            StepDefinition::Command(s) => &s.name,
            StepDefinition::Manual(s) => &s.name,
        }
    }

    pub fn timeout_seconds(&self) -> u32 {
        match self {
            StepDefinition::Command(s) => s.timeout_seconds,
            StepDefinition::Manual(s) => s.timeout_seconds,
        }
    }

    pub fn is_destructive(&self) -> bool {
        matches!(
            self,
            StepDefinition::Command(CommandStep { blast_radius: BlastRadius::Destructive, .. })
        )
    }
}

/// Approval/publication lifecycle of a runbook itself (distinct from a
/// session's approval gate, which applies per-step).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunbookStatus {
    Draft,
    Approved,
    Archived,
}

crate::simple_display! {
    RunbookStatus {
        Draft => "draft",
        Approved => "approved",
        Archived => "archived",
    }
}

/// A versioned, declarative description of how to resolve one class of
/// incident: an ordered list of steps, the inputs they're templated
/// against, and metadata used by the Matcher.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RunbookSpec {
    pub id: RunbookId,
    pub name: String,
    pub version: u32,
    pub status: RunbookStatus,
 /// Signal match expressions (exact-match key/value against
 /// `Ticket::signals`) used by the Matcher.
    pub match_signals: BTreeMap<String, String>,
 /// Names of inputs a bound session must supply values for; referenced
 /// by `{placeholder}` tokens in step command templates.
    pub declared_inputs: Vec<String>,
    pub steps: Vec<StepDefinition>,
}

impl RunbookSpec {
    pub fn step(&self, index: usize) -> Option<&StepDefinition> {
        self.steps.get(index)
    }

    pub fn is_approved(&self) -> bool {
        matches!(self.status, RunbookStatus::Approved)
    }

 /// Highest blast radius across all command steps; used to decide
 /// whether a runbook is eligible for fully-automated execution at all.
    pub fn max_blast_radius(&self) -> BlastRadius {
        self.steps
            .iter()
            .filter_map(|s| match s {
                StepDefinition::Command(c) => Some(c.blast_radius),
                StepDefinition::Manual(_) => None,
            })
            .max()
            .unwrap_or(BlastRadius::Low)
    }
}

#[cfg(any(test, feature = "test-support"))]
crate::builder! {
    pub struct RunbookSpecBuilder => RunbookSpec {
        computed { id: RunbookId = RunbookId::new() }
        into { name: String = "disk-cleanup" }
        set { version: u32 = 1 }
        set { status: RunbookStatus = RunbookStatus::Approved }
        set { match_signals: BTreeMap<String, String> = Default::default() }
        set { declared_inputs: Vec<String> = Vec::new() }
        set { steps: Vec<StepDefinition> = Vec::new() }
    }
}

#[cfg(any(test, feature = "test-support"))]
impl CommandStep {
 /// Construct a minimal, low-risk command step for tests.
    pub fn test_default(name: impl Into<String>, command_template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            connector: "local".to_string(),
            command_template: command_template.into(),
            expected_output: ExpectedOutput::None,
            rollback_command_template: None,
            timeout_seconds: 30,
            retry: RetryPolicy::none(),
            blast_radius: BlastRadius::Low,
            approval: ApprovalRequirement::None,
            requires_shell: false,
        }
    }
}

#[cfg(test)]
#[path = "runbook_spec_tests.rs"]
mod tests;
