// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! YAML grammar for the Runbook Specification and its
//! conversion into `incident_core::RunbookSpec`.

use incident_core::{
 ApprovalRequirement, BlastRadius, CommandStep, ExpectedOutput, ManualStep, RetryPolicy, RunbookId,
 RunbookSpec, RunbookStatus, StepDefinition,
};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RunbookParseError {
 #[error("invalid YAML: {0}")]
 Yaml(String),
 #[error("unknown risk level {0:?}; expected low, medium, high, or destructive")]
 UnknownRisk(String),
 #[error("unknown step type {0:?}; expected \"command\" or \"manual\"")]
 UnknownStepType(String),
 #[error("step {index} ({name:?}) is missing its command")]
 MissingCommand { index: usize, name: String },
 #[error("runbook has no runbook_id")]
 MissingRunbookId,
 #[error("runbook has no version")]
 MissingVersion,
 #[error("version {0:?} is not a valid semantic version (expected MAJOR.MINOR.PATCH)")]
 InvalidVersion(String),
}

#[derive(Debug, Clone, serde::Deserialize)]
struct YamlInput {
 #[allow(dead_code)]
 name: String,
 #[serde(default)]
 #[allow(dead_code)]
 r#type: Option<String>,
 #[serde(default)]
 #[allow(dead_code)]
 required: bool,
 #[serde(default)]
 #[allow(dead_code)]
 description: Option<String>,
}

#[derive(Debug, Clone, serde::Deserialize)]
#[serde(untagged)]
enum YamlExpectedOutput {
 Literal(String),
 Structured { regex: Option<String>, contains: Option<String> },
}

#[derive(Debug, Clone, serde::Deserialize)]
struct YamlStep {
 name: String,
 #[serde(default = "default_step_type")]
 r#type: String,
 #[serde(default)]
 command: Option<String>,
 #[serde(default)]
 instructions: Option<String>,
 #[serde(default)]
 expected_output: Option<YamlExpectedOutput>,
 #[serde(default)]
 rollback_command: Option<String>,
 #[serde(default)]
 requires_approval: Option<bool>,
 #[serde(default)]
 timeout_seconds: Option<u32>,
 #[serde(default)]
 connector: Option<String>,
 /// Opt-in to shell interpolation for this step's command. Absent or
 /// `false` binds the template's words as argv directly.
 #[serde(default)]
 requires_shell: bool,
}

fn default_step_type() -> String {
 "command".to_string()
}

#[derive(Debug, Clone, serde::Deserialize)]
struct YamlRunbook {
 runbook_id: Option<String>,
 version: Option<String>,
 #[allow(dead_code)]
 title: Option<String>,
 service: Option<String>,
 env: Option<String>,
 risk: Option<String>,
 #[allow(dead_code)]
 description: Option<String>,
 #[serde(default)]
 inputs: Vec<YamlInput>,
 #[serde(default)]
 prechecks: Vec<YamlStep>,
 #[serde(default)]
 steps: Vec<YamlStep>,
 #[serde(default)]
 postchecks: Vec<YamlStep>,
}

/// Which of the three ordered phases a step came from, used only to pick
/// sensible defaults (idempotent retry budget, implicit connector) — the
/// phase itself is not retained on `incident_core::RunbookSpec`, which
/// models steps as one flat ordered list (no separately
/// addressed sub-collections).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
 Precheck,
 Main,
 Postcheck,
}

fn parse_risk(raw: &str) -> Result<BlastRadius, RunbookParseError> {
 match raw {
 "low" => Ok(BlastRadius::Low),
 "medium" => Ok(BlastRadius::Medium),
 "high" => Ok(BlastRadius::High),
 "destructive" => Ok(BlastRadius::Destructive),
 other => Err(RunbookParseError::UnknownRisk(other.to_string())),
 }
}

/// Fold `MAJOR.MINOR.PATCH` into the `u32` ordinal `incident_core::RunbookSpec`
/// stores. The dotted string itself isn't retained past parsing; two
/// runbooks with the same ordinal are genuinely the same version for every
/// purpose the core model cares about (session binding, ordering).
fn parse_semver_ordinal(raw: &str) -> Result<u32, RunbookParseError> {
 let mut parts = raw.splitn(3, '.');
 let (major, minor, patch) = (parts.next(), parts.next(), parts.next());
 let err = || RunbookParseError::InvalidVersion(raw.to_string());
 let major: u32 = major.ok_or_else(err)?.parse().map_err(|_| err())?;
 let minor: u32 = minor.ok_or_else(err)?.parse().map_err(|_| err())?;
 let patch: u32 = patch.ok_or_else(err)?.parse().map_err(|_| err())?;
 if major > 999 || minor > 999 || patch > 999 {
 return Err(err());
 }
 Ok(major * 1_000_000 + minor * 1_000 + patch)
}

fn default_retry(phase: Phase, blast_radius: BlastRadius) -> RetryPolicy {
 if blast_radius == BlastRadius::Destructive {
 return RetryPolicy::none();
 }
 match phase {
 Phase::Precheck | Phase::Postcheck => {
 RetryPolicy { max_attempts: 2, backoff_initial_ms: 500, backoff_multiplier: 2 }
 }
 Phase::Main => RetryPolicy::none(),
 }
}

fn convert_step(
 step: YamlStep,
 index: usize,
 phase: Phase,
 runbook_risk: BlastRadius,
) -> Result<StepDefinition, RunbookParseError> {
 match step.r#type.as_str() {
 "manual" => Ok(StepDefinition::Manual(ManualStep {
 name: step.name,
 instructions: step
 .instructions
 .or(step.command)
 .unwrap_or_else(|| "(no instructions provided)".to_string()),
 timeout_seconds: step.timeout_seconds.unwrap_or(3600),
 })),
 "command" => {
 let command = step.command.ok_or_else(|| RunbookParseError::MissingCommand {
 index,
 name: step.name.clone(),
 })?;
 let expected_output = match step.expected_output {
 None => ExpectedOutput::None,
 Some(YamlExpectedOutput::Literal(value)) => ExpectedOutput::LiteralSubstring { value },
 Some(YamlExpectedOutput::Structured { regex: Some(pattern), .. }) => {
 ExpectedOutput::Regex { pattern }
 }
 Some(YamlExpectedOutput::Structured { contains: Some(value), .. }) => {
 ExpectedOutput::LiteralSubstring { value }
 }
 Some(YamlExpectedOutput::Structured { .. }) => ExpectedOutput::None,
 };
 let approval = match step.requires_approval {
 Some(true) => ApprovalRequirement::Single,
 Some(false) => ApprovalRequirement::None,
 // Unset defaults to requiring approval once blast radius reaches medium.
 None if runbook_risk >= BlastRadius::Medium => ApprovalRequirement::Single,
 None => ApprovalRequirement::None,
 };
 Ok(StepDefinition::Command(CommandStep {
 name: step.name,
 connector: step.connector.unwrap_or_else(|| "local".to_string()),
 command_template: command,
 expected_output,
 rollback_command_template: step.rollback_command,
 timeout_seconds: step.timeout_seconds.unwrap_or(300),
 retry: default_retry(phase, runbook_risk),
 blast_radius: runbook_risk,
 approval,
 requires_shell: step.requires_shell,
 }))
 }
 other => Err(RunbookParseError::UnknownStepType(other.to_string())),
 }
}

/// Parse a runbook YAML document into `incident_core::RunbookSpec`, freshly
/// in `RunbookStatus::Draft` (approval is a separate, explicit operator
/// action — "Validates: runbook is approved").
pub fn parse(raw: &str) -> Result<RunbookSpec, RunbookParseError> {
 let doc: YamlRunbook =
 serde_yaml::from_str(raw).map_err(|e| RunbookParseError::Yaml(e.to_string()))?;

 let runbook_id = doc.runbook_id.ok_or(RunbookParseError::MissingRunbookId)?;
 let version_raw = doc.version.ok_or(RunbookParseError::MissingVersion)?;
 let version = parse_semver_ordinal(&version_raw)?;
 let risk = match &doc.risk {
 Some(raw) => parse_risk(raw)?,
 None => BlastRadius::Low,
 };

 let mut match_signals = BTreeMap::new();
 if let Some(service) = doc.service {
 match_signals.insert("service".to_string(), service);
 }
 if let Some(env) = doc.env {
 match_signals.insert("environment".to_string(), env);
 }

 let declared_inputs = doc.inputs.iter().map(|i| i.name.clone()).collect();

 let mut steps = Vec::new();
 let mut index = 0;
 for step in doc.prechecks {
 steps.push(convert_step(step, index, Phase::Precheck, risk)?);
 index += 1;
 }
 for step in doc.steps {
 steps.push(convert_step(step, index, Phase::Main, risk)?);
 index += 1;
 }
 for step in doc.postchecks {
 steps.push(convert_step(step, index, Phase::Postcheck, risk)?);
 index += 1;
 }

 Ok(RunbookSpec {
 id: RunbookId::from_string(runbook_id),
 name: doc.title.unwrap_or_default(),
 version,
 status: RunbookStatus::Draft,
 match_signals,
 declared_inputs,
 steps,
 })
}

#[cfg(test)]
mod tests {
 use super::*;

 const SAMPLE: &str = r#"
runbook_id: rbk-disk-cleanup
version: "1.2.0"
title: Disk cleanup
service: postgresql
env: prod
risk: medium
description: Clears stale WAL segments.
inputs:
 - name: host
 type: string
 required: true
prechecks:
 - name: ping host
 command: "ping -c1 {host}"
steps:
 - name: clear wal
 command: "pg_archivecleanup {host}"
 rollback_command: "restore_wal {host}"
 timeout_seconds: 120
postchecks:
 - name: confirm disk free
 command: "df -h {host}"
 expected_output: "available"
"#;

 #[test]
 fn parses_sample_runbook() {
 let spec = parse(SAMPLE).expect("parses");
 assert_eq!(spec.version, 1_002_000);
 assert_eq!(spec.steps.len(), 3);
 assert_eq!(spec.match_signals.get("service"), Some(&"postgresql".to_string()));
 assert_eq!(spec.status, RunbookStatus::Draft);
 }

 #[test]
 fn precheck_defaults_to_no_approval_when_risk_is_medium_but_explicit_false() {
 let spec = parse(SAMPLE).expect("parses");
 match &spec.steps[0] {
 StepDefinition::Command(c) => assert_eq!(c.approval, ApprovalRequirement::Single),
 _ => panic!("expected command step"),
 }
 }

 #[test]
 fn postcheck_literal_expected_output_parses() {
 let spec = parse(SAMPLE).expect("parses");
 match &spec.steps[2] {
 StepDefinition::Command(c) => {
 assert_eq!(c.expected_output, ExpectedOutput::LiteralSubstring { value: "available".to_string() })
 }
 _ => panic!("expected command step"),
 }
 }

 #[test]
 fn rejects_unknown_risk() {
 let bad = SAMPLE.replace("risk: medium", "risk: catastrophic");
 assert!(matches!(parse(&bad), Err(RunbookParseError::UnknownRisk(_))));
 }

 #[test]
 fn rejects_non_semver_version() {
 let bad = SAMPLE.replace("version: \"1.2.0\"", "version: \"1.2\"");
 assert!(matches!(parse(&bad), Err(RunbookParseError::InvalidVersion(_))));
 }
}
