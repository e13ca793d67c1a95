// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pre-approval validation: a runbook must pass these checks before
//! `approve_runbook` may move it out of `Draft`.

use crate::template;
use incident_core::{RunbookSpec, StepDefinition};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
 #[error("placeholder {placeholder:?} in step {step:?} does not reference a declared input")]
 UndeclaredPlaceholder { step: String, placeholder: String },
 #[error("duplicate step name {0:?}")]
 DuplicateStepName(String),
 #[error("step {0:?} has timeout_seconds of 0")]
 ZeroTimeout(String),
 #[error("runbook has zero steps")]
 Empty,
}

/// Non-fatal issue surfaced to the runbook author but not blocking approval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintWarning {
 pub step: String,
 pub message: String,
}

/// Validate `spec` against the hard rules (returns `Err` on the first
/// violation) and collect soft lint warnings otherwise.
pub fn validate(spec: &RunbookSpec) -> Result<Vec<LintWarning>, ValidationError> {
 if spec.steps.is_empty() {
 // A session bound to a zero-step runbook terminates immediately as
 // completed with a warning event, so it's legal to *execute* but not
 // legal to *approve* as a meaningful procedure; callers that want
 // that boundary behavior should approve via `allow_empty`.
 return Err(ValidationError::Empty);
 }

 let mut names = HashSet::new();
 let mut warnings = Vec::new();
 let declared: HashSet<&str> = spec.declared_inputs.iter().map(String::as_str).collect();

 for step in &spec.steps {
 let name = step.name();
 if !names.insert(name.to_string()) {
 return Err(ValidationError::DuplicateStepName(name.to_string()));
 }
 if step.timeout_seconds() == 0 {
 return Err(ValidationError::ZeroTimeout(name.to_string()));
 }

 if let StepDefinition::Command(cmd) = step {
 let mut templates = vec![cmd.command_template.as_str()];
 if let Some(rollback) = &cmd.rollback_command_template {
 templates.push(rollback.as_str());
 }
 for tmpl in templates {
 let placeholders = template::placeholders(tmpl)
 .map_err(|_| ValidationError::UndeclaredPlaceholder {
 step: name.to_string(),
 placeholder: "<unterminated>".to_string(),
 })?;
 for placeholder in placeholders {
 if !declared.contains(placeholder.as_str()) {
 return Err(ValidationError::UndeclaredPlaceholder {
 step: name.to_string(),
 placeholder,
 });
 }
 }
 }

 if cmd.is_destructive_blast() && cmd.rollback_command_template.is_none() {
 warnings.push(LintWarning {
 step: name.to_string(),
 message: "destructive step has no rollback_command".to_string(),
 });
 }
 }
 }

 Ok(warnings)
}

/// Validate a runbook that is explicitly allowed to have zero steps
/// (boundary case); every other rule still applies.
pub fn validate_allow_empty(spec: &RunbookSpec) -> Result<Vec<LintWarning>, ValidationError> {
 match validate(spec) {
 Err(ValidationError::Empty) if spec.steps.is_empty() => Ok(Vec::new()),
 other => other,
 }
}

trait BlastExt {
 fn is_destructive_blast(&self) -> bool;
}

impl BlastExt for incident_core::CommandStep {
 fn is_destructive_blast(&self) -> bool {
 self.blast_radius == incident_core::BlastRadius::Destructive
 }
}

#[cfg(test)]
mod tests {
 use super::*;
 use incident_core::{ApprovalRequirement, BlastRadius, CommandStep, ExpectedOutput, RetryPolicy};

 fn step(name: &str, template: &str) -> StepDefinition {
 StepDefinition::Command(CommandStep {
 name: name.to_string(),
 connector: "local".to_string(),
 command_template: template.to_string(),
 expected_output: ExpectedOutput::None,
 rollback_command_template: None,
 timeout_seconds: 30,
 retry: RetryPolicy::none(),
 blast_radius: BlastRadius::Low,
 approval: ApprovalRequirement::None,
 requires_shell: false,
 })
 }

 #[test]
 fn rejects_empty_runbook() {
 let spec = incident_core::RunbookSpec::builder().steps(Vec::new()).build();
 assert_eq!(validate(&spec), Err(ValidationError::Empty));
 assert!(validate_allow_empty(&spec).is_ok());
 }

 #[test]
 fn rejects_undeclared_placeholder() {
 let spec = incident_core::RunbookSpec::builder()
 .steps(vec![step("ping", "ping {host}")])
 .declared_inputs(Vec::new())
 .build();
 assert!(matches!(validate(&spec), Err(ValidationError::UndeclaredPlaceholder { .. })));
 }

 #[test]
 fn accepts_declared_placeholder() {
 let spec = incident_core::RunbookSpec::builder()
 .steps(vec![step("ping", "ping {host}")])
 .declared_inputs(vec!["host".to_string()])
 .build();
 assert!(validate(&spec).is_ok());
 }

 #[test]
 fn rejects_duplicate_step_names() {
 let spec = incident_core::RunbookSpec::builder()
 .steps(vec![step("ping", "ping"), step("ping", "ping")])
 .build();
 assert_eq!(validate(&spec), Err(ValidationError::DuplicateStepName("ping".to_string())));
 }

 #[test]
 fn warns_on_destructive_step_without_rollback() {
 let mut destructive = match step("drop", "drop") {
 StepDefinition::Command(c) => c,
 _ => unreachable!(),
 };
 destructive.blast_radius = BlastRadius::Destructive;
 let spec = incident_core::RunbookSpec::builder()
 .steps(vec![StepDefinition::Command(destructive)])
 .build();
 let warnings = validate(&spec).expect("valid, only a lint warning");
 assert_eq!(warnings.len(), 1);
 }
}
