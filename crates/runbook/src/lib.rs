// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! incident-runbook: YAML parsing, `{placeholder}` template
//! binding with shell-escaping, and pre-approval validation for the
//! Runbook Specification.

pub mod template;
mod validate;
mod yaml;

pub use template::{bind, placeholders, shell_escape, TemplateError};
pub use validate::{validate, validate_allow_empty, LintWarning, ValidationError};
pub use yaml::{parse, RunbookParseError};

use incident_core::{RunbookSpec, RunbookStatus};

#[derive(Debug, thiserror::Error)]
pub enum ApproveError {
 #[error("runbook is not in draft status")]
 NotDraft,
 #[error(transparent)]
 Validation(#[from] ValidationError),
}

/// Move a runbook from `Draft` to `Approved`, running full validation first.
/// Once approved, a runbook is immutable; any further change requires
/// authoring a new version.
pub fn approve(mut spec: RunbookSpec) -> Result<RunbookSpec, ApproveError> {
 if spec.status != RunbookStatus::Draft {
 return Err(ApproveError::NotDraft);
 }
 validate_allow_empty(&spec)?;
 spec.status = RunbookStatus::Approved;
 Ok(spec)
}

/// Archive an approved runbook. Already-bound sessions are unaffected:
/// a session binds to the runbook version it was created against, so
/// archival mid-session does not cancel it.
pub fn archive(mut spec: RunbookSpec) -> RunbookSpec {
 spec.status = RunbookStatus::Archived;
 spec
}

#[cfg(test)]
mod tests {
 use super::*;

 #[test]
 fn approve_rejects_non_draft() {
 let spec = RunbookSpec::builder().status(RunbookStatus::Approved).build();
 assert!(matches!(approve(spec), Err(ApproveError::NotDraft)));
 }

 #[test]
 fn archive_sets_status() {
 let spec = RunbookSpec::builder().status(RunbookStatus::Approved).build();
 assert_eq!(archive(spec).status, RunbookStatus::Archived);
 }
}
