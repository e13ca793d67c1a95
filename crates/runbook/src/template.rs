// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `{placeholder}` binding for step command templates and rollback command
//! templates.
//!
//! Every substituted value is single-quote wrapped with embedded quotes
//! escaped, regardless of whether the destination connector runs the
//! realized command through a shell or splits it into argv directly: a
//! quoted token can never be split on whitespace or used to inject a
//! second command, which is the property both binding modes need. The
//! choice of shell vs. argv is made downstream by the connector, driven
//! by the step's `requires_shell` flag — this module only ever produces a
//! single realized string.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
 #[error("template references undeclared input {0:?}")]
 UndeclaredInput(String),
 #[error("unterminated placeholder starting at byte {0}")]
 Unterminated(usize),
}

/// Single-quote wrap `value`, escaping embedded single quotes as the
/// standard `'\''` four-character sequence (close quote, escaped quote,
/// reopen quote).
pub fn shell_escape(value: &str) -> String {
 let mut out = String::with_capacity(value.len() + 2);
 out.push('\'');
 for ch in value.chars() {
 if ch == '\'' {
 out.push_str("'\\''");
 } else {
 out.push(ch);
 }
 }
 out.push('\'');
 out
}

/// Extract every `{name}` placeholder referenced by `template`, in order of
/// first appearance. Used by `incident-runbook`'s validator to confirm
/// every placeholder names a declared input.
pub fn placeholders(template: &str) -> Result<Vec<String>, TemplateError> {
 let mut names = Vec::new();
 let bytes = template.as_bytes();
 let mut i = 0;
 while i < bytes.len() {
 if bytes[i] == b'{' {
 let start = i;
 let end = template[i + 1..]
 .find('}')
 .map(|rel| i + 1 + rel)
 .ok_or(TemplateError::Unterminated(start))?;
 names.push(template[i + 1..end].to_string());
 i = end + 1;
 } else {
 i += 1;
 }
 }
 Ok(names)
}

/// Substitute every `{name}` placeholder in `template` with the
/// shell-escaped value of `inputs[name]`.
#[allow(clippy::expect_used)]
pub fn bind(template: &str, inputs: &BTreeMap<String, String>) -> Result<String, TemplateError> {
 let mut out = String::with_capacity(template.len());
 let bytes = template.as_bytes();
 let mut i = 0;
 while i < bytes.len() {
 if bytes[i] == b'{' {
 let start = i;
 let end = template[i + 1..]
 .find('}')
 .map(|rel| i + 1 + rel)
 .ok_or(TemplateError::Unterminated(start))?;
 let name = &template[i + 1..end];
 let value = inputs
 .get(name)
 .ok_or_else(|| TemplateError::UndeclaredInput(name.to_string()))?;
 out.push_str(&shell_escape(value));
 i = end + 1;
 } else {
 out.push(template[i..].chars().next().expect("i < bytes.len()"));
 i += template[i..].chars().next().map(char::len_utf8).unwrap_or(1);
 }
 }
 Ok(out)
}

/// Every placeholder referenced across a runbook's templates, deduplicated,
/// used to check against `declared_inputs` at validation time.
pub fn all_placeholders<'a>(templates: impl IntoIterator<Item = &'a str>) -> Result<BTreeSet<String>, TemplateError> {
 let mut set = BTreeSet::new();
 for template in templates {
 for name in placeholders(template)? {
 set.insert(name);
 }
 }
 Ok(set)
}

#[cfg(test)]
mod tests {
 use super::*;

 #[test]
 fn escapes_embedded_single_quotes() {
 assert_eq!(shell_escape("it's"), "'it'\\''s'");
 }

 #[test]
 fn binds_declared_inputs() {
 let mut inputs = BTreeMap::new();
 inputs.insert("host".to_string(), "db-prod-01".to_string());
 let bound = bind("ping -c1 {host}", &inputs).expect("binds");
 assert_eq!(bound, "ping -c1 'db-prod-01'");
 }

 #[test]
 fn rejects_undeclared_input() {
 let inputs = BTreeMap::new();
 let err = bind("ping -c1 {host}", &inputs).unwrap_err();
 assert_eq!(err, TemplateError::UndeclaredInput("host".to_string()));
 }

 #[test]
 fn blocks_injection_via_quoted_value() {
 let mut inputs = BTreeMap::new();
 inputs.insert("host".to_string(), "x'; rm -rf / #".to_string());
 let bound = bind("ping -c1 {host}", &inputs).expect("binds");
 // The malicious value is now entirely inside a quoted token.
 assert_eq!(bound, "ping -c1 'x'\\''; rm -rf / #'");
 }

 #[test]
 fn collects_placeholders_in_order() {
 assert_eq!(
 placeholders("cp {src} {dst}").expect("parses"),
 vec!["src".to_string(), "dst".to_string()]
 );
 }
}
