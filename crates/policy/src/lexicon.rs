// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The destructive command lexicon: realized commands matching these
//! patterns are denied outright unless the step is explicitly marked
//! `BlastRadius::Destructive`.

use regex::{Regex, RegexSet};

/// Pattern + human label, so a deny reason can name which rule fired
/// instead of just "denied by policy".
struct Pattern {
 label: &'static str,
 regex: &'static str,
}

const PATTERNS: &[Pattern] = &[
 Pattern { label: "unconditional table drop", regex: r"(?i)\bdrop\s+(table|database|schema)\b" },
 Pattern { label: "recursive root delete", regex: r"(?i)\brm\s+-[a-z]*r[a-z]*f[a-z]*\s+/(\s|$|\*)" },
 Pattern { label: "filesystem reinitialize", regex: r"(?i)\bmkfs(\.\w+)?\b" },
 Pattern {
 label: "unconditional shutdown",
 regex: r"(?i)\b(shutdown\s+-h\s+now|poweroff|halt\s+-f|reboot\s+-f)\b",
 },
 Pattern { label: "truncate without predicate", regex: r"(?i)\btruncate\s+table\b" },
];

/// Compiled form of [`PATTERNS`], built once and shared by every
/// [`crate::PolicyEngine`] that uses the default lexicon.
pub struct DestructiveLexicon {
 set: RegexSet,
 labels: Vec<&'static str>,
}

impl DestructiveLexicon {
 #[allow(clippy::expect_used)]
 pub fn default_lexicon() -> Self {
 let regexes: Vec<&str> = PATTERNS.iter().map(|p| p.regex).collect();
 let set = RegexSet::new(&regexes).expect("built-in lexicon patterns are valid regex");
 let labels = PATTERNS.iter().map(|p| p.label).collect();
 Self { set, labels }
 }

 /// Build from caller-supplied patterns (e.g. tenant-specific additions
 /// loaded from config), each paired with a label used in deny reasons.
 pub fn from_patterns(patterns: &[(&str, &str)]) -> Result<Self, regex::Error> {
 let regexes: Vec<&str> = patterns.iter().map(|(_, p)| *p).collect();
 let set = RegexSet::new(&regexes)?;
 let labels = patterns.iter().map(|(label, _)| *label).collect();
 Ok(Self { set, labels })
 }

 /// Returns the label of the first pattern that matches `command`, if any.
 pub fn matches(&self, command: &str) -> Option<&'static str> {
 self.set.matches(command).iter().next().map(|i| self.labels[i])
 }
}

/// Compile one ad-hoc pattern (used by tests and tenant overrides that only
/// need a single rule, where building a whole [`RegexSet`] is overkill).
pub fn compile(pattern: &str) -> Result<Regex, regex::Error> {
 Regex::new(pattern)
}
