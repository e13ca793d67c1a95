// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Carries a process exit code alongside an error message so `main()` is
//! the single place that calls `std::process::exit` (exit
//! codes: 0 success, 2 misuse, 10 upstream unavailable, 20 tenant/policy
//! rejection).

use std::fmt;

#[derive(Debug)]
pub struct ExitError {
 pub code: i32,
 pub message: String,
}

impl ExitError {
 pub fn new(code: i32, message: impl Into<String>) -> Self {
 Self { code, message: message.into() }
 }

 pub fn misuse(message: impl Into<String>) -> Self {
 Self::new(2, message)
 }

 pub fn upstream_unavailable(message: impl Into<String>) -> Self {
 Self::new(10, message)
 }

 pub fn rejected(message: impl Into<String>) -> Self {
 Self::new(20, message)
 }
}

impl fmt::Display for ExitError {
 fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
 write!(f, "{}", self.message)
 }
}

impl std::error::Error for ExitError {}
