// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A scripted connector for engine/worker tests: returns a preconfigured
//! `ExecutionResult` per call, recording the requests it saw. Never
//! compiled outside tests.

#![cfg(any(test, feature = "test-support"))]

use crate::traits::{Connector, ExecutionRequest, OutputSink};
use incident_core::ExecutionResult;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

pub struct FakeConnector {
    kind: &'static str,
    scripted: Mutex<Vec<ExecutionResult>>,
    seen_commands: Mutex<Vec<String>>,
 /// Runs once per `execute` call, before `req.credential_still_valid` is
 /// re-checked, so a test can simulate a rotation landing partway
 /// through a long-running invocation (the Azure Run Command poll loop,
 /// in production).
    on_execute: Option<Box<dyn Fn() + Send + Sync>>,
}

impl FakeConnector {
    pub fn new(kind: &'static str, scripted: Vec<ExecutionResult>) -> Self {
        Self {
            kind,
            scripted: Mutex::new(scripted),
            seen_commands: Mutex::new(Vec::new()),
            on_execute: None,
        }
    }

    pub fn requiring_valid_credential(
        kind: &'static str,
        scripted: Vec<ExecutionResult>,
        on_execute: impl Fn() + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            scripted: Mutex::new(scripted),
            seen_commands: Mutex::new(Vec::new()),
            on_execute: Some(Box::new(on_execute)),
        }
    }

    pub fn seen_commands(&self) -> Vec<String> {
        self.seen_commands.lock().clone()
    }
}

#[async_trait::async_trait]
impl Connector for FakeConnector {
    fn kind(&self) -> &'static str {
        self.kind
    }

    async fn execute(
        &self,
        req: ExecutionRequest<'_>,
        _sink: &mut dyn OutputSink,
        _cancel: CancellationToken,
    ) -> ExecutionResult {
        self.seen_commands.lock().push(req.command.to_string());
        if let Some(hook) = &self.on_execute {
            hook();
            if let Some(still_valid) = req.credential_still_valid {
                if !still_valid() {
                    return ExecutionResult::failed(
                        incident_core::FailureKind::CredentialUnavailable,
                        "credential invalidated mid-execution",
                        0,
                    );
                }
            }
        }
        let mut scripted = self.scripted.lock();
        if scripted.is_empty() {
            ExecutionResult::ok(0, "", 0)
        } else {
            scripted.remove(0)
        }
    }
}
