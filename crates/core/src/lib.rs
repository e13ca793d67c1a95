// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! incident-core: shared domain types for the execution orchestration core.

pub mod macros;

pub mod clock;
pub mod config;
pub mod connection;
pub mod connector_result;
pub mod credential;
pub mod decision;
pub mod effect;
pub mod event;
pub mod id;
pub mod idempotency;
pub mod policy_types;
pub mod runbook_spec;
pub mod session;
pub mod step;
pub mod tenant;
pub mod ticket;
pub mod timer;
pub mod worker;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use clock::{Clock, FakeClock, SystemClock};
pub use config::OrchestratorConfig;
#[cfg(any(test, feature = "test-support"))]
pub use connection::InfrastructureConnectionBuilder;
pub use connection::{ConnectionId, InfrastructureConnection};
pub use connector_result::{ExecutionResult, FailureKind};
pub use credential::{CredentialHandle, CredentialReference, CredentialReferenceId};
#[cfg(any(test, feature = "test-support"))]
pub use decision::ApprovalTaskBuilder;
pub use decision::{ApprovalTask, Decision, DecisionKind};
pub use effect::Effect;
pub use event::{EventId, EventKind, ExecutionEvent, OutputChannel};
pub use id::short;
pub use idempotency::IdempotencyKey;
pub use policy_types::PolicyDecision;
#[cfg(any(test, feature = "test-support"))]
pub use runbook_spec::RunbookSpecBuilder;
pub use runbook_spec::{
    ApprovalRequirement, BlastRadius, CommandStep, ExpectedOutput, ManualStep, RetryPolicy,
    RunbookId, RunbookSpec, RunbookStatus, StepDefinition,
};
#[cfg(any(test, feature = "test-support"))]
pub use session::ExecutionSessionBuilder;
pub use session::{ExecutionSession, PauseReason, SessionId, SessionStatus, ValidationMode};
#[cfg(any(test, feature = "test-support"))]
pub use step::ExecutionStepBuilder;
pub use step::{ExecutionStep, StepStatus};
pub use tenant::{Tenant, TenantId};
pub use ticket::{Severity, Ticket, TicketId, TicketStatus};
pub use timer::{TimerId, TimerKind};
pub use worker::{AgentWorker, WorkerId, WorkerState};
