// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! incident-engine: the Session State Machine, the Matcher, the Approval
//! Gate's escalation policy, and the Ticket Outcome Adapter.
//!
//! [`statemachine`] is the only piece that touches session state, and it
//! does so as a pure function; everything else here is a pure helper the
//! coordinator calls around it.

pub mod approval;
pub mod command;
pub mod error;
pub mod matcher;
pub mod statemachine;
pub mod ticket_outcome;

pub use command::Command;
pub use error::EngineError;
pub use statemachine::{create_session, transition, SessionContext};

pub use approval::{escalation_effects, expiry_escalation_effects, EscalationPolicy};
pub use matcher::{match_runbooks, MatchCandidate, MatcherInput, RunbookHistory};
pub use ticket_outcome::{classify_outcome, to_effect as ticket_outcome_effect, TicketOutcome};
