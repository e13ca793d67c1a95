// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Timer identifier type for tracking scheduled timers.
//!
//! Timers drive approval SLAs, per-step timeouts, and worker heartbeat
//! deadlines. Encoding the timer's purpose into the id string (rather than
//! keeping a side table) means a timer firing can be routed back to the
//! right handler with nothing more than the fired `TimerId`.

use crate::session::SessionId;
use crate::worker::WorkerId;

crate::define_id! {
 /// Unique identifier for a scheduled timer.
    pub struct TimerId("tmr-");
}

impl TimerId {
    pub fn approval_sla(session_id: SessionId, step_index: usize) -> Self {
        TimerKind::ApprovalSla { session_id, step_index }.to_timer_id()
    }

    pub fn step_timeout(session_id: SessionId, step_index: usize, attempt: u32) -> Self {
        TimerKind::StepTimeout { session_id, step_index, attempt }.to_timer_id()
    }

    pub fn worker_heartbeat(worker_id: WorkerId) -> Self {
        TimerKind::WorkerHeartbeat { worker_id }.to_timer_id()
    }

    pub fn kind(&self) -> Option<TimerKind> {
        TimerKind::parse(self.as_str())
    }
}

/// Parsed representation of a timer id for type-safe routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    ApprovalSla { session_id: SessionId, step_index: usize },
    StepTimeout { session_id: SessionId, step_index: usize, attempt: u32 },
    WorkerHeartbeat { worker_id: WorkerId },
}

impl TimerKind {
    pub fn parse(id: &str) -> Option<TimerKind> {
        if let Some(rest) = id.strip_prefix("approval-sla:") {
            let (session, step) = rest.split_once(':')?;
            return Some(TimerKind::ApprovalSla {
                session_id: SessionId::from_string(session),
                step_index: step.parse().ok()?,
            });
        }
        if let Some(rest) = id.strip_prefix("step-timeout:") {
            let mut parts = rest.splitn(3, ':');
            let session = parts.next()?;
            let step: usize = parts.next()?.parse().ok()?;
            let attempt: u32 = parts.next()?.parse().ok()?;
            return Some(TimerKind::StepTimeout {
                session_id: SessionId::from_string(session),
                step_index: step,
                attempt,
            });
        }
        if let Some(rest) = id.strip_prefix("worker-heartbeat:") {
            return Some(TimerKind::WorkerHeartbeat { worker_id: WorkerId::from_string(rest) });
        }
        None
    }

    pub fn to_timer_id(&self) -> TimerId {
        match self {
            TimerKind::ApprovalSla { session_id, step_index } => {
                TimerId::from_string(format!("approval-sla:{session_id}:{step_index}"))
            }
            TimerKind::StepTimeout { session_id, step_index, attempt } => {
                TimerId::from_string(format!("step-timeout:{session_id}:{step_index}:{attempt}"))
            }
            TimerKind::WorkerHeartbeat { worker_id } => {
                TimerId::from_string(format!("worker-heartbeat:{worker_id}"))
            }
        }
    }
}

#[cfg(test)]
#[path = "timer_tests.rs"]
mod tests;
