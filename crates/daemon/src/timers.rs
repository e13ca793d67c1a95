// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! TimerWheel: the executor side of `Effect::SetTimer`/`Effect::CancelTimer`.
//!
//! Poll-based rather than one `tokio::time::sleep` per timer: entries sit
//! in a min-heap keyed by fire time, and the lifecycle loop calls
//! [`TimerWheel::due`] once per tick instead of spawning a task per timer.
//! A tick granularity of ~1s against SLA/timeout windows measured in
//! minutes is an acceptable trade for not having to track and abort one
//! `JoinHandle` per in-flight timer.

use incident_core::{SessionId, TimerId};
use parking_lot::Mutex;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

#[derive(Default)]
pub struct TimerWheel {
 /// Current fire time for every still-armed timer id. A `SetTimer` for an
 /// id already present overwrites it; `due` only fires an entry whose
 /// heap-recorded fire time still matches this map, so a superseded or
 /// cancelled heap entry is silently skipped rather than fired twice.
    scheduled: Mutex<HashMap<TimerId, (SessionId, u64)>>,
    heap: Mutex<BinaryHeap<Reverse<(u64, TimerId)>>>,
}

impl TimerWheel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, id: TimerId, session_id: SessionId, fire_at_ms: u64) {
        self.scheduled.lock().insert(id, (session_id, fire_at_ms));
        self.heap.lock().push(Reverse((fire_at_ms, id)));
    }

    pub fn cancel(&self, id: TimerId) {
        self.scheduled.lock().remove(&id);
    }

 /// Pop every timer whose recorded fire time has passed `now_ms`,
 /// returning `(session_id, TimerId)` pairs for the caller to route.
    pub fn due(&self, now_ms: u64) -> Vec<(SessionId, TimerId)> {
        let mut fired = Vec::new();
        let mut heap = self.heap.lock();
        let mut scheduled = self.scheduled.lock();
        while let Some(Reverse((fire_at, id))) = heap.peek().copied() {
            if fire_at > now_ms {
                break;
            }
            heap.pop();
            if let Some((session_id, current_fire_at)) = scheduled.get(&id).copied() {
                if current_fire_at == fire_at {
                    scheduled.remove(&id);
                    fired.push((session_id, id));
                }
            }
        }
        fired
    }

    pub fn pending_count(&self) -> usize {
        self.scheduled.lock().len()
    }
}
