// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! incident-wire: length-prefixed JSON transport shared by the daemon's
//! connection to each worker.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod message;
mod wire;

pub use message::{DaemonMessage, EventAck, WorkerMessage};
pub use wire::{decode, encode, read_frame, read_message, write_frame, write_message, WireError, MAX_FRAME_BYTES};
