// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Write gate
//!
//! Binary open/closed gate in front of every typed request. It is closed
//! whenever a transport is opened or lost, and opened exactly once per
//! connection by the authentication state machine. Waiters are released
//! together when it opens; it does not count permits.

use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::watch;

pub struct WriteGate {
    state: watch::Sender<bool>,
    open_events: AtomicUsize,
}

impl WriteGate {
    /// New gate, closed
    pub fn new() -> Self {
        let (state, _) = watch::channel(false);
        Self {
            state,
            open_events: AtomicUsize::new(0),
        }
    }

    pub fn open(&self) {
        self.open_events.fetch_add(1, Ordering::SeqCst);
        self.state.send_replace(true);
    }

    pub fn close(&self) {
        self.state.send_replace(false);
    }

    pub fn is_open(&self) -> bool {
        *self.state.borrow()
    }

    /// Number of times the gate has been opened
    pub fn open_events(&self) -> usize {
        self.open_events.load(Ordering::SeqCst)
    }

    /// Wait until the gate is open
    pub async fn acquire(&self) {
        let mut rx = self.state.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = rx.wait_for(|open| *open).await;
    }
}

impl Default for WriteGate {
    fn default() -> Self {
        Self::new()
    }
}
