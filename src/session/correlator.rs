// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Request/reply correlation
//!
//! Every typed request carries a random 32-bit `id` that the server echoes
//! back. Pending callers wait on a oneshot receiver; the reply frame is handed
//! over verbatim and decoded by the caller.
//!
//! There is no timeout and no expiry. A reply that never arrives leaves its
//! entry and its caller pending, including across reconnects. Only a local
//! close drains the map.

use std::collections::HashMap;
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, warn};

/// Fulfilled with the raw reply frame
pub type Resolver = oneshot::Sender<Vec<u8>>;

#[derive(Default)]
pub struct RequestCorrelator {
    pending: Mutex<HashMap<u32, Resolver>>,
}

impl RequestCorrelator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Draw a random request id
    ///
    /// Ids stay random on the wire; an id that is currently pending is
    /// re-drawn so one caller can never receive another's reply.
    pub async fn allocate(&self) -> u32 {
        fresh_id(&*self.pending.lock().await)
    }

    /// Register the resolver for `id`
    pub async fn register(&self, id: u32, resolver: Resolver) {
        if self.pending.lock().await.insert(id, resolver).is_some() {
            warn!("Request id {} registered twice; previous caller dropped", id);
        }
    }

    /// Allocate an id and register a fresh oneshot for it
    pub async fn track(&self) -> (u32, oneshot::Receiver<Vec<u8>>) {
        let (tx, rx) = oneshot::channel();
        let mut pending = self.pending.lock().await;
        let id = fresh_id(&pending);
        pending.insert(id, tx);
        (id, rx)
    }

    /// Hand `payload` to the caller waiting on `id`
    ///
    /// Returns `false` when nothing is pending under `id`.
    pub async fn resolve(&self, id: u32, payload: Vec<u8>) -> bool {
        let resolver = self.pending.lock().await.remove(&id);
        match resolver {
            Some(resolver) => {
                if resolver.send(payload).is_err() {
                    debug!("Caller for request {} went away before its reply", id);
                }
                true
            }
            None => {
                warn!("Discarding reply for unknown request id {}", id);
                false
            }
        }
    }

    /// Drop the entry for `id` without resolving it
    pub async fn cancel(&self, id: u32) -> bool {
        self.pending.lock().await.remove(&id).is_some()
    }

    /// Drop every pending entry; their callers observe a closed channel
    pub async fn clear(&self) -> usize {
        let drained = std::mem::take(&mut *self.pending.lock().await);
        if !drained.is_empty() {
            debug!("Abandoning {} pending request(s)", drained.len());
        }
        drained.len()
    }

    /// Number of requests still waiting for a reply
    pub async fn pending(&self) -> usize {
        self.pending.lock().await.len()
    }
}

fn fresh_id(pending: &HashMap<u32, Resolver>) -> u32 {
    loop {
        let id = rand::random::<u32>();
        if !pending.contains_key(&id) {
            return id;
        }
        debug!("Request id {} already pending, drawing again", id);
    }
}
