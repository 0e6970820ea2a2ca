// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Connection lifecycle and reconnection
//!
//! Every transport is tagged with the epoch that was current when it was
//! opened. Its pump task handles inbound frames under the message lock and
//! reports close/error to a single supervisor task. The supervisor only acts
//! on events whose epoch is still current: it advances the epoch (silencing
//! the dying transport), closes the write gate, waits the fixed reconnect
//! delay and opens a new transport. Retries are unbounded.

use super::auth::AuthStateMachine;
use super::error::SessionError;
use super::gate::WriteGate;
use super::transport::{Connector, FrameSender, TransportEvent};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Monotonic connection epoch
#[derive(Debug, Default)]
pub struct EpochCounter(AtomicU64);

impl EpochCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }

    pub fn is_current(&self, epoch: u64) -> bool {
        self.current() == epoch
    }

    /// Start a new epoch and return it
    pub fn advance(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Move past `epoch` if it is still current
    ///
    /// Returns `false` for a stale epoch, or when another event of the same
    /// epoch already claimed the reconnect.
    pub fn invalidate(&self, epoch: u64) -> bool {
        self.0
            .compare_exchange(epoch, epoch + 1, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }
}

#[derive(Debug, Clone, PartialEq)]
enum LifecycleCause {
    Closed,
    Error(String),
}

#[derive(Debug)]
struct Lifecycle {
    epoch: u64,
    cause: LifecycleCause,
}

struct Shared {
    connector: Arc<dyn Connector>,
    epochs: EpochCounter,
    gate: Arc<WriteGate>,
    outbound: RwLock<Option<FrameSender>>,
    auth: Mutex<AuthStateMachine>,
    reconnect_delay: Duration,
    shutdown: CancellationToken,
    lifecycle: mpsc::UnboundedSender<Lifecycle>,
}

pub struct ConnectionManager {
    shared: Arc<Shared>,
}

impl ConnectionManager {
    /// Open the first transport and start the reconnect supervisor
    pub async fn start(
        connector: Arc<dyn Connector>,
        auth: AuthStateMachine,
        gate: Arc<WriteGate>,
        reconnect_delay: Duration,
    ) -> Self {
        let (lifecycle, lifecycle_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            connector,
            epochs: EpochCounter::new(),
            gate,
            outbound: RwLock::new(None),
            auth: Mutex::new(auth),
            reconnect_delay,
            shutdown: CancellationToken::new(),
            lifecycle,
        });

        open(&shared).await;
        tokio::spawn(supervise(shared.clone(), lifecycle_rx));

        Self { shared }
    }

    pub fn epoch(&self) -> u64 {
        self.shared.epochs.current()
    }

    pub fn is_shut_down(&self) -> bool {
        self.shared.shutdown.is_cancelled()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.shared.gate.is_open()
            && self.shared.auth.lock().await.state() == super::auth::AuthState::Authenticated
    }

    /// Send a typed request frame once the write gate is open
    ///
    /// Fails only when the session is shut down, including while waiting for
    /// the gate. A frame written to a dead transport is lost and its caller
    /// keeps waiting, exactly like a reply that never arrives.
    pub async fn send(&self, frame: Vec<u8>) -> Result<(), SessionError> {
        tokio::select! {
            biased;
            _ = self.shared.shutdown.cancelled() => return Err(SessionError::Closed),
            _ = self.shared.gate.acquire() => {}
        }

        let outbound = self.shared.outbound.read().await.clone();
        match outbound {
            Some(tx) => {
                if tx.send(frame).await.is_err() {
                    debug!("Transport closed while sending; frame dropped");
                }
            }
            None => debug!("No transport while sending; frame dropped"),
        }
        Ok(())
    }

    /// Deliberate local shutdown; no reconnect follows
    pub async fn shutdown(&self) {
        if self.shared.shutdown.is_cancelled() {
            return;
        }
        self.shared.shutdown.cancel();
        self.shared.gate.close();
        self.shared.outbound.write().await.take();
        info!("Session closed at epoch {}", self.shared.epochs.current());
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.shared.shutdown.cancel();
    }
}

async fn open(shared: &Arc<Shared>) {
    let epoch = shared.epochs.advance();
    shared.gate.close();
    shared.auth.lock().await.reset();

    match shared.connector.connect().await {
        Ok(channel) => {
            info!("Transport open (epoch {})", epoch);
            *shared.outbound.write().await = Some(channel.outbound.clone());
            tokio::spawn(pump(shared.clone(), epoch, channel.outbound, channel.events));
        }
        Err(e) => {
            warn!("Failed to open transport (epoch {}): {}", epoch, e);
            let _ = shared.lifecycle.send(Lifecycle {
                epoch,
                cause: LifecycleCause::Error(e.to_string()),
            });
        }
    }
}

async fn pump(
    shared: Arc<Shared>,
    epoch: u64,
    outbound: FrameSender,
    mut events: mpsc::Receiver<TransportEvent>,
) {
    loop {
        let event = tokio::select! {
            _ = shared.shutdown.cancelled() => return,
            event = events.recv() => event,
        };

        let cause = match event {
            Some(TransportEvent::Message(frame)) => {
                let mut auth = shared.auth.lock().await;
                if !shared.epochs.is_current(epoch) {
                    debug!("Dropping frame from stale epoch {}", epoch);
                    continue;
                }
                auth.handle(&frame, &outbound).await;
                continue;
            }
            Some(TransportEvent::Error(reason)) => LifecycleCause::Error(reason),
            Some(TransportEvent::Closed) | None => LifecycleCause::Closed,
        };

        let _ = shared.lifecycle.send(Lifecycle { epoch, cause });
        return;
    }
}

async fn supervise(shared: Arc<Shared>, mut lifecycle: mpsc::UnboundedReceiver<Lifecycle>) {
    loop {
        let event = tokio::select! {
            _ = shared.shutdown.cancelled() => return,
            event = lifecycle.recv() => match event {
                Some(event) => event,
                None => return,
            },
        };

        if !shared.epochs.invalidate(event.epoch) {
            debug!(
                "Ignoring {:?} from stale epoch {} (current {})",
                event.cause,
                event.epoch,
                shared.epochs.current()
            );
            continue;
        }

        warn!(
            "Transport lost (epoch {}, {:?}); reconnecting in {:?}",
            event.epoch, event.cause, shared.reconnect_delay
        );
        shared.gate.close();
        shared.outbound.write().await.take();

        tokio::select! {
            _ = shared.shutdown.cancelled() => return,
            _ = tokio::time::sleep(shared.reconnect_delay) => {}
        }
        open(&shared).await;
    }
}
