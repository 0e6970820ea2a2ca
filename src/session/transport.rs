// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Duplex transports
//!
//! A connector opens one message-oriented channel to the EDS. The session
//! layer only sees whole frames going out and a stream of lifecycle events
//! coming in; it never touches the socket.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

/// Outbound half of an open channel
pub type FrameSender = mpsc::Sender<Vec<u8>>;

#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Message(Vec<u8>),
    Closed,
    Error(String),
}

pub struct TransportChannel {
    pub outbound: FrameSender,
    pub events: mpsc::Receiver<TransportEvent>,
}

#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<TransportChannel>;
}

/// WebSocket connector; frames travel as binary messages
pub struct WsConnector {
    url: String,
    capacity: usize,
}

impl WsConnector {
    pub fn new(url: impl Into<String>, capacity: usize) -> Self {
        Self {
            url: url.into(),
            capacity: capacity.max(1),
        }
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self) -> Result<TransportChannel> {
        let (ws_stream, _) = connect_async(self.url.as_str())
            .await
            .map_err(|e| anyhow!("Failed to connect to {}: {}", self.url, e))?;
        info!("WebSocket connected to {}", self.url);

        let (mut write, mut read) = ws_stream.split();
        let (out_tx, mut out_rx) = mpsc::channel::<Vec<u8>>(self.capacity);
        let (event_tx, event_rx) = mpsc::channel::<TransportEvent>(self.capacity);

        tokio::spawn(async move {
            while let Some(frame) = out_rx.recv().await {
                if let Err(e) = write.send(Message::Binary(frame)).await {
                    warn!("WebSocket send error: {}", e);
                    break;
                }
            }
            // Outbound sender dropped: local shutdown or replaced transport
            let _ = write.close().await;
            debug!("WebSocket writer stopped");
        });

        tokio::spawn(async move {
            while let Some(message) = read.next().await {
                let event = match message {
                    Ok(Message::Binary(data)) => TransportEvent::Message(data),
                    Ok(Message::Close(frame)) => {
                        debug!("WebSocket close frame: {:?}", frame);
                        let _ = event_tx.send(TransportEvent::Closed).await;
                        return;
                    }
                    Ok(Message::Text(text)) => {
                        warn!("Ignoring text frame ({} bytes)", text.len());
                        continue;
                    }
                    Ok(_) => continue,
                    Err(e) => {
                        let _ = event_tx.send(TransportEvent::Error(e.to_string())).await;
                        return;
                    }
                };
                if event_tx.send(event).await.is_err() {
                    return;
                }
            }
            let _ = event_tx.send(TransportEvent::Closed).await;
        });

        Ok(TransportChannel {
            outbound: out_tx,
            events: event_rx,
        })
    }
}

/// Server side of an in-memory channel
pub struct MemoryPeer {
    /// Frames written by the client
    pub inbound: mpsc::Receiver<Vec<u8>>,
    /// Events delivered to the client
    pub events: mpsc::Sender<TransportEvent>,
}

impl MemoryPeer {
    pub async fn send(&self, frame: Vec<u8>) -> bool {
        self.events.send(TransportEvent::Message(frame)).await.is_ok()
    }

    pub async fn recv(&mut self) -> Option<Vec<u8>> {
        self.inbound.recv().await
    }

    pub async fn close(&self) {
        let _ = self.events.send(TransportEvent::Closed).await;
    }

    pub async fn fail(&self, reason: &str) {
        let _ = self.events.send(TransportEvent::Error(reason.to_string())).await;
    }
}

/// In-process connector; each `connect` hands a [`MemoryPeer`] to the listener
pub struct MemoryConnector {
    peers: mpsc::UnboundedSender<MemoryPeer>,
    capacity: usize,
}

impl MemoryConnector {
    pub fn new(capacity: usize) -> (Self, mpsc::UnboundedReceiver<MemoryPeer>) {
        let (peers, listener) = mpsc::unbounded_channel();
        (
            Self {
                peers,
                capacity: capacity.max(1),
            },
            listener,
        )
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self) -> Result<TransportChannel> {
        let (out_tx, out_rx) = mpsc::channel(self.capacity);
        let (event_tx, event_rx) = mpsc::channel(self.capacity);

        self.peers
            .send(MemoryPeer {
                inbound: out_rx,
                events: event_tx,
            })
            .map_err(|_| anyhow!("Memory listener dropped"))?;

        Ok(TransportChannel {
            outbound: out_tx,
            events: event_rx,
        })
    }
}
