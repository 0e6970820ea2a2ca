// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! EDS session layer
//!
//! Authentication handshake, key provisioning, request correlation and
//! reconnection over a single duplex transport.

pub mod auth;
pub mod client;
pub mod connection;
pub mod correlator;
pub mod error;
pub mod gate;
pub mod transport;

pub use auth::{AuthState, AuthStateMachine, ReadySignal};
pub use client::{SessionClient, UpdatedRow};
pub use connection::{ConnectionManager, EpochCounter};
pub use correlator::RequestCorrelator;
pub use error::SessionError;
pub use gate::WriteGate;
pub use transport::{
    Connector, FrameSender, MemoryConnector, MemoryPeer, TransportChannel, TransportEvent,
    WsConnector,
};
