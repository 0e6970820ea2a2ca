// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod cli;
pub mod config;
pub mod crypto;
pub mod protocol;
pub mod session;
pub mod wallet;

// Re-export the session surface
pub use config::SessionConfig;
pub use crypto::{CryptoError, Identity, SessionKeyPair};
pub use protocol::Opcode;
pub use session::{
    AuthState, Connector, MemoryConnector, MemoryPeer, SessionClient, SessionError, UpdatedRow,
    WsConnector,
};
pub use wallet::{RawKeyWallet, WalletProvider};
