// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use crate::crypto::CryptoError;
use crate::protocol::CodecError;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Wallet error: {0}")]
    Wallet(String),

    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Key provisioning failed: {0}")]
    Provisioning(String),

    #[error("Session closed")]
    Closed,
}

impl SessionError {
    pub fn wallet(err: anyhow::Error) -> Self {
        SessionError::Wallet(format!("{:#}", err))
    }
}
