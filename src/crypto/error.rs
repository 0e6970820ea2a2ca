// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Crypto Error Types
//!
//! Every variant names the step or field that failed, so handshake
//! diagnostics say which part broke without printing key material.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum CryptoError {
    /// Authentication tag mismatch, truncated ciphertext or non-UTF-8 plaintext
    DecryptionFailed { operation: String, reason: String },

    EncryptionFailed { operation: String, reason: String },

    /// Wrong length or unparsable key; `key_type` is e.g. "session_secret"
    InvalidKey { key_type: String, reason: String },

    InvalidNonce {
        expected_size: usize,
        actual_size: usize,
    },

    /// Malformed envelope or key blob field
    InvalidPayload { field: String, reason: String },

    /// Wallet envelope version tag or name this client does not know
    UnsupportedVersion(String),
}

impl fmt::Display for CryptoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CryptoError::DecryptionFailed { operation, reason } => {
                write!(f, "{} decryption failed: {}", operation, reason)
            }
            CryptoError::EncryptionFailed { operation, reason } => {
                write!(f, "{} encryption failed: {}", operation, reason)
            }
            CryptoError::InvalidKey { key_type, reason } => {
                write!(f, "Invalid {}: {}", key_type, reason)
            }
            CryptoError::InvalidNonce {
                expected_size,
                actual_size,
            } => write!(
                f,
                "Invalid nonce: expected {} bytes, got {}",
                expected_size, actual_size
            ),
            CryptoError::InvalidPayload { field, reason } => {
                write!(f, "Malformed {}: {}", field, reason)
            }
            CryptoError::UnsupportedVersion(version) => {
                write!(f, "Unsupported wallet envelope version: {}", version)
            }
        }
    }
}

impl std::error::Error for CryptoError {}

impl From<hex::FromHexError> for CryptoError {
    fn from(err: hex::FromHexError) -> Self {
        CryptoError::InvalidPayload {
            field: "hex".to_string(),
            reason: err.to_string(),
        }
    }
}

impl From<base64::DecodeError> for CryptoError {
    fn from(err: base64::DecodeError) -> Self {
        CryptoError::InvalidPayload {
            field: "base64".to_string(),
            reason: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for CryptoError {
    fn from(err: serde_json::Error) -> Self {
        CryptoError::InvalidPayload {
            field: "wallet envelope json".to_string(),
            reason: err.to_string(),
        }
    }
}
