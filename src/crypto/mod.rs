// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Client-Side Encryption Module
//!
//! Cryptographic primitives used by the EDS session layer:
//!
//! - **Hash**: SHA-256 digests for the identity hash and wire keys
//! - **Identity**: binds a wallet encryption key and app namespace to one key record
//! - **Session Keys**: X25519 session keypair whose secret is also the envelope key
//! - **Encryption**: XChaCha20-Poly1305 `nonce || ciphertext` payload envelopes
//! - **ECIES**: packing of the wallet-encrypted session secret
//!
//! ## Security Considerations
//!
//! - The session keypair is held in memory only, never persisted
//! - Nonces are random per envelope
//! - Keys sent to the server are digests; values are always sealed
//!
//! ## Key Provisioning Flow
//!
//! 1. Client authenticates and sends its identity hash
//! 2. Server answers whether a wallet-encrypted session secret exists
//! 3. If it does, the wallet decrypts it and the keypair is rebuilt
//! 4. If not, a fresh keypair is generated, wallet-encrypted and uploaded
//! 5. All payloads are then sealed with the session secret

pub mod ecies;
pub mod encryption;
pub mod error;
pub mod hash;
pub mod identity;
pub mod session_keys;

pub use ecies::{EciesEnvelope, EncryptedKeyBlob};
pub use encryption::{open_envelope, seal_envelope, symmetric_decrypt, symmetric_encrypt};
pub use error::CryptoError;
pub use hash::digest;
pub use identity::{pk_hash, Identity};
pub use session_keys::{SessionKeyCell, SessionKeyPair};
