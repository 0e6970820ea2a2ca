// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Session Keypair and Key Storage
//!
//! The session keypair is an X25519 box keypair. Its 32 secret bytes are also
//! the XChaCha20-Poly1305 key for every payload envelope. The EDS protocol
//! depends on this reuse: other clients of the same account recover the same
//! secret from the server and must be able to open each other's envelopes, so
//! no separate symmetric key is ever derived.
//!
//! **Security**: the keypair lives in memory only. It leaves the process solely
//! inside a wallet-encrypted blob.

use super::encryption::{open_envelope, seal_envelope, KEY_SIZE};
use super::CryptoError;
use crypto_box::{aead::OsRng, PublicKey, SecretKey};
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Asymmetric session keypair whose secret doubles as the envelope key
#[derive(Clone)]
pub struct SessionKeyPair {
    secret: SecretKey,
    public: PublicKey,
}

impl SessionKeyPair {
    /// Generate a fresh keypair from the OS RNG
    pub fn generate() -> Self {
        let secret = SecretKey::generate(&mut OsRng);
        let public = secret.public_key();
        Self { secret, public }
    }

    /// Rebuild a keypair from its raw 32-byte secret
    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let raw: [u8; KEY_SIZE] = bytes.try_into().map_err(|_| CryptoError::InvalidKey {
            key_type: "session_secret".to_string(),
            reason: format!("expected {} bytes, got {}", KEY_SIZE, bytes.len()),
        })?;
        let secret = SecretKey::from(raw);
        let public = secret.public_key();
        Ok(Self { secret, public })
    }

    /// Raw secret bytes
    pub fn secret_bytes(&self) -> [u8; KEY_SIZE] {
        self.secret.to_bytes()
    }

    /// Raw public key bytes
    pub fn public_bytes(&self) -> [u8; 32] {
        *self.public.as_bytes()
    }

    /// Envelope key. Always identical to [`Self::secret_bytes`].
    pub fn symmetric_key(&self) -> [u8; KEY_SIZE] {
        self.secret_bytes()
    }
}

impl PartialEq for SessionKeyPair {
    fn eq(&self, other: &Self) -> bool {
        self.secret_bytes() == other.secret_bytes()
    }
}

impl Eq for SessionKeyPair {}

impl fmt::Debug for SessionKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionKeyPair")
            .field("public", &hex::encode(self.public_bytes()))
            .finish_non_exhaustive()
    }
}

/// Shared slot holding the active session keypair
///
/// Written only by the authentication state machine; everything else goes
/// through [`SessionKeyCell::seal`] and [`SessionKeyCell::open`].
#[derive(Clone, Default)]
pub struct SessionKeyCell {
    inner: Arc<RwLock<Option<SessionKeyPair>>>,
}

impl SessionKeyCell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a keypair, replacing any previous one
    pub async fn store(&self, keys: SessionKeyPair) {
        let mut slot = self.inner.write().await;
        let replaced = slot.replace(keys).is_some();
        debug!("Session keypair installed (replaced previous: {})", replaced);
    }

    /// Snapshot of the current keypair
    pub async fn get(&self) -> Option<SessionKeyPair> {
        self.inner.read().await.clone()
    }

    pub async fn is_set(&self) -> bool {
        self.inner.read().await.is_some()
    }

    /// Drop the keypair from memory
    pub async fn clear(&self) {
        if self.inner.write().await.take().is_some() {
            debug!("Session keypair cleared");
        }
    }

    /// Seal `plaintext` into a wire envelope under the session key
    pub async fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let slot = self.inner.read().await;
        let keys = slot.as_ref().ok_or_else(|| CryptoError::InvalidKey {
            key_type: "session_secret".to_string(),
            reason: "no session key provisioned".to_string(),
        })?;
        seal_envelope(plaintext, &keys.symmetric_key())
    }

    /// Open a wire envelope; `None` when no key is held or decryption fails
    pub async fn open(&self, envelope: &[u8]) -> Option<Vec<u8>> {
        let slot = self.inner.read().await;
        let keys = slot.as_ref()?;
        open_envelope(envelope, &keys.symmetric_key())
    }
}
