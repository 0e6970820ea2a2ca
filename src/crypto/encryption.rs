// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! XChaCha20-Poly1305 Payload Envelopes
//!
//! Every value stored on the EDS is sealed client-side before it leaves the
//! process. An envelope on the wire is `nonce (24 bytes) || ciphertext`, where
//! the ciphertext carries the 16-byte Poly1305 tag. The nonce is drawn fresh
//! from the OS RNG for every call.
//!
//! Opening never fails loudly: a wrong key, a truncated envelope or a flipped
//! bit all yield `None`, which callers surface as "absent".

use super::CryptoError;
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    XChaCha20Poly1305, XNonce,
};
use rand::{rngs::OsRng, RngCore};

/// Nonce length of the envelope cipher
pub const NONCE_SIZE: usize = 24;

/// Symmetric key length (the session secret)
pub const KEY_SIZE: usize = 32;

/// Encrypt `plaintext` under `key`, returning `(nonce, ciphertext)`
///
/// # Errors
///
/// Returns error if the key is not 32 bytes or the cipher rejects the input.
pub fn symmetric_encrypt(
    plaintext: &[u8],
    key: &[u8],
) -> Result<([u8; NONCE_SIZE], Vec<u8>), CryptoError> {
    let cipher = cipher_for(key)?;

    let mut nonce = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce);

    let ciphertext = cipher
        .encrypt(XNonce::from_slice(&nonce), plaintext)
        .map_err(|e| CryptoError::EncryptionFailed {
            operation: "envelope".to_string(),
            reason: e.to_string(),
        })?;

    Ok((nonce, ciphertext))
}

/// Decrypt `ciphertext` sealed with `nonce` under `key`
///
/// Returns `None` on any authentication failure, bad nonce size or bad key size.
pub fn symmetric_decrypt(nonce: &[u8], ciphertext: &[u8], key: &[u8]) -> Option<Vec<u8>> {
    if nonce.len() != NONCE_SIZE {
        return None;
    }
    let cipher = cipher_for(key).ok()?;
    cipher.decrypt(XNonce::from_slice(nonce), ciphertext).ok()
}

/// Seal `plaintext` into a wire envelope: `nonce || ciphertext`
pub fn seal_envelope(plaintext: &[u8], key: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let (nonce, ciphertext) = symmetric_encrypt(plaintext, key)?;

    let mut envelope = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    envelope.extend_from_slice(&nonce);
    envelope.extend_from_slice(&ciphertext);
    Ok(envelope)
}

/// Strip the nonce prefix from a wire envelope and decrypt the remainder
pub fn open_envelope(envelope: &[u8], key: &[u8]) -> Option<Vec<u8>> {
    if envelope.len() < NONCE_SIZE {
        return None;
    }
    let (nonce, ciphertext) = envelope.split_at(NONCE_SIZE);
    symmetric_decrypt(nonce, ciphertext, key)
}

fn cipher_for(key: &[u8]) -> Result<XChaCha20Poly1305, CryptoError> {
    if key.len() != KEY_SIZE {
        return Err(CryptoError::InvalidKey {
            key_type: "session_secret".to_string(),
            reason: format!("expected {} bytes, got {}", KEY_SIZE, key.len()),
        });
    }
    XChaCha20Poly1305::new_from_slice(key).map_err(|e| CryptoError::InvalidKey {
        key_type: "session_secret".to_string(),
        reason: e.to_string(),
    })
}
