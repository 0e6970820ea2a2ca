// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Wallet-Encrypted Session Key Blobs
//!
//! The session secret is stored on the EDS encrypted to the wallet's X25519
//! encryption key using the `x25519-xsalsa20-poly1305` scheme (an ephemeral
//! sender keypair plus a NaCl box). Two shapes of the same data exist:
//!
//! - **Wire blob**: `[versionTag, ciphertext, nonce, ephemeralPublicKey]`, a
//!   4-element MessagePack array with raw byte fields.
//! - **Wallet envelope**: the JSON object the wallet API speaks,
//!   `{version, nonce, ephemPublicKey, ciphertext}` with base64 fields. For
//!   `eth_decrypt` it is passed as 0x-prefixed hex of the JSON text.
//!
//! Only packing and unpacking is needed when a real wallet holds the key. The
//! [`seal`] and [`open`] helpers implement the scheme itself for wallets that
//! are backed by a raw private key.

use super::CryptoError;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use crypto_box::{
    aead::{generic_array::GenericArray, Aead, AeadCore, OsRng},
    PublicKey, SalsaBox, SecretKey,
};
use serde::{Deserialize, Serialize};
use serde_bytes::ByteBuf;

/// Scheme name understood by wallet encryption APIs
pub const X25519_XSALSA20_POLY1305: &str = "x25519-xsalsa20-poly1305";

/// Box nonce length
pub const BOX_NONCE_SIZE: usize = 24;

/// Map a wire version tag to the scheme name
pub fn version_name(tag: u8) -> Result<&'static str, CryptoError> {
    match tag {
        0 => Ok(X25519_XSALSA20_POLY1305),
        other => Err(CryptoError::UnsupportedVersion(format!("tag {}", other))),
    }
}

/// Map a scheme name to its wire version tag
pub fn version_tag(name: &str) -> Result<u8, CryptoError> {
    match name {
        X25519_XSALSA20_POLY1305 => Ok(0),
        other => Err(CryptoError::UnsupportedVersion(other.to_string())),
    }
}

/// Wallet-side JSON envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EciesEnvelope {
    pub version: String,
    pub nonce: String,
    pub ephem_public_key: String,
    pub ciphertext: String,
}

impl EciesEnvelope {
    /// `0x` + hex(JSON), the argument format of `eth_decrypt`
    pub fn to_hex_json(&self) -> Result<String, CryptoError> {
        let json = serde_json::to_string(self)?;
        Ok(format!("0x{}", hex::encode(json.as_bytes())))
    }

    /// Inverse of [`Self::to_hex_json`]
    pub fn from_hex_json(encoded: &str) -> Result<Self, CryptoError> {
        let raw = hex::decode(encoded.strip_prefix("0x").unwrap_or(encoded))?;
        Ok(serde_json::from_slice(&raw)?)
    }
}

/// Wire form of the wallet-encrypted session secret
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedKeyBlob(pub u8, pub ByteBuf, pub ByteBuf, pub ByteBuf);

impl EncryptedKeyBlob {
    pub fn version_tag(&self) -> u8 {
        self.0
    }

    pub fn ciphertext(&self) -> &[u8] {
        &self.1
    }

    pub fn nonce(&self) -> &[u8] {
        &self.2
    }

    pub fn ephemeral_public_key(&self) -> &[u8] {
        &self.3
    }

    /// Pack a wallet envelope into the wire tuple
    pub fn from_envelope(envelope: &EciesEnvelope) -> Result<Self, CryptoError> {
        let tag = version_tag(&envelope.version)?;
        let ciphertext = BASE64.decode(&envelope.ciphertext)?;
        let nonce = BASE64.decode(&envelope.nonce)?;
        let ephemeral = BASE64.decode(&envelope.ephem_public_key)?;

        if nonce.len() != BOX_NONCE_SIZE {
            return Err(CryptoError::InvalidNonce {
                expected_size: BOX_NONCE_SIZE,
                actual_size: nonce.len(),
            });
        }

        Ok(Self(
            tag,
            ByteBuf::from(ciphertext),
            ByteBuf::from(nonce),
            ByteBuf::from(ephemeral),
        ))
    }

    /// Re-express the wire tuple as the named-field wallet envelope
    pub fn to_envelope(&self) -> Result<EciesEnvelope, CryptoError> {
        Ok(EciesEnvelope {
            version: version_name(self.version_tag())?.to_string(),
            nonce: BASE64.encode(self.nonce()),
            ephem_public_key: BASE64.encode(self.ephemeral_public_key()),
            ciphertext: BASE64.encode(self.ciphertext()),
        })
    }
}

/// X25519 public key for a raw 32-byte secret, base64-encoded
///
/// This is the `eth_getEncryptionPublicKey` value for a wallet whose
/// secp256k1 private key bytes are `secret`.
pub fn encryption_public_key(secret: &[u8; 32]) -> String {
    let secret = SecretKey::from(*secret);
    BASE64.encode(secret.public_key().as_bytes())
}

/// Encrypt `plaintext` to a base64 X25519 public key
pub fn seal(recipient_public_key: &str, plaintext: &str) -> Result<EciesEnvelope, CryptoError> {
    let recipient = decode_public_key(recipient_public_key, "wallet_encryption_key")?;

    let ephemeral = SecretKey::generate(&mut OsRng);
    let salsa_box = SalsaBox::new(&recipient, &ephemeral);
    let nonce = SalsaBox::generate_nonce(&mut OsRng);

    let ciphertext = salsa_box
        .encrypt(&nonce, plaintext.as_bytes())
        .map_err(|e| CryptoError::EncryptionFailed {
            operation: "wallet_envelope".to_string(),
            reason: e.to_string(),
        })?;

    Ok(EciesEnvelope {
        version: X25519_XSALSA20_POLY1305.to_string(),
        nonce: BASE64.encode(nonce.as_slice()),
        ephem_public_key: BASE64.encode(ephemeral.public_key().as_bytes()),
        ciphertext: BASE64.encode(ciphertext),
    })
}

/// Decrypt a wallet envelope with the recipient's raw X25519 secret
pub fn open(secret: &[u8; 32], envelope: &EciesEnvelope) -> Result<String, CryptoError> {
    version_tag(&envelope.version)?;

    let nonce = BASE64.decode(&envelope.nonce)?;
    if nonce.len() != BOX_NONCE_SIZE {
        return Err(CryptoError::InvalidNonce {
            expected_size: BOX_NONCE_SIZE,
            actual_size: nonce.len(),
        });
    }
    let ephemeral = decode_public_key(&envelope.ephem_public_key, "ephemeral_public_key")?;
    let ciphertext = BASE64.decode(&envelope.ciphertext)?;

    let salsa_box = SalsaBox::new(&ephemeral, &SecretKey::from(*secret));
    let plaintext = salsa_box
        .decrypt(GenericArray::from_slice(&nonce), ciphertext.as_slice())
        .map_err(|e| CryptoError::DecryptionFailed {
            operation: "wallet_envelope".to_string(),
            reason: e.to_string(),
        })?;

    String::from_utf8(plaintext).map_err(|e| CryptoError::InvalidPayload {
        field: "plaintext".to_string(),
        reason: e.to_string(),
    })
}

fn decode_public_key(encoded: &str, key_type: &str) -> Result<PublicKey, CryptoError> {
    let raw = BASE64.decode(encoded)?;
    let raw: [u8; 32] = raw.as_slice().try_into().map_err(|_| CryptoError::InvalidKey {
        key_type: key_type.to_string(),
        reason: format!("expected 32 bytes, got {}", raw.len()),
    })?;
    Ok(PublicKey::from(raw))
}
