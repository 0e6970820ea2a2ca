// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Wallet Capability
//!
//! The session layer never touches the wallet's long-term keys. It asks the
//! wallet for an address, a signature over the server challenge, its X25519
//! encryption key, and decryption of the stored session secret.
//!
//! Methods mirror the wallet RPC surface: `eth_requestAccounts`, `personal_sign`,
//! `eth_getEncryptionPublicKey` and `eth_decrypt`. Encryption to the wallet key
//! needs only the public key, so it has a default implementation.

pub mod raw_key;

use crate::crypto::{ecies, EciesEnvelope};
use anyhow::Result;
use async_trait::async_trait;
use ethers::types::Address;

pub use raw_key::RawKeyWallet;

#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// `eth_requestAccounts`
    async fn request_accounts(&self) -> Result<Vec<Address>>;

    /// Active account address
    async fn address(&self) -> Result<Address>;

    /// Sign `message` (EIP-191 personal message); returns 0x-prefixed hex
    async fn sign_message(&self, message: &str) -> Result<String>;

    /// `eth_getEncryptionPublicKey` for the active account (base64 X25519 key)
    async fn encryption_public_key(&self) -> Result<String>;

    /// `eth_decrypt`: `encrypted` is 0x-prefixed hex of the JSON envelope
    async fn decrypt(&self, encrypted: &str) -> Result<String>;

    /// Encrypt `plaintext` to this wallet's encryption key
    async fn encrypt(&self, plaintext: &str) -> Result<EciesEnvelope> {
        let public_key = self.encryption_public_key().await?;
        Ok(ecies::seal(&public_key, plaintext)?)
    }
}
