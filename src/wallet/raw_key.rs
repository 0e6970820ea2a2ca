// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Raw Private Key Wallet
//!
//! Wallet backed by a secp256k1 private key held in process memory, for
//! headless clients and tests. Signing goes through `ethers::LocalWallet`.
//! The encryption key follows the browser-wallet convention: the same 32
//! secret bytes are used as an X25519 secret.
//!
//! **Security**: the key is never logged.

use super::WalletProvider;
use crate::crypto::{ecies, EciesEnvelope};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use ethers::signers::{LocalWallet, Signer};
use ethers::types::Address;

pub struct RawKeyWallet {
    wallet: LocalWallet,
    secret: [u8; 32],
}

impl RawKeyWallet {
    /// Build from a 32-byte hex private key, with or without `0x`
    pub fn from_private_key(private_key: &str) -> Result<Self> {
        let key_hex = private_key.strip_prefix("0x").unwrap_or(private_key);
        let bytes = hex::decode(key_hex).map_err(|e| anyhow!("Invalid private key hex: {}", e))?;

        let secret: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
            anyhow!(
                "Invalid private key length: expected 32 bytes, got {}",
                bytes.len()
            )
        })?;

        let wallet = LocalWallet::from_bytes(&secret)
            .map_err(|e| anyhow!("Invalid private key: {}", e))?;

        Ok(Self { wallet, secret })
    }

    /// Fresh random key, mostly useful in tests
    pub fn random() -> Self {
        let wallet = LocalWallet::new(&mut rand::thread_rng());
        let mut secret = [0u8; 32];
        secret.copy_from_slice(&wallet.signer().to_bytes());
        Self { wallet, secret }
    }
}

#[async_trait]
impl WalletProvider for RawKeyWallet {
    async fn request_accounts(&self) -> Result<Vec<Address>> {
        Ok(vec![self.wallet.address()])
    }

    async fn address(&self) -> Result<Address> {
        Ok(self.wallet.address())
    }

    async fn sign_message(&self, message: &str) -> Result<String> {
        let signature = self
            .wallet
            .sign_message(message)
            .await
            .map_err(|e| anyhow!("Failed to sign message: {}", e))?;
        Ok(format!("0x{}", hex::encode(signature.to_vec())))
    }

    async fn encryption_public_key(&self) -> Result<String> {
        Ok(ecies::encryption_public_key(&self.secret))
    }

    async fn decrypt(&self, encrypted: &str) -> Result<String> {
        let envelope = EciesEnvelope::from_hex_json(encrypted)?;
        Ok(ecies::open(&self.secret, &envelope)?)
    }
}
