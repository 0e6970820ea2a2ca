// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Identity Binding
//!
//! Binds a (wallet, application) pair to one server-side key record. The
//! record is looked up by `PKHash = digest(walletPublicKey [ "_" appID ])`,
//! where `walletPublicKey` is the text returned by `eth_getEncryptionPublicKey`.

use super::hash::{digest, DIGEST_SIZE};
use crate::wallet::WalletProvider;
use ethers::types::Address;
use tracing::info;

/// Server-side lookup key for the session key record
pub fn pk_hash(wallet_public_key: &str, app_id: Option<&str>) -> [u8; DIGEST_SIZE] {
    match app_id {
        Some(app_id) => digest(format!("{}_{}", wallet_public_key, app_id).as_bytes()),
        None => digest(wallet_public_key.as_bytes()),
    }
}

/// Wallet identity as presented to the server
///
/// Computed once when the client starts and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub address: Address,
    pub encryption_public_key: String,
    pub pk_hash: [u8; DIGEST_SIZE],
}

impl Identity {
    pub fn new(address: Address, encryption_public_key: String, app_id: Option<&str>) -> Self {
        let pk_hash = pk_hash(&encryption_public_key, app_id);
        Self {
            address,
            encryption_public_key,
            pk_hash,
        }
    }

    /// Query the wallet for its address and encryption key
    pub async fn resolve(
        wallet: &dyn WalletProvider,
        app_id: Option<&str>,
    ) -> anyhow::Result<Self> {
        let address = wallet.address().await?;
        let encryption_public_key = wallet.encryption_public_key().await?;
        let identity = Self::new(address, encryption_public_key, app_id);
        info!(
            "Resolved identity 0x{} (app: {})",
            hex::encode(identity.address.as_bytes()),
            app_id.unwrap_or("<none>")
        );
        Ok(identity)
    }

    /// Address as sent on the wire: 0x-prefixed lowercase hex
    pub fn address_hex(&self) -> String {
        format!("0x{}", hex::encode(self.address.as_bytes()))
    }
}
