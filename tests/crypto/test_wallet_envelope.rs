// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Wallet encryption of the session secret
//!
//! The secret is sealed to the wallet's encryption key, packed into the
//! compact blob the server stores, and later unpacked and decrypted by the
//! wallet.

use fabstir_eds_client::crypto::{EncryptedKeyBlob, SessionKeyPair};
use fabstir_eds_client::protocol::{decode, encode};
use fabstir_eds_client::wallet::{RawKeyWallet, WalletProvider};

#[tokio::test]
async fn test_session_secret_survives_blob_storage() {
    let wallet = RawKeyWallet::random();
    let keys = SessionKeyPair::generate();

    let envelope = wallet.encrypt(&hex::encode(keys.secret_bytes())).await.unwrap();
    let blob = EncryptedKeyBlob::from_envelope(&envelope).unwrap();
    assert_eq!(blob.version_tag(), 0);
    assert_eq!(blob.nonce().len(), 24);
    assert_eq!(blob.ephemeral_public_key().len(), 32);

    // stored and returned by the server as a MessagePack array
    let stored: EncryptedKeyBlob = decode(&encode(&blob).unwrap()).unwrap();

    let hex_json = stored.to_envelope().unwrap().to_hex_json().unwrap();
    let secret_hex = wallet.decrypt(&hex_json).await.unwrap();
    let recovered = SessionKeyPair::from_secret_bytes(&hex::decode(secret_hex).unwrap()).unwrap();

    assert_eq!(recovered, keys);
}

#[test]
fn test_unknown_version_tag_is_rejected() {
    let blob = EncryptedKeyBlob(
        7,
        serde_bytes::ByteBuf::from(vec![1, 2, 3]),
        serde_bytes::ByteBuf::from(vec![0; 24]),
        serde_bytes::ByteBuf::from(vec![0; 32]),
    );
    assert!(blob.to_envelope().is_err());
}
