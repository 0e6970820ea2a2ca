// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use super::common::{connect, FakeServer, APP_ID};
use fabstir_eds_client::crypto::pk_hash;
use fabstir_eds_client::wallet::{RawKeyWallet, WalletProvider};
use std::sync::Arc;

#[tokio::test]
async fn test_first_connect_provisions_key() {
    let (server, connector) = FakeServer::start();
    let wallet = Arc::new(RawKeyWallet::random());

    let client = connect(wallet.clone(), connector).await;
    assert!(client.is_authenticated().await);
    assert_eq!(client.epoch(), 1);

    let state = server.state().await;
    assert_eq!(state.connections, 1);
    assert_eq!(state.auths.len(), 1);
    assert!(!state.auths[0].key_found, "first connect creates the key record");
    assert_eq!(state.key_records.len(), 1);
}

#[tokio::test]
async fn test_auth_frame_binds_wallet_identity() {
    let (server, connector) = FakeServer::start();
    let wallet = Arc::new(RawKeyWallet::random());
    let address = wallet.address().await.unwrap();
    let public_key = wallet.encryption_public_key().await.unwrap();

    let client = connect(wallet.clone(), connector).await;
    assert_eq!(client.identity().address, address);

    let state = server.state().await;
    let auth = &state.auths[0];
    assert_eq!(auth.address, format!("0x{}", hex::encode(address.as_bytes())));
    assert_eq!(auth.signer, Some(address), "challenge signature must recover to the wallet");
    assert_eq!(auth.pk_hash, pk_hash(&public_key, Some(APP_ID)).to_vec());
}

#[tokio::test]
async fn test_stored_key_record_is_wallet_encrypted() {
    let (server, connector) = FakeServer::start();
    let wallet = Arc::new(RawKeyWallet::random());
    let _client = connect(wallet.clone(), connector).await;

    let blob = server
        .state()
        .await
        .key_records
        .values()
        .next()
        .cloned()
        .unwrap();
    let hex_json = blob.to_envelope().unwrap().to_hex_json().unwrap();

    let secret_hex = wallet.decrypt(&hex_json).await.unwrap();
    assert_eq!(hex::decode(secret_hex).unwrap().len(), 32);

    let stranger = RawKeyWallet::random();
    assert!(stranger.decrypt(&hex_json).await.is_err());
}

#[tokio::test]
async fn test_second_client_recovers_same_key() {
    let (server, connector) = FakeServer::start();
    let wallet = Arc::new(RawKeyWallet::random());

    let first = connect(wallet.clone(), connector.clone()).await;
    first.set_key("shared", "written by first").await.unwrap();
    first.close().await;

    let second = connect(wallet.clone(), connector).await;
    let value: Option<String> = second.get_key("shared").await.unwrap();
    assert_eq!(value.as_deref(), Some("written by first"));

    let state = server.state().await;
    assert_eq!(state.key_records.len(), 1);
    assert!(state.auths[1].key_found);
}
