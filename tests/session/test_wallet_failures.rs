// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Wallet refusals during the first handshake reject `connect`

use super::common::{connect, test_config, FakeServer};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use ethers::types::Address;
use fabstir_eds_client::session::{SessionClient, SessionError};
use fabstir_eds_client::wallet::{RawKeyWallet, WalletProvider};
use mockall::mock;
use std::sync::Arc;
use std::time::Duration;

mock! {
    pub Wallet {}

    #[async_trait]
    impl WalletProvider for Wallet {
        async fn request_accounts(&self) -> Result<Vec<Address>>;
        async fn address(&self) -> Result<Address>;
        async fn sign_message(&self, message: &str) -> Result<String>;
        async fn encryption_public_key(&self) -> Result<String>;
        async fn decrypt(&self, encrypted: &str) -> Result<String>;
    }
}

/// Mock that mirrors `real` for everything but signing and decryption
async fn mirror(real: &RawKeyWallet) -> MockWallet {
    let address = real.address().await.unwrap();
    let public_key = real.encryption_public_key().await.unwrap();

    let mut wallet = MockWallet::new();
    wallet
        .expect_request_accounts()
        .returning(move || Ok(vec![address]));
    wallet.expect_address().returning(move || Ok(address));
    wallet
        .expect_encryption_public_key()
        .returning(move || Ok(public_key.clone()));
    wallet
}

async fn connect_mock(
    wallet: MockWallet,
    server: &FakeServer,
) -> std::result::Result<SessionClient, SessionError> {
    let connector = server.connector();
    tokio::time::timeout(
        Duration::from_secs(5),
        SessionClient::connect_with(test_config(), Arc::new(wallet), connector),
    )
    .await
    .expect("connect should settle")
}

#[tokio::test]
async fn test_refused_accounts_fail_before_connecting() {
    let (server, _connector) = FakeServer::start();
    let mut wallet = MockWallet::new();
    wallet
        .expect_request_accounts()
        .times(1)
        .returning(|| Err(anyhow!("User rejected the request")));

    let result = connect_mock(wallet, &server).await;
    match result {
        Err(SessionError::Wallet(message)) => assert!(message.contains("rejected")),
        other => panic!("expected wallet error, got {:?}", other.map(|_| ())),
    }
    assert_eq!(server.state().await.connections, 0);
}

#[tokio::test]
async fn test_refused_signature_rejects_connect() {
    let (server, _connector) = FakeServer::start();
    let mut wallet = mirror(&RawKeyWallet::random()).await;
    wallet
        .expect_sign_message()
        .withf(|message: &str| message.starts_with("EDS authentication challenge: "))
        .times(1)
        .returning(|_| Err(anyhow!("User denied message signature")));

    let result = connect_mock(wallet, &server).await;
    assert!(matches!(result, Err(SessionError::Wallet(_))));

    let state = server.state().await;
    assert_eq!(state.connections, 1);
    assert!(state.auths.is_empty());
    assert!(state.key_records.is_empty());
}

#[tokio::test]
async fn test_refused_decrypt_rejects_connect() {
    let (server, connector) = FakeServer::start();
    let real = Arc::new(RawKeyWallet::random());

    // provision the key record with the real wallet
    let first = connect(real.clone(), connector).await;
    first.close().await;

    let mut wallet = mirror(&real).await;
    wallet
        .expect_sign_message()
        .returning(|_| Ok("0x00".to_string()));
    wallet
        .expect_decrypt()
        .times(1)
        .returning(|_| Err(anyhow!("User denied decryption")));

    let result = connect_mock(wallet, &server).await;
    match result {
        Err(SessionError::Wallet(message)) => assert!(message.contains("denied decryption")),
        other => panic!("expected wallet error, got {:?}", other.map(|_| ())),
    }
}
