// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use super::common::{connect, FakeServer};
use fabstir_eds_client::crypto::digest;
use fabstir_eds_client::protocol::Opcode;
use fabstir_eds_client::wallet::RawKeyWallet;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Settings {
    theme: String,
    font_size: u32,
    tags: Vec<String>,
}

#[tokio::test]
async fn test_set_then_get_returns_value() {
    let (_server, connector) = FakeServer::start();
    let client = connect(Arc::new(RawKeyWallet::random()), connector).await;

    let settings = Settings {
        theme: "dark".to_string(),
        font_size: 14,
        tags: vec!["a".to_string(), "b".to_string()],
    };
    client.set_key("settings", &settings).await.unwrap();

    let loaded: Option<Settings> = client.get_key("settings").await.unwrap();
    assert_eq!(loaded, Some(settings));
}

#[tokio::test]
async fn test_missing_key_is_none() {
    let (_server, connector) = FakeServer::start();
    let client = connect(Arc::new(RawKeyWallet::random()), connector).await;

    let value: Option<String> = client.get_key("never-written").await.unwrap();
    assert_eq!(value, None);
}

#[tokio::test]
async fn test_delete_removes_value() {
    let (server, connector) = FakeServer::start();
    let client = connect(Arc::new(RawKeyWallet::random()), connector).await;

    client.set_key("temp", &42u64).await.unwrap();
    assert_eq!(client.get_key::<u64>("temp").await.unwrap(), Some(42));

    client.delete_key("temp").await.unwrap();
    assert_eq!(client.get_key::<u64>("temp").await.unwrap(), None);

    assert_eq!(
        server.state().await.requests,
        vec![Opcode::SetKey, Opcode::GetKey, Opcode::DeleteKey, Opcode::GetKey]
    );
}

#[tokio::test]
async fn test_server_sees_only_digests_and_ciphertext() {
    let (server, connector) = FakeServer::start();
    let client = connect(Arc::new(RawKeyWallet::random()), connector).await;

    client.set_key("email", "alice@example.com").await.unwrap();

    let state = server.state().await;
    let stored = state
        .values
        .get(digest(b"email").as_slice())
        .expect("value stored under the key digest");
    assert!(!stored
        .windows(b"alice@example.com".len())
        .any(|w| w == b"alice@example.com"));
}

#[tokio::test]
async fn test_undecryptable_value_reads_as_none() {
    let (server, connector) = FakeServer::start();
    let client = connect(Arc::new(RawKeyWallet::random()), connector).await;

    client.set_key("corrupt", "fine").await.unwrap();
    server
        .state()
        .await
        .values
        .insert(digest(b"corrupt").to_vec(), vec![0xAB; 64]);

    let value: Option<String> = client.get_key("corrupt").await.unwrap();
    assert_eq!(value, None);
}

#[tokio::test]
async fn test_concurrent_requests_are_correlated() {
    let (_server, connector) = FakeServer::start();
    let client = Arc::new(connect(Arc::new(RawKeyWallet::random()), connector).await);

    let mut writers = Vec::new();
    for i in 0..20u32 {
        let client = client.clone();
        writers.push(tokio::spawn(async move {
            client.set_key(&format!("key-{}", i), &i).await.unwrap();
        }));
    }
    for writer in writers {
        writer.await.unwrap();
    }

    let mut readers = Vec::new();
    for i in 0..20u32 {
        let client = client.clone();
        readers.push(tokio::spawn(async move {
            let value: Option<u32> = client.get_key(&format!("key-{}", i)).await.unwrap();
            assert_eq!(value, Some(i));
        }));
    }
    for reader in readers {
        reader.await.unwrap();
    }
    assert_eq!(client.pending_requests().await, 0);
}
