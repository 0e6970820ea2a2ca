// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use super::common::{connect, test_config, wait_until, FakeServer};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use fabstir_eds_client::session::{
    Connector, MemoryConnector, SessionClient, TransportChannel, TransportEvent,
};
use fabstir_eds_client::wallet::RawKeyWallet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

async fn wait_for_epoch(client: &SessionClient, epoch: u64) {
    wait_until(move || async move { client.epoch() >= epoch }).await;
}

async fn wait_for_authenticated(client: &SessionClient) {
    wait_until(move || async move { client.is_authenticated().await }).await;
}

#[tokio::test]
async fn test_reconnect_recovers_same_session_key() {
    let (server, connector) = FakeServer::start();
    let client = connect(Arc::new(RawKeyWallet::random()), connector).await;

    client.set_key("before", "sealed on epoch 1").await.unwrap();

    server.drop_connection().await;
    server.wait_for_auths(2).await;
    wait_for_authenticated(&client).await;

    // invalidated epoch 1, then opened epoch 3
    assert_eq!(client.epoch(), 3);
    let value: Option<String> = client.get_key("before").await.unwrap();
    assert_eq!(value.as_deref(), Some("sealed on epoch 1"));

    let state = server.state().await;
    assert_eq!(state.connections, 2);
    assert!(state.auths[1].key_found, "reconnect must reuse the stored key");
    assert_eq!(state.key_records.len(), 1);
}

#[tokio::test]
async fn test_transport_error_triggers_single_reconnect() {
    let (server, connector) = FakeServer::start();
    let client = connect(Arc::new(RawKeyWallet::random()), connector).await;

    server.fail_connection("connection reset").await;
    server.wait_for_auths(2).await;
    wait_for_authenticated(&client).await;

    // give a duplicate reconnect time to show up
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(server.state().await.connections, 2);
    assert_eq!(client.epoch(), 3);
}

#[tokio::test]
async fn test_requests_wait_for_reauthentication() {
    let (server, connector) = FakeServer::start();
    let client = connect(Arc::new(RawKeyWallet::random()), connector).await;

    server.drop_connection().await;
    wait_for_epoch(&client, 2).await;
    assert!(!client.is_authenticated().await);

    // issued while the gate is closed; sent once the new handshake finishes
    client.set_key("queued", &7u8).await.unwrap();
    assert_eq!(server.state().await.auths.len(), 2);
    assert_eq!(client.get_key::<u8>("queued").await.unwrap(), Some(7));
}

#[tokio::test]
async fn test_pending_request_survives_reconnect() {
    let (server, connector) = FakeServer::start();
    let client = Arc::new(connect(Arc::new(RawKeyWallet::random()), connector).await);
    client.set_key("slow", "eventually").await.unwrap();

    server.state().await.hold_replies = true;
    let reader = {
        let client = client.clone();
        tokio::spawn(async move { client.get_key::<String>("slow").await })
    };
    server.wait_for_requests(2).await;

    server.drop_connection().await;
    server.wait_for_auths(2).await;
    wait_for_authenticated(&client).await;

    // no resend and no failure: the caller is still waiting
    assert!(!reader.is_finished());
    assert_eq!(client.pending_requests().await, 1);
    assert_eq!(server.state().await.requests.len(), 2);

    // the late reply still resolves it by id
    server.release_held().await;
    let value = tokio::time::timeout(Duration::from_secs(5), reader)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(value.as_deref(), Some("eventually"));
    assert_eq!(client.pending_requests().await, 0);
}

#[tokio::test]
async fn test_events_from_replaced_transport_are_ignored() {
    let (server, connector) = FakeServer::start();
    let client = Arc::new(connect(Arc::new(RawKeyWallet::random()), connector).await);
    let stale = server.live_events().await.unwrap();

    // the reply to this request is captured instead of delivered
    server.state().await.hold_replies = true;
    let reader = {
        let client = client.clone();
        tokio::spawn(async move { client.get_key::<String>("late").await })
    };
    {
        let server = server.clone();
        wait_until(move || {
            let server = server.clone();
            async move { !server.state().await.held.is_empty() }
        })
        .await;
    }
    let reply = server.state().await.held.pop().unwrap();

    server.drop_connection().await;
    server.wait_for_auths(2).await;
    wait_for_authenticated(&client).await;
    assert_eq!(client.epoch(), 3);

    // reply and close arriving on the epoch-1 transport change nothing
    let _ = stale.send(TransportEvent::Message(reply.clone())).await;
    let _ = stale.send(TransportEvent::Closed).await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(!reader.is_finished());
    assert_eq!(client.pending_requests().await, 1);
    assert_eq!(server.state().await.connections, 2);
    assert_eq!(client.epoch(), 3);
    assert!(client.is_authenticated().await);

    // the same reply on the current transport resolves the caller
    let live = server.live_events().await.unwrap();
    live.send(TransportEvent::Message(reply)).await.unwrap();
    let value = tokio::time::timeout(Duration::from_secs(5), reader)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(value, None);
}

/// Refuses the first `failures` connection attempts
struct FlakyConnector {
    inner: Arc<MemoryConnector>,
    failures: usize,
    attempts: AtomicUsize,
}

#[async_trait]
impl Connector for FlakyConnector {
    async fn connect(&self) -> Result<TransportChannel> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if attempt < self.failures {
            return Err(anyhow!("connection refused (attempt {})", attempt + 1));
        }
        self.inner.connect().await
    }
}

#[tokio::test]
async fn test_connect_retries_failed_opens() {
    let (server, inner) = FakeServer::start();
    let connector = Arc::new(FlakyConnector {
        inner,
        failures: 3,
        attempts: AtomicUsize::new(0),
    });

    let client = tokio::time::timeout(
        Duration::from_secs(5),
        SessionClient::connect_with(
            test_config(),
            Arc::new(RawKeyWallet::random()),
            connector.clone(),
        ),
    )
    .await
    .unwrap()
    .unwrap();

    assert!(client.is_authenticated().await);
    assert_eq!(connector.attempts.load(Ordering::SeqCst), 4);
    assert_eq!(server.state().await.connections, 1);
    // each failed open is invalidated before the next one
    assert_eq!(client.epoch(), 7);
}
