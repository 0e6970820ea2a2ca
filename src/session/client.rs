// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! EDS session client
//!
//! Typed key-value and row operations on top of the authenticated session.
//! Each operation hashes its logical key, allocates a request id, seals the
//! value where there is one, sends an opcode frame through the write gate and
//! waits for the matching reply. Encrypted reads return `None` both when the
//! server has nothing and when the stored envelope cannot be opened.

use super::auth::{AuthStateMachine, ReadySignal};
use super::connection::ConnectionManager;
use super::correlator::RequestCorrelator;
use super::error::SessionError;
use super::gate::WriteGate;
use super::transport::{Connector, WsConnector};
use crate::config::SessionConfig;
use crate::crypto::{digest, Identity, SessionKeyCell};
use crate::protocol::{
    codec, KeyRequest, Opcode, ReplyHeader, RowRequest, RowsReply, RowsSinceRequest, SetKeyRequest,
    UpsertRowRequest, ValueReply,
};
use crate::wallet::WalletProvider;
use serde::{de::DeserializeOwned, Serialize};
use serde_bytes::ByteBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Row returned by [`SessionClient::rows_updated_since`]
#[derive(Debug, Clone, PartialEq)]
pub struct UpdatedRow<R> {
    /// Digest of the row's serialized primary key
    pub key_hash: Vec<u8>,
    pub updated_at: u64,
    pub row: R,
}

pub struct SessionClient {
    manager: ConnectionManager,
    correlator: Arc<RequestCorrelator>,
    keys: SessionKeyCell,
    identity: Arc<Identity>,
}

impl SessionClient {
    /// Connect over WebSocket to `config.url`
    pub async fn connect(
        config: SessionConfig,
        wallet: Arc<dyn WalletProvider>,
    ) -> Result<Self, SessionError> {
        let connector = Arc::new(WsConnector::new(config.url.clone(), config.channel_capacity));
        Self::connect_with(config, wallet, connector).await
    }

    /// Connect through an arbitrary transport
    ///
    /// Resolves once the first handshake is authenticated. A wallet or key
    /// provisioning failure during that handshake rejects the connection.
    pub async fn connect_with(
        config: SessionConfig,
        wallet: Arc<dyn WalletProvider>,
        connector: Arc<dyn Connector>,
    ) -> Result<Self, SessionError> {
        wallet
            .request_accounts()
            .await
            .map_err(SessionError::wallet)?;
        let identity = Arc::new(
            Identity::resolve(wallet.as_ref(), config.app_id.as_deref())
                .await
                .map_err(SessionError::wallet)?,
        );

        let keys = SessionKeyCell::new();
        let gate = Arc::new(WriteGate::new());
        let correlator = Arc::new(RequestCorrelator::new());

        let mut auth = AuthStateMachine::new(
            identity.clone(),
            wallet,
            config.auth_prefix.clone(),
            keys.clone(),
            gate.clone(),
            correlator.clone(),
        );
        let ready: ReadySignal = auth.ready_signal();

        let manager = ConnectionManager::start(connector, auth, gate, config.reconnect_delay).await;

        match ready.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                manager.shutdown().await;
                return Err(e);
            }
            Err(_) => {
                manager.shutdown().await;
                return Err(SessionError::Closed);
            }
        }

        info!("EDS session ready for {}", identity.address_hex());
        Ok(Self {
            manager,
            correlator,
            keys,
            identity,
        })
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn epoch(&self) -> u64 {
        self.manager.epoch()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.manager.is_authenticated().await
    }

    /// Number of requests still waiting for a reply
    pub async fn pending_requests(&self) -> usize {
        self.correlator.pending().await
    }

    /// Read and decrypt the value stored under `key`
    pub async fn get_key<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, SessionError> {
        let key = key_digest(key);
        let reply: ValueReply = self
            .request(Opcode::GetKey, |id| KeyRequest { id, key })
            .await?;
        Ok(self.open_value(reply).await)
    }

    /// Encrypt and store `value` under `key`
    pub async fn set_key<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), SessionError> {
        let key = key_digest(key);
        let data = self.seal(value).await?;
        let _: ReplyHeader = self
            .request(Opcode::SetKey, |id| SetKeyRequest { id, key, data })
            .await?;
        Ok(())
    }

    pub async fn delete_key(&self, key: &str) -> Result<(), SessionError> {
        let key = key_digest(key);
        let _: ReplyHeader = self
            .request(Opcode::DeleteKey, |id| KeyRequest { id, key })
            .await?;
        Ok(())
    }

    /// Read and decrypt the row of `table` whose primary key is `primary_key`
    pub async fn get_row<K, R>(&self, table: &str, primary_key: &K) -> Result<Option<R>, SessionError>
    where
        K: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let key = row_digest(primary_key)?;
        let table = table.to_string();
        let reply: ValueReply = self
            .request(Opcode::GetRow, |id| RowRequest { id, table, key })
            .await?;
        Ok(self.open_value(reply).await)
    }

    pub async fn upsert_row<K, R>(&self, table: &str, primary_key: &K, row: &R) -> Result<(), SessionError>
    where
        K: Serialize + ?Sized,
        R: Serialize + ?Sized,
    {
        let key = row_digest(primary_key)?;
        let data = self.seal(row).await?;
        let table = table.to_string();
        let _: ReplyHeader = self
            .request(Opcode::UpsertRow, |id| UpsertRowRequest {
                id,
                table,
                key,
                data,
            })
            .await?;
        Ok(())
    }

    pub async fn delete_row<K>(&self, table: &str, primary_key: &K) -> Result<(), SessionError>
    where
        K: Serialize + ?Sized,
    {
        let key = row_digest(primary_key)?;
        let table = table.to_string();
        let _: ReplyHeader = self
            .request(Opcode::DeleteRow, |id| RowRequest { id, table, key })
            .await?;
        Ok(())
    }

    /// Rows of `table` updated after `since`
    ///
    /// Rows whose envelope cannot be opened or decoded are dropped with a
    /// warning; the rest are returned.
    pub async fn rows_updated_since<R: DeserializeOwned>(
        &self,
        table: &str,
        since: u64,
    ) -> Result<Vec<UpdatedRow<R>>, SessionError> {
        let table_name = table.to_string();
        let reply: RowsReply = self
            .request(Opcode::RowsUpdatedSince, |id| RowsSinceRequest {
                id,
                table: table_name,
                since,
            })
            .await?;

        let mut rows = Vec::with_capacity(reply.rows.len());
        for record in reply.rows {
            let Some(plaintext) = self.keys.open(&record.data).await else {
                warn!(
                    "Dropping row {} of {}: envelope failed to decrypt",
                    hex::encode(&record.key),
                    table
                );
                continue;
            };
            match codec::decode::<R>(&plaintext) {
                Ok(row) => rows.push(UpdatedRow {
                    key_hash: record.key.into_vec(),
                    updated_at: record.updated_at,
                    row,
                }),
                Err(e) => warn!(
                    "Dropping row {} of {}: {}",
                    hex::encode(&record.key),
                    table,
                    e
                ),
            }
        }
        Ok(rows)
    }

    /// Shut the session down; no reconnect follows
    ///
    /// Requests still waiting for the gate or for a reply fail with
    /// [`SessionError::Closed`].
    pub async fn close(&self) {
        self.manager.shutdown().await;
        self.correlator.clear().await;
        self.keys.clear().await;
    }

    async fn request<Req, Reply>(
        &self,
        opcode: Opcode,
        build: impl FnOnce(u32) -> Req,
    ) -> Result<Reply, SessionError>
    where
        Req: Serialize,
        Reply: DeserializeOwned,
    {
        if self.manager.is_shut_down() {
            return Err(SessionError::Closed);
        }

        let (id, reply) = self.correlator.track().await;
        let frame = codec::encode_request(opcode, &build(id))?;
        debug!("Sending {:?} request {} ({} bytes)", opcode, id, frame.len());
        if let Err(e) = self.manager.send(frame).await {
            self.correlator.cancel(id).await;
            return Err(e);
        }

        let reply = reply.await.map_err(|_| SessionError::Closed)?;
        Ok(codec::decode(&reply)?)
    }

    async fn seal<T: Serialize + ?Sized>(&self, value: &T) -> Result<ByteBuf, SessionError> {
        let plaintext = codec::encode(value)?;
        Ok(ByteBuf::from(self.keys.seal(&plaintext).await?))
    }

    async fn open_value<T: DeserializeOwned>(&self, reply: ValueReply) -> Option<T> {
        let data = match reply {
            ValueReply {
                exists: true,
                data: Some(data),
                ..
            } => data,
            _ => return None,
        };

        let Some(plaintext) = self.keys.open(&data).await else {
            warn!("Stored value ({} bytes) failed to decrypt", data.len());
            return None;
        };
        match codec::decode(&plaintext) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Stored value decrypted but failed to decode: {}", e);
                None
            }
        }
    }
}

fn key_digest(key: &str) -> ByteBuf {
    ByteBuf::from(digest(key.as_bytes()).to_vec())
}

fn row_digest<K: Serialize + ?Sized>(primary_key: &K) -> Result<ByteBuf, SessionError> {
    let serialized = codec::encode(primary_key)?;
    Ok(ByteBuf::from(digest(&serialized).to_vec()))
}
