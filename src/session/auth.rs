// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Authentication State Machine
//!
//! Drives the four-phase handshake on every fresh transport and, once
//! authenticated, routes replies to the request correlator.
//!
//! | State | Expects | Action | Next |
//! |---|---|---|---|
//! | AwaitingChallenge | `{challenge}` | sign `prefix ‖ challenge`, send `{address, signature, pkHash}` | AwaitingResponse |
//! | AwaitingResponse | `{keyFound, encryptedKey?}` | recover or provision the session keypair | AwaitingWelcome |
//! | AwaitingWelcome | `{welcome: true}` | signal readiness, open the write gate | Authenticated |
//! | Authenticated | `{id, ...}` | resolve the pending request | Authenticated |
//!
//! A frame that does not match the current state is logged and dropped with
//! no transition. The machine owns the session keypair and is only ever
//! driven under the connection's message lock, so two frames are never
//! handled at once.

use super::correlator::RequestCorrelator;
use super::error::SessionError;
use super::gate::WriteGate;
use super::transport::FrameSender;
use crate::crypto::{EncryptedKeyBlob, Identity, SessionKeyCell, SessionKeyPair};
use crate::protocol::{
    codec, AuthRequest, Challenge, KeyLookup, ReplyHeader, Welcome,
};
use crate::wallet::WalletProvider;
use serde_bytes::ByteBuf;
use std::fmt;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    AwaitingChallenge,
    AwaitingResponse,
    AwaitingWelcome,
    Authenticated,
}

impl fmt::Display for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AuthState::AwaitingChallenge => "awaiting_challenge",
            AuthState::AwaitingResponse => "awaiting_response",
            AuthState::AwaitingWelcome => "awaiting_welcome",
            AuthState::Authenticated => "authenticated",
        };
        f.write_str(name)
    }
}

/// One-shot readiness signal for the first completed handshake
pub type ReadySignal = oneshot::Receiver<Result<(), SessionError>>;

pub struct AuthStateMachine {
    state: AuthState,
    identity: Arc<Identity>,
    wallet: Arc<dyn WalletProvider>,
    auth_prefix: String,
    keys: SessionKeyCell,
    gate: Arc<WriteGate>,
    correlator: Arc<RequestCorrelator>,
    ready: Option<oneshot::Sender<Result<(), SessionError>>>,
}

impl AuthStateMachine {
    pub fn new(
        identity: Arc<Identity>,
        wallet: Arc<dyn WalletProvider>,
        auth_prefix: impl Into<String>,
        keys: SessionKeyCell,
        gate: Arc<WriteGate>,
        correlator: Arc<RequestCorrelator>,
    ) -> Self {
        Self {
            state: AuthState::AwaitingChallenge,
            identity,
            wallet,
            auth_prefix: auth_prefix.into(),
            keys,
            gate,
            correlator,
            ready: None,
        }
    }

    /// Arm the readiness signal, replacing any previous one
    pub fn ready_signal(&mut self) -> ReadySignal {
        let (tx, rx) = oneshot::channel();
        self.ready = Some(tx);
        rx
    }

    pub fn state(&self) -> AuthState {
        self.state
    }

    /// Restart the handshake for a fresh transport
    pub fn reset(&mut self) {
        if self.state != AuthState::AwaitingChallenge {
            debug!("Auth state {} -> {} (new transport)", self.state, AuthState::AwaitingChallenge);
        }
        self.state = AuthState::AwaitingChallenge;
    }

    /// Handle one inbound frame; `control` is the transport it arrived on
    ///
    /// Returns the state after the frame. Wallet and provisioning failures
    /// leave the state unchanged and reject the readiness signal if it is
    /// still armed.
    pub async fn handle(&mut self, frame: &[u8], control: &FrameSender) -> AuthState {
        let result = match self.state {
            AuthState::AwaitingChallenge => self.on_challenge(frame, control).await,
            AuthState::AwaitingResponse => self.on_key_lookup(frame, control).await,
            AuthState::AwaitingWelcome => Ok(self.on_welcome(frame)),
            AuthState::Authenticated => {
                self.on_reply(frame).await;
                Ok(None)
            }
        };

        match result {
            Ok(Some(next)) => {
                debug!("Auth state {} -> {}", self.state, next);
                self.state = next;
            }
            Ok(None) => {}
            Err(e) => {
                error!("Handshake failed in state {}: {}", self.state, e);
                if let Some(ready) = self.ready.take() {
                    let _ = ready.send(Err(e));
                }
            }
        }
        self.state
    }

    async fn on_challenge(
        &mut self,
        frame: &[u8],
        control: &FrameSender,
    ) -> Result<Option<AuthState>, SessionError> {
        let Ok(challenge) = codec::decode::<Challenge>(frame) else {
            warn!("Discarding unexpected frame while awaiting challenge ({} bytes)", frame.len());
            return Ok(None);
        };

        let message = format!("{}{}", self.auth_prefix, challenge.challenge);
        let signature = self
            .wallet
            .sign_message(&message)
            .await
            .map_err(SessionError::wallet)?;

        let auth = AuthRequest {
            address: self.identity.address_hex(),
            signature,
            pk_hash: ByteBuf::from(self.identity.pk_hash.to_vec()),
        };
        send_control(control, codec::encode_control(&auth)?).await;

        Ok(Some(AuthState::AwaitingResponse))
    }

    async fn on_key_lookup(
        &mut self,
        frame: &[u8],
        control: &FrameSender,
    ) -> Result<Option<AuthState>, SessionError> {
        let Ok(lookup) = codec::decode::<KeyLookup>(frame) else {
            warn!("Discarding unexpected frame while awaiting key lookup ({} bytes)", frame.len());
            return Ok(None);
        };

        let keys = if lookup.key_found {
            let blob = lookup.encrypted_key.ok_or_else(|| {
                SessionError::Provisioning("server reported a key but sent no blob".to_string())
            })?;
            let keys = self.recover_keys(&blob).await?;
            info!("Recovered session key from server");
            keys
        } else {
            let keys = self.provision_keys(control).await?;
            info!("Provisioned new session key");
            keys
        };
        self.keys.store(keys).await;

        Ok(Some(AuthState::AwaitingWelcome))
    }

    fn on_welcome(&mut self, frame: &[u8]) -> Option<AuthState> {
        match codec::decode::<Welcome>(frame) {
            Ok(Welcome { welcome: true }) => {
                if let Some(ready) = self.ready.take() {
                    let _ = ready.send(Ok(()));
                }
                self.gate.open();
                info!("Authenticated as {}", self.identity.address_hex());
                Some(AuthState::Authenticated)
            }
            _ => {
                warn!("Discarding unexpected frame while awaiting welcome ({} bytes)", frame.len());
                None
            }
        }
    }

    async fn on_reply(&self, frame: &[u8]) {
        match codec::decode::<ReplyHeader>(frame) {
            Ok(header) => {
                self.correlator.resolve(header.id, frame.to_vec()).await;
            }
            Err(e) => warn!("Discarding frame without request id: {}", e),
        }
    }

    async fn recover_keys(&self, blob: &EncryptedKeyBlob) -> Result<SessionKeyPair, SessionError> {
        let encrypted = blob.to_envelope()?.to_hex_json()?;
        let plaintext = self
            .wallet
            .decrypt(&encrypted)
            .await
            .map_err(SessionError::wallet)?;

        let secret = hex::decode(plaintext.trim())
            .map_err(|e| SessionError::Provisioning(format!("decrypted key is not hex: {}", e)))?;
        Ok(SessionKeyPair::from_secret_bytes(&secret)?)
    }

    async fn provision_keys(&self, control: &FrameSender) -> Result<SessionKeyPair, SessionError> {
        let keys = SessionKeyPair::generate();
        let envelope = self
            .wallet
            .encrypt(&hex::encode(keys.secret_bytes()))
            .await
            .map_err(SessionError::wallet)?;

        let blob = EncryptedKeyBlob::from_envelope(&envelope)?;
        send_control(control, codec::encode_control(&blob)?).await;
        Ok(keys)
    }
}

async fn send_control(control: &FrameSender, frame: Vec<u8>) {
    if control.send(frame).await.is_err() {
        // The reconnect loop replaces the transport; the handshake restarts there.
        debug!("Transport closed, control frame dropped");
    }
}
