// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use crate::crypto::EncryptedKeyBlob;
use serde::{Deserialize, Serialize};
use serde_bytes::ByteBuf;

// Handshake, server -> client

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Challenge {
    pub challenge: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyLookup {
    #[serde(rename = "keyFound")]
    pub key_found: bool,

    #[serde(
        rename = "encryptedKey",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub encrypted_key: Option<EncryptedKeyBlob>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Welcome {
    pub welcome: bool,
}

// Handshake, client -> server

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthRequest {
    pub address: String,
    pub signature: String,
    #[serde(rename = "pkHash")]
    pub pk_hash: ByteBuf,
}

// Typed requests (payload after the opcode byte)

/// `GetKey` and `DeleteKey`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyRequest {
    pub id: u32,
    pub key: ByteBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetKeyRequest {
    pub id: u32,
    pub key: ByteBuf,
    pub data: ByteBuf,
}

/// `GetRow` and `DeleteRow`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowRequest {
    pub id: u32,
    pub table: String,
    pub key: ByteBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpsertRowRequest {
    pub id: u32,
    pub table: String,
    pub key: ByteBuf,
    pub data: ByteBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowsSinceRequest {
    pub id: u32,
    pub table: String,
    pub since: u64,
}

// Replies, routed by `id` once authenticated

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyHeader {
    pub id: u32,
}

/// Reply to `GetKey` and `GetRow`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueReply {
    pub id: u32,

    #[serde(rename = "Exists", default)]
    pub exists: bool,

    #[serde(rename = "Data", default, skip_serializing_if = "Option::is_none")]
    pub data: Option<ByteBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowRecord {
    #[serde(rename = "Key")]
    pub key: ByteBuf,

    #[serde(rename = "Data")]
    pub data: ByteBuf,

    #[serde(rename = "UpdatedAt", default)]
    pub updated_at: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowsReply {
    pub id: u32,

    #[serde(rename = "Rows", default)]
    pub rows: Vec<RowRecord>,
}
