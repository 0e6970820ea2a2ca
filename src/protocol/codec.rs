// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! MessagePack frame codec
//!
//! Control frames are a bare MessagePack payload. Typed request frames are
//! `opcode (1 byte) || payload`. Everything the server sends is bare.
//! Structs are encoded as maps with their field names so the server can
//! read them without a schema.

use super::opcode::Opcode;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Failed to encode frame: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    #[error("Failed to decode frame: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    #[error("Empty request frame")]
    EmptyFrame,

    #[error("Unknown opcode: 0x{0:02x}")]
    UnknownOpcode(u8),
}

/// Serialize a value as a named MessagePack map
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, CodecError> {
    Ok(rmp_serde::to_vec_named(value)?)
}

/// Deserialize a MessagePack payload
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
    Ok(rmp_serde::from_slice(bytes)?)
}

/// Frame a handshake message
pub fn encode_control<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, CodecError> {
    encode(value)
}

/// Frame a typed request: opcode byte followed by the payload
pub fn encode_request<T: Serialize + ?Sized>(
    opcode: Opcode,
    payload: &T,
) -> Result<Vec<u8>, CodecError> {
    let body = encode(payload)?;
    let mut frame = Vec::with_capacity(1 + body.len());
    frame.push(opcode.as_byte());
    frame.extend_from_slice(&body);
    Ok(frame)
}

/// Split a typed request frame into opcode and payload
pub fn split_request(frame: &[u8]) -> Result<(Opcode, &[u8]), CodecError> {
    let (&first, body) = frame.split_first().ok_or(CodecError::EmptyFrame)?;
    Ok((Opcode::try_from(first)?, body))
}
