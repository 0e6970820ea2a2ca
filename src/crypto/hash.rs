// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use sha2::{Digest, Sha256};

/// Digest length
pub const DIGEST_SIZE: usize = 32;

/// SHA-256 content digest
///
/// Used for the identity hash and for every key sent to the server. Keys are
/// hashed, never their values, so the server can index records it cannot read.
pub fn digest(bytes: &[u8]) -> [u8; DIGEST_SIZE] {
    Sha256::digest(bytes).into()
}
