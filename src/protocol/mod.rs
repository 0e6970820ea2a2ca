// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod codec;
pub mod messages;
pub mod opcode;

pub use codec::{decode, encode, encode_control, encode_request, split_request, CodecError};
pub use messages::*;
pub use opcode::Opcode;
