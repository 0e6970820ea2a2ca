// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use super::codec::CodecError;

/// First byte of every typed request frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    GetKey = 0x11,
    SetKey = 0x1A,
    DeleteKey = 0x1B,
    GetRow = 0x21,
    RowsUpdatedSince = 0x22,
    UpsertRow = 0x2A,
    DeleteRow = 0x2B,
}

impl Opcode {
    pub fn as_byte(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Opcode {
    type Error = CodecError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            0x11 => Ok(Opcode::GetKey),
            0x1A => Ok(Opcode::SetKey),
            0x1B => Ok(Opcode::DeleteKey),
            0x21 => Ok(Opcode::GetRow),
            0x22 => Ok(Opcode::RowsUpdatedSince),
            0x2A => Ok(Opcode::UpsertRow),
            0x2B => Ok(Opcode::DeleteRow),
            other => Err(CodecError::UnknownOpcode(other)),
        }
    }
}
