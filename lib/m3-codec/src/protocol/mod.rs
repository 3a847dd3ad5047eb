/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::fmt;
use std::str::FromStr;

use crate::{BatchDecodeError, BatchEncodeError, ProtocolParseError};

mod compact;
pub use compact::{CompactReader, CompactWriter};

mod binary;
pub use binary::{BinaryReader, BinaryWriter};

mod buf;
pub(crate) use buf::ReadBuf;

pub const PROTOCOL_VERSION: u8 = 0x01;

const MAX_SKIP_DEPTH: usize = 32;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Protocol {
    #[default]
    Compact,
    Binary,
}

impl Protocol {
    pub fn id(&self) -> u8 {
        match self {
            Protocol::Compact => 0x82,
            Protocol::Binary => 0x80,
        }
    }

    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            0x82 => Some(Protocol::Compact),
            0x80 => Some(Protocol::Binary),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Compact => "compact",
            Protocol::Binary => "binary",
        }
    }
}

impl FromStr for Protocol {
    type Err = ProtocolParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "compact" => Ok(Protocol::Compact),
            "binary" => Ok(Protocol::Binary),
            _ => Err(ProtocolParseError(s.to_string())),
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wire types shared by both protocols, the numeric ids differ per protocol.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldType {
    Bool,
    Byte,
    I16,
    I32,
    I64,
    Double,
    Binary,
    List,
    Set,
    Map,
    Struct,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldHeader {
    pub field_type: FieldType,
    pub id: i16,
}

pub trait ProtocolWriter {
    fn write_struct_begin(&mut self);
    fn write_struct_end(&mut self);
    fn write_field_begin(&mut self, field_type: FieldType, id: i16);
    fn write_field_stop(&mut self);
    fn write_bool(&mut self, v: bool);
    fn write_byte(&mut self, v: u8);
    fn write_i16(&mut self, v: i16);
    fn write_i32(&mut self, v: i32);
    fn write_i64(&mut self, v: i64);
    fn write_double(&mut self, v: f64);
    fn write_binary(&mut self, v: &[u8]) -> Result<(), BatchEncodeError>;
    fn write_list_begin(
        &mut self,
        elem_type: FieldType,
        size: usize,
    ) -> Result<(), BatchEncodeError>;
    fn write_map_begin(
        &mut self,
        key_type: FieldType,
        value_type: FieldType,
        size: usize,
    ) -> Result<(), BatchEncodeError>;

    fn write_string(&mut self, s: &str) -> Result<(), BatchEncodeError> {
        self.write_binary(s.as_bytes())
    }

    fn write_set_begin(
        &mut self,
        elem_type: FieldType,
        size: usize,
    ) -> Result<(), BatchEncodeError> {
        self.write_list_begin(elem_type, size)
    }
}

pub trait ProtocolReader<'a> {
    fn read_struct_begin(&mut self);
    fn read_struct_end(&mut self);
    /// Returns `None` when the stop field is reached
    fn read_field_begin(&mut self) -> Result<Option<FieldHeader>, BatchDecodeError>;
    fn read_bool(&mut self) -> Result<bool, BatchDecodeError>;
    fn read_byte(&mut self) -> Result<u8, BatchDecodeError>;
    fn read_i16(&mut self) -> Result<i16, BatchDecodeError>;
    fn read_i32(&mut self) -> Result<i32, BatchDecodeError>;
    fn read_i64(&mut self) -> Result<i64, BatchDecodeError>;
    fn read_double(&mut self) -> Result<f64, BatchDecodeError>;
    fn read_binary(&mut self) -> Result<&'a [u8], BatchDecodeError>;
    fn read_list_begin(&mut self) -> Result<(FieldType, usize), BatchDecodeError>;
    fn read_map_begin(&mut self) -> Result<(FieldType, FieldType, usize), BatchDecodeError>;
    fn remaining(&self) -> usize;

    fn read_string(&mut self) -> Result<&'a str, BatchDecodeError> {
        let b = self.read_binary()?;
        std::str::from_utf8(b).map_err(|_| BatchDecodeError::InvalidUtf8)
    }

    fn read_set_begin(&mut self) -> Result<(FieldType, usize), BatchDecodeError> {
        self.read_list_begin()
    }

    /// Read and discard a value of the given wire type
    fn skip(&mut self, field_type: FieldType) -> Result<(), BatchDecodeError> {
        self.skip_nested(field_type, 0)
    }

    fn skip_nested(&mut self, field_type: FieldType, depth: usize) -> Result<(), BatchDecodeError> {
        if depth > MAX_SKIP_DEPTH {
            return Err(BatchDecodeError::TooDeep);
        }
        match field_type {
            FieldType::Bool => {
                self.read_bool()?;
            }
            FieldType::Byte => {
                self.read_byte()?;
            }
            FieldType::I16 => {
                self.read_i16()?;
            }
            FieldType::I32 => {
                self.read_i32()?;
            }
            FieldType::I64 => {
                self.read_i64()?;
            }
            FieldType::Double => {
                self.read_double()?;
            }
            FieldType::Binary => {
                self.read_binary()?;
            }
            FieldType::Struct => {
                self.read_struct_begin();
                while let Some(header) = self.read_field_begin()? {
                    self.skip_nested(header.field_type, depth + 1)?;
                }
                self.read_struct_end();
            }
            FieldType::List => {
                let (elem_type, size) = self.read_list_begin()?;
                for _ in 0..size {
                    self.skip_nested(elem_type, depth + 1)?;
                }
            }
            FieldType::Set => {
                let (elem_type, size) = self.read_set_begin()?;
                for _ in 0..size {
                    self.skip_nested(elem_type, depth + 1)?;
                }
            }
            FieldType::Map => {
                let (key_type, value_type, size) = self.read_map_begin()?;
                for _ in 0..size {
                    self.skip_nested(key_type, depth + 1)?;
                    self.skip_nested(value_type, depth + 1)?;
                }
            }
        }
        Ok(())
    }
}

/// Every collection element takes at least one byte on the wire
fn check_collection_size<'a, R>(reader: &R, size: i64) -> Result<usize, BatchDecodeError>
where
    R: ProtocolReader<'a> + ?Sized,
{
    match usize::try_from(size) {
        Ok(n) if n <= reader.remaining() => Ok(n),
        _ => Err(BatchDecodeError::InvalidLength(size)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_name() {
        assert_eq!(Protocol::from_str("compact").unwrap(), Protocol::Compact);
        assert_eq!(Protocol::from_str("Binary").unwrap(), Protocol::Binary);
        assert!(Protocol::from_str("json").is_err());
        assert_eq!(Protocol::default(), Protocol::Compact);
        assert_eq!(Protocol::Binary.to_string(), "binary");
    }

    #[test]
    fn protocol_id() {
        for p in [Protocol::Compact, Protocol::Binary] {
            assert_eq!(Protocol::from_id(p.id()), Some(p));
        }
        assert_eq!(Protocol::from_id(0x00), None);
    }
}
