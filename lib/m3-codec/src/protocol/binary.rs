/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use super::{
    FieldHeader, FieldType, ProtocolReader, ProtocolWriter, ReadBuf, check_collection_size,
};
use crate::{BatchDecodeError, BatchEncodeError};

const TYPE_STOP: u8 = 0;

fn type_id(field_type: FieldType) -> u8 {
    match field_type {
        FieldType::Bool => 2,
        FieldType::Byte => 3,
        FieldType::Double => 4,
        FieldType::I16 => 6,
        FieldType::I32 => 8,
        FieldType::I64 => 10,
        FieldType::Binary => 11,
        FieldType::Struct => 12,
        FieldType::Map => 13,
        FieldType::Set => 14,
        FieldType::List => 15,
    }
}

fn field_type(id: u8) -> Result<FieldType, BatchDecodeError> {
    let t = match id {
        2 => FieldType::Bool,
        3 => FieldType::Byte,
        4 => FieldType::Double,
        6 => FieldType::I16,
        8 => FieldType::I32,
        10 => FieldType::I64,
        11 => FieldType::Binary,
        12 => FieldType::Struct,
        13 => FieldType::Map,
        14 => FieldType::Set,
        15 => FieldType::List,
        _ => return Err(BatchDecodeError::UnknownFieldType(id)),
    };
    Ok(t)
}

fn check_len(len: usize) -> Result<i32, BatchEncodeError> {
    i32::try_from(len).map_err(|_| BatchEncodeError::TooManyElements(len))
}

pub struct BinaryWriter<'a> {
    buf: &'a mut Vec<u8>,
}

impl<'a> BinaryWriter<'a> {
    pub fn new(buf: &'a mut Vec<u8>) -> Self {
        BinaryWriter { buf }
    }
}

impl ProtocolWriter for BinaryWriter<'_> {
    fn write_struct_begin(&mut self) {}

    fn write_struct_end(&mut self) {}

    fn write_field_begin(&mut self, field_type: FieldType, id: i16) {
        self.buf.push(type_id(field_type));
        self.buf.extend_from_slice(&id.to_be_bytes());
    }

    fn write_field_stop(&mut self) {
        self.buf.push(TYPE_STOP);
    }

    fn write_bool(&mut self, v: bool) {
        self.buf.push(u8::from(v));
    }

    fn write_byte(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_i16(&mut self, v: i16) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    fn write_i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    fn write_i64(&mut self, v: i64) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    fn write_double(&mut self, v: f64) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    fn write_binary(&mut self, v: &[u8]) -> Result<(), BatchEncodeError> {
        let len = i32::try_from(v.len()).map_err(|_| BatchEncodeError::TooLongString(v.len()))?;
        self.write_i32(len);
        self.buf.extend_from_slice(v);
        Ok(())
    }

    fn write_list_begin(
        &mut self,
        elem_type: FieldType,
        size: usize,
    ) -> Result<(), BatchEncodeError> {
        let size = check_len(size)?;
        self.buf.push(type_id(elem_type));
        self.write_i32(size);
        Ok(())
    }

    fn write_map_begin(
        &mut self,
        key_type: FieldType,
        value_type: FieldType,
        size: usize,
    ) -> Result<(), BatchEncodeError> {
        let size = check_len(size)?;
        self.buf.push(type_id(key_type));
        self.buf.push(type_id(value_type));
        self.write_i32(size);
        Ok(())
    }
}

pub struct BinaryReader<'a> {
    buf: ReadBuf<'a>,
}

impl<'a> BinaryReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        BinaryReader {
            buf: ReadBuf::new(data),
        }
    }

    fn read_size(&mut self) -> Result<usize, BatchDecodeError> {
        let size = self.read_i32()?;
        check_collection_size(&*self, i64::from(size))
    }
}

impl<'a> ProtocolReader<'a> for BinaryReader<'a> {
    fn read_struct_begin(&mut self) {}

    fn read_struct_end(&mut self) {}

    fn read_field_begin(&mut self) -> Result<Option<FieldHeader>, BatchDecodeError> {
        let b = self.buf.read_u8()?;
        if b == TYPE_STOP {
            return Ok(None);
        }
        let field_type = field_type(b)?;
        let id = self.read_i16()?;
        Ok(Some(FieldHeader { field_type, id }))
    }

    fn read_bool(&mut self) -> Result<bool, BatchDecodeError> {
        let b = self.buf.read_u8()?;
        Ok(b != 0)
    }

    fn read_byte(&mut self) -> Result<u8, BatchDecodeError> {
        self.buf.read_u8()
    }

    fn read_i16(&mut self) -> Result<i16, BatchDecodeError> {
        let b = self.buf.read_array::<2>()?;
        Ok(i16::from_be_bytes(b))
    }

    fn read_i32(&mut self) -> Result<i32, BatchDecodeError> {
        let b = self.buf.read_array::<4>()?;
        Ok(i32::from_be_bytes(b))
    }

    fn read_i64(&mut self) -> Result<i64, BatchDecodeError> {
        let b = self.buf.read_array::<8>()?;
        Ok(i64::from_be_bytes(b))
    }

    fn read_double(&mut self) -> Result<f64, BatchDecodeError> {
        let b = self.buf.read_array::<8>()?;
        Ok(f64::from_be_bytes(b))
    }

    fn read_binary(&mut self) -> Result<&'a [u8], BatchDecodeError> {
        let len = self.read_i32()?;
        let Ok(len) = usize::try_from(len) else {
            return Err(BatchDecodeError::InvalidLength(i64::from(len)));
        };
        self.buf.read_bytes(len)
    }

    fn read_list_begin(&mut self) -> Result<(FieldType, usize), BatchDecodeError> {
        let elem_type = field_type(self.buf.read_u8()?)?;
        let size = self.read_size()?;
        Ok((elem_type, size))
    }

    fn read_map_begin(&mut self) -> Result<(FieldType, FieldType, usize), BatchDecodeError> {
        let key_type = field_type(self.buf.read_u8()?)?;
        let value_type = field_type(self.buf.read_u8()?)?;
        let size = self.read_size()?;
        Ok((key_type, value_type, size))
    }

    #[inline]
    fn remaining(&self) -> usize {
        self.buf.remaining()
    }
}
