/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use super::{
    FieldHeader, FieldType, ProtocolReader, ProtocolWriter, ReadBuf, check_collection_size,
};
use crate::varint::{Leb128Encoder, zigzag_decode};
use crate::{BatchDecodeError, BatchEncodeError};

const TYPE_BOOL_TRUE: u8 = 1;
const TYPE_BOOL_FALSE: u8 = 2;

fn type_id(field_type: FieldType) -> u8 {
    match field_type {
        FieldType::Bool => TYPE_BOOL_TRUE,
        FieldType::Byte => 3,
        FieldType::I16 => 4,
        FieldType::I32 => 5,
        FieldType::I64 => 6,
        FieldType::Double => 7,
        FieldType::Binary => 8,
        FieldType::List => 9,
        FieldType::Set => 10,
        FieldType::Map => 11,
        FieldType::Struct => 12,
    }
}

fn field_type(id: u8) -> Result<FieldType, BatchDecodeError> {
    let t = match id {
        TYPE_BOOL_TRUE | TYPE_BOOL_FALSE => FieldType::Bool,
        3 => FieldType::Byte,
        4 => FieldType::I16,
        5 => FieldType::I32,
        6 => FieldType::I64,
        7 => FieldType::Double,
        8 => FieldType::Binary,
        9 => FieldType::List,
        10 => FieldType::Set,
        11 => FieldType::Map,
        12 => FieldType::Struct,
        _ => return Err(BatchDecodeError::UnknownFieldType(id)),
    };
    Ok(t)
}

pub struct CompactWriter<'a> {
    buf: &'a mut Vec<u8>,
    encoder: Leb128Encoder,
    last_field_id: i16,
    field_id_stack: Vec<i16>,
    // bool fields carry the value in the field header
    pending_bool_field: Option<i16>,
}

impl<'a> CompactWriter<'a> {
    pub fn new(buf: &'a mut Vec<u8>) -> Self {
        CompactWriter {
            buf,
            encoder: Leb128Encoder::default(),
            last_field_id: 0,
            field_id_stack: Vec::new(),
            pending_bool_field: None,
        }
    }

    fn write_varint(&mut self, v: u64) {
        let bytes = self.encoder.encode_u64(v);
        self.buf.extend_from_slice(bytes);
    }

    fn write_field_header(&mut self, type_id: u8, id: i16) {
        let delta = i32::from(id) - i32::from(self.last_field_id);
        if (1..=15).contains(&delta) {
            self.buf.push(((delta as u8) << 4) | type_id);
        } else {
            self.buf.push(type_id);
            let bytes = self.encoder.encode_i64(i64::from(id));
            self.buf.extend_from_slice(bytes);
        }
        self.last_field_id = id;
    }

    fn check_size(size: usize) -> Result<u64, BatchEncodeError> {
        if size > i32::MAX as usize {
            return Err(BatchEncodeError::TooManyElements(size));
        }
        Ok(size as u64)
    }
}

impl ProtocolWriter for CompactWriter<'_> {
    fn write_struct_begin(&mut self) {
        self.field_id_stack.push(self.last_field_id);
        self.last_field_id = 0;
    }

    fn write_struct_end(&mut self) {
        self.last_field_id = self.field_id_stack.pop().unwrap_or_default();
    }

    fn write_field_begin(&mut self, field_type: FieldType, id: i16) {
        if field_type == FieldType::Bool {
            self.pending_bool_field = Some(id);
        } else {
            self.write_field_header(type_id(field_type), id);
        }
    }

    fn write_field_stop(&mut self) {
        self.buf.push(0x00);
    }

    fn write_bool(&mut self, v: bool) {
        let type_id = if v { TYPE_BOOL_TRUE } else { TYPE_BOOL_FALSE };
        match self.pending_bool_field.take() {
            Some(id) => self.write_field_header(type_id, id),
            None => self.buf.push(type_id),
        }
    }

    fn write_byte(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_i16(&mut self, v: i16) {
        self.write_i64(i64::from(v));
    }

    fn write_i32(&mut self, v: i32) {
        self.write_i64(i64::from(v));
    }

    fn write_i64(&mut self, v: i64) {
        let bytes = self.encoder.encode_i64(v);
        self.buf.extend_from_slice(bytes);
    }

    fn write_double(&mut self, v: f64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_binary(&mut self, v: &[u8]) -> Result<(), BatchEncodeError> {
        if v.len() > i32::MAX as usize {
            return Err(BatchEncodeError::TooLongString(v.len()));
        }
        self.write_varint(v.len() as u64);
        self.buf.extend_from_slice(v);
        Ok(())
    }

    fn write_list_begin(
        &mut self,
        elem_type: FieldType,
        size: usize,
    ) -> Result<(), BatchEncodeError> {
        let size = Self::check_size(size)?;
        let elem_type = type_id(elem_type);
        if size < 15 {
            self.buf.push(((size as u8) << 4) | elem_type);
        } else {
            self.buf.push(0xF0 | elem_type);
            self.write_varint(size);
        }
        Ok(())
    }

    fn write_set_begin(
        &mut self,
        elem_type: FieldType,
        size: usize,
    ) -> Result<(), BatchEncodeError> {
        self.write_list_begin(elem_type, size)
    }

    fn write_map_begin(
        &mut self,
        key_type: FieldType,
        value_type: FieldType,
        size: usize,
    ) -> Result<(), BatchEncodeError> {
        let size = Self::check_size(size)?;
        self.write_varint(size);
        if size > 0 {
            self.buf
                .push((type_id(key_type) << 4) | type_id(value_type));
        }
        Ok(())
    }
}

pub struct CompactReader<'a> {
    buf: ReadBuf<'a>,
    last_field_id: i16,
    field_id_stack: Vec<i16>,
    pending_bool: Option<bool>,
}

impl<'a> CompactReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        CompactReader {
            buf: ReadBuf::new(data),
            last_field_id: 0,
            field_id_stack: Vec::new(),
            pending_bool: None,
        }
    }

    fn read_size(&mut self) -> Result<usize, BatchDecodeError> {
        let v = self.buf.read_varint()?;
        let size = i64::try_from(v).unwrap_or(i64::MAX);
        check_collection_size(&*self, size)
    }
}

impl<'a> ProtocolReader<'a> for CompactReader<'a> {
    fn read_struct_begin(&mut self) {
        self.field_id_stack.push(self.last_field_id);
        self.last_field_id = 0;
    }

    fn read_struct_end(&mut self) {
        self.last_field_id = self.field_id_stack.pop().unwrap_or_default();
    }

    fn read_field_begin(&mut self) -> Result<Option<FieldHeader>, BatchDecodeError> {
        let b = self.buf.read_u8()?;
        if b == 0 {
            return Ok(None);
        }

        let type_id = b & 0x0F;
        let field_type = field_type(type_id)?;
        let delta = b >> 4;
        let id = if delta != 0 {
            self.last_field_id.wrapping_add(i16::from(delta))
        } else {
            self.read_i16()?
        };

        if field_type == FieldType::Bool {
            self.pending_bool = Some(type_id == TYPE_BOOL_TRUE);
        }
        self.last_field_id = id;
        Ok(Some(FieldHeader { field_type, id }))
    }

    fn read_bool(&mut self) -> Result<bool, BatchDecodeError> {
        if let Some(v) = self.pending_bool.take() {
            return Ok(v);
        }
        let b = self.buf.read_u8()?;
        Ok(b == TYPE_BOOL_TRUE)
    }

    fn read_byte(&mut self) -> Result<u8, BatchDecodeError> {
        self.buf.read_u8()
    }

    fn read_i16(&mut self) -> Result<i16, BatchDecodeError> {
        let v = self.read_i64()?;
        i16::try_from(v).map_err(|_| BatchDecodeError::InvalidVarInt)
    }

    fn read_i32(&mut self) -> Result<i32, BatchDecodeError> {
        let v = self.read_i64()?;
        i32::try_from(v).map_err(|_| BatchDecodeError::InvalidVarInt)
    }

    fn read_i64(&mut self) -> Result<i64, BatchDecodeError> {
        let v = self.buf.read_varint()?;
        Ok(zigzag_decode(v))
    }

    fn read_double(&mut self) -> Result<f64, BatchDecodeError> {
        let b = self.buf.read_array::<8>()?;
        Ok(f64::from_le_bytes(b))
    }

    fn read_binary(&mut self) -> Result<&'a [u8], BatchDecodeError> {
        let v = self.buf.read_varint()?;
        let len = usize::try_from(v).unwrap_or(usize::MAX);
        self.buf.read_bytes(len)
    }

    fn read_list_begin(&mut self) -> Result<(FieldType, usize), BatchDecodeError> {
        let b = self.buf.read_u8()?;
        let elem_type = field_type(b & 0x0F)?;
        let size_nibble = b >> 4;
        let size = if size_nibble == 0x0F {
            self.read_size()?
        } else {
            check_collection_size(&*self, i64::from(size_nibble))?
        };
        Ok((elem_type, size))
    }

    fn read_map_begin(&mut self) -> Result<(FieldType, FieldType, usize), BatchDecodeError> {
        let size = self.read_size()?;
        if size == 0 {
            return Ok((FieldType::Binary, FieldType::Binary, 0));
        }
        let b = self.buf.read_u8()?;
        let key_type = field_type(b >> 4)?;
        let value_type = field_type(b & 0x0F)?;
        Ok((key_type, value_type, size))
    }

    #[inline]
    fn remaining(&self) -> usize {
        self.buf.remaining()
    }
}
