/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use crate::BatchDecodeError;
use crate::varint::Leb128;

pub(crate) struct ReadBuf<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> ReadBuf<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        ReadBuf { data, offset: 0 }
    }

    #[inline]
    pub(crate) fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8, BatchDecodeError> {
        let Some(b) = self.data.get(self.offset) else {
            return Err(BatchDecodeError::NeedMoreData(1));
        };
        self.offset += 1;
        Ok(*b)
    }

    pub(crate) fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], BatchDecodeError> {
        let left = self.remaining();
        if left < len {
            return Err(BatchDecodeError::NeedMoreData(len - left));
        }
        let bytes = &self.data[self.offset..self.offset + len];
        self.offset += len;
        Ok(bytes)
    }

    pub(crate) fn read_array<const N: usize>(&mut self) -> Result<[u8; N], BatchDecodeError> {
        let bytes = self.read_bytes(N)?;
        let mut a = [0u8; N];
        a.copy_from_slice(bytes);
        Ok(a)
    }

    pub(crate) fn read_varint(&mut self) -> Result<u64, BatchDecodeError> {
        let v = Leb128::decode(&self.data[self.offset..])?;
        self.offset += v.encoded_len();
        Ok(v.value())
    }
}
