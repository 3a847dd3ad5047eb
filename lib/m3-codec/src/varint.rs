/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

//! LEB128 variable length integers and the zigzag mapping used by the
//! compact protocol for signed values.

use crate::BatchDecodeError;

pub const MAX_VARINT_LEN: usize = 10;

#[derive(Debug)]
pub struct Leb128 {
    value: u64,
    encoded_len: usize,
}

impl Leb128 {
    pub fn decode(data: &[u8]) -> Result<Leb128, BatchDecodeError> {
        let mut value: u64 = 0;
        for (i, b) in data.iter().take(MAX_VARINT_LEN).enumerate() {
            let bits = u64::from(b & 0x7F);
            if i == MAX_VARINT_LEN - 1 && bits > 1 {
                // only one bit left for the 10th byte
                return Err(BatchDecodeError::InvalidVarInt);
            }
            value |= bits << (7 * i);
            if b & 0x80 == 0 {
                return Ok(Leb128 {
                    value,
                    encoded_len: i + 1,
                });
            }
        }
        if data.len() >= MAX_VARINT_LEN {
            Err(BatchDecodeError::InvalidVarInt)
        } else {
            Err(BatchDecodeError::NeedMoreData(1))
        }
    }

    #[inline]
    pub fn value(&self) -> u64 {
        self.value
    }

    #[inline]
    pub fn encoded_len(&self) -> usize {
        self.encoded_len
    }
}

#[derive(Default)]
pub struct Leb128Encoder {
    buf: [u8; MAX_VARINT_LEN],
}

impl Leb128Encoder {
    pub fn encode_u64(&mut self, mut v: u64) -> &[u8] {
        let mut i = 0;
        loop {
            let b = (v & 0x7F) as u8;
            v >>= 7;
            if v == 0 {
                self.buf[i] = b;
                return &self.buf[..=i];
            }
            self.buf[i] = b | 0x80;
            i += 1;
        }
    }

    /// Encode a signed value with zigzag mapping
    #[inline]
    pub fn encode_i64(&mut self, v: i64) -> &[u8] {
        self.encode_u64(zigzag_encode(v))
    }
}

#[inline]
pub fn zigzag_encode(v: i64) -> u64 {
    ((v << 1) ^ (v >> 63)) as u64
}

#[inline]
pub fn zigzag_decode(v: u64) -> i64 {
    ((v >> 1) as i64) ^ -((v & 1) as i64)
}
