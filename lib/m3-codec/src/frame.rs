/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io::{self, Read};

use m3_types::MetricBatch;

use crate::batch::{decode_batch, encode_batch};
use crate::protocol::{
    BinaryReader, BinaryWriter, CompactReader, CompactWriter, PROTOCOL_VERSION, ProtocolReader,
};
use crate::{BatchDecodeError, BatchEncodeError, Protocol};

pub const FRAME_HEADER_LEN: usize = 4;
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

impl Protocol {
    /// Append one length prefixed frame carrying `batch` to `buf`
    pub fn encode_frame(
        &self,
        batch: &MetricBatch,
        buf: &mut Vec<u8>,
    ) -> Result<(), BatchEncodeError> {
        let start_offset = buf.len();
        buf.extend_from_slice(&[0u8; FRAME_HEADER_LEN]);
        buf.push(self.id());
        buf.push(PROTOCOL_VERSION);
        let r = match self {
            Protocol::Compact => encode_batch(&mut CompactWriter::new(buf), batch),
            Protocol::Binary => encode_batch(&mut BinaryWriter::new(buf), batch),
        };
        if let Err(e) = r {
            buf.truncate(start_offset);
            return Err(e);
        }

        let payload_len = buf.len() - start_offset - FRAME_HEADER_LEN;
        if payload_len > MAX_FRAME_SIZE {
            buf.truncate(start_offset);
            return Err(BatchEncodeError::TooLargeFrame(payload_len));
        }
        let dst = &mut buf[start_offset..start_offset + FRAME_HEADER_LEN];
        dst.copy_from_slice(&(payload_len as u32).to_be_bytes());
        Ok(())
    }
}

/// Decode the payload of a frame, the length prefix excluded.
///
/// The protocol is detected from the leading protocol id.
pub fn decode_frame(payload: &[u8]) -> Result<(Protocol, MetricBatch), BatchDecodeError> {
    if payload.len() < 2 {
        return Err(BatchDecodeError::NeedMoreData(2 - payload.len()));
    }
    let protocol =
        Protocol::from_id(payload[0]).ok_or(BatchDecodeError::UnknownProtocol(payload[0]))?;
    if payload[1] != PROTOCOL_VERSION {
        return Err(BatchDecodeError::UnsupportedVersion(payload[1]));
    }

    let data = &payload[2..];
    let (batch, left) = match protocol {
        Protocol::Compact => {
            let mut r = CompactReader::new(data);
            (decode_batch(&mut r)?, r.remaining())
        }
        Protocol::Binary => {
            let mut r = BinaryReader::new(data);
            (decode_batch(&mut r)?, r.remaining())
        }
    };
    if left > 0 {
        return Err(BatchDecodeError::TrailingData(left));
    }
    Ok((protocol, batch))
}

/// Read the payload of the next frame.
///
/// `None` is returned if the reader reached EOF at a frame boundary.
pub fn read_frame<R: Read>(reader: &mut R, max_len: usize) -> io::Result<Option<Vec<u8>>> {
    let mut hdr = [0u8; FRAME_HEADER_LEN];
    let mut nr = 0;
    while nr < FRAME_HEADER_LEN {
        match reader.read(&mut hdr[nr..]) {
            Ok(0) if nr == 0 => return Ok(None),
            Ok(0) => return Err(io::Error::from(io::ErrorKind::UnexpectedEof)),
            Ok(n) => nr += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }

    let to_read = u32::from_be_bytes(hdr) as usize;
    if to_read > max_len {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("frame size {to_read} exceeds limit {max_len}"),
        ));
    }
    let mut buf = vec![0u8; to_read];
    reader.read_exact(&mut buf)?;
    Ok(Some(buf))
}
