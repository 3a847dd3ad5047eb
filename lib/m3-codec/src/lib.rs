/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

mod error;
pub use error::{BatchDecodeError, BatchEncodeError, ProtocolParseError};

pub mod varint;
pub mod protocol;
pub use protocol::Protocol;

mod batch;
pub use batch::{decode_batch, encode_batch};

mod estimate;
pub use estimate::{estimate_batch_overhead, estimate_metric_size};

mod frame;
pub use frame::{FRAME_HEADER_LEN, MAX_FRAME_SIZE, decode_frame, read_frame};
