/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use thiserror::Error;

use m3_types::MetricError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BatchDecodeError {
    #[error("need {0} bytes more data")]
    NeedMoreData(usize),
    #[error("invalid varint encoding")]
    InvalidVarInt,
    #[error("invalid length {0}")]
    InvalidLength(i64),
    #[error("invalid utf-8 string")]
    InvalidUtf8,
    #[error("unknown field type {0}")]
    UnknownFieldType(u8),
    #[error("unknown protocol id {0:#04x}")]
    UnknownProtocol(u8),
    #[error("unsupported protocol version {0}")]
    UnsupportedVersion(u8),
    #[error("missing mandatory field {0}")]
    MissingField(&'static str),
    #[error("invalid metric value: {0}")]
    InvalidValue(&'static str),
    #[error("invalid metric: {0}")]
    InvalidMetric(#[from] MetricError),
    #[error("too deep nesting")]
    TooDeep,
    #[error("{0} bytes trailing data")]
    TrailingData(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BatchEncodeError {
    #[error("too long string of {0} bytes")]
    TooLongString(usize),
    #[error("too many elements: {0}")]
    TooManyElements(usize),
    #[error("too large frame size {0}")]
    TooLargeFrame(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown protocol name {0}")]
pub struct ProtocolParseError(pub String);
