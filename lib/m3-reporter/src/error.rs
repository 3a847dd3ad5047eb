/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io;

use thiserror::Error;

use m3_codec::{BatchDecodeError, BatchEncodeError};

use crate::transport::ServerAddr;

#[derive(Debug, Error)]
pub enum ReporterError {
    #[error("invalid config: {0}")]
    Configuration(String),
    #[error("server {addr} unavailable: {source:?}")]
    TransportUnavailable { addr: ServerAddr, source: io::Error },
    #[error("malformed batch: {0}")]
    MalformedBatch(#[from] BatchDecodeError),
    #[error("failed to encode batch: {0}")]
    Encode(#[from] BatchEncodeError),
    #[error("reporter already closed")]
    Closed,
    #[error("failed to spawn flush thread: {0:?}")]
    ThreadSpawn(io::Error),
}

impl ReporterError {
    pub(crate) fn config<T: Into<String>>(msg: T) -> Self {
        ReporterError::Configuration(msg.into())
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, ReporterError::Closed)
    }
}
