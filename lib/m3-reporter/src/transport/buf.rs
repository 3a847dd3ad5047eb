/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use super::ServerAddr;
use crate::ReporterError;

/// Collects sent frames in memory
#[derive(Clone, Default)]
pub(crate) struct BufTransport {
    frames: Arc<Mutex<Vec<Vec<u8>>>>,
    fail: Arc<AtomicBool>,
    closed: bool,
}

impl BufTransport {
    pub(crate) fn frames(&self) -> Vec<Vec<u8>> {
        self.frames.lock().unwrap().clone()
    }

    pub(crate) fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::Relaxed);
    }

    pub(super) fn send(&mut self, frame: &[u8]) -> Result<(), ReporterError> {
        if self.closed {
            return Err(ReporterError::Closed);
        }
        if self.fail.load(Ordering::Relaxed) {
            return Err(ReporterError::TransportUnavailable {
                addr: ServerAddr::from_str("buf.test:1").unwrap(),
                source: io::Error::from(io::ErrorKind::ConnectionRefused),
            });
        }
        self.frames.lock().unwrap().push(frame.to_vec());
        Ok(())
    }

    pub(super) fn close(&mut self) {
        self.closed = true;
    }
}
