/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Clone, Copy, Default, Debug, Eq, PartialEq)]
pub struct ReporterSnapshot {
    pub recorded: u64,
    pub dropped_closed: u64,
    pub dropped_invalid: u64,
    pub batches_sent: u64,
    pub metrics_sent: u64,
    pub bytes_sent: u64,
    pub send_failed: u64,
    pub batches_dropped: u64,
}

#[derive(Default)]
pub(crate) struct ReporterStats {
    recorded: AtomicU64,
    dropped_closed: AtomicU64,
    dropped_invalid: AtomicU64,
    batches_sent: AtomicU64,
    metrics_sent: AtomicU64,
    bytes_sent: AtomicU64,
    send_failed: AtomicU64,
    batches_dropped: AtomicU64,
}

impl ReporterStats {
    pub(crate) fn snapshot(&self) -> ReporterSnapshot {
        ReporterSnapshot {
            recorded: self.recorded.load(Ordering::Relaxed),
            dropped_closed: self.dropped_closed.load(Ordering::Relaxed),
            dropped_invalid: self.dropped_invalid.load(Ordering::Relaxed),
            batches_sent: self.batches_sent.load(Ordering::Relaxed),
            metrics_sent: self.metrics_sent.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            send_failed: self.send_failed.load(Ordering::Relaxed),
            batches_dropped: self.batches_dropped.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn add_recorded(&self) {
        self.recorded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add_dropped_closed(&self) {
        self.dropped_closed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add_dropped_invalid(&self) {
        self.dropped_invalid.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add_batch_sent(&self, metrics: usize, bytes: usize) {
        self.batches_sent.fetch_add(1, Ordering::Relaxed);
        self.metrics_sent
            .fetch_add(metrics as u64, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub(crate) fn add_send_failed(&self) {
        self.send_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add_batch_dropped(&self) {
        self.batches_dropped.fetch_add(1, Ordering::Relaxed);
    }
}
