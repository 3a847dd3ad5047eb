/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use log::debug;

use m3_codec::estimate_metric_size;
use m3_types::Metric;

use crate::flush::FlushCommand;
use crate::stats::ReporterStats;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum RecordOutcome {
    Appended,
    /// the previous batch was moved to the pending queue first
    Overflowed,
    Dropped,
}

#[derive(Default)]
struct BufferInner {
    metrics: Vec<Metric>,
    size: usize,
    /// full batches waiting for the flush thread, oldest first
    pending: VecDeque<Vec<Metric>>,
    closed: bool,
}

impl BufferInner {
    fn take(&mut self) -> Vec<Metric> {
        self.size = 0;
        std::mem::take(&mut self.metrics)
    }

    fn take_all(&mut self) -> Vec<Vec<Metric>> {
        let mut batches: Vec<Vec<Metric>> = self.pending.drain(..).collect();
        if !self.metrics.is_empty() {
            batches.push(self.take());
        }
        batches
    }
}

pub(crate) struct MetricsBuffer {
    inner: Mutex<BufferInner>,
    max_len: usize,
    size_budget: usize,
    handoff: kanal::Sender<FlushCommand>,
    stats: Arc<ReporterStats>,
}

impl MetricsBuffer {
    pub(crate) fn new(
        max_len: usize,
        size_budget: usize,
        handoff: kanal::Sender<FlushCommand>,
        stats: Arc<ReporterStats>,
    ) -> Self {
        MetricsBuffer {
            inner: Mutex::new(BufferInner::default()),
            max_len,
            size_budget,
            handoff,
            stats,
        }
    }

    fn lock(&self) -> MutexGuard<'_, BufferInner> {
        // the inner state is always consistent between statements
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    #[inline]
    pub(crate) fn stats(&self) -> &ReporterStats {
        &self.stats
    }

    pub(crate) fn record(&self, metric: Metric) -> RecordOutcome {
        let size = estimate_metric_size(&metric);

        let mut inner = self.lock();
        if inner.closed {
            self.stats.add_dropped_closed();
            return RecordOutcome::Dropped;
        }

        let mut outcome = RecordOutcome::Appended;
        if !inner.metrics.is_empty()
            && (inner.metrics.len() >= self.max_len || inner.size + size > self.size_budget)
        {
            let batch = inner.take();
            inner.pending.push_back(batch);
            // a full queue already holds a wake up for the flush thread
            if self.handoff.try_send(FlushCommand::Wake).is_err() {
                debug!("m3 flush thread is gone");
            }
            outcome = RecordOutcome::Overflowed;
        }

        inner.metrics.push(metric);
        inner.size += size;
        self.stats.add_recorded();
        outcome
    }

    /// Take the batches cut on overflow, leaving the filling one in place
    pub(crate) fn take_pending(&self) -> Vec<Vec<Metric>> {
        self.lock().pending.drain(..).collect()
    }

    /// Take every batch in recording order, the filling one last
    pub(crate) fn drain(&self) -> Vec<Vec<Metric>> {
        self.lock().take_all()
    }

    pub(crate) fn close_and_drain(&self) -> Vec<Vec<Metric>> {
        let mut inner = self.lock();
        inner.closed = true;
        inner.take_all()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.lock().closed
    }
}
