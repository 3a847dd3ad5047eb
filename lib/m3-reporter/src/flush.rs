/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use kanal::ReceiveErrorTimeout;
use log::{debug, warn};

use m3_codec::Protocol;
use m3_types::{Metric, MetricBatch, now_timestamp};

use crate::ReporterError;
use crate::buffer::MetricsBuffer;
use crate::config::ErrorHandler;
use crate::stats::ReporterStats;
use crate::transport::Transport;

const FLUSH_THREAD_NAME: &str = "m3-flush";
/// Longest wait between two periodic flushes
const MAX_FLUSH_WAIT: Duration = Duration::from_secs(86400 * 365);

pub(crate) enum FlushCommand {
    /// overflow batches are pending in the buffer
    Wake,
    Flush(kanal::Sender<Result<(), ReporterError>>),
    Close,
}

/// Returned through the join handle of the flush thread
pub(crate) struct FlushOutcome {
    pub(crate) transport: Transport,
    pub(crate) result: Result<(), ReporterError>,
}

pub(crate) struct FlushThread {
    receiver: kanal::Receiver<FlushCommand>,
    buffer: Arc<MetricsBuffer>,
    transport: Transport,
    protocol: Protocol,
    batch: MetricBatch,
    encode_buf: Vec<u8>,
    flush_interval: Duration,
    final_flush_retries: usize,
    error_handler: Option<ErrorHandler>,
    stats: Arc<ReporterStats>,

    create_instant: Instant,
    last_error_report: u64,
}

pub(crate) struct FlushThreadConfig {
    pub(crate) protocol: Protocol,
    /// batch metadata, the metrics are filled in on each send
    pub(crate) batch: MetricBatch,
    pub(crate) flush_interval: Duration,
    pub(crate) final_flush_retries: usize,
    pub(crate) error_handler: Option<ErrorHandler>,
}

impl FlushThread {
    pub(crate) fn new(
        config: FlushThreadConfig,
        receiver: kanal::Receiver<FlushCommand>,
        buffer: Arc<MetricsBuffer>,
        transport: Transport,
        stats: Arc<ReporterStats>,
    ) -> Self {
        FlushThread {
            receiver,
            buffer,
            transport,
            protocol: config.protocol,
            batch: config.batch,
            encode_buf: Vec::new(),
            flush_interval: config.flush_interval,
            final_flush_retries: config.final_flush_retries,
            error_handler: config.error_handler,
            stats,
            create_instant: Instant::now(),
            last_error_report: 0,
        }
    }

    pub(crate) fn spawn(self) -> Result<JoinHandle<FlushOutcome>, ReporterError> {
        std::thread::Builder::new()
            .name(FLUSH_THREAD_NAME.to_string())
            .spawn(move || self.run_to_end())
            .map_err(ReporterError::ThreadSpawn)
    }

    fn run_to_end(mut self) -> FlushOutcome {
        let mut deadline = next_deadline(Instant::now(), self.flush_interval);
        loop {
            let timeout = deadline.saturating_duration_since(Instant::now());
            match self.receiver.recv_timeout(timeout) {
                Ok(FlushCommand::Wake) => {
                    let batches = self.buffer.take_pending();
                    if let Err(e) = self.send_batches(batches, 0) {
                        self.handle_flush_error(e);
                    }
                }
                Ok(FlushCommand::Flush(reply)) => {
                    let r = self.flush_buffer();
                    if reply.send(r).is_err() {
                        debug!("flush caller is gone");
                    }
                }
                Ok(FlushCommand::Close) => break,
                Err(ReceiveErrorTimeout::Timeout) => {
                    if let Err(e) = self.flush_buffer() {
                        self.handle_flush_error(e);
                    }
                    deadline = next_deadline(deadline, self.flush_interval);
                }
                Err(_) => break,
            }
        }

        let result = self.final_flush();
        FlushOutcome {
            transport: self.transport,
            result,
        }
    }

    fn flush_buffer(&mut self) -> Result<(), ReporterError> {
        let batches = self.buffer.drain();
        self.send_batches(batches, 0)
    }

    fn final_flush(&mut self) -> Result<(), ReporterError> {
        let batches = self.buffer.close_and_drain();

        while let Ok(Some(cmd)) = self.receiver.try_recv() {
            if let FlushCommand::Flush(reply) = cmd
                && reply.send(Err(ReporterError::Closed)).is_err()
            {
                debug!("flush caller is gone");
            }
        }

        self.send_batches(batches, self.final_flush_retries)
    }

    /// Send all batches in order, returning the last error
    fn send_batches(
        &mut self,
        batches: Vec<Vec<Metric>>,
        retries: usize,
    ) -> Result<(), ReporterError> {
        let total = batches.len();
        let mut result = Ok(());
        for (i, metrics) in batches.into_iter().enumerate() {
            if let Err(e) = self.send_metrics(metrics, retries) {
                self.stats.add_batch_dropped();
                if i + 1 < total {
                    debug!("m3 batch {i} of {total} dropped: {e}");
                }
                result = Err(e);
            }
        }
        result
    }

    fn send_metrics(&mut self, metrics: Vec<Metric>, retries: usize) -> Result<(), ReporterError> {
        let count = metrics.len();
        self.batch.metrics = metrics;
        self.batch.timestamp = now_timestamp();
        self.encode_buf.clear();
        let r = self.protocol.encode_frame(&self.batch, &mut self.encode_buf);
        self.batch.metrics.clear();
        r?;

        let mut attempt = 0;
        loop {
            match self.transport.send(&self.encode_buf) {
                Ok(_) => {
                    self.stats.add_batch_sent(count, self.encode_buf.len());
                    return Ok(());
                }
                Err(e) => {
                    self.stats.add_send_failed();
                    if attempt >= retries || e.is_closed() {
                        return Err(e);
                    }
                    debug!("retry sending m3 batch after error: {e}");
                    attempt += 1;
                }
            }
        }
    }

    fn handle_flush_error(&mut self, e: ReporterError) {
        let time_slice = self.create_instant.elapsed().as_secs().rotate_right(6); // every 64s
        if self.last_error_report != time_slice {
            warn!("sending m3 metrics error: {e}");
            self.last_error_report = time_slice;
        }
        if let Some(handler) = &self.error_handler {
            handler(&e);
        }
    }
}

fn next_deadline(last: Instant, interval: Duration) -> Instant {
    let interval = interval.min(MAX_FLUSH_WAIT);
    let now = Instant::now();
    match last.checked_add(interval) {
        // re-calculate from now if we are already late
        Some(next) if next > now => next,
        _ => now.checked_add(interval).unwrap_or(now),
    }
}
