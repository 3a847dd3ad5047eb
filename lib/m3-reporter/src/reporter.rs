/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use log::{debug, warn};

use m3_types::{Metric, MetricBatch, MetricName, MetricTagMap, MetricValue};

use crate::buffer::MetricsBuffer;
use crate::config::ReporterSetup;
use crate::flush::{FlushCommand, FlushOutcome, FlushThread, FlushThreadConfig};
use crate::stats::{ReporterSnapshot, ReporterStats};
use crate::transport::{TcpTransport, Transport};
use crate::{ReporterConfig, ReporterError};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Capabilities {
    pub reporting: bool,
    pub tagging: bool,
}

/// The report, flush and close contract consumed by a metrics scope.
pub trait CachedReporter: Send + Sync {
    fn capabilities(&self) -> Capabilities;

    fn report_counter(&self, name: &str, tags: &MetricTagMap, delta: i64);
    fn report_gauge(&self, name: &str, tags: &MetricTagMap, value: f64);
    fn report_timer(&self, name: &str, tags: &MetricTagMap, duration: Duration);

    fn allocate_counter(&self, name: &str, tags: &MetricTagMap) -> CachedCounter;
    fn allocate_gauge(&self, name: &str, tags: &MetricTagMap) -> CachedGauge;
    fn allocate_timer(&self, name: &str, tags: &MetricTagMap) -> CachedTimer;

    fn flush(&self) -> Result<(), ReporterError>;
    fn close(&self) -> Result<(), ReporterError>;
}

#[derive(Clone)]
struct CachedMetric {
    // metrics with an invalid name are counted and dropped on each report
    name: Option<MetricName>,
    tags: Arc<MetricTagMap>,
    buffer: Arc<MetricsBuffer>,
}

impl CachedMetric {
    fn new(buffer: &Arc<MetricsBuffer>, name: &str, tags: &MetricTagMap) -> Self {
        CachedMetric {
            name: MetricName::new(name).ok(),
            tags: Arc::new(tags.clone()),
            buffer: Arc::clone(buffer),
        }
    }

    fn report(&self, value: MetricValue) {
        match &self.name {
            Some(name) => {
                let metric = Metric::new(name.clone(), Arc::clone(&self.tags), value);
                self.buffer.record(metric);
            }
            None => self.buffer.stats().add_dropped_invalid(),
        }
    }
}

#[derive(Clone)]
pub struct CachedCounter(CachedMetric);

impl CachedCounter {
    pub fn report_count(&self, delta: i64) {
        self.0.report(MetricValue::Counter(delta));
    }
}

#[derive(Clone)]
pub struct CachedGauge(CachedMetric);

impl CachedGauge {
    pub fn report_gauge(&self, value: f64) {
        self.0.report(MetricValue::Gauge(value));
    }
}

#[derive(Clone)]
pub struct CachedTimer(CachedMetric);

impl CachedTimer {
    pub fn report_timer(&self, duration: Duration) {
        self.0.report(MetricValue::timer(duration));
    }
}

pub struct M3Reporter {
    buffer: Arc<MetricsBuffer>,
    sender: kanal::Sender<FlushCommand>,
    flush_thread: Mutex<Option<JoinHandle<FlushOutcome>>>,
    stats: Arc<ReporterStats>,
}

impl M3Reporter {
    pub fn new(config: ReporterConfig) -> Result<Self, ReporterError> {
        let setup = config.check()?;
        let transport = Transport::Tcp(TcpTransport::new(
            setup.addrs.clone(),
            config.connect_timeout,
            config.write_timeout,
        ));
        M3Reporter::with_transport(config, setup, transport)
    }

    fn with_transport(
        config: ReporterConfig,
        setup: ReporterSetup,
        transport: Transport,
    ) -> Result<Self, ReporterError> {
        let stats = Arc::new(ReporterStats::default());
        let (sender, receiver) = kanal::bounded(config.queue_size);
        let buffer = Arc::new(MetricsBuffer::new(
            config.max_batch_len,
            setup.size_budget,
            sender.clone(),
            Arc::clone(&stats),
        ));

        debug!(
            "starting m3 reporter for {}/{} with common tags [{}]",
            config.service,
            config.env,
            setup.common_tags.display()
        );
        let batch = MetricBatch::new(&config.service, &config.env, Vec::new())
            .with_common_tags(setup.common_tags);
        let flush_config = FlushThreadConfig {
            protocol: config.protocol,
            batch,
            flush_interval: config.flush_interval,
            final_flush_retries: config.final_flush_retries,
            error_handler: config.error_handler,
        };
        let handle = FlushThread::new(
            flush_config,
            receiver,
            Arc::clone(&buffer),
            transport,
            Arc::clone(&stats),
        )
        .spawn()?;

        Ok(M3Reporter {
            buffer,
            sender,
            flush_thread: Mutex::new(Some(handle)),
            stats,
        })
    }

    fn record(&self, metric: Result<Metric, m3_types::MetricError>) {
        match metric {
            Ok(m) => {
                self.buffer.record(m);
            }
            Err(_) => self.stats.add_dropped_invalid(),
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            reporting: true,
            tagging: true,
        }
    }

    pub fn report_counter(&self, name: &str, tags: &MetricTagMap, delta: i64) {
        self.record(Metric::counter(name, tags, delta));
    }

    pub fn report_gauge(&self, name: &str, tags: &MetricTagMap, value: f64) {
        self.record(Metric::gauge(name, tags, value));
    }

    pub fn report_timer(&self, name: &str, tags: &MetricTagMap, duration: Duration) {
        self.record(Metric::timer(name, tags, duration));
    }

    pub fn allocate_counter(&self, name: &str, tags: &MetricTagMap) -> CachedCounter {
        CachedCounter(CachedMetric::new(&self.buffer, name, tags))
    }

    pub fn allocate_gauge(&self, name: &str, tags: &MetricTagMap) -> CachedGauge {
        CachedGauge(CachedMetric::new(&self.buffer, name, tags))
    }

    pub fn allocate_timer(&self, name: &str, tags: &MetricTagMap) -> CachedTimer {
        CachedTimer(CachedMetric::new(&self.buffer, name, tags))
    }

    /// Send all buffered metrics now and wait for the result
    pub fn flush(&self) -> Result<(), ReporterError> {
        let guard = self.flush_thread.lock().unwrap_or_else(|e| e.into_inner());
        if guard.is_none() {
            return Err(ReporterError::Closed);
        }

        let (reply_sender, reply_receiver) = kanal::bounded(1);
        self.sender
            .send(FlushCommand::Flush(reply_sender))
            .map_err(|_| ReporterError::Closed)?;
        let r = reply_receiver.recv().map_err(|_| ReporterError::Closed)?;
        drop(guard);
        r
    }

    /// Stop the flush thread after sending everything recorded so far.
    ///
    /// The error of the final send is returned.
    pub fn close(&self) -> Result<(), ReporterError> {
        let mut guard = self.flush_thread.lock().unwrap_or_else(|e| e.into_inner());
        let Some(handle) = guard.take() else {
            return Err(ReporterError::Closed);
        };

        if self.sender.send(FlushCommand::Close).is_err() {
            debug!("m3 flush thread exited before close");
        }
        match handle.join() {
            Ok(FlushOutcome {
                mut transport,
                result,
            }) => {
                transport.close();
                result
            }
            Err(_) => {
                warn!("m3 flush thread panicked");
                let lost: usize = self.buffer.close_and_drain().iter().map(Vec::len).sum();
                if lost > 0 {
                    warn!("{lost} metrics lost on close");
                }
                Err(ReporterError::Closed)
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.buffer.is_closed()
    }

    pub fn stats(&self) -> ReporterSnapshot {
        self.stats.snapshot()
    }
}

impl Drop for M3Reporter {
    fn drop(&mut self) {
        match self.close() {
            Ok(_) | Err(ReporterError::Closed) => {}
            Err(e) => warn!("m3 reporter final flush failed: {e}"),
        }
    }
}

impl CachedReporter for M3Reporter {
    fn capabilities(&self) -> Capabilities {
        M3Reporter::capabilities(self)
    }

    fn report_counter(&self, name: &str, tags: &MetricTagMap, delta: i64) {
        M3Reporter::report_counter(self, name, tags, delta)
    }

    fn report_gauge(&self, name: &str, tags: &MetricTagMap, value: f64) {
        M3Reporter::report_gauge(self, name, tags, value)
    }

    fn report_timer(&self, name: &str, tags: &MetricTagMap, duration: Duration) {
        M3Reporter::report_timer(self, name, tags, duration)
    }

    fn allocate_counter(&self, name: &str, tags: &MetricTagMap) -> CachedCounter {
        M3Reporter::allocate_counter(self, name, tags)
    }

    fn allocate_gauge(&self, name: &str, tags: &MetricTagMap) -> CachedGauge {
        M3Reporter::allocate_gauge(self, name, tags)
    }

    fn allocate_timer(&self, name: &str, tags: &MetricTagMap) -> CachedTimer {
        M3Reporter::allocate_timer(self, name, tags)
    }

    fn flush(&self) -> Result<(), ReporterError> {
        M3Reporter::flush(self)
    }

    fn close(&self) -> Result<(), ReporterError> {
        M3Reporter::close(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::BufTransport;
    use m3_codec::{FRAME_HEADER_LEN, decode_frame};

    fn buf_reporter(config: ReporterConfig) -> (M3Reporter, BufTransport) {
        let setup = config.check().unwrap();
        let transport = BufTransport::default();
        let reporter =
            M3Reporter::with_transport(config, setup, Transport::Buf(transport.clone())).unwrap();
        (reporter, transport)
    }

    fn test_config() -> ReporterConfig {
        let mut config = ReporterConfig::new("svc", "test");
        config.add_host_port("127.0.0.1:9052");
        config.set_flush_interval(Duration::from_secs(3600));
        config.add_common_tag("region", "east");
        config
    }

    fn sent_batches(transport: &BufTransport) -> Vec<MetricBatch> {
        transport
            .frames()
            .iter()
            .map(|f| decode_frame(&f[FRAME_HEADER_LEN..]).unwrap().1)
            .collect()
    }

    #[test]
    fn report_and_close() {
        let (reporter, transport) = buf_reporter(test_config());
        let tags: MetricTagMap = [("host", "a")].into_iter().collect();
        reporter.report_counter("my-counter", &tags, 42);
        reporter.report_gauge("my-gauge", &tags, 123.0);
        reporter.report_timer("my-timer", &tags, Duration::from_millis(456));
        reporter.close().unwrap();

        let batches = sent_batches(&transport);
        assert_eq!(batches.len(), 1);
        let batch = &batches[0];
        assert_eq!(batch.service, "svc");
        assert_eq!(batch.env, "test");
        assert_eq!(batch.common_tags.get("region"), Some("east"));
        let values: Vec<MetricValue> = batch.metrics.iter().map(|m| m.value()).collect();
        assert_eq!(
            values,
            [
                MetricValue::Counter(42),
                MetricValue::Gauge(123.0),
                MetricValue::Timer(456_000_000)
            ]
        );
        assert_eq!(batch.metrics[0].name().as_str(), "my-counter");
        assert_eq!(batch.metrics[2].tags().get("host"), Some("a"));
    }

    #[test]
    fn invalid_name_dropped() {
        let (reporter, transport) = buf_reporter(test_config());
        reporter.report_counter("", &MetricTagMap::default(), 1);
        let counter = reporter.allocate_counter("", &MetricTagMap::default());
        counter.report_count(1);
        reporter.close().unwrap();

        assert!(transport.frames().is_empty());
        assert_eq!(reporter.stats().dropped_invalid, 2);
        assert_eq!(reporter.stats().recorded, 0);
    }

    #[test]
    fn cached_handles() {
        let (reporter, transport) = buf_reporter(test_config());
        let tags: MetricTagMap = [("k", "v")].into_iter().collect();
        let counter = reporter.allocate_counter("requests", &tags);
        let gauge = reporter.allocate_gauge("load", &tags);
        let timer = reporter.allocate_timer("latency", &MetricTagMap::default());
        counter.report_count(1);
        counter.report_count(2);
        gauge.report_gauge(0.5);
        timer.report_timer(Duration::from_micros(3));
        reporter.flush().unwrap();

        let batches = sent_batches(&transport);
        assert_eq!(batches.len(), 1);
        let metrics = &batches[0].metrics;
        assert_eq!(metrics.len(), 4);
        assert_eq!(metrics[1].value(), MetricValue::Counter(2));
        assert_eq!(metrics[1].tags().get("k"), Some("v"));
        assert_eq!(metrics[3].value(), MetricValue::Timer(3000));

        reporter.close().unwrap();
        counter.report_count(3);
        assert_eq!(transport.frames().len(), 1);
        assert_eq!(reporter.stats().dropped_closed, 1);
    }

    #[test]
    fn closed_twice() {
        let (reporter, transport) = buf_reporter(test_config());
        reporter.close().unwrap();
        assert!(reporter.is_closed());
        assert!(reporter.close().unwrap_err().is_closed());
        assert!(reporter.flush().unwrap_err().is_closed());

        reporter.report_gauge("g", &MetricTagMap::default(), 1.0);
        drop(reporter);
        assert!(transport.frames().is_empty());
    }

    #[test]
    fn close_on_drop() {
        let (reporter, transport) = buf_reporter(test_config());
        reporter.report_counter("c", &MetricTagMap::default(), 7);
        drop(reporter);
        let batches = sent_batches(&transport);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].metrics[0].value(), MetricValue::Counter(7));
    }

    #[test]
    fn final_flush_error() {
        let (reporter, transport) = buf_reporter(test_config());
        reporter.report_counter("c", &MetricTagMap::default(), 1);
        transport.set_fail(true);
        assert!(matches!(
            reporter.close(),
            Err(ReporterError::TransportUnavailable { .. })
        ));
    }

    #[test]
    fn as_trait_object() {
        let (reporter, transport) = buf_reporter(test_config());
        let r: &dyn CachedReporter = &reporter;
        assert_eq!(
            r.capabilities(),
            Capabilities {
                reporting: true,
                tagging: true
            }
        );
        r.report_counter("c", &MetricTagMap::default(), 1);
        r.flush().unwrap();
        r.close().unwrap();
        assert_eq!(transport.frames().len(), 1);
    }
}
