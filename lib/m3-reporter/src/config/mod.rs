/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::Arc;
use std::time::Duration;

use m3_codec::{MAX_FRAME_SIZE, Protocol, estimate_batch_overhead};
use m3_types::MetricTagMap;

use crate::ReporterError;
use crate::transport::ServerAddr;

#[cfg(feature = "yaml")]
mod yaml;

const DEFAULT_MAX_BATCH_LEN: usize = 1024;
const DEFAULT_MAX_BATCH_SIZE: usize = 32 * 1024;
const DEFAULT_QUEUE_SIZE: usize = 64;

pub const HOST_TAG_KEY: &str = "host";

pub type ErrorHandler = Arc<dyn Fn(&ReporterError) + Send + Sync>;

#[derive(Clone)]
pub struct ReporterConfig {
    pub(crate) host_ports: Vec<String>,
    pub(crate) service: String,
    pub(crate) env: String,
    pub(crate) common_tags: MetricTagMap,
    pub(crate) include_host: bool,
    pub(crate) protocol: Protocol,
    pub(crate) flush_interval: Duration,
    pub(crate) max_batch_len: usize,
    pub(crate) max_batch_size: usize,
    pub(crate) queue_size: usize,
    pub(crate) connect_timeout: Duration,
    pub(crate) write_timeout: Duration,
    pub(crate) final_flush_retries: usize,
    pub(crate) error_handler: Option<ErrorHandler>,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        ReporterConfig {
            host_ports: Vec::new(),
            service: String::new(),
            env: String::new(),
            common_tags: MetricTagMap::default(),
            include_host: false,
            protocol: Protocol::default(),
            flush_interval: Duration::from_secs(1),
            max_batch_len: DEFAULT_MAX_BATCH_LEN,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            queue_size: DEFAULT_QUEUE_SIZE,
            connect_timeout: Duration::from_secs(10),
            write_timeout: Duration::from_secs(5),
            final_flush_retries: 1,
            error_handler: None,
        }
    }
}

/// What a checked config resolves to
pub(crate) struct ReporterSetup {
    pub(crate) addrs: Vec<ServerAddr>,
    pub(crate) common_tags: MetricTagMap,
    pub(crate) size_budget: usize,
}

impl ReporterConfig {
    pub fn new(service: &str, env: &str) -> Self {
        ReporterConfig {
            service: service.to_string(),
            env: env.to_string(),
            ..Default::default()
        }
    }

    pub fn set_host_ports<I, S>(&mut self, host_ports: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.host_ports = host_ports.into_iter().map(Into::into).collect();
    }

    pub fn add_host_port<S: Into<String>>(&mut self, host_port: S) {
        self.host_ports.push(host_port.into());
    }

    pub fn set_service(&mut self, service: &str) {
        self.service = service.to_string();
    }

    pub fn set_env(&mut self, env: &str) {
        self.env = env.to_string();
    }

    pub fn set_common_tags(&mut self, tags: MetricTagMap) {
        self.common_tags = tags;
    }

    pub fn add_common_tag(&mut self, key: &str, value: &str) {
        self.common_tags.insert(key, value);
    }

    pub fn set_include_host(&mut self, include: bool) {
        self.include_host = include;
    }

    pub fn set_protocol(&mut self, protocol: Protocol) {
        self.protocol = protocol;
    }

    pub fn set_flush_interval(&mut self, interval: Duration) {
        self.flush_interval = interval;
    }

    pub fn set_max_batch_len(&mut self, len: usize) {
        self.max_batch_len = len;
    }

    pub fn set_max_batch_size(&mut self, size: usize) {
        self.max_batch_size = size;
    }

    pub fn set_queue_size(&mut self, size: usize) {
        self.queue_size = size;
    }

    pub fn set_connect_timeout(&mut self, timeout: Duration) {
        self.connect_timeout = timeout;
    }

    pub fn set_write_timeout(&mut self, timeout: Duration) {
        self.write_timeout = timeout;
    }

    pub fn set_final_flush_retries(&mut self, retries: usize) {
        self.final_flush_retries = retries;
    }

    /// Set a callback to be notified of flush failures that are not
    /// returned to any caller
    pub fn set_error_handler<F>(&mut self, handler: F)
    where
        F: Fn(&ReporterError) + Send + Sync + 'static,
    {
        self.error_handler = Some(Arc::new(handler));
    }

    #[inline]
    pub fn service(&self) -> &str {
        &self.service
    }

    #[inline]
    pub fn env(&self) -> &str {
        &self.env
    }

    #[inline]
    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub(crate) fn check(&self) -> Result<ReporterSetup, ReporterError> {
        if self.host_ports.is_empty() {
            return Err(ReporterError::config("no server host_ports set"));
        }
        let mut addrs = Vec::with_capacity(self.host_ports.len());
        for s in &self.host_ports {
            let addr = s
                .parse::<ServerAddr>()
                .map_err(|e| ReporterError::config(format!("invalid host_port {s}: {e}")))?;
            addrs.push(addr);
        }

        if self.service.is_empty() {
            return Err(ReporterError::config("empty service name"));
        }
        if self.env.is_empty() {
            return Err(ReporterError::config("empty env name"));
        }
        if self.flush_interval.is_zero() {
            return Err(ReporterError::config("zero flush interval"));
        }
        if self.max_batch_len == 0 {
            return Err(ReporterError::config("zero max batch len"));
        }
        if self.queue_size == 0 {
            return Err(ReporterError::config("zero queue size"));
        }
        if self.final_flush_retries > 1 {
            return Err(ReporterError::config(format!(
                "final flush retries should be 0 or 1, got {}",
                self.final_flush_retries
            )));
        }

        if self.max_batch_size > MAX_FRAME_SIZE {
            return Err(ReporterError::config(format!(
                "max batch size {} exceeds the frame limit {MAX_FRAME_SIZE}",
                self.max_batch_size
            )));
        }

        let common_tags = self.batch_common_tags();
        let overhead = estimate_batch_overhead(&self.service, &self.env, &common_tags);
        if self.max_batch_size <= overhead {
            return Err(ReporterError::config(format!(
                "max batch size {} is too small, the batch header takes up to {overhead} bytes",
                self.max_batch_size
            )));
        }

        Ok(ReporterSetup {
            addrs,
            common_tags,
            size_budget: self.max_batch_size - overhead,
        })
    }

    fn batch_common_tags(&self) -> MetricTagMap {
        let mut tags = self.common_tags.clone();
        if self.include_host && !tags.contains(HOST_TAG_KEY) {
            let hostname = local_hostname();
            if !hostname.is_empty() {
                tags.insert(HOST_TAG_KEY, hostname);
            }
        }
        tags
    }
}

fn local_hostname() -> String {
    rustix::system::uname()
        .nodename()
        .to_string_lossy()
        .into_owned()
}
