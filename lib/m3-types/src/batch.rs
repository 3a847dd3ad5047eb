/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use crate::{Metric, MetricTagMap, now_timestamp};

/// The unit of wire transmission.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MetricBatch {
    pub service: String,
    pub env: String,
    /// emission time, nanoseconds since the unix epoch
    pub timestamp: i64,
    pub common_tags: MetricTagMap,
    pub metrics: Vec<Metric>,
}

impl MetricBatch {
    pub fn new(service: &str, env: &str, metrics: Vec<Metric>) -> Self {
        MetricBatch {
            service: service.to_string(),
            env: env.to_string(),
            timestamp: now_timestamp(),
            common_tags: MetricTagMap::default(),
            metrics,
        }
    }

    pub fn with_common_tags(mut self, tags: MetricTagMap) -> Self {
        self.common_tags = tags;
        self
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}
