/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::{MetricError, MetricKind, MetricName, MetricTagMap, MetricValue};

/// Nanoseconds since the unix epoch
pub fn now_timestamp() -> i64 {
    Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX)
}

#[derive(Clone, Debug, PartialEq)]
pub struct Metric {
    name: MetricName,
    tags: Arc<MetricTagMap>,
    value: MetricValue,
    timestamp: i64,
}

impl Metric {
    pub fn new(name: MetricName, tags: Arc<MetricTagMap>, value: MetricValue) -> Self {
        Metric::with_timestamp(name, tags, value, now_timestamp())
    }

    pub fn with_timestamp(
        name: MetricName,
        tags: Arc<MetricTagMap>,
        value: MetricValue,
        timestamp: i64,
    ) -> Self {
        Metric {
            name,
            tags,
            value,
            timestamp,
        }
    }

    pub fn counter(name: &str, tags: &MetricTagMap, delta: i64) -> Result<Self, MetricError> {
        let name = MetricName::new(name)?;
        Ok(Metric::new(
            name,
            Arc::new(tags.clone()),
            MetricValue::Counter(delta),
        ))
    }

    pub fn gauge(name: &str, tags: &MetricTagMap, value: f64) -> Result<Self, MetricError> {
        let name = MetricName::new(name)?;
        Ok(Metric::new(
            name,
            Arc::new(tags.clone()),
            MetricValue::Gauge(value),
        ))
    }

    pub fn timer(
        name: &str,
        tags: &MetricTagMap,
        duration: Duration,
    ) -> Result<Self, MetricError> {
        let name = MetricName::new(name)?;
        Ok(Metric::new(
            name,
            Arc::new(tags.clone()),
            MetricValue::timer(duration),
        ))
    }

    #[inline]
    pub fn name(&self) -> &MetricName {
        &self.name
    }

    #[inline]
    pub fn tags(&self) -> &MetricTagMap {
        &self.tags
    }

    #[inline]
    pub fn value(&self) -> MetricValue {
        self.value
    }

    #[inline]
    pub fn kind(&self) -> MetricKind {
        self.value.kind()
    }

    #[inline]
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }
}
