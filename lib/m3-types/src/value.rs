/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::fmt;
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MetricKind {
    Counter,
    Gauge,
    Timer,
}

impl MetricKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
            MetricKind::Timer => "timer",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MetricValue {
    /// counter delta
    Counter(i64),
    /// gauge snapshot
    Gauge(f64),
    /// timer duration in nanoseconds
    Timer(i64),
}

impl MetricValue {
    /// Timer value from a duration, saturated at `i64::MAX` nanoseconds
    pub fn timer(duration: Duration) -> Self {
        let nanos = i64::try_from(duration.as_nanos()).unwrap_or(i64::MAX);
        MetricValue::Timer(nanos)
    }

    pub fn kind(&self) -> MetricKind {
        match self {
            MetricValue::Counter(_) => MetricKind::Counter,
            MetricValue::Gauge(_) => MetricKind::Gauge,
            MetricValue::Timer(_) => MetricKind::Timer,
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Counter(v) => write!(f, "{v}"),
            MetricValue::Gauge(v) => write!(f, "{v}"),
            MetricValue::Timer(v) => write!(f, "{v}ns"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timer_from_duration() {
        let v = MetricValue::timer(Duration::from_millis(456));
        assert_eq!(v, MetricValue::Timer(456_000_000));
        assert_eq!(v.kind(), MetricKind::Timer);

        let v = MetricValue::timer(Duration::MAX);
        assert_eq!(v, MetricValue::Timer(i64::MAX));
    }

    #[test]
    fn kind() {
        assert_eq!(MetricValue::Counter(-1).kind(), MetricKind::Counter);
        assert_eq!(MetricValue::Gauge(1.5).kind(), MetricKind::Gauge);
        assert_eq!(MetricKind::Gauge.to_string(), "gauge");
        assert_eq!(MetricValue::Timer(10).to_string(), "10ns");
    }
}
