/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use m3_types::{Metric, MetricTagMap};

/// Headers, value union, timestamp and struct stops of one metric
const METRIC_FIXED_OVERHEAD: usize = 48;
/// Frame header, protocol header, batch field headers and the timestamp
const BATCH_FIXED_OVERHEAD: usize = 64;
/// Two length prefixes
const TAG_OVERHEAD: usize = 10;

fn tags_size(tags: &MetricTagMap) -> usize {
    TAG_OVERHEAD * tags.len() + tags.text_len()
}

/// An upper bound of the encoded size of a metric in any supported protocol
pub fn estimate_metric_size(metric: &Metric) -> usize {
    METRIC_FIXED_OVERHEAD + metric.name().as_str().len() + tags_size(metric.tags())
}

/// An upper bound of the encoded size of a frame carrying no metrics
pub fn estimate_batch_overhead(service: &str, env: &str, common_tags: &MetricTagMap) -> usize {
    BATCH_FIXED_OVERHEAD + service.len() + env.len() + tags_size(common_tags)
}
