/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

mod name;
pub use name::{MetricError, MetricName};

mod tag;
pub use tag::{DisplayTagMap, MetricTagMap};

mod value;
pub use value::{MetricKind, MetricValue};

mod metric;
pub use metric::{Metric, now_timestamp};

mod batch;
pub use batch::MetricBatch;
