/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

mod error;
pub use error::ReporterError;

mod config;
pub use config::{ErrorHandler, HOST_TAG_KEY, ReporterConfig};

mod stats;
pub use stats::ReporterSnapshot;

mod transport;
pub use transport::{ServerAddr, ServerAddrParseError};

mod buffer;
mod flush;

mod reporter;
pub use reporter::{
    CachedCounter, CachedGauge, CachedReporter, CachedTimer, Capabilities, M3Reporter,
};

pub use m3_codec::Protocol;
pub use m3_types::{MetricKind, MetricTagMap, MetricValue};
