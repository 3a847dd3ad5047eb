/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::Arc;

use m3_types::{Metric, MetricBatch, MetricName, MetricTagMap, MetricValue};

use crate::protocol::{FieldType, ProtocolReader, ProtocolWriter};
use crate::{BatchDecodeError, BatchEncodeError};

const BATCH_FIELD_METRICS: i16 = 1;
const BATCH_FIELD_SERVICE: i16 = 2;
const BATCH_FIELD_ENV: i16 = 3;
const BATCH_FIELD_TIMESTAMP: i16 = 4;
const BATCH_FIELD_COMMON_TAGS: i16 = 5;

const METRIC_FIELD_NAME: i16 = 1;
const METRIC_FIELD_VALUE: i16 = 2;
const METRIC_FIELD_TAGS: i16 = 3;
const METRIC_FIELD_TIMESTAMP: i16 = 4;

const VALUE_FIELD_COUNT: i16 = 1;
const VALUE_FIELD_GAUGE: i16 = 2;
const VALUE_FIELD_TIMER: i16 = 3;

pub fn encode_batch<W: ProtocolWriter>(
    w: &mut W,
    batch: &MetricBatch,
) -> Result<(), BatchEncodeError> {
    w.write_struct_begin();

    w.write_field_begin(FieldType::List, BATCH_FIELD_METRICS);
    w.write_list_begin(FieldType::Struct, batch.metrics.len())?;
    for m in &batch.metrics {
        encode_metric(w, m)?;
    }

    w.write_field_begin(FieldType::Binary, BATCH_FIELD_SERVICE);
    w.write_string(&batch.service)?;
    w.write_field_begin(FieldType::Binary, BATCH_FIELD_ENV);
    w.write_string(&batch.env)?;
    w.write_field_begin(FieldType::I64, BATCH_FIELD_TIMESTAMP);
    w.write_i64(batch.timestamp);
    if !batch.common_tags.is_empty() {
        w.write_field_begin(FieldType::Map, BATCH_FIELD_COMMON_TAGS);
        encode_tags(w, &batch.common_tags)?;
    }

    w.write_field_stop();
    w.write_struct_end();
    Ok(())
}

fn encode_metric<W: ProtocolWriter>(w: &mut W, m: &Metric) -> Result<(), BatchEncodeError> {
    w.write_struct_begin();

    w.write_field_begin(FieldType::Binary, METRIC_FIELD_NAME);
    w.write_string(m.name().as_str())?;

    w.write_field_begin(FieldType::Struct, METRIC_FIELD_VALUE);
    w.write_struct_begin();
    match m.value() {
        MetricValue::Counter(v) => {
            w.write_field_begin(FieldType::I64, VALUE_FIELD_COUNT);
            w.write_i64(v);
        }
        MetricValue::Gauge(v) => {
            w.write_field_begin(FieldType::Double, VALUE_FIELD_GAUGE);
            w.write_double(v);
        }
        MetricValue::Timer(v) => {
            w.write_field_begin(FieldType::I64, VALUE_FIELD_TIMER);
            w.write_i64(v);
        }
    }
    w.write_field_stop();
    w.write_struct_end();

    if !m.tags().is_empty() {
        w.write_field_begin(FieldType::Map, METRIC_FIELD_TAGS);
        encode_tags(w, m.tags())?;
    }
    w.write_field_begin(FieldType::I64, METRIC_FIELD_TIMESTAMP);
    w.write_i64(m.timestamp());

    w.write_field_stop();
    w.write_struct_end();
    Ok(())
}

fn encode_tags<W: ProtocolWriter>(w: &mut W, tags: &MetricTagMap) -> Result<(), BatchEncodeError> {
    w.write_map_begin(FieldType::Binary, FieldType::Binary, tags.len())?;
    for (k, v) in tags.iter() {
        w.write_string(k)?;
        w.write_string(v)?;
    }
    Ok(())
}

enum BatchField<'a> {
    Metrics(Vec<Metric>),
    Service(&'a str),
    Env(&'a str),
    Timestamp(i64),
    CommonTags(MetricTagMap),
    Unknown,
}

enum MetricField<'a> {
    Name(&'a str),
    Value(MetricValue),
    Tags(MetricTagMap),
    Timestamp(i64),
    Unknown,
}

enum ValueField {
    Set(MetricValue),
    Unknown,
}

pub fn decode_batch<'a, R: ProtocolReader<'a>>(r: &mut R) -> Result<MetricBatch, BatchDecodeError> {
    let mut metrics = None;
    let mut service = None;
    let mut env = None;
    let mut timestamp = None;
    let mut common_tags = MetricTagMap::default();

    r.read_struct_begin();
    while let Some(header) = r.read_field_begin()? {
        let field = match (header.id, header.field_type) {
            (BATCH_FIELD_METRICS, FieldType::List) => {
                let (elem_type, size) = r.read_list_begin()?;
                if elem_type == FieldType::Struct {
                    let mut list = Vec::with_capacity(size);
                    for _ in 0..size {
                        list.push(decode_metric(r)?);
                    }
                    BatchField::Metrics(list)
                } else {
                    for _ in 0..size {
                        r.skip(elem_type)?;
                    }
                    BatchField::Unknown
                }
            }
            (BATCH_FIELD_SERVICE, FieldType::Binary) => BatchField::Service(r.read_string()?),
            (BATCH_FIELD_ENV, FieldType::Binary) => BatchField::Env(r.read_string()?),
            (BATCH_FIELD_TIMESTAMP, FieldType::I64) => BatchField::Timestamp(r.read_i64()?),
            (BATCH_FIELD_COMMON_TAGS, FieldType::Map) => {
                BatchField::CommonTags(decode_tags(r)?)
            }
            (_, field_type) => {
                r.skip(field_type)?;
                BatchField::Unknown
            }
        };
        match field {
            BatchField::Metrics(v) => metrics = Some(v),
            BatchField::Service(v) => service = Some(v),
            BatchField::Env(v) => env = Some(v),
            BatchField::Timestamp(v) => timestamp = Some(v),
            BatchField::CommonTags(v) => common_tags = v,
            BatchField::Unknown => {}
        }
    }
    r.read_struct_end();

    Ok(MetricBatch {
        service: service
            .ok_or(BatchDecodeError::MissingField("service"))?
            .to_string(),
        env: env.ok_or(BatchDecodeError::MissingField("env"))?.to_string(),
        timestamp: timestamp.ok_or(BatchDecodeError::MissingField("timestamp"))?,
        common_tags,
        metrics: metrics.ok_or(BatchDecodeError::MissingField("metrics"))?,
    })
}

fn decode_metric<'a, R: ProtocolReader<'a>>(r: &mut R) -> Result<Metric, BatchDecodeError> {
    let mut name = None;
    let mut value = None;
    let mut tags = MetricTagMap::default();
    // absent on the wire means unknown
    let mut timestamp = 0;

    r.read_struct_begin();
    while let Some(header) = r.read_field_begin()? {
        let field = match (header.id, header.field_type) {
            (METRIC_FIELD_NAME, FieldType::Binary) => MetricField::Name(r.read_string()?),
            (METRIC_FIELD_VALUE, FieldType::Struct) => MetricField::Value(decode_value(r)?),
            (METRIC_FIELD_TAGS, FieldType::Map) => MetricField::Tags(decode_tags(r)?),
            (METRIC_FIELD_TIMESTAMP, FieldType::I64) => MetricField::Timestamp(r.read_i64()?),
            (_, field_type) => {
                r.skip(field_type)?;
                MetricField::Unknown
            }
        };
        match field {
            MetricField::Name(v) => name = Some(v),
            MetricField::Value(v) => value = Some(v),
            MetricField::Tags(v) => tags = v,
            MetricField::Timestamp(v) => timestamp = v,
            MetricField::Unknown => {}
        }
    }
    r.read_struct_end();

    let name = name.ok_or(BatchDecodeError::MissingField("metric name"))?;
    let name = MetricName::new(name)?;
    let value = value.ok_or(BatchDecodeError::MissingField("metric value"))?;
    Ok(Metric::with_timestamp(
        name,
        Arc::new(tags),
        value,
        timestamp,
    ))
}

fn decode_value<'a, R: ProtocolReader<'a>>(r: &mut R) -> Result<MetricValue, BatchDecodeError> {
    let mut value = None;

    r.read_struct_begin();
    while let Some(header) = r.read_field_begin()? {
        let field = match (header.id, header.field_type) {
            (VALUE_FIELD_COUNT, FieldType::I64) => {
                ValueField::Set(MetricValue::Counter(r.read_i64()?))
            }
            (VALUE_FIELD_GAUGE, FieldType::Double) => {
                ValueField::Set(MetricValue::Gauge(r.read_double()?))
            }
            (VALUE_FIELD_TIMER, FieldType::I64) => {
                ValueField::Set(MetricValue::Timer(r.read_i64()?))
            }
            (_, field_type) => {
                r.skip(field_type)?;
                ValueField::Unknown
            }
        };
        if let ValueField::Set(v) = field {
            if value.is_some() {
                return Err(BatchDecodeError::InvalidValue("more than one variant set"));
            }
            value = Some(v);
        }
    }
    r.read_struct_end();

    value.ok_or(BatchDecodeError::InvalidValue("no variant set"))
}

fn decode_tags<'a, R: ProtocolReader<'a>>(r: &mut R) -> Result<MetricTagMap, BatchDecodeError> {
    let mut tags = MetricTagMap::default();
    let (key_type, value_type, size) = r.read_map_begin()?;
    if key_type == FieldType::Binary && value_type == FieldType::Binary {
        for _ in 0..size {
            let k = r.read_string()?;
            let v = r.read_string()?;
            tags.insert(k, v);
        }
    } else {
        for _ in 0..size {
            r.skip(key_type)?;
            r.skip(value_type)?;
        }
    }
    Ok(tags)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{BinaryReader, BinaryWriter, CompactReader, CompactWriter};
    use m3_types::MetricError;

    fn sample_batch() -> MetricBatch {
        let tags: MetricTagMap = [("region", "east")].into_iter().collect();
        let metrics = vec![
            Metric::with_timestamp(
                MetricName::new("requests").unwrap(),
                Arc::new(tags.clone()),
                MetricValue::Counter(42),
                1000,
            ),
            Metric::with_timestamp(
                MetricName::new("load").unwrap(),
                Arc::new(MetricTagMap::default()),
                MetricValue::Gauge(0.75),
                1001,
            ),
            Metric::with_timestamp(
                MetricName::new("latency").unwrap(),
                Arc::new(tags),
                MetricValue::Timer(456_000_000),
                1002,
            ),
        ];
        let common: MetricTagMap = [("service", "web"), ("env", "test")].into_iter().collect();
        let mut batch = MetricBatch::new("web", "test", metrics).with_common_tags(common);
        batch.timestamp = 2000;
        batch
    }

    #[test]
    fn compact_batch() {
        let batch = sample_batch();
        let mut buf = Vec::new();
        encode_batch(&mut CompactWriter::new(&mut buf), &batch).unwrap();

        let mut r = CompactReader::new(&buf);
        let decoded = decode_batch(&mut r).unwrap();
        assert_eq!(r.remaining(), 0);
        assert_eq!(decoded, batch);
    }

    #[test]
    fn binary_batch() {
        let batch = sample_batch();
        let mut buf = Vec::new();
        encode_batch(&mut BinaryWriter::new(&mut buf), &batch).unwrap();

        let mut r = BinaryReader::new(&buf);
        let decoded = decode_batch(&mut r).unwrap();
        assert_eq!(r.remaining(), 0);
        assert_eq!(decoded, batch);
    }

    #[test]
    fn empty_batch() {
        let mut batch = MetricBatch::new("svc", "dev", Vec::new());
        batch.timestamp = 1;
        let mut buf = Vec::new();
        encode_batch(&mut CompactWriter::new(&mut buf), &batch).unwrap();
        let decoded = decode_batch(&mut CompactReader::new(&buf)).unwrap();
        assert!(decoded.is_empty());
        assert!(decoded.common_tags.is_empty());
        assert_eq!(decoded.service, "svc");
    }

    #[test]
    fn missing_field() {
        let mut buf = Vec::new();
        let mut w = CompactWriter::new(&mut buf);
        w.write_struct_begin();
        w.write_field_begin(FieldType::List, BATCH_FIELD_METRICS);
        w.write_list_begin(FieldType::Struct, 0).unwrap();
        w.write_field_begin(FieldType::Binary, BATCH_FIELD_SERVICE);
        w.write_string("svc").unwrap();
        w.write_field_begin(FieldType::I64, BATCH_FIELD_TIMESTAMP);
        w.write_i64(1);
        w.write_field_stop();
        w.write_struct_end();

        assert_eq!(
            decode_batch(&mut CompactReader::new(&buf)).unwrap_err(),
            BatchDecodeError::MissingField("env")
        );
    }

    #[test]
    fn unknown_fields() {
        let mut buf = Vec::new();
        let mut w = BinaryWriter::new(&mut buf);
        w.write_struct_begin();
        w.write_field_begin(FieldType::Struct, 99);
        w.write_struct_begin();
        w.write_field_begin(FieldType::Bool, 1);
        w.write_bool(true);
        w.write_field_begin(FieldType::List, 2);
        w.write_list_begin(FieldType::Binary, 1).unwrap();
        w.write_string("x").unwrap();
        w.write_field_stop();
        w.write_struct_end();
        // known id with a different wire type is skipped too
        w.write_field_begin(FieldType::I32, BATCH_FIELD_SERVICE);
        w.write_i32(7);
        w.write_field_begin(FieldType::Binary, BATCH_FIELD_SERVICE);
        w.write_string("svc").unwrap();
        w.write_field_begin(FieldType::Binary, BATCH_FIELD_ENV);
        w.write_string("prod").unwrap();
        w.write_field_begin(FieldType::I64, BATCH_FIELD_TIMESTAMP);
        w.write_i64(5);
        w.write_field_begin(FieldType::List, BATCH_FIELD_METRICS);
        w.write_list_begin(FieldType::Struct, 1).unwrap();
        w.write_struct_begin();
        w.write_field_begin(FieldType::Binary, METRIC_FIELD_NAME);
        w.write_string("m").unwrap();
        w.write_field_begin(FieldType::Double, 50);
        w.write_double(1.0);
        w.write_field_begin(FieldType::Struct, METRIC_FIELD_VALUE);
        w.write_struct_begin();
        w.write_field_begin(FieldType::I64, VALUE_FIELD_COUNT);
        w.write_i64(3);
        w.write_field_stop();
        w.write_struct_end();
        w.write_field_stop();
        w.write_struct_end();
        w.write_field_stop();
        w.write_struct_end();

        let mut r = BinaryReader::new(&buf);
        let batch = decode_batch(&mut r).unwrap();
        assert_eq!(r.remaining(), 0);
        assert_eq!(batch.service, "svc");
        assert_eq!(batch.env, "prod");
        assert_eq!(batch.timestamp, 5);
        assert_eq!(batch.len(), 1);
        let m = &batch.metrics[0];
        assert_eq!(m.name().as_str(), "m");
        assert_eq!(m.value(), MetricValue::Counter(3));
        assert_eq!(m.timestamp(), 0);
        assert!(m.tags().is_empty());
    }

    fn encode_single_metric(value_fields: &[(i16, FieldType)], name: &str) -> Vec<u8> {
        let mut buf = Vec::new();
        let mut w = CompactWriter::new(&mut buf);
        w.write_struct_begin();
        w.write_field_begin(FieldType::List, BATCH_FIELD_METRICS);
        w.write_list_begin(FieldType::Struct, 1).unwrap();
        w.write_struct_begin();
        w.write_field_begin(FieldType::Binary, METRIC_FIELD_NAME);
        w.write_string(name).unwrap();
        w.write_field_begin(FieldType::Struct, METRIC_FIELD_VALUE);
        w.write_struct_begin();
        for (id, field_type) in value_fields {
            w.write_field_begin(*field_type, *id);
            match field_type {
                FieldType::Double => w.write_double(1.0),
                _ => w.write_i64(1),
            }
        }
        w.write_field_stop();
        w.write_struct_end();
        w.write_field_stop();
        w.write_struct_end();
        w.write_field_begin(FieldType::Binary, BATCH_FIELD_SERVICE);
        w.write_string("svc").unwrap();
        w.write_field_begin(FieldType::Binary, BATCH_FIELD_ENV);
        w.write_string("env").unwrap();
        w.write_field_begin(FieldType::I64, BATCH_FIELD_TIMESTAMP);
        w.write_i64(1);
        w.write_field_stop();
        w.write_struct_end();
        buf
    }

    #[test]
    fn invalid_value_union() {
        let buf = encode_single_metric(&[], "m");
        assert_eq!(
            decode_batch(&mut CompactReader::new(&buf)).unwrap_err(),
            BatchDecodeError::InvalidValue("no variant set")
        );

        let buf = encode_single_metric(
            &[
                (VALUE_FIELD_COUNT, FieldType::I64),
                (VALUE_FIELD_GAUGE, FieldType::Double),
            ],
            "m",
        );
        assert_eq!(
            decode_batch(&mut CompactReader::new(&buf)).unwrap_err(),
            BatchDecodeError::InvalidValue("more than one variant set")
        );

        let buf = encode_single_metric(&[(VALUE_FIELD_TIMER, FieldType::I64)], "m");
        let batch = decode_batch(&mut CompactReader::new(&buf)).unwrap();
        assert_eq!(batch.metrics[0].value(), MetricValue::Timer(1));
    }

    #[test]
    fn empty_metric_name() {
        let buf = encode_single_metric(&[(VALUE_FIELD_COUNT, FieldType::I64)], "");
        assert_eq!(
            decode_batch(&mut CompactReader::new(&buf)).unwrap_err(),
            BatchDecodeError::InvalidMetric(MetricError::EmptyName)
        );
    }
}
