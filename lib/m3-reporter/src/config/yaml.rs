/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, anyhow};
use humanize_rs::ParseError;
use humanize_rs::bytes::Bytes;
use yaml_rust::Yaml;

use m3_codec::Protocol;
use m3_types::MetricTagMap;

use super::ReporterConfig;

fn normalize_key(raw: &str) -> String {
    raw.to_lowercase().replace('-', "_")
}

fn map_key(k: &Yaml) -> anyhow::Result<&str> {
    k.as_str()
        .ok_or_else(|| anyhow!("key in yaml map should be string"))
}

fn as_string(v: &Yaml) -> anyhow::Result<String> {
    match v {
        Yaml::String(s) => Ok(s.to_string()),
        Yaml::Integer(i) => Ok(i.to_string()),
        Yaml::Real(s) => Ok(s.to_string()),
        _ => Err(anyhow!(
            "yaml value type for string should be 'string', 'integer' or 'real'"
        )),
    }
}

fn as_bool(v: &Yaml) -> anyhow::Result<bool> {
    match v {
        Yaml::Boolean(value) => Ok(*value),
        Yaml::String(s) => bool::from_str(s).map_err(|_| anyhow!("invalid bool value {s}")),
        _ => Err(anyhow!("yaml value type for bool should be 'boolean'")),
    }
}

fn as_usize(v: &Yaml) -> anyhow::Result<usize> {
    match v {
        Yaml::String(value) => {
            let v = value.parse::<Bytes>()?;
            Ok(v.size())
        }
        Yaml::Integer(value) => Ok(usize::try_from(*value)?),
        _ => Err(anyhow!(
            "yaml value type for humanize usize should be 'string' or 'integer'"
        )),
    }
}

fn as_duration(v: &Yaml) -> anyhow::Result<Duration> {
    match v {
        Yaml::String(value) => match humanize_rs::duration::parse(value) {
            Ok(v) => Ok(v),
            Err(ParseError::MissingUnit) => {
                if let Ok(u) = u64::from_str(value) {
                    Ok(Duration::from_secs(u))
                } else if let Ok(f) = f64::from_str(value) {
                    Duration::try_from_secs_f64(f).map_err(anyhow::Error::new)
                } else {
                    Err(anyhow!("invalid duration string"))
                }
            }
            Err(e) => Err(anyhow!("invalid humanize duration string: {e}")),
        },
        Yaml::Integer(value) => {
            let u = u64::try_from(*value).map_err(|_| anyhow!("negative duration value"))?;
            Ok(Duration::from_secs(u))
        }
        Yaml::Real(s) => {
            let f = f64::from_str(s).map_err(|e| anyhow!("invalid f64 value: {e}"))?;
            Duration::try_from_secs_f64(f).map_err(anyhow::Error::new)
        }
        _ => Err(anyhow!(
            "yaml value type for humanize duration should be 'string', 'integer' or 'real'"
        )),
    }
}

fn as_tag_map(v: &Yaml) -> anyhow::Result<MetricTagMap> {
    let Yaml::Hash(map) = v else {
        return Err(anyhow!("yaml value type for tags should be 'map'"));
    };
    let mut tags = MetricTagMap::default();
    for (k, v) in map {
        let k = map_key(k)?;
        let value = as_string(v).context(format!("invalid tag value for key {k}"))?;
        tags.insert(k, value);
    }
    Ok(tags)
}

impl ReporterConfig {
    pub fn parse_yaml(v: &Yaml) -> anyhow::Result<Self> {
        if let Yaml::Hash(map) = v {
            let mut config = ReporterConfig::default();
            for (k, v) in map {
                let k = map_key(k)?;
                config
                    .set_by_yaml_kv(k, v)
                    .context(format!("failed to parse value of key {k}"))?;
            }
            Ok(config)
        } else {
            Err(anyhow!(
                "yaml value type for 'm3 reporter config' should be 'map'"
            ))
        }
    }

    fn set_by_yaml_kv(&mut self, k: &str, v: &Yaml) -> anyhow::Result<()> {
        match normalize_key(k).as_str() {
            "host_ports" | "hosts" => match v {
                Yaml::String(s) => {
                    self.set_host_ports([s.as_str()]);
                }
                Yaml::Array(seq) => {
                    let mut host_ports = Vec::with_capacity(seq.len());
                    for (i, v) in seq.iter().enumerate() {
                        let s = as_string(v).context(format!("invalid value for {k}#{i}"))?;
                        host_ports.push(s);
                    }
                    self.set_host_ports(host_ports);
                }
                _ => {
                    return Err(anyhow!(
                        "yaml value type for key {k} should be 'string' or 'array'"
                    ));
                }
            },
            "service" => {
                self.service = as_string(v).context(format!("invalid string value for key {k}"))?;
            }
            "env" => {
                self.env = as_string(v).context(format!("invalid string value for key {k}"))?;
            }
            "common_tags" => {
                self.common_tags = as_tag_map(v).context(format!("invalid value for key {k}"))?;
            }
            "include_host" => {
                self.include_host = as_bool(v).context(format!("invalid bool value for key {k}"))?;
            }
            "protocol" => {
                let s = as_string(v).context(format!("invalid string value for key {k}"))?;
                self.protocol = Protocol::from_str(&s)?;
            }
            "flush_interval" => {
                self.flush_interval =
                    as_duration(v).context(format!("invalid humanize duration value for key {k}"))?;
            }
            "max_batch_len" | "max_queue_size" => {
                self.max_batch_len =
                    as_usize(v).context(format!("invalid humanize usize value for key {k}"))?;
            }
            "max_batch_size" | "max_packet_size" => {
                self.max_batch_size =
                    as_usize(v).context(format!("invalid humanize usize value for key {k}"))?;
            }
            "queue_size" => {
                self.queue_size =
                    as_usize(v).context(format!("invalid humanize usize value for key {k}"))?;
            }
            "connect_timeout" => {
                self.connect_timeout =
                    as_duration(v).context(format!("invalid humanize duration value for key {k}"))?;
            }
            "write_timeout" => {
                self.write_timeout =
                    as_duration(v).context(format!("invalid humanize duration value for key {k}"))?;
            }
            "final_flush_retries" => {
                self.final_flush_retries =
                    as_usize(v).context(format!("invalid usize value for key {k}"))?;
            }
            _ => return Err(anyhow!("invalid key {k}")),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yaml_rust::YamlLoader;

    fn load(s: &str) -> Yaml {
        YamlLoader::load_from_str(s).unwrap().remove(0)
    }

    #[test]
    fn parse_yaml_ok() {
        let yaml = load(
            r#"
                host_ports:
                  - "127.0.0.1:9052"
                  - "m3.example.net:9052"
                service: web
                env: prod
                common-tags:
                  region: east
                  shard: 3
                include_host: false
                protocol: Binary
                flush_interval: 500ms
                max_queue_size: 100
                max_packet_size: 16KiB
                queue_size: 8
                connect_timeout: 3
                write_timeout: 2.5
                final_flush_retries: 0
            "#,
        );
        let config = ReporterConfig::parse_yaml(&yaml).unwrap();
        assert_eq!(config.host_ports, ["127.0.0.1:9052", "m3.example.net:9052"]);
        assert_eq!(config.service(), "web");
        assert_eq!(config.env(), "prod");
        assert_eq!(config.common_tags.get("region"), Some("east"));
        assert_eq!(config.common_tags.get("shard"), Some("3"));
        assert!(!config.include_host);
        assert_eq!(config.protocol(), Protocol::Binary);
        assert_eq!(config.flush_interval, Duration::from_millis(500));
        assert_eq!(config.max_batch_len, 100);
        assert_eq!(config.max_batch_size, 16 * 1024);
        assert_eq!(config.queue_size, 8);
        assert_eq!(config.connect_timeout, Duration::from_secs(3));
        assert_eq!(config.write_timeout, Duration::from_millis(2500));
        assert_eq!(config.final_flush_retries, 0);
        assert!(config.check().is_ok());

        let yaml = load(
            r#"
                hosts: "localhost:9052"
                service: svc
                env: dev
            "#,
        );
        let config = ReporterConfig::parse_yaml(&yaml).unwrap();
        assert_eq!(config.host_ports, ["localhost:9052"]);
        assert_eq!(config.protocol(), Protocol::Compact);
        assert_eq!(config.flush_interval, Duration::from_secs(1));
    }

    #[test]
    fn parse_yaml_err() {
        let yaml = load("invalid_key: value");
        assert!(ReporterConfig::parse_yaml(&yaml).is_err());

        let yaml = load("protocol: json");
        assert!(ReporterConfig::parse_yaml(&yaml).is_err());

        let yaml = load("hosts: {a: b}");
        assert!(ReporterConfig::parse_yaml(&yaml).is_err());

        let yaml = load("flush_interval: 1xs");
        assert!(ReporterConfig::parse_yaml(&yaml).is_err());

        let yaml = load("max_batch_len: -1");
        assert!(ReporterConfig::parse_yaml(&yaml).is_err());

        let yaml = load("common_tags: [a, b]");
        assert!(ReporterConfig::parse_yaml(&yaml).is_err());

        let yaml = load("include_host: maybe");
        assert!(ReporterConfig::parse_yaml(&yaml).is_err());

        assert!(ReporterConfig::parse_yaml(&Yaml::Array(vec![])).is_err());
        assert!(ReporterConfig::parse_yaml(&Yaml::Integer(1)).is_err());
        assert!(ReporterConfig::parse_yaml(&Yaml::Null).is_err());
    }
}
