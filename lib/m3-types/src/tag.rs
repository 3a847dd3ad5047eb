/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::collections::BTreeMap;
use std::fmt::{self, Write};

use smol_str::SmolStr;

/// Tags attached to a metric or to a whole batch.
///
/// Keys are unique and iterated in sorted order, so two maps built from the
/// same pairs in a different order compare equal and encode identically.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MetricTagMap {
    inner: BTreeMap<SmolStr, SmolStr>,
}

impl MetricTagMap {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Insert a tag, replacing any previous value of the same key.
    ///
    /// Tags with an empty key are silently dropped, `false` is returned then.
    pub fn insert<K, V>(&mut self, key: K, value: V) -> bool
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let key = key.as_ref();
        if key.is_empty() {
            return false;
        }
        self.inner
            .insert(SmolStr::new(key), SmolStr::new(value.as_ref()));
        true
    }

    #[inline]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.inner.get(key).map(|v| v.as_str())
    }

    #[inline]
    pub fn contains(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Sum of all key and value lengths
    pub fn text_len(&self) -> usize {
        self.inner.iter().map(|(k, v)| k.len() + v.len()).sum()
    }

    pub fn display(&self) -> DisplayTagMap<'_> {
        DisplayTagMap(self)
    }
}

impl<K, V> FromIterator<(K, V)> for MetricTagMap
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut map = MetricTagMap::default();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

pub struct DisplayTagMap<'a>(&'a MetricTagMap);

impl fmt::Display for DisplayTagMap<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut iter = self.0.iter();
        let Some((name, value)) = iter.next() else {
            return Ok(());
        };
        f.write_str(name)?;
        f.write_char('=')?;
        f.write_str(value)?;

        for (name, value) in iter {
            f.write_char(',')?;
            f.write_str(name)?;
            f.write_char('=')?;
            f.write_str(value)?;
        }
        Ok(())
    }
}
