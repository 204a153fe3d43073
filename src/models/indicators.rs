use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Suffix marking the previous bar's value of an indicator, e.g. `SMA_10_prev`.
pub const PREV_SUFFIX: &str = "_prev";

/// Named numeric indicator values for one symbol and timeframe.
///
/// Non-finite values (NaN, infinities from indicator warm-up) are kept as
/// supplied but read back as missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IndicatorMap(BTreeMap<String, f64>);

impl IndicatorMap {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn with(mut self, key: impl Into<String>, value: f64) -> Self {
        self.0.insert(key.into(), value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: f64) -> Option<f64> {
        self.0.insert(key.into(), value)
    }

    /// Finite value for `key`, or `None` when absent or non-finite.
    pub fn value(&self, key: &str) -> Option<f64> {
        self.0.get(key).copied().filter(|v| v.is_finite())
    }

    /// Value of `key` on the previous bar.
    pub fn previous(&self, key: &str) -> Option<f64> {
        self.value(&prev_key(key))
    }

    pub fn raw(&self, key: &str) -> Option<f64> {
        self.0.get(key).copied()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.value(key).is_some()
    }

    /// Keys from `keys` with no usable value, sorted and deduplicated.
    pub fn missing<I, S>(&self, keys: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut missing: Vec<String> = keys
            .into_iter()
            .filter(|k| !self.contains(k.as_ref()))
            .map(|k| k.as_ref().to_string())
            .collect();
        missing.sort();
        missing.dedup();
        missing
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn finite_count(&self) -> usize {
        self.0.values().filter(|v| v.is_finite()).count()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl From<BTreeMap<String, f64>> for IndicatorMap {
    fn from(map: BTreeMap<String, f64>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for IndicatorMap {
    fn from_iter<T: IntoIterator<Item = (K, f64)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

pub fn prev_key(key: &str) -> String {
    format!("{}{}", key, PREV_SUFFIX)
}

/// Column name for a simple moving average of `period` bars.
pub fn sma_key(period: u32) -> String {
    format!("SMA_{}", period)
}
