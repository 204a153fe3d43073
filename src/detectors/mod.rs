//! Detector contract and built-in detector families

pub mod fibonacci;
pub mod momentum;
pub mod moving_average;
pub mod registry;
pub mod volume;

use crate::error::{ConfigurationError, DetectorError};
use crate::models::{IndicatorMap, Signal, SignalStrength};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

pub use fibonacci::{FibonacciDetector, FibonacciSettings};
pub use momentum::{
    MacdDetector, MacdSettings, RsiDetector, RsiSettings, StochasticDetector, StochasticSettings,
};
pub use moving_average::{
    MaCrossoverDetector, MaCrossoverSettings, MaPositionDetector, MaPositionSettings,
    MaRibbonDetector, MaRibbonSettings,
};
pub use registry::{DetectorRegistry, DetectorRegistryBuilder, DetectorSpec, Suite, SuiteSpec};
pub use volume::{AdxTrendDetector, AdxTrendSettings, VolumeSpikeDetector, VolumeSpikeSettings};

/// Static description of a detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorMetadata {
    pub name: String,
    pub category: String,
    pub required_inputs: Vec<String>,
    pub description: String,
    pub signal_names: Vec<String>,
}

impl DetectorMetadata {
    pub fn new(
        name: impl Into<String>,
        category: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            required_inputs: Vec::new(),
            description: description.into(),
            signal_names: Vec::new(),
        }
    }

    pub fn with_inputs<I, S>(mut self, inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_inputs = inputs.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_signal_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.signal_names = names.into_iter().map(Into::into).collect();
        self
    }
}

/// Per-run stamp shared by every signal of one aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionContext {
    pub symbol: String,
    pub timeframe: String,
    pub timestamp: DateTime<Utc>,
}

impl DetectionContext {
    pub fn new(symbol: impl Into<String>, timeframe: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe: timeframe.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Start a signal already stamped with this run's timeframe and time.
    pub fn signal(
        &self,
        name: impl Into<String>,
        category: impl Into<String>,
        strength: SignalStrength,
        confidence: f64,
        description: impl Into<String>,
    ) -> Signal {
        Signal::new(name, category, strength, confidence, description)
            .with_timeframe(self.timeframe.clone())
            .with_timestamp(self.timestamp)
    }
}

/// A unit that turns indicator values into zero or more signals.
///
/// Implementations must be read-only over the inputs; the aggregator may run
/// several detectors against the same map concurrently.
pub trait Detector: Send + Sync {
    fn metadata(&self) -> &DetectorMetadata;

    fn name(&self) -> &str {
        &self.metadata().name
    }

    fn category(&self) -> &str {
        &self.metadata().category
    }

    fn required_inputs(&self) -> BTreeSet<String> {
        self.metadata().required_inputs.iter().cloned().collect()
    }

    fn validate(&self, inputs: &IndicatorMap) -> Result<(), DetectorError> {
        let missing = inputs.missing(self.required_inputs());
        if missing.is_empty() {
            Ok(())
        } else {
            Err(DetectorError::MissingInput {
                detector: self.name().to_string(),
                missing,
            })
        }
    }

    fn detect(&self, inputs: &IndicatorMap, ctx: &DetectionContext)
        -> Result<Vec<Signal>, DetectorError>;

    fn execute(
        &self,
        inputs: &IndicatorMap,
        ctx: &DetectionContext,
    ) -> Result<Vec<Signal>, DetectorError> {
        self.validate(inputs)?;
        self.detect(inputs, ctx)
    }
}

/// Fetch a required value after validation; absence here is a detection fault.
pub(crate) fn require(
    inputs: &IndicatorMap,
    detector: &str,
    key: &str,
) -> Result<f64, DetectorError> {
    inputs
        .value(key)
        .ok_or_else(|| DetectorError::detection(detector, format!("input '{}' has no usable value", key)))
}

/// Deserialize detector settings; `null` yields the defaults.
pub(crate) fn parse_settings<T>(kind: &str, params: Value) -> Result<T, ConfigurationError>
where
    T: DeserializeOwned + Default,
{
    if params.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(params).map_err(|e| ConfigurationError::InvalidSettings {
        kind: kind.to_string(),
        reason: e.to_string(),
    })
}

pub(crate) fn check_threshold_order(
    key: &str,
    low: f64,
    high: f64,
) -> Result<(), ConfigurationError> {
    if !(low.is_finite() && high.is_finite()) || low >= high {
        return Err(ConfigurationError::invalid(
            key,
            format!("lower bound {} must be below upper bound {}", low, high),
        ));
    }
    Ok(())
}
