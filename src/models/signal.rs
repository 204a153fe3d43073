//! Signal value object and its closed vocabularies

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Strength tag attached to every signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalStrength {
    ExtremeBullish,
    StrongBullish,
    Bullish,
    Significant,
    Trending,
    Moderate,
    Weak,
    Neutral,
    Bearish,
    StrongBearish,
    ExtremeBearish,
}

/// Directional bias derived from a strength tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalDirection {
    Bullish,
    Bearish,
    Neutral,
}

impl SignalStrength {
    pub const ALL: [SignalStrength; 11] = [
        SignalStrength::ExtremeBullish,
        SignalStrength::StrongBullish,
        SignalStrength::Bullish,
        SignalStrength::Significant,
        SignalStrength::Trending,
        SignalStrength::Moderate,
        SignalStrength::Weak,
        SignalStrength::Neutral,
        SignalStrength::Bearish,
        SignalStrength::StrongBearish,
        SignalStrength::ExtremeBearish,
    ];

    pub fn direction(self) -> SignalDirection {
        match self {
            Self::ExtremeBullish | Self::StrongBullish | Self::Bullish => SignalDirection::Bullish,
            Self::ExtremeBearish | Self::StrongBearish | Self::Bearish => SignalDirection::Bearish,
            _ => SignalDirection::Neutral,
        }
    }

    pub fn is_bullish(self) -> bool {
        self.direction() == SignalDirection::Bullish
    }

    pub fn is_bearish(self) -> bool {
        self.direction() == SignalDirection::Bearish
    }

    pub fn is_neutral(self) -> bool {
        self == Self::Neutral
    }

    /// How emphatic the tag is, from 0.2 (neutral) to 1.0 (extreme).
    pub fn magnitude(self) -> f64 {
        match self {
            Self::ExtremeBullish | Self::ExtremeBearish => 1.0,
            Self::StrongBullish | Self::StrongBearish => 0.85,
            Self::Bullish | Self::Bearish => 0.65,
            Self::Significant => 0.6,
            Self::Trending => 0.55,
            Self::Moderate => 0.45,
            Self::Weak => 0.25,
            Self::Neutral => 0.2,
        }
    }

    /// Display ordering: most bullish first, most bearish last.
    pub fn rank(self) -> u8 {
        match self {
            Self::ExtremeBullish => 0,
            Self::StrongBullish => 1,
            Self::Bullish => 2,
            Self::Significant => 3,
            Self::Trending => 4,
            Self::Moderate => 5,
            Self::Weak => 6,
            Self::Neutral => 7,
            Self::Bearish => 8,
            Self::StrongBearish => 9,
            Self::ExtremeBearish => 10,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ExtremeBullish => "EXTREME_BULLISH",
            Self::StrongBullish => "STRONG_BULLISH",
            Self::Bullish => "BULLISH",
            Self::Significant => "SIGNIFICANT",
            Self::Trending => "TRENDING",
            Self::Moderate => "MODERATE",
            Self::Weak => "WEAK",
            Self::Neutral => "NEUTRAL",
            Self::Bearish => "BEARISH",
            Self::StrongBearish => "STRONG_BEARISH",
            Self::ExtremeBearish => "EXTREME_BEARISH",
        }
    }
}

impl fmt::Display for SignalStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Categories known when the detector registry is built.
pub const DEFAULT_CATEGORIES: [&str; 12] = [
    "MA_CROSS",
    "MA_POSITION",
    "MA_RIBBON",
    "RSI",
    "MACD",
    "STOCHASTIC",
    "ATR",
    "ADX",
    "VOLUME",
    "FIBONACCI",
    "PRICE_ACTION",
    "VWAP",
];

/// Closed set of signal categories, frozen once the registry is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalVocabulary {
    categories: BTreeSet<String>,
}

impl SignalVocabulary {
    pub fn new<I, S>(categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            categories: categories.into_iter().map(Into::into).collect(),
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.categories.insert(category.into());
        self
    }

    pub fn contains(&self, category: &str) -> bool {
        self.categories.contains(category)
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().map(String::as_str)
    }
}

impl Default for SignalVocabulary {
    fn default() -> Self {
        Self::new(DEFAULT_CATEGORIES)
    }
}

/// Immutable finding produced by one detector run.
///
/// Detectors assemble a signal with [`Signal::new`] and the consuming
/// `with_*` methods. Once handed to the aggregator a signal is only moved,
/// filtered or cloned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    name: String,
    category: String,
    strength: SignalStrength,
    confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<f64>,
    description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    trading_implication: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    indicator: Option<String>,
    timeframe: String,
    timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    details: BTreeMap<String, Value>,
}

impl Signal {
    pub fn new(
        name: impl Into<String>,
        category: impl Into<String>,
        strength: SignalStrength,
        confidence: f64,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            strength,
            confidence,
            value: None,
            description: description.into(),
            trading_implication: None,
            indicator: None,
            timeframe: "unknown".to_string(),
            timestamp: Utc::now(),
            details: BTreeMap::new(),
        }
    }

    pub fn with_value(mut self, value: f64) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_implication(mut self, implication: impl Into<String>) -> Self {
        self.trading_implication = Some(implication.into());
        self
    }

    pub fn with_indicator(mut self, indicator: impl Into<String>) -> Self {
        self.indicator = Some(indicator.into());
        self
    }

    pub fn with_timeframe(mut self, timeframe: impl Into<String>) -> Self {
        self.timeframe = timeframe.into();
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn strength(&self) -> SignalStrength {
        self.strength
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn value(&self) -> Option<f64> {
        self.value
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn trading_implication(&self) -> Option<&str> {
        self.trading_implication.as_deref()
    }

    pub fn indicator(&self) -> Option<&str> {
        self.indicator.as_deref()
    }

    pub fn timeframe(&self) -> &str {
        &self.timeframe
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn details(&self) -> &BTreeMap<String, Value> {
        &self.details
    }

    pub fn direction(&self) -> SignalDirection {
        self.strength.direction()
    }

    pub fn is_bullish(&self) -> bool {
        self.strength.is_bullish()
    }

    pub fn is_bearish(&self) -> bool {
        self.strength.is_bearish()
    }

    pub fn is_neutral(&self) -> bool {
        self.strength.is_neutral()
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}) - {}", self.name, self.strength, self.description)
    }
}

/// A signal annotated with its independently computed quality score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredSignal {
    pub signal: Signal,
    pub quality: f64,
}
