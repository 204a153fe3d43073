//! Fibonacci retracement and extension detector over a swing range

use super::{require, DetectionContext, Detector, DetectorMetadata};
use crate::error::{ConfigurationError, DetectorError};
use crate::models::{IndicatorMap, Signal, SignalStrength};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelKind {
    Retrace,
    Extension,
}

impl LevelKind {
    fn as_str(self) -> &'static str {
        match self {
            Self::Retrace => "RETRACE",
            Self::Extension => "EXTENSION",
        }
    }
}

/// (ratio, label, kind) for every level measured from the swing low.
pub const FIB_LEVELS: [(f64, &str, LevelKind); 11] = [
    (0.236, "23.6%", LevelKind::Retrace),
    (0.382, "38.2%", LevelKind::Retrace),
    (0.5, "50.0%", LevelKind::Retrace),
    (0.618, "61.8%", LevelKind::Retrace),
    (0.786, "78.6%", LevelKind::Retrace),
    (1.272, "127.2%", LevelKind::Extension),
    (1.414, "141.4%", LevelKind::Extension),
    (1.618, "161.8%", LevelKind::Extension),
    (2.0, "200.0%", LevelKind::Extension),
    (2.236, "223.6%", LevelKind::Extension),
    (2.618, "261.8%", LevelKind::Extension),
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FibLevel {
    pub ratio: f64,
    pub label: &'static str,
    pub kind: LevelKind,
    pub price: f64,
}

impl FibLevel {
    fn strength(&self) -> SignalStrength {
        let is = |r: f64| (self.ratio - r).abs() < 1e-9;
        match self.kind {
            LevelKind::Retrace if is(0.618) => SignalStrength::Significant,
            LevelKind::Retrace if is(0.382) || is(0.786) => SignalStrength::Moderate,
            LevelKind::Retrace => SignalStrength::Weak,
            LevelKind::Extension if is(1.618) || is(2.0) => SignalStrength::Significant,
            LevelKind::Extension => SignalStrength::Moderate,
        }
    }
}

pub fn fib_levels(swing_low: f64, swing_high: f64) -> Vec<FibLevel> {
    let range = swing_high - swing_low;
    FIB_LEVELS
        .iter()
        .map(|(ratio, label, kind)| FibLevel {
            ratio: *ratio,
            label: *label,
            kind: *kind,
            price: swing_low + ratio * range,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FibonacciSettings {
    /// Relative distance from a level that counts as touching it.
    pub tolerance: f64,
    /// Relative distance past a level required for a breakout.
    pub breakout: f64,
    /// Bucket width, relative to price, for grouping nearby levels.
    pub cluster: f64,
    pub volume_ratio: f64,
    pub time_zones: Vec<u32>,
    pub high_key: String,
    pub low_key: String,
}

impl Default for FibonacciSettings {
    fn default() -> Self {
        Self {
            tolerance: 0.01,
            breakout: 0.01,
            cluster: 0.02,
            volume_ratio: 1.5,
            time_zones: vec![5, 8, 13, 21, 34, 55, 89, 144],
            high_key: "SWING_HIGH".to_string(),
            low_key: "SWING_LOW".to_string(),
        }
    }
}

impl FibonacciSettings {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        for (key, v) in [
            ("fibonacci.tolerance", self.tolerance),
            ("fibonacci.breakout", self.breakout),
            ("fibonacci.cluster", self.cluster),
            ("fibonacci.volume_ratio", self.volume_ratio),
        ] {
            if !v.is_finite() || v <= 0.0 {
                return Err(ConfigurationError::invalid(key, "must be a positive number"));
            }
        }
        if self.time_zones.iter().any(|z| *z == 0) {
            return Err(ConfigurationError::invalid(
                "fibonacci.time_zones",
                "zone lengths must be positive",
            ));
        }
        Ok(())
    }
}

/// Price interaction with Fibonacci levels of the current swing.
pub struct FibonacciDetector {
    settings: FibonacciSettings,
    metadata: DetectorMetadata,
}

impl FibonacciDetector {
    pub fn new(settings: FibonacciSettings) -> Result<Self, ConfigurationError> {
        settings.validate()?;
        Ok(Self::build(settings))
    }

    fn build(settings: FibonacciSettings) -> Self {
        let metadata = DetectorMetadata::new(
            "Fibonacci Levels",
            "FIBONACCI",
            "Detects retracement/extension touches, breaks, channels and confluence",
        )
        .with_inputs([
            "Close".to_string(),
            settings.high_key.clone(),
            settings.low_key.clone(),
        ])
        .with_signal_names([
            "FIB RETRACE",
            "FIB EXTENSION",
            "FIB BOUNCE",
            "FIB REJECTION",
            "FIB BREAKOUT",
            "FIB BREAKDOWN",
            "FIB CHANNEL",
            "FIB CONFLUENCE",
            "FIB TIME ZONE",
            "FIB HIGH VOLUME",
        ]);
        Self { settings, metadata }
    }

    fn at_level(&self, ctx: &DetectionContext, close: f64, levels: &[FibLevel]) -> Vec<Signal> {
        levels
            .iter()
            .filter(|l| (close - l.price).abs() / close < self.settings.tolerance)
            .map(|l| {
                ctx.signal(
                    format!("FIB {} {}", l.kind.as_str(), l.label),
                    "FIBONACCI",
                    l.strength(),
                    0.7,
                    format!("Price at {} Fibonacci {}", l.label, l.kind.as_str().to_lowercase()),
                )
                .with_value(l.price)
                .with_detail("ratio", l.ratio)
            })
            .collect()
    }

    fn crossings(&self, ctx: &DetectionContext, close: f64, prev: f64, levels: &[FibLevel]) -> Vec<Signal> {
        let mut signals = Vec::new();
        for l in levels {
            if prev < l.price && close > l.price {
                signals.push(
                    ctx.signal(
                        format!("FIB {} BOUNCE", l.label),
                        "FIBONACCI",
                        SignalStrength::Bullish,
                        0.65,
                        format!("Price bounced above {} level", l.label),
                    )
                    .with_value(l.price),
                );
            } else if prev > l.price && close < l.price {
                signals.push(
                    ctx.signal(
                        format!("FIB {} REJECTION", l.label),
                        "FIBONACCI",
                        SignalStrength::Bearish,
                        0.65,
                        format!("Price rejected below {} level", l.label),
                    )
                    .with_value(l.price),
                );
            }
        }

        for l in levels {
            if prev < l.price && close > l.price * (1.0 + self.settings.breakout) {
                signals.push(
                    ctx.signal(
                        format!("FIB {} BREAKOUT", l.label),
                        "FIBONACCI",
                        SignalStrength::StrongBullish,
                        0.75,
                        format!("Price broke out above {} level", l.label),
                    )
                    .with_value(l.price)
                    .with_implication("Level cleared; next extension becomes target"),
                );
            } else if prev > l.price && close < l.price * (1.0 - self.settings.breakout) {
                signals.push(
                    ctx.signal(
                        format!("FIB {} BREAKDOWN", l.label),
                        "FIBONACCI",
                        SignalStrength::StrongBearish,
                        0.75,
                        format!("Price broke down below {} level", l.label),
                    )
                    .with_value(l.price)
                    .with_implication("Support lost; next level below becomes target"),
                );
            }
        }
        signals
    }

    fn channel(&self, ctx: &DetectionContext, close: f64, levels: &[FibLevel]) -> Option<Signal> {
        let mut sorted: Vec<&FibLevel> = levels.iter().collect();
        sorted.sort_by(|a, b| a.price.total_cmp(&b.price));
        sorted.windows(2).find_map(|pair| {
            let (lower, upper) = (pair[0], pair[1]);
            (lower.price <= close && close <= upper.price).then(|| {
                ctx.signal(
                    format!("FIB CHANNEL {}-{}", lower.label, upper.label),
                    "FIBONACCI",
                    SignalStrength::Neutral,
                    0.6,
                    format!(
                        "Price in Fibonacci channel between {} and {}",
                        lower.label, upper.label
                    ),
                )
                .with_value((lower.price + upper.price) / 2.0)
            })
        })
    }

    fn confluence(&self, ctx: &DetectionContext, close: f64, levels: &[FibLevel]) -> Vec<Signal> {
        let width = close.abs() * self.settings.cluster;
        let mut clusters: Vec<(i64, Vec<&'static str>)> = Vec::new();
        for l in levels {
            let bucket = (l.price / width).round() as i64;
            match clusters.iter_mut().find(|(b, _)| *b == bucket) {
                Some((_, names)) => names.push(l.label),
                None => clusters.push((bucket, vec![l.label])),
            }
        }

        clusters
            .into_iter()
            .filter(|(_, names)| names.len() >= 2)
            .map(|(bucket, names)| {
                let strength = if names.len() >= 3 {
                    SignalStrength::ExtremeBullish
                } else {
                    SignalStrength::Significant
                };
                ctx.signal(
                    format!("FIB CONFLUENCE ({} levels)", names.len()),
                    "FIBONACCI",
                    strength,
                    0.8,
                    format!(
                        "Fibonacci confluence at {} levels: {}",
                        names.len(),
                        names.join(", ")
                    ),
                )
                .with_value(bucket as f64 * width)
                .with_implication("Strong support/resistance from multiple Fibonacci levels")
            })
            .collect()
    }

    fn time_zones(&self, ctx: &DetectionContext, bar_index: f64) -> Vec<Signal> {
        if bar_index < 0.0 {
            return Vec::new();
        }
        let bar = bar_index.round() as u64;
        self.settings
            .time_zones
            .iter()
            .filter(|n| bar % u64::from(**n) <= 1)
            .map(|n| {
                ctx.signal(
                    format!("FIB TIME ZONE {}", n),
                    "FIBONACCI",
                    SignalStrength::Moderate,
                    0.6,
                    format!("Current bar aligns with {}-bar Fibonacci time zone", n),
                )
                .with_value(f64::from(*n))
                .with_implication("Potential reversal/inflection point")
            })
            .collect()
    }

    fn volume_confirmed(
        &self,
        ctx: &DetectionContext,
        close: f64,
        volume: f64,
        volume_ma: f64,
        levels: &[FibLevel],
    ) -> Option<Signal> {
        if volume_ma <= 0.0 {
            return None;
        }
        let ratio = volume / volume_ma;
        if ratio <= self.settings.volume_ratio {
            return None;
        }
        let nearest = levels
            .iter()
            .min_by(|a, b| (a.price - close).abs().total_cmp(&(b.price - close).abs()))?;
        if (close - nearest.price).abs() / close >= self.settings.tolerance {
            return None;
        }
        Some(
            ctx.signal(
                format!("FIB {} + HIGH VOLUME", nearest.label),
                "FIBONACCI",
                SignalStrength::Significant,
                0.8,
                format!("Fibonacci {} confirmed with {:.1}x volume", nearest.label, ratio),
            )
            .with_value(nearest.price)
            .with_detail("volume_ratio", ratio)
            .with_implication("Strong confirmation of Fibonacci level"),
        )
    }
}

impl Default for FibonacciDetector {
    fn default() -> Self {
        Self::build(FibonacciSettings::default())
    }
}

impl Detector for FibonacciDetector {
    fn metadata(&self) -> &DetectorMetadata {
        &self.metadata
    }

    fn detect(&self, inputs: &IndicatorMap, ctx: &DetectionContext) -> Result<Vec<Signal>, DetectorError> {
        let close = require(inputs, self.name(), "Close")?;
        let high = require(inputs, self.name(), &self.settings.high_key)?;
        let low = require(inputs, self.name(), &self.settings.low_key)?;

        if high < low {
            return Err(DetectorError::detection(
                self.name(),
                format!("swing high {} is below swing low {}", high, low),
            ));
        }
        if high == low || close <= 0.0 {
            return Ok(Vec::new());
        }

        let levels = fib_levels(low, high);
        let mut signals = self.at_level(ctx, close, &levels);
        if let Some(prev) = inputs.previous("Close") {
            signals.extend(self.crossings(ctx, close, prev, &levels));
        }
        signals.extend(self.channel(ctx, close, &levels));
        signals.extend(self.confluence(ctx, close, &levels));
        if let Some(bar) = inputs.value("BAR_INDEX") {
            signals.extend(self.time_zones(ctx, bar));
        }
        if let (Some(volume), Some(volume_ma)) = (inputs.value("Volume"), inputs.value("Volume_MA")) {
            signals.extend(self.volume_confirmed(ctx, close, volume, volume_ma, &levels));
        }

        let signals: Vec<Signal> = signals
            .into_iter()
            .map(|s| s.with_indicator("Fibonacci"))
            .collect();
        debug!(detector = %self.name(), count = signals.len(), "Fibonacci levels evaluated");
        Ok(signals)
    }
}
