//! Moving-average crossover, positioning and ribbon detectors

use super::{require, DetectionContext, Detector, DetectorMetadata};
use crate::error::{ConfigurationError, DetectorError};
use crate::models::{prev_key, IndicatorMap, Signal, SignalStrength};
use serde::{Deserialize, Serialize};
use tracing::debug;

fn ma_key(prefix: &str, period: u32) -> String {
    format!("{}_{}", prefix, period)
}

fn check_periods(key: &str, periods: &[u32], min_len: usize) -> Result<(), ConfigurationError> {
    if periods.len() < min_len {
        return Err(ConfigurationError::invalid(
            key,
            format!("need at least {} periods, got {}", min_len, periods.len()),
        ));
    }
    if periods.iter().any(|p| *p == 0) {
        return Err(ConfigurationError::invalid(key, "periods must be positive"));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaCrossoverSettings {
    pub fast: u32,
    pub slow: u32,
    /// Minimum separation required before a cross counts.
    pub epsilon: f64,
    /// Indicator prefix, `SMA` or `EMA`.
    pub ma_type: String,
}

impl Default for MaCrossoverSettings {
    fn default() -> Self {
        Self {
            fast: 10,
            slow: 20,
            epsilon: 0.0,
            ma_type: "SMA".to_string(),
        }
    }
}

impl MaCrossoverSettings {
    pub fn new(fast: u32, slow: u32) -> Self {
        Self {
            fast,
            slow,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.fast == 0 || self.fast >= self.slow {
            return Err(ConfigurationError::invalid(
                "ma_crossover.fast",
                format!("fast period {} must be positive and below slow period {}", self.fast, self.slow),
            ));
        }
        if !self.epsilon.is_finite() || self.epsilon < 0.0 {
            return Err(ConfigurationError::invalid(
                "ma_crossover.epsilon",
                "must be a non-negative number",
            ));
        }
        Ok(())
    }
}

/// Fast/slow moving-average crossover on the latest bar.
pub struct MaCrossoverDetector {
    settings: MaCrossoverSettings,
    fast_key: String,
    slow_key: String,
    metadata: DetectorMetadata,
}

impl MaCrossoverDetector {
    pub fn new(settings: MaCrossoverSettings) -> Result<Self, ConfigurationError> {
        settings.validate()?;
        Ok(Self::build(settings))
    }

    fn build(settings: MaCrossoverSettings) -> Self {
        let fast_key = ma_key(&settings.ma_type, settings.fast);
        let slow_key = ma_key(&settings.ma_type, settings.slow);
        let metadata = DetectorMetadata::new(
            format!("MA Crossover ({}/{})", settings.fast, settings.slow),
            "MA_CROSS",
            format!("Detects {} MA crossing {} MA", settings.fast, settings.slow),
        )
        .with_inputs([
            fast_key.clone(),
            slow_key.clone(),
            prev_key(&fast_key),
            prev_key(&slow_key),
        ])
        .with_signal_names([
            format!("{}/{} MA BULL CROSS", settings.fast, settings.slow),
            format!("{}/{} MA BEAR CROSS", settings.fast, settings.slow),
        ]);

        Self {
            settings,
            fast_key,
            slow_key,
            metadata,
        }
    }
}

impl Default for MaCrossoverDetector {
    fn default() -> Self {
        Self::build(MaCrossoverSettings::default())
    }
}

impl Detector for MaCrossoverDetector {
    fn metadata(&self) -> &DetectorMetadata {
        &self.metadata
    }

    fn detect(&self, inputs: &IndicatorMap, ctx: &DetectionContext) -> Result<Vec<Signal>, DetectorError> {
        let name = self.name();
        let fast = require(inputs, name, &self.fast_key)?;
        let slow = require(inputs, name, &self.slow_key)?;
        let fast_prev = require(inputs, name, &prev_key(&self.fast_key))?;
        let slow_prev = require(inputs, name, &prev_key(&self.slow_key))?;
        let eps = self.settings.epsilon;
        let (f, s) = (self.settings.fast, self.settings.slow);

        let mut signals = Vec::new();
        if fast_prev <= slow_prev + eps && fast > slow + eps {
            signals.push(
                ctx.signal(
                    format!("{}/{} MA BULL CROSS", f, s),
                    "MA_CROSS",
                    SignalStrength::Bullish,
                    0.7,
                    format!("{} MA crossed above {} MA", f, s),
                )
                .with_value(fast)
                .with_indicator(self.settings.ma_type.clone())
                .with_implication("Uptrend forming; consider long entries")
                .with_detail("spread", fast - slow),
            );
        } else if fast_prev >= slow_prev - eps && fast < slow - eps {
            signals.push(
                ctx.signal(
                    format!("{}/{} MA BEAR CROSS", f, s),
                    "MA_CROSS",
                    SignalStrength::Bearish,
                    0.7,
                    format!("{} MA crossed below {} MA", f, s),
                )
                .with_value(fast)
                .with_indicator(self.settings.ma_type.clone())
                .with_implication("Downtrend forming; consider short entries or exits")
                .with_detail("spread", fast - slow),
            );
        }

        debug!(detector = %name, count = signals.len(), "MA crossover evaluated");
        Ok(signals)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaPositionSettings {
    pub periods: Vec<u32>,
    pub ma_type: String,
}

impl Default for MaPositionSettings {
    fn default() -> Self {
        Self {
            periods: vec![20, 50, 200],
            ma_type: "SMA".to_string(),
        }
    }
}

impl MaPositionSettings {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        check_periods("ma_position.periods", &self.periods, 1)
    }
}

/// Price above or below every tracked moving average.
pub struct MaPositionDetector {
    settings: MaPositionSettings,
    keys: Vec<String>,
    metadata: DetectorMetadata,
}

impl MaPositionDetector {
    pub fn new(settings: MaPositionSettings) -> Result<Self, ConfigurationError> {
        settings.validate()?;
        Ok(Self::build(settings))
    }

    fn build(mut settings: MaPositionSettings) -> Self {
        settings.periods.sort_unstable();
        settings.periods.dedup();
        let keys: Vec<String> = settings
            .periods
            .iter()
            .map(|p| ma_key(&settings.ma_type, *p))
            .collect();
        let metadata = DetectorMetadata::new(
            format!("MA Positioning ({:?})", settings.periods),
            "MA_POSITION",
            format!("Detects price positioning relative to {:?} MAs", settings.periods),
        )
        .with_inputs(std::iter::once("Close".to_string()).chain(keys.iter().cloned()))
        .with_signal_names(["PRICE ABOVE ALL MAs", "PRICE BELOW ALL MAs"]);

        Self {
            settings,
            keys,
            metadata,
        }
    }
}

impl Default for MaPositionDetector {
    fn default() -> Self {
        Self::build(MaPositionSettings::default())
    }
}

impl Detector for MaPositionDetector {
    fn metadata(&self) -> &DetectorMetadata {
        &self.metadata
    }

    fn detect(&self, inputs: &IndicatorMap, ctx: &DetectionContext) -> Result<Vec<Signal>, DetectorError> {
        let close = require(inputs, self.name(), "Close")?;
        let mas = self
            .keys
            .iter()
            .map(|k| require(inputs, self.name(), k))
            .collect::<Result<Vec<f64>, _>>()?;

        let signal = if mas.iter().all(|ma| close > *ma) {
            Some(
                ctx.signal(
                    "PRICE ABOVE ALL MAs",
                    "MA_POSITION",
                    SignalStrength::Bullish,
                    0.8,
                    format!("Price is above all moving averages: {:?}", self.settings.periods),
                )
                .with_implication("Strong uptrend; favor long positions"),
            )
        } else if mas.iter().all(|ma| close < *ma) {
            Some(
                ctx.signal(
                    "PRICE BELOW ALL MAs",
                    "MA_POSITION",
                    SignalStrength::Bearish,
                    0.8,
                    format!("Price is below all moving averages: {:?}", self.settings.periods),
                )
                .with_implication("Strong downtrend; favor short positions"),
            )
        } else {
            None
        };

        Ok(signal
            .map(|s| s.with_value(close).with_indicator(self.settings.ma_type.clone()))
            .into_iter()
            .collect())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaRibbonSettings {
    pub periods: Vec<u32>,
    pub ma_type: String,
    /// Spread ratio below which the ribbon counts as aligned.
    pub aligned_threshold: f64,
    /// Spread ratio above which the ribbon counts as spread out.
    pub spread_threshold: f64,
}

impl Default for MaRibbonSettings {
    fn default() -> Self {
        Self {
            periods: vec![10, 20, 50, 100, 200],
            ma_type: "SMA".to_string(),
            aligned_threshold: 0.02,
            spread_threshold: 0.05,
        }
    }
}

impl MaRibbonSettings {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        check_periods("ma_ribbon.periods", &self.periods, 2)?;
        super::check_threshold_order(
            "ma_ribbon.aligned_threshold",
            self.aligned_threshold,
            self.spread_threshold,
        )?;
        if self.aligned_threshold <= 0.0 {
            return Err(ConfigurationError::invalid(
                "ma_ribbon.aligned_threshold",
                "must be positive",
            ));
        }
        Ok(())
    }
}

/// Compression or expansion of a stack of moving averages.
pub struct MaRibbonDetector {
    settings: MaRibbonSettings,
    keys: Vec<String>,
    metadata: DetectorMetadata,
}

impl MaRibbonDetector {
    pub fn new(settings: MaRibbonSettings) -> Result<Self, ConfigurationError> {
        settings.validate()?;
        Ok(Self::build(settings))
    }

    fn build(mut settings: MaRibbonSettings) -> Self {
        settings.periods.sort_unstable();
        settings.periods.dedup();
        let keys: Vec<String> = settings
            .periods
            .iter()
            .map(|p| ma_key(&settings.ma_type, *p))
            .collect();
        let metadata = DetectorMetadata::new(
            format!("MA Ribbon ({} MAs)", settings.periods.len()),
            "MA_RIBBON",
            "Detects MA ribbon alignment and trend strength",
        )
        .with_inputs(std::iter::once("Close".to_string()).chain(keys.iter().cloned()))
        .with_signal_names(["MA RIBBON ALIGNED", "MA RIBBON SPREAD"]);

        Self {
            settings,
            keys,
            metadata,
        }
    }
}

impl Default for MaRibbonDetector {
    fn default() -> Self {
        Self::build(MaRibbonSettings::default())
    }
}

impl Detector for MaRibbonDetector {
    fn metadata(&self) -> &DetectorMetadata {
        &self.metadata
    }

    fn detect(&self, inputs: &IndicatorMap, ctx: &DetectionContext) -> Result<Vec<Signal>, DetectorError> {
        let close = require(inputs, self.name(), "Close")?;
        let mas = self
            .keys
            .iter()
            .map(|k| require(inputs, self.name(), k))
            .collect::<Result<Vec<f64>, _>>()?;

        let max = mas.iter().copied().fold(f64::MIN, f64::max);
        let min = mas.iter().copied().fold(f64::MAX, f64::min);
        let range = max - min;
        if range == 0.0 || close == 0.0 {
            return Ok(Vec::new());
        }

        let spread_ratio = range / close.abs();
        let mut signals = Vec::new();

        if spread_ratio < self.settings.aligned_threshold {
            let avg = mas.iter().sum::<f64>() / mas.len() as f64;
            let (strength, implication) = if close > avg {
                (SignalStrength::StrongBullish, "Ribbon compressed upward; strong uptrend")
            } else {
                (SignalStrength::StrongBearish, "Ribbon compressed downward; strong downtrend")
            };
            signals.push(
                ctx.signal(
                    "MA RIBBON ALIGNED",
                    "MA_RIBBON",
                    strength,
                    0.85,
                    format!("All {} MAs are tightly aligned", mas.len()),
                )
                .with_value(spread_ratio)
                .with_indicator(self.settings.ma_type.clone())
                .with_implication(implication),
            );
        } else if spread_ratio > self.settings.spread_threshold {
            signals.push(
                ctx.signal(
                    "MA RIBBON SPREAD",
                    "MA_RIBBON",
                    SignalStrength::Neutral,
                    0.6,
                    "MAs are spread apart (weak trend or transition)",
                )
                .with_value(spread_ratio)
                .with_indicator(self.settings.ma_type.clone())
                .with_implication("Weak trend or consolidation; wait for ribbon compression"),
            );
        }

        Ok(signals)
    }
}
