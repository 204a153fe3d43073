//! Volume spike and ADX trend-strength detectors

use super::{check_threshold_order, require, DetectionContext, Detector, DetectorMetadata};
use crate::error::{ConfigurationError, DetectorError};
use crate::models::{IndicatorMap, Signal, SignalStrength};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeSpikeSettings {
    pub volume_key: String,
    pub average_key: String,
    /// Volume / average ratio that counts as a spike.
    pub threshold: f64,
}

impl Default for VolumeSpikeSettings {
    fn default() -> Self {
        Self {
            volume_key: "Volume".to_string(),
            average_key: "Volume_MA".to_string(),
            threshold: 2.0,
        }
    }
}

impl VolumeSpikeSettings {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if !self.threshold.is_finite() || self.threshold <= 1.0 {
            return Err(ConfigurationError::invalid(
                "volume_spike.threshold",
                "must be greater than 1.0",
            ));
        }
        Ok(())
    }
}

/// Volume far above its moving average, signed by the bar's price change.
pub struct VolumeSpikeDetector {
    settings: VolumeSpikeSettings,
    metadata: DetectorMetadata,
}

impl VolumeSpikeDetector {
    pub fn new(settings: VolumeSpikeSettings) -> Result<Self, ConfigurationError> {
        settings.validate()?;
        Ok(Self::build(settings))
    }

    fn build(settings: VolumeSpikeSettings) -> Self {
        let metadata = DetectorMetadata::new(
            format!("Volume Spike ({:.1}x)", settings.threshold),
            "VOLUME",
            "Detects volume surges relative to the volume moving average",
        )
        .with_inputs([settings.volume_key.clone(), settings.average_key.clone()])
        .with_signal_names(["VOLUME SPIKE"]);
        Self { settings, metadata }
    }
}

impl Default for VolumeSpikeDetector {
    fn default() -> Self {
        Self::build(VolumeSpikeSettings::default())
    }
}

impl Detector for VolumeSpikeDetector {
    fn metadata(&self) -> &DetectorMetadata {
        &self.metadata
    }

    fn detect(&self, inputs: &IndicatorMap, ctx: &DetectionContext) -> Result<Vec<Signal>, DetectorError> {
        let volume = require(inputs, self.name(), &self.settings.volume_key)?;
        let average = require(inputs, self.name(), &self.settings.average_key)?;
        if average <= 0.0 {
            return Ok(Vec::new());
        }

        let ratio = volume / average;
        if ratio < self.settings.threshold {
            return Ok(Vec::new());
        }

        let change = match (inputs.value("Close"), inputs.previous("Close")) {
            (Some(close), Some(prev)) => Some(close - prev),
            _ => None,
        };
        let (strength, implication) = match change {
            Some(c) if c > 0.0 => (SignalStrength::Bullish, "Buying pressure behind the move up"),
            Some(c) if c < 0.0 => (SignalStrength::Bearish, "Selling pressure behind the move down"),
            _ => (SignalStrength::Significant, "Unusual activity; direction unconfirmed"),
        };
        let confidence = (0.6 + 0.05 * (ratio - self.settings.threshold)).min(0.85);

        Ok(vec![ctx
            .signal(
                "VOLUME SPIKE",
                "VOLUME",
                strength,
                confidence,
                format!("Volume at {:.1}x its average", ratio),
            )
            .with_value(volume)
            .with_indicator("Volume")
            .with_implication(implication)
            .with_detail("volume_ratio", ratio)])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdxTrendSettings {
    pub period: u32,
    pub weak: f64,
    pub trending: f64,
    pub strong: f64,
}

impl Default for AdxTrendSettings {
    fn default() -> Self {
        Self {
            period: 14,
            weak: 20.0,
            trending: 25.0,
            strong: 40.0,
        }
    }
}

impl AdxTrendSettings {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        check_threshold_order("adx.weak", self.weak, self.trending)?;
        check_threshold_order("adx.trending", self.trending, self.strong)
    }
}

/// Trend strength from ADX, direction from the directional indicators.
pub struct AdxTrendDetector {
    settings: AdxTrendSettings,
    metadata: DetectorMetadata,
}

impl AdxTrendDetector {
    pub fn new(settings: AdxTrendSettings) -> Result<Self, ConfigurationError> {
        settings.validate()?;
        Ok(Self::build(settings))
    }

    fn build(settings: AdxTrendSettings) -> Self {
        let metadata = DetectorMetadata::new(
            format!("ADX Trend ({})", settings.period),
            "ADX",
            "Classifies trend strength with ADX and +DI/-DI",
        )
        .with_inputs(["ADX", "PLUS_DI", "MINUS_DI"])
        .with_signal_names(["ADX STRONG TREND", "ADX TRENDING", "ADX WEAK TREND"]);
        Self { settings, metadata }
    }
}

impl Default for AdxTrendDetector {
    fn default() -> Self {
        Self::build(AdxTrendSettings::default())
    }
}

impl Detector for AdxTrendDetector {
    fn metadata(&self) -> &DetectorMetadata {
        &self.metadata
    }

    fn detect(&self, inputs: &IndicatorMap, ctx: &DetectionContext) -> Result<Vec<Signal>, DetectorError> {
        let adx = require(inputs, self.name(), "ADX")?;
        let plus = require(inputs, self.name(), "PLUS_DI")?;
        let minus = require(inputs, self.name(), "MINUS_DI")?;
        let s = &self.settings;

        let signal = if adx >= s.trending {
            let strong = adx >= s.strong;
            let strength = match (plus > minus, minus > plus, strong) {
                (true, _, true) => SignalStrength::StrongBullish,
                (true, _, false) => SignalStrength::Bullish,
                (_, true, true) => SignalStrength::StrongBearish,
                (_, true, false) => SignalStrength::Bearish,
                _ => SignalStrength::Trending,
            };
            let (name, confidence) = if strong {
                ("ADX STRONG TREND", 0.75)
            } else {
                ("ADX TRENDING", 0.65)
            };
            Some(ctx.signal(
                name,
                "ADX",
                strength,
                confidence,
                format!("ADX {:.1} with +DI {:.1} / -DI {:.1}", adx, plus, minus),
            ))
        } else if adx < s.weak {
            Some(
                ctx.signal(
                    "ADX WEAK TREND",
                    "ADX",
                    SignalStrength::Weak,
                    0.5,
                    format!("ADX {:.1} shows no established trend", adx),
                )
                .with_implication("Range conditions; trend signals less reliable"),
            )
        } else {
            None
        };

        Ok(signal
            .map(|sig| {
                sig.with_value(adx)
                    .with_indicator("ADX")
                    .with_detail("plus_di", plus)
                    .with_detail("minus_di", minus)
            })
            .into_iter()
            .collect())
    }
}
