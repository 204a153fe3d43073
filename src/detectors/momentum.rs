//! RSI, MACD and stochastic oscillator detectors

use super::{check_threshold_order, require, DetectionContext, Detector, DetectorMetadata};
use crate::error::{ConfigurationError, DetectorError};
use crate::models::{prev_key, IndicatorMap, Signal, SignalStrength};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RsiSettings {
    pub period: u32,
    /// Input key holding the RSI reading.
    pub key: String,
    pub oversold: f64,
    pub overbought: f64,
    pub neutral_low: f64,
    pub neutral_high: f64,
    pub drift_low: f64,
    pub drift_high: f64,
}

impl Default for RsiSettings {
    fn default() -> Self {
        Self {
            period: 14,
            key: "RSI".to_string(),
            oversold: 30.0,
            overbought: 70.0,
            neutral_low: 40.0,
            neutral_high: 60.0,
            drift_low: 45.0,
            drift_high: 55.0,
        }
    }
}

impl RsiSettings {
    pub fn with_thresholds(mut self, oversold: f64, overbought: f64) -> Self {
        self.oversold = oversold;
        self.overbought = overbought;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        check_threshold_order("rsi.oversold", self.oversold, self.overbought)?;
        check_threshold_order("rsi.neutral_low", self.neutral_low, self.neutral_high)?;
        if self.oversold < 0.0 || self.overbought > 100.0 {
            return Err(ConfigurationError::invalid(
                "rsi.overbought",
                "thresholds must lie within 0-100",
            ));
        }
        if self.key.trim().is_empty() {
            return Err(ConfigurationError::invalid("rsi.key", "must not be empty"));
        }
        Ok(())
    }
}

/// Overbought, oversold and neutral-zone RSI readings.
pub struct RsiDetector {
    settings: RsiSettings,
    metadata: DetectorMetadata,
}

impl RsiDetector {
    pub fn new(settings: RsiSettings) -> Result<Self, ConfigurationError> {
        settings.validate()?;
        Ok(Self::build(settings))
    }

    fn build(settings: RsiSettings) -> Self {
        let metadata = DetectorMetadata::new(
            format!("RSI ({})", settings.period),
            "RSI",
            "Detects overbought/oversold conditions",
        )
        .with_inputs([settings.key.clone()])
        .with_signal_names(["RSI OVERSOLD", "RSI OVERBOUGHT", "RSI NEUTRAL"]);
        Self { settings, metadata }
    }
}

impl Default for RsiDetector {
    fn default() -> Self {
        Self::build(RsiSettings::default())
    }
}

impl Detector for RsiDetector {
    fn metadata(&self) -> &DetectorMetadata {
        &self.metadata
    }

    fn detect(&self, inputs: &IndicatorMap, ctx: &DetectionContext) -> Result<Vec<Signal>, DetectorError> {
        let rsi = require(inputs, self.name(), &self.settings.key)?;
        let s = &self.settings;

        let signal = if rsi < s.oversold {
            Some(
                ctx.signal(
                    "RSI OVERSOLD",
                    "RSI",
                    SignalStrength::Bullish,
                    0.65,
                    format!("RSI below {:.0}: {:.1}", s.oversold, rsi),
                )
                .with_implication("Potential bounce; watch for support"),
            )
        } else if rsi > s.overbought {
            Some(
                ctx.signal(
                    "RSI OVERBOUGHT",
                    "RSI",
                    SignalStrength::Bearish,
                    0.65,
                    format!("RSI above {:.0}: {:.1}", s.overbought, rsi),
                )
                .with_implication("Potential reversal or pullback; watch for resistance"),
            )
        } else if (s.neutral_low..=s.neutral_high).contains(&rsi) {
            let (strength, description) = if rsi > s.drift_high {
                (SignalStrength::Moderate, format!("RSI trending into overbought: {:.1}", rsi))
            } else if rsi < s.drift_low {
                (SignalStrength::Moderate, format!("RSI trending into oversold: {:.1}", rsi))
            } else {
                (SignalStrength::Neutral, format!("RSI in neutral zone: {:.1}", rsi))
            };
            Some(ctx.signal("RSI NEUTRAL", "RSI", strength, 0.5, description))
        } else {
            None
        };

        Ok(signal
            .map(|sig| sig.with_value(rsi).with_indicator("RSI").with_detail("period", s.period))
            .into_iter()
            .collect())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MacdSettings {
    pub epsilon: f64,
}

impl MacdSettings {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if !self.epsilon.is_finite() || self.epsilon < 0.0 {
            return Err(ConfigurationError::invalid(
                "macd.epsilon",
                "must be a non-negative number",
            ));
        }
        Ok(())
    }
}

/// MACD/signal-line crossovers and zero-line crosses.
pub struct MacdDetector {
    settings: MacdSettings,
    metadata: DetectorMetadata,
}

impl MacdDetector {
    pub fn new(settings: MacdSettings) -> Result<Self, ConfigurationError> {
        settings.validate()?;
        Ok(Self::build(settings))
    }

    fn build(settings: MacdSettings) -> Self {
        let metadata = DetectorMetadata::new(
            "MACD",
            "MACD",
            "Detects MACD crossovers and momentum changes",
        )
        .with_inputs(["MACD", "MACD_Signal", "MACD_prev", "MACD_Signal_prev"])
        .with_signal_names([
            "MACD BULL CROSS",
            "MACD BEAR CROSS",
            "MACD ZERO CROSS UP",
            "MACD ZERO CROSS DOWN",
        ]);
        Self { settings, metadata }
    }
}

impl Default for MacdDetector {
    fn default() -> Self {
        Self::build(MacdSettings::default())
    }
}

impl Detector for MacdDetector {
    fn metadata(&self) -> &DetectorMetadata {
        &self.metadata
    }

    fn detect(&self, inputs: &IndicatorMap, ctx: &DetectionContext) -> Result<Vec<Signal>, DetectorError> {
        let name = self.name();
        let macd = require(inputs, name, "MACD")?;
        let line = require(inputs, name, "MACD_Signal")?;
        let macd_prev = require(inputs, name, &prev_key("MACD"))?;
        let line_prev = require(inputs, name, &prev_key("MACD_Signal"))?;
        let histogram = inputs.value("MACD_Histogram");
        let eps = self.settings.epsilon;

        let mut signals = Vec::new();

        let cross = if macd_prev <= line_prev + eps && macd > line + eps {
            Some((
                "MACD BULL CROSS",
                SignalStrength::StrongBullish,
                "MACD crossed above signal line",
                "Bullish momentum building; consider long entries",
            ))
        } else if macd_prev >= line_prev - eps && macd < line - eps {
            Some((
                "MACD BEAR CROSS",
                SignalStrength::StrongBearish,
                "MACD crossed below signal line",
                "Bearish momentum building; consider exits",
            ))
        } else {
            None
        };

        if let Some((signal_name, strength, description, implication)) = cross {
            let mut signal = ctx
                .signal(signal_name, "MACD", strength, 0.8, description)
                .with_value(macd)
                .with_indicator("MACD")
                .with_implication(implication);
            if let Some(h) = histogram {
                signal = signal.with_detail("histogram", h);
            }
            signals.push(signal);
        }

        if macd_prev < 0.0 && macd > 0.0 {
            signals.push(
                ctx.signal(
                    "MACD ZERO CROSS UP",
                    "MACD",
                    SignalStrength::Moderate,
                    0.7,
                    "MACD crossed above zero line",
                )
                .with_value(macd)
                .with_indicator("MACD")
                .with_implication("Momentum turning positive"),
            );
        } else if macd_prev > 0.0 && macd < 0.0 {
            signals.push(
                ctx.signal(
                    "MACD ZERO CROSS DOWN",
                    "MACD",
                    SignalStrength::Moderate,
                    0.7,
                    "MACD crossed below zero line",
                )
                .with_value(macd)
                .with_indicator("MACD")
                .with_implication("Momentum turning negative"),
            );
        }

        Ok(signals)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StochasticSettings {
    pub period: u32,
    pub oversold: f64,
    pub overbought: f64,
}

impl Default for StochasticSettings {
    fn default() -> Self {
        Self {
            period: 14,
            oversold: 20.0,
            overbought: 80.0,
        }
    }
}

impl StochasticSettings {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        check_threshold_order("stochastic.oversold", self.oversold, self.overbought)
    }
}

/// Stochastic extremes and %K/%D crossovers.
pub struct StochasticDetector {
    settings: StochasticSettings,
    metadata: DetectorMetadata,
}

impl StochasticDetector {
    pub fn new(settings: StochasticSettings) -> Result<Self, ConfigurationError> {
        settings.validate()?;
        Ok(Self::build(settings))
    }

    fn build(settings: StochasticSettings) -> Self {
        let metadata = DetectorMetadata::new(
            format!("Stochastic ({})", settings.period),
            "STOCHASTIC",
            "Detects Stochastic overbought/oversold and crossovers",
        )
        .with_inputs(["Stoch_K", "Stoch_D"])
        .with_signal_names([
            "STOCHASTIC OVERSOLD",
            "STOCHASTIC OVERBOUGHT",
            "STOCHASTIC %K CROSS ABOVE %D",
            "STOCHASTIC %K CROSS BELOW %D",
        ]);
        Self { settings, metadata }
    }
}

impl Default for StochasticDetector {
    fn default() -> Self {
        Self::build(StochasticSettings::default())
    }
}

impl Detector for StochasticDetector {
    fn metadata(&self) -> &DetectorMetadata {
        &self.metadata
    }

    fn detect(&self, inputs: &IndicatorMap, ctx: &DetectionContext) -> Result<Vec<Signal>, DetectorError> {
        let k = require(inputs, self.name(), "Stoch_K")?;
        let d = require(inputs, self.name(), "Stoch_D")?;
        let mut signals = Vec::new();

        if k < self.settings.oversold {
            signals.push(
                ctx.signal(
                    "STOCHASTIC OVERSOLD",
                    "STOCHASTIC",
                    SignalStrength::Bullish,
                    0.65,
                    format!("Stochastic %K oversold: {:.1}", k),
                )
                .with_value(k)
                .with_indicator("Stochastic")
                .with_implication("Potential bounce from oversold"),
            );
        } else if k > self.settings.overbought {
            signals.push(
                ctx.signal(
                    "STOCHASTIC OVERBOUGHT",
                    "STOCHASTIC",
                    SignalStrength::Bearish,
                    0.65,
                    format!("Stochastic %K overbought: {:.1}", k),
                )
                .with_value(k)
                .with_indicator("Stochastic")
                .with_implication("Potential pullback from overbought"),
            );
        }

        // Crossovers need the previous bar, which is optional input.
        if let (Some(k_prev), Some(d_prev)) = (inputs.previous("Stoch_K"), inputs.previous("Stoch_D")) {
            if k_prev <= d_prev && k > d {
                signals.push(
                    ctx.signal(
                        "STOCHASTIC %K CROSS ABOVE %D",
                        "STOCHASTIC",
                        SignalStrength::Bullish,
                        0.7,
                        "Stochastic %K crossed above %D",
                    )
                    .with_value(k)
                    .with_indicator("Stochastic")
                    .with_detail("d", d),
                );
            } else if k_prev >= d_prev && k < d {
                signals.push(
                    ctx.signal(
                        "STOCHASTIC %K CROSS BELOW %D",
                        "STOCHASTIC",
                        SignalStrength::Bearish,
                        0.7,
                        "Stochastic %K crossed below %D",
                    )
                    .with_value(k)
                    .with_indicator("Stochastic")
                    .with_detail("d", d),
                );
            }
        }

        Ok(signals)
    }
}
