//! Signal quality scoring

use crate::error::ConfigurationError;
use crate::models::{ScoredSignal, Signal};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Context items counted toward richness before it saturates.
pub const RICHNESS_CAP: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityWeights {
    pub confidence: f64,
    pub strength: f64,
    pub context: f64,
}

impl Default for QualityWeights {
    fn default() -> Self {
        Self {
            confidence: 0.6,
            strength: 0.25,
            context: 0.15,
        }
    }
}

impl QualityWeights {
    pub fn new(confidence: f64, strength: f64, context: f64) -> Result<Self, ConfigurationError> {
        let weights = Self {
            confidence,
            strength,
            context,
        };
        weights.validate()?;
        Ok(weights)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.confidence < 0.0 || self.strength < 0.0 || self.context < 0.0 {
            return Err(ConfigurationError::invalid(
                "quality.weights",
                "all weights must be non-negative",
            ));
        }
        let total = self.confidence + self.strength + self.context;
        if (total - 1.0).abs() > 0.001 {
            return Err(ConfigurationError::WeightSum(total));
        }
        Ok(())
    }
}

/// Scores a signal in `[0, 1]` from confidence, strength magnitude and how
/// much supporting context it carries.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct QualityScorer {
    weights: QualityWeights,
}

impl QualityScorer {
    pub fn new(weights: QualityWeights) -> Result<Self, ConfigurationError> {
        weights.validate()?;
        Ok(Self { weights })
    }

    pub fn weights(&self) -> QualityWeights {
        self.weights
    }

    pub fn richness(signal: &Signal) -> f64 {
        let items = signal.details().len()
            + usize::from(signal.trading_implication().is_some())
            + usize::from(signal.indicator().is_some());
        items.min(RICHNESS_CAP) as f64 / RICHNESS_CAP as f64
    }

    pub fn score(&self, signal: &Signal) -> f64 {
        let w = &self.weights;
        let raw = w.confidence * signal.confidence()
            + w.strength * signal.strength().magnitude()
            + w.context * Self::richness(signal);
        if raw.is_finite() {
            raw.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    pub fn score_batch(&self, signals: &[Signal]) -> Vec<f64> {
        signals.iter().map(|s| self.score(s)).collect()
    }

    /// Annotate every signal with its score and keep those at or above
    /// `min_quality`. A threshold of 0.0 keeps everything.
    pub fn filter_by_quality(&self, signals: Vec<Signal>, min_quality: f64) -> Vec<ScoredSignal> {
        let before = signals.len();
        let kept: Vec<ScoredSignal> = signals
            .into_iter()
            .map(|signal| {
                let quality = self.score(&signal);
                ScoredSignal { signal, quality }
            })
            .filter(|scored| scored.quality >= min_quality)
            .collect();

        if kept.len() < before {
            info!(
                before,
                after = kept.len(),
                min_quality,
                "Quality filter: {} -> {} signals",
                before,
                kept.len()
            );
        }
        kept
    }
}
