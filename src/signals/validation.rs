//! Structural checks on produced signals

use crate::error::ValidationError;
use crate::models::{DroppedSignal, Signal, SignalVocabulary};
use tracing::warn;

#[derive(Debug, Clone, Default)]
pub struct SignalValidator {
    vocabulary: SignalVocabulary,
}

impl SignalValidator {
    pub fn new(vocabulary: SignalVocabulary) -> Self {
        Self { vocabulary }
    }

    pub fn validate(&self, signal: &Signal) -> Result<(), ValidationError> {
        if signal.name().trim().is_empty() {
            return Err(ValidationError::MissingField("name"));
        }
        if signal.description().trim().is_empty() {
            return Err(ValidationError::MissingField("description"));
        }
        if signal.category().trim().is_empty() {
            return Err(ValidationError::MissingField("category"));
        }
        if !self.vocabulary.contains(signal.category()) {
            return Err(ValidationError::UnknownCategory(signal.category().to_string()));
        }
        let confidence = signal.confidence();
        if !confidence.is_finite() || !(0.0..=1.0).contains(&confidence) {
            return Err(ValidationError::ConfidenceOutOfRange(confidence));
        }
        if let Some(value) = signal.value() {
            if !value.is_finite() {
                return Err(ValidationError::NonFiniteValue(value));
            }
        }
        Ok(())
    }

    /// Split `signals` into valid ones (order kept) and drop records.
    pub fn filter(&self, signals: Vec<Signal>) -> (Vec<Signal>, Vec<DroppedSignal>) {
        let mut valid = Vec::with_capacity(signals.len());
        let mut dropped = Vec::new();
        for signal in signals {
            match self.validate(&signal) {
                Ok(()) => valid.push(signal),
                Err(err) => {
                    warn!(signal = %signal.name(), category = %signal.category(), reason = %err, "Dropping invalid signal");
                    dropped.push(DroppedSignal {
                        name: signal.name().to_string(),
                        category: signal.category().to_string(),
                        reason: err.to_string(),
                    });
                }
            }
        }
        (valid, dropped)
    }
}
