//! Near-duplicate signal removal

use crate::error::ConfigurationError;
use crate::models::Signal;
use std::collections::HashMap;

pub const DEFAULT_DEDUP_EPSILON: f64 = 0.01;

/// Drops later signals that repeat an earlier `(name, category)` with
/// confidence closer than `epsilon`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Deduplicator {
    epsilon: f64,
}

impl Default for Deduplicator {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_DEDUP_EPSILON,
        }
    }
}

impl Deduplicator {
    pub fn new(epsilon: f64) -> Result<Self, ConfigurationError> {
        if !epsilon.is_finite() || epsilon < 0.0 {
            return Err(ConfigurationError::invalid(
                "dedup_epsilon",
                format!("must be a non-negative number, got {}", epsilon),
            ));
        }
        Ok(Self { epsilon })
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn is_duplicate(&self, a: &Signal, b: &Signal) -> bool {
        a.name() == b.name()
            && a.category() == b.category()
            && (a.confidence() - b.confidence()).abs() < self.epsilon
    }

    /// Survivors in original order and the number removed.
    pub fn deduplicate(&self, signals: Vec<Signal>) -> (Vec<Signal>, usize) {
        let mut seen: HashMap<(String, String), Vec<f64>> = HashMap::new();
        let mut kept = Vec::with_capacity(signals.len());
        let mut removed = 0;

        for signal in signals {
            let key = (signal.name().to_string(), signal.category().to_string());
            let confidences = seen.entry(key).or_default();
            if confidences
                .iter()
                .any(|c| (c - signal.confidence()).abs() < self.epsilon)
            {
                removed += 1;
                continue;
            }
            confidences.push(signal.confidence());
            kept.push(signal);
        }

        (kept, removed)
    }
}
