//! Signal quality pipeline: validate, resolve, deduplicate, score

use super::contradiction::{default_exclusive_categories, ContradictionResolver, SidePolicy};
use super::dedup::{Deduplicator, DEFAULT_DEDUP_EPSILON};
use super::scoring::{QualityScorer, QualityWeights};
use super::validation::SignalValidator;
use crate::error::ConfigurationError;
use crate::models::{QualityReport, ScoredSignal, Signal, SignalVocabulary};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    pub validate: bool,
    pub resolve_contradictions: bool,
    pub deduplicate: bool,
    pub filter_quality: bool,
    pub min_quality: f64,
    pub dedup_epsilon: f64,
    pub exclusive_categories: BTreeSet<String>,
    pub side_policy: SidePolicy,
    pub weights: QualityWeights,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            validate: true,
            resolve_contradictions: true,
            deduplicate: true,
            filter_quality: true,
            min_quality: 0.3,
            dedup_epsilon: DEFAULT_DEDUP_EPSILON,
            exclusive_categories: default_exclusive_categories(),
            side_policy: SidePolicy::default(),
            weights: QualityWeights::default(),
        }
    }
}

impl QualityConfig {
    pub fn with_min_quality(mut self, min_quality: f64) -> Self {
        self.min_quality = min_quality;
        self
    }

    pub fn with_side_policy(mut self, policy: SidePolicy) -> Self {
        self.side_policy = policy;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if !self.min_quality.is_finite() || self.min_quality < 0.0 {
            return Err(ConfigurationError::invalid(
                "MIN_SIGNAL_QUALITY",
                format!("must be a non-negative number, got {}", self.min_quality),
            ));
        }
        if !self.dedup_epsilon.is_finite() || self.dedup_epsilon < 0.0 {
            return Err(ConfigurationError::invalid(
                "DEDUP_EPSILON",
                format!("must be a non-negative number, got {}", self.dedup_epsilon),
            ));
        }
        self.weights.validate()
    }
}

/// Pipeline output: scored survivors plus an account of every drop.
#[derive(Debug, Clone, PartialEq)]
pub struct CuratedSignals {
    pub signals: Vec<ScoredSignal>,
    pub report: QualityReport,
}

#[derive(Debug, Clone)]
pub struct QualityPipeline {
    config: QualityConfig,
    validator: SignalValidator,
    resolver: ContradictionResolver,
    deduplicator: Deduplicator,
    scorer: QualityScorer,
}

impl QualityPipeline {
    pub fn new(config: QualityConfig, vocabulary: SignalVocabulary) -> Result<Self, ConfigurationError> {
        config.validate()?;
        Ok(Self {
            validator: SignalValidator::new(vocabulary),
            resolver: ContradictionResolver::new(config.exclusive_categories.clone(), config.side_policy),
            deduplicator: Deduplicator::new(config.dedup_epsilon)?,
            scorer: QualityScorer::new(config.weights)?,
            config,
        })
    }

    pub fn config(&self) -> &QualityConfig {
        &self.config
    }

    pub fn validator(&self) -> &SignalValidator {
        &self.validator
    }

    pub fn resolver(&self) -> &ContradictionResolver {
        &self.resolver
    }

    pub fn deduplicator(&self) -> &Deduplicator {
        &self.deduplicator
    }

    pub fn scorer(&self) -> &QualityScorer {
        &self.scorer
    }

    pub fn process(&self, signals: Vec<Signal>) -> CuratedSignals {
        let mut report = QualityReport {
            input_count: signals.len(),
            ..QualityReport::default()
        };
        let mut current = signals;

        if self.config.validate {
            let (valid, dropped) = self.validator.filter(current);
            report.invalid_dropped = dropped;
            current = valid;
        }

        if self.config.resolve_contradictions {
            let (kept, events) = self.resolver.resolve(current);
            report.contradictions = events;
            current = kept;
        }

        if self.config.deduplicate {
            let (kept, removed) = self.deduplicator.deduplicate(current);
            report.duplicates_removed = removed;
            current = kept;
        }

        let before_filter = current.len();
        let min_quality = if self.config.filter_quality {
            self.config.min_quality
        } else {
            0.0
        };
        let scored = self.scorer.filter_by_quality(current, min_quality);
        report.below_quality_dropped = before_filter - scored.len();
        report.output_count = scored.len();

        info!(
            input = report.input_count,
            output = report.output_count,
            invalid = report.invalid_dropped.len(),
            contradictions = report.contradictions_resolved(),
            duplicates = report.duplicates_removed,
            below_quality = report.below_quality_dropped,
            "Quality pipeline complete: {} -> {} signals",
            report.input_count,
            report.output_count
        );

        CuratedSignals {
            signals: scored,
            report,
        }
    }
}
