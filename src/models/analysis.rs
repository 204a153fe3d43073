//! Aggregation and analysis result types

use crate::error::DetectorError;
use crate::models::signal::{ScoredSignal, Signal, SignalDirection, SignalStrength};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    MissingInput,
    Detection,
}

/// A detector that was skipped or failed during aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorFailure {
    pub detector: String,
    pub kind: FailureKind,
    pub cause: String,
}

impl From<&DetectorError> for DetectorFailure {
    fn from(err: &DetectorError) -> Self {
        let kind = match err {
            DetectorError::MissingInput { .. } => FailureKind::MissingInput,
            DetectorError::Detection { .. } => FailureKind::Detection,
        };
        Self {
            detector: err.detector().to_string(),
            kind,
            cause: err.to_string(),
        }
    }
}

/// Signals collected from a detector suite with summary counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationResult {
    pub signals: Vec<Signal>,
    pub bullish_count: usize,
    pub bearish_count: usize,
    pub neutral_count: usize,
    pub by_category: BTreeMap<String, usize>,
    pub by_strength: BTreeMap<SignalStrength, usize>,
    pub duplicates_removed: usize,
    pub failed_detectors: Vec<DetectorFailure>,
    pub detectors_run: usize,
}

impl AggregationResult {
    pub fn new(signals: Vec<Signal>, failed_detectors: Vec<DetectorFailure>, detectors_run: usize) -> Self {
        let mut by_category = BTreeMap::new();
        let mut by_strength = BTreeMap::new();
        let (mut bullish_count, mut bearish_count, mut neutral_count) = (0, 0, 0);

        for signal in &signals {
            match signal.direction() {
                SignalDirection::Bullish => bullish_count += 1,
                SignalDirection::Bearish => bearish_count += 1,
                SignalDirection::Neutral => neutral_count += 1,
            }
            *by_category.entry(signal.category().to_string()).or_insert(0) += 1;
            *by_strength.entry(signal.strength()).or_insert(0) += 1;
        }

        Self {
            signals,
            bullish_count,
            bearish_count,
            neutral_count,
            by_category,
            by_strength,
            duplicates_removed: 0,
            failed_detectors,
            detectors_run,
        }
    }

    pub fn with_duplicates_removed(mut self, removed: usize) -> Self {
        self.duplicates_removed = removed;
        self
    }

    pub fn total(&self) -> usize {
        self.signals.len()
    }

    pub fn has_failures(&self) -> bool {
        !self.failed_detectors.is_empty()
    }

    pub fn bullish(&self) -> impl Iterator<Item = &Signal> {
        self.signals.iter().filter(|s| s.is_bullish())
    }

    pub fn bearish(&self) -> impl Iterator<Item = &Signal> {
        self.signals.iter().filter(|s| s.is_bearish())
    }

    pub fn in_category<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a Signal> + 'a {
        self.signals.iter().filter(move |s| s.category() == category)
    }
}

/// Signal removed by the validation stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DroppedSignal {
    pub name: String,
    pub category: String,
    pub reason: String,
}

/// One exclusive-category conflict and how it was settled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContradictionEvent {
    pub category: String,
    pub kept_side: SignalDirection,
    pub kept: usize,
    /// Names of the signals on the losing side.
    pub discarded: Vec<String>,
}

/// Accounting for every signal the curation stages removed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub input_count: usize,
    pub invalid_dropped: Vec<DroppedSignal>,
    pub contradictions: Vec<ContradictionEvent>,
    pub duplicates_removed: usize,
    pub below_quality_dropped: usize,
    pub output_count: usize,
}

impl QualityReport {
    pub fn contradictions_resolved(&self) -> usize {
        self.contradictions.len()
    }

    pub fn contradiction_dropped(&self) -> usize {
        self.contradictions.iter().map(|c| c.discarded.len()).sum()
    }

    pub fn signals_dropped(&self) -> usize {
        self.invalid_dropped.len()
            + self.contradiction_dropped()
            + self.duplicates_removed
            + self.below_quality_dropped
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StageTimings {
    pub fetch: Duration,
    pub detect: Duration,
    pub quality: Duration,
    pub total: Duration,
}

/// Key tuple a persistence layer stores each signal under.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PersistenceRecord<'a> {
    pub analysis_id: Uuid,
    pub category: &'a str,
    pub timestamp: DateTime<Utc>,
    pub signal: &'a Signal,
}

/// Final curated output for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub analysis_id: Uuid,
    pub symbol: String,
    pub timeframe: String,
    pub suite: String,
    pub signals: Vec<ScoredSignal>,
    pub aggregation: AggregationResult,
    pub quality: QualityReport,
    pub timings: StageTimings,
    pub from_cache: bool,
    pub created_at: DateTime<Utc>,
}

impl AnalysisResult {
    pub fn detector_failure_count(&self) -> usize {
        self.aggregation.failed_detectors.len()
    }

    pub fn signals_dropped(&self) -> usize {
        self.quality.signals_dropped()
    }

    pub fn signal_count(&self) -> usize {
        self.signals.len()
    }

    /// Highest-quality signals first, ties in original order.
    pub fn top_signals(&self, n: usize) -> Vec<&ScoredSignal> {
        let mut ranked: Vec<&ScoredSignal> = self.signals.iter().collect();
        ranked.sort_by(|a, b| b.quality.total_cmp(&a.quality));
        ranked.truncate(n);
        ranked
    }

    pub fn persistence_records(&self) -> impl Iterator<Item = PersistenceRecord<'_>> {
        self.signals.iter().map(move |scored| PersistenceRecord {
            analysis_id: self.analysis_id,
            category: scored.signal.category(),
            timestamp: scored.signal.timestamp(),
            signal: &scored.signal,
        })
    }

    /// Mark a stored result as served from cache, reported under the
    /// caller's spelling of the symbol.
    pub(crate) fn cached_for(mut self, symbol: &str) -> Self {
        self.from_cache = true;
        self.symbol = symbol.to_string();
        self
    }
}
