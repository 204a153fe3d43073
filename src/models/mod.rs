//! Shared data models spanning the engine layers.

pub mod analysis;
pub mod indicators;
pub mod signal;

pub use analysis::{
    AggregationResult, AnalysisResult, ContradictionEvent, DetectorFailure, DroppedSignal,
    FailureKind, PersistenceRecord, QualityReport, StageTimings,
};
pub use indicators::{prev_key, sma_key, IndicatorMap, PREV_SUFFIX};
pub use signal::{
    ScoredSignal, Signal, SignalDirection, SignalStrength, SignalVocabulary, DEFAULT_CATEGORIES,
};
