//! Error taxonomy for detection, curation and orchestration

use thiserror::Error;

/// Invalid configuration detected while building detectors, suites or pipelines.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("invalid value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("unknown detector kind: {0}")]
    UnknownDetector(String),

    #[error("unknown detector suite preset: {0}")]
    UnknownPreset(String),

    #[error("detector suite '{0}' contains no detectors")]
    EmptySuite(String),

    #[error("failed to parse settings for '{kind}': {reason}")]
    InvalidSettings { kind: String, reason: String },

    #[error("weights must sum to 1.0, got {0}")]
    WeightSum(f64),
}

impl ConfigurationError {
    pub fn invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

/// Failure scoped to a single detector invocation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DetectorError {
    #[error("detector '{detector}' is missing required inputs: {}", missing.join(", "))]
    MissingInput {
        detector: String,
        missing: Vec<String>,
    },

    #[error("detector '{detector}' failed: {cause}")]
    Detection { detector: String, cause: String },
}

impl DetectorError {
    pub fn detection(detector: impl Into<String>, cause: impl Into<String>) -> Self {
        Self::Detection {
            detector: detector.into(),
            cause: cause.into(),
        }
    }

    pub fn detector(&self) -> &str {
        match self {
            Self::MissingInput { detector, .. } | Self::Detection { detector, .. } => detector,
        }
    }
}

/// Structural problem with a produced signal. The signal is dropped, never the batch.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("signal field '{0}' is required")]
    MissingField(&'static str),

    #[error("confidence must be within 0.0-1.0, got {0}")]
    ConfidenceOutOfRange(f64),

    #[error("signal value must be finite, got {0}")]
    NonFiniteValue(f64),

    #[error("unknown signal category: {0}")]
    UnknownCategory(String),
}

/// Whole-batch failure for one symbol's aggregation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AggregationError {
    #[error("indicator mapping for {symbol} is empty")]
    EmptyInput { symbol: String },

    #[error("indicator mapping for {symbol} has no finite values ({count} keys)")]
    NoUsableValues { symbol: String, count: usize },
}

/// Failure reported by an indicator source.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    #[error("no market data for {symbol} [{timeframe}]")]
    NotFound { symbol: String, timeframe: String },

    #[error("market data unavailable for {symbol}: {reason}")]
    Unavailable { symbol: String, reason: String },
}

impl SourceError {
    /// Transient failures are retried by the orchestrator.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

/// Per-symbol analysis failure. Never aborts other symbols in a batch.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Aggregation(#[from] AggregationError),

    #[error("fetching indicators for {symbol} timed out after {timeout_ms}ms")]
    Timeout { symbol: String, timeout_ms: u64 },

    #[error("analysis for {0} was cancelled")]
    Cancelled(String),

    #[error("analysis task for {symbol} failed: {reason}")]
    TaskFailed { symbol: String, reason: String },
}

pub type Result<T, E = AnalysisError> = std::result::Result<T, E>;
