//! Runs a detector suite against one indicator snapshot

use crate::detectors::{DetectionContext, Detector};
use crate::error::{AggregationError, DetectorError};
use crate::models::{AggregationResult, DetectorFailure, IndicatorMap, Signal};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    /// Run detectors on the rayon pool. Output order is unchanged.
    pub parallel: bool,
}

/// Collects signals from every detector, isolating per-detector failures.
#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    config: AggregatorConfig,
}

impl Aggregator {
    pub fn new(config: AggregatorConfig) -> Self {
        Self { config }
    }

    pub fn parallel() -> Self {
        Self::new(AggregatorConfig { parallel: true })
    }

    /// Run `detectors` in order over `inputs`.
    ///
    /// Signals appear in detector order, then each detector's emission
    /// order. A failing or panicking detector contributes no signals and is
    /// listed in `failed_detectors`.
    pub fn run(
        &self,
        detectors: &[Arc<dyn Detector>],
        inputs: &IndicatorMap,
        ctx: &DetectionContext,
    ) -> Result<AggregationResult, AggregationError> {
        if inputs.is_empty() {
            return Err(AggregationError::EmptyInput {
                symbol: ctx.symbol.clone(),
            });
        }
        if inputs.finite_count() == 0 {
            return Err(AggregationError::NoUsableValues {
                symbol: ctx.symbol.clone(),
                count: inputs.len(),
            });
        }

        let outcomes: Vec<Result<Vec<Signal>, DetectorError>> = if self.config.parallel {
            detectors
                .par_iter()
                .map(|d| run_isolated(d.as_ref(), inputs, ctx))
                .collect()
        } else {
            detectors
                .iter()
                .map(|d| run_isolated(d.as_ref(), inputs, ctx))
                .collect()
        };

        let mut signals = Vec::new();
        let mut failures = Vec::new();
        for (detector, outcome) in detectors.iter().zip(outcomes) {
            match outcome {
                Ok(found) => {
                    debug!(
                        symbol = %ctx.symbol,
                        detector = %detector.name(),
                        count = found.len(),
                        "Detector produced signals"
                    );
                    signals.extend(found);
                }
                Err(err) => {
                    warn!(
                        symbol = %ctx.symbol,
                        detector = %detector.name(),
                        error = %err,
                        "Detector failed, continuing with remaining detectors"
                    );
                    failures.push(DetectorFailure::from(&err));
                }
            }
        }

        let result = AggregationResult::new(signals, failures, detectors.len());
        info!(
            symbol = %ctx.symbol,
            detectors = result.detectors_run,
            failed = result.failed_detectors.len(),
            signals = result.total(),
            bullish = result.bullish_count,
            bearish = result.bearish_count,
            "Aggregation complete"
        );
        Ok(result)
    }
}

fn run_isolated(
    detector: &dyn Detector,
    inputs: &IndicatorMap,
    ctx: &DetectionContext,
) -> Result<Vec<Signal>, DetectorError> {
    match panic::catch_unwind(AssertUnwindSafe(|| detector.execute(inputs, ctx))) {
        Ok(outcome) => outcome,
        Err(payload) => Err(DetectorError::detection(
            detector.name(),
            format!("panicked: {}", panic_message(payload.as_ref())),
        )),
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
