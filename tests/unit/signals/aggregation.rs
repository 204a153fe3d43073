//! Unit tests for the aggregator

use signal_curator::detectors::{
    DetectionContext, Detector, DetectorMetadata, MacdDetector, RsiDetector,
};
use signal_curator::error::{AggregationError, DetectorError};
use signal_curator::models::{FailureKind, IndicatorMap, Signal, SignalStrength};
use signal_curator::signals::Aggregator;
use std::sync::Arc;

struct PanickingDetector {
    metadata: DetectorMetadata,
}

impl PanickingDetector {
    fn new() -> Self {
        Self {
            metadata: DetectorMetadata::new("Exploding", "RSI", "Always panics"),
        }
    }
}

impl Detector for PanickingDetector {
    fn metadata(&self) -> &DetectorMetadata {
        &self.metadata
    }

    fn detect(&self, _inputs: &IndicatorMap, _ctx: &DetectionContext) -> Result<Vec<Signal>, DetectorError> {
        panic!("division by zero in exploding detector");
    }
}

struct FixedDetector {
    metadata: DetectorMetadata,
    signals: Vec<(&'static str, SignalStrength)>,
}

impl FixedDetector {
    fn new(name: &str, signals: Vec<(&'static str, SignalStrength)>) -> Self {
        Self {
            metadata: DetectorMetadata::new(name, "PRICE_ACTION", "Fixed output"),
            signals,
        }
    }
}

impl Detector for FixedDetector {
    fn metadata(&self) -> &DetectorMetadata {
        &self.metadata
    }

    fn detect(&self, _inputs: &IndicatorMap, ctx: &DetectionContext) -> Result<Vec<Signal>, DetectorError> {
        Ok(self
            .signals
            .iter()
            .map(|(name, strength)| ctx.signal(*name, "PRICE_ACTION", *strength, 0.6, "fixed"))
            .collect())
    }
}

fn ctx() -> DetectionContext {
    DetectionContext::new("BTC", "1d")
}

#[test]
fn test_single_rsi_signal() {
    let detectors: Vec<Arc<dyn Detector>> = vec![Arc::new(RsiDetector::default())];
    let inputs = IndicatorMap::new().with("RSI", 71.9);

    let result = Aggregator::default().run(&detectors, &inputs, &ctx()).unwrap();
    assert_eq!(result.total(), 1);
    assert_eq!(result.bearish_count, 1);
    assert_eq!(result.by_category.get("RSI"), Some(&1));
    assert_eq!(result.detectors_run, 1);
    assert!(!result.has_failures());
}

#[test]
fn test_missing_input_is_isolated() {
    let detectors: Vec<Arc<dyn Detector>> = vec![
        Arc::new(MacdDetector::default()),
        Arc::new(RsiDetector::default()),
    ];
    let inputs = IndicatorMap::new().with("RSI", 25.0);

    let result = Aggregator::default().run(&detectors, &inputs, &ctx()).unwrap();
    assert_eq!(result.total(), 1);
    assert_eq!(result.failed_detectors.len(), 1);
    assert_eq!(result.failed_detectors[0].detector, "MACD");
    assert_eq!(result.failed_detectors[0].kind, FailureKind::MissingInput);
}

#[test]
fn test_panicking_detector_is_isolated() {
    let detectors: Vec<Arc<dyn Detector>> = vec![
        Arc::new(PanickingDetector::new()),
        Arc::new(RsiDetector::default()),
    ];
    let inputs = IndicatorMap::new().with("RSI", 50.0);

    for aggregator in [Aggregator::default(), Aggregator::parallel()] {
        let result = aggregator.run(&detectors, &inputs, &ctx()).unwrap();
        assert_eq!(result.total(), 1);
        assert_eq!(result.failed_detectors.len(), 1);
        let failure = &result.failed_detectors[0];
        assert_eq!(failure.detector, "Exploding");
        assert_eq!(failure.kind, FailureKind::Detection);
        assert!(failure.cause.contains("division by zero"));
    }
}

#[test]
fn test_detector_order_is_preserved() {
    let detectors: Vec<Arc<dyn Detector>> = vec![
        Arc::new(FixedDetector::new(
            "first",
            vec![("A", SignalStrength::Bullish), ("B", SignalStrength::Neutral)],
        )),
        Arc::new(FixedDetector::new("second", vec![("C", SignalStrength::Bearish)])),
        Arc::new(FixedDetector::new("third", vec![("D", SignalStrength::Weak)])),
    ];
    let inputs = IndicatorMap::new().with("Close", 1.0);

    let sequential = Aggregator::default().run(&detectors, &inputs, &ctx()).unwrap();
    let parallel = Aggregator::parallel().run(&detectors, &inputs, &ctx()).unwrap();

    let names = |r: &signal_curator::models::AggregationResult| {
        r.signals.iter().map(|s| s.name().to_string()).collect::<Vec<_>>()
    };
    assert_eq!(names(&sequential), vec!["A", "B", "C", "D"]);
    assert_eq!(names(&sequential), names(&parallel));
    assert_eq!(sequential.neutral_count, 2);
    assert_eq!(sequential.bullish().count(), 1);
    assert_eq!(sequential.in_category("PRICE_ACTION").count(), 4);
}

#[test]
fn test_empty_and_unusable_inputs() {
    let detectors: Vec<Arc<dyn Detector>> = vec![Arc::new(RsiDetector::default())];

    let err = Aggregator::default()
        .run(&detectors, &IndicatorMap::new(), &ctx())
        .unwrap_err();
    assert_eq!(err, AggregationError::EmptyInput { symbol: "BTC".to_string() });

    let nan_only = IndicatorMap::new().with("RSI", f64::NAN).with("MACD", f64::INFINITY);
    let err = Aggregator::default().run(&detectors, &nan_only, &ctx()).unwrap_err();
    assert_eq!(
        err,
        AggregationError::NoUsableValues {
            symbol: "BTC".to_string(),
            count: 2
        }
    );
}
