//! Unit tests for the volume spike and ADX detectors

use signal_curator::detectors::{
    AdxTrendDetector, DetectionContext, Detector, VolumeSpikeDetector, VolumeSpikeSettings,
};
use signal_curator::models::{IndicatorMap, SignalStrength};

fn ctx() -> DetectionContext {
    DetectionContext::new("BTC", "1h")
}

#[test]
fn test_volume_spike_with_rising_close() {
    let inputs = IndicatorMap::new()
        .with("Volume", 300.0)
        .with("Volume_MA", 100.0)
        .with("Close", 101.0)
        .with("Close_prev", 100.0);

    let signals = VolumeSpikeDetector::default().execute(&inputs, &ctx()).unwrap();
    assert_eq!(signals.len(), 1);
    assert_eq!(signals[0].category(), "VOLUME");
    assert_eq!(signals[0].strength(), SignalStrength::Bullish);
    assert!((signals[0].confidence() - 0.65).abs() < 1e-9);
}

#[test]
fn test_volume_spike_without_direction() {
    let inputs = IndicatorMap::new().with("Volume", 250.0).with("Volume_MA", 100.0);
    let signals = VolumeSpikeDetector::default().execute(&inputs, &ctx()).unwrap();
    assert_eq!(signals[0].strength(), SignalStrength::Significant);
}

#[test]
fn test_volume_confidence_is_capped() {
    let inputs = IndicatorMap::new().with("Volume", 10_000.0).with("Volume_MA", 100.0);
    let signals = VolumeSpikeDetector::default().execute(&inputs, &ctx()).unwrap();
    assert_eq!(signals[0].confidence(), 0.85);
}

#[test]
fn test_volume_below_threshold() {
    let inputs = IndicatorMap::new().with("Volume", 150.0).with("Volume_MA", 100.0);
    assert!(VolumeSpikeDetector::default().execute(&inputs, &ctx()).unwrap().is_empty());
}

#[test]
fn test_volume_threshold_must_exceed_one() {
    let settings = VolumeSpikeSettings {
        threshold: 1.0,
        ..VolumeSpikeSettings::default()
    };
    assert!(VolumeSpikeDetector::new(settings).is_err());
}

#[test]
fn test_adx_strong_trend() {
    let inputs = IndicatorMap::new()
        .with("ADX", 45.0)
        .with("PLUS_DI", 30.0)
        .with("MINUS_DI", 10.0);
    let signals = AdxTrendDetector::default().execute(&inputs, &ctx()).unwrap();
    assert_eq!(signals[0].name(), "ADX STRONG TREND");
    assert_eq!(signals[0].strength(), SignalStrength::StrongBullish);
}

#[test]
fn test_adx_trending_bearish() {
    let inputs = IndicatorMap::new()
        .with("ADX", 30.0)
        .with("PLUS_DI", 10.0)
        .with("MINUS_DI", 25.0);
    let signals = AdxTrendDetector::default().execute(&inputs, &ctx()).unwrap();
    assert_eq!(signals[0].name(), "ADX TRENDING");
    assert_eq!(signals[0].strength(), SignalStrength::Bearish);
}

#[test]
fn test_adx_bands() {
    let weak = IndicatorMap::new()
        .with("ADX", 15.0)
        .with("PLUS_DI", 20.0)
        .with("MINUS_DI", 20.0);
    let signals = AdxTrendDetector::default().execute(&weak, &ctx()).unwrap();
    assert_eq!(signals[0].strength(), SignalStrength::Weak);

    let between = weak.clone().with("ADX", 22.0);
    assert!(AdxTrendDetector::default().execute(&between, &ctx()).unwrap().is_empty());
}
