//! Unit tests for the quality pipeline

use signal_curator::models::{Signal, SignalStrength, SignalVocabulary};
use signal_curator::signals::{QualityConfig, QualityPipeline, SidePolicy};

fn signal(name: &str, category: &str, strength: SignalStrength, confidence: f64) -> Signal {
    Signal::new(name, category, strength, confidence, "pipeline test")
}

fn pipeline(config: QualityConfig) -> QualityPipeline {
    QualityPipeline::new(config, SignalVocabulary::default()).unwrap()
}

#[test]
fn test_every_stage_is_accounted_for() {
    let signals = vec![
        signal("BAD", "RSI", SignalStrength::Bullish, 1.4),
        signal("MA BULL", "MA_CROSS", SignalStrength::Bullish, 0.8),
        signal("MA BEAR", "MA_CROSS", SignalStrength::Bearish, 0.3),
        signal("RSI OVERSOLD", "RSI", SignalStrength::Bullish, 0.65),
        signal("RSI OVERSOLD", "RSI", SignalStrength::Bullish, 0.652),
        signal("FAINT", "ADX", SignalStrength::Weak, 0.05),
    ];

    let curated = pipeline(QualityConfig::default()).process(signals);
    let report = &curated.report;

    assert_eq!(report.input_count, 6);
    assert_eq!(report.invalid_dropped.len(), 1);
    assert_eq!(report.contradictions_resolved(), 1);
    assert_eq!(report.contradiction_dropped(), 1);
    assert_eq!(report.duplicates_removed, 1);
    assert_eq!(report.below_quality_dropped, 1);
    assert_eq!(report.output_count, 2);
    assert_eq!(report.signals_dropped(), 4);

    let names: Vec<&str> = curated.signals.iter().map(|s| s.signal.name()).collect();
    assert_eq!(names, vec!["MA BULL", "RSI OVERSOLD"]);
}

#[test]
fn test_quality_filter_disabled_keeps_low_scores() {
    let config = QualityConfig {
        filter_quality: false,
        ..QualityConfig::default()
    };
    let curated = pipeline(config).process(vec![signal("FAINT", "ADX", SignalStrength::Weak, 0.05)]);
    assert_eq!(curated.signals.len(), 1);
    assert!(curated.signals[0].quality > 0.0);
    assert_eq!(curated.report.below_quality_dropped, 0);
}

#[test]
fn test_high_threshold_drops_everything() {
    let curated = pipeline(QualityConfig::default().with_min_quality(1.1))
        .process(vec![signal("A", "RSI", SignalStrength::ExtremeBullish, 1.0)]);
    assert!(curated.signals.is_empty());
    assert_eq!(curated.report.below_quality_dropped, 1);
}

#[test]
fn test_sum_policy_is_wired_through() {
    let signals = vec![
        signal("BULL 1", "MACD", SignalStrength::Bullish, 0.5),
        signal("BULL 2", "MACD", SignalStrength::Bullish, 0.45),
        signal("BEAR", "MACD", SignalStrength::Bearish, 0.7),
    ];
    let curated = pipeline(QualityConfig::default().with_side_policy(SidePolicy::SumConfidence))
        .process(signals);
    assert!(curated.signals.iter().all(|s| s.signal.is_bullish()));
}

#[test]
fn test_invalid_config_rejected() {
    let result = QualityPipeline::new(
        QualityConfig::default().with_min_quality(-1.0),
        SignalVocabulary::default(),
    );
    assert!(result.is_err());
}

#[test]
fn test_empty_input() {
    let curated = pipeline(QualityConfig::default()).process(Vec::new());
    assert!(curated.signals.is_empty());
    assert_eq!(curated.report.signals_dropped(), 0);
}
