//! Unit tests for the signal model

use signal_curator::models::{Signal, SignalDirection, SignalStrength, SignalVocabulary};

#[test]
fn test_strength_direction() {
    assert!(SignalStrength::Bullish.is_bullish());
    assert!(SignalStrength::StrongBullish.is_bullish());
    assert!(SignalStrength::ExtremeBullish.is_bullish());
    assert!(SignalStrength::Bearish.is_bearish());
    assert!(SignalStrength::ExtremeBearish.is_bearish());
    assert!(SignalStrength::Neutral.is_neutral());

    for strength in [
        SignalStrength::Moderate,
        SignalStrength::Significant,
        SignalStrength::Trending,
        SignalStrength::Weak,
    ] {
        assert_eq!(strength.direction(), SignalDirection::Neutral);
        assert!(!strength.is_neutral(), "{} is not the NEUTRAL tag", strength);
    }
}

#[test]
fn test_strength_magnitude_ordering() {
    use SignalStrength::*;
    let ordered = [ExtremeBullish, StrongBullish, Bullish, Significant, Trending, Moderate, Weak, Neutral];
    for pair in ordered.windows(2) {
        assert!(pair[0].magnitude() > pair[1].magnitude(), "{} vs {}", pair[0], pair[1]);
    }
    assert_eq!(Bearish.magnitude(), Bullish.magnitude());
    assert_eq!(ExtremeBearish.magnitude(), 1.0);
}

#[test]
fn test_strength_rank_covers_all() {
    let mut ranks: Vec<u8> = SignalStrength::ALL.iter().map(|s| s.rank()).collect();
    ranks.sort();
    ranks.dedup();
    assert_eq!(ranks.len(), SignalStrength::ALL.len());
    assert!(SignalStrength::ExtremeBullish.rank() < SignalStrength::ExtremeBearish.rank());
}

#[test]
fn test_strength_serializes_screaming_case() {
    let json = serde_json::to_string(&SignalStrength::StrongBearish).unwrap();
    assert_eq!(json, "\"STRONG_BEARISH\"");
    assert_eq!(SignalStrength::StrongBearish.to_string(), "STRONG_BEARISH");
}

#[test]
fn test_signal_builder() {
    let signal = Signal::new("RSI OVERBOUGHT", "RSI", SignalStrength::Bearish, 0.65, "RSI above 70")
        .with_value(71.9)
        .with_indicator("RSI")
        .with_implication("Watch for pullback")
        .with_timeframe("1d")
        .with_detail("period", 14);

    assert_eq!(signal.name(), "RSI OVERBOUGHT");
    assert_eq!(signal.category(), "RSI");
    assert_eq!(signal.value(), Some(71.9));
    assert_eq!(signal.indicator(), Some("RSI"));
    assert_eq!(signal.timeframe(), "1d");
    assert_eq!(signal.details().len(), 1);
    assert!(signal.is_bearish());
    assert_eq!(signal.to_string(), "RSI OVERBOUGHT (BEARISH) - RSI above 70");
}

#[test]
fn test_signal_defaults() {
    let signal = Signal::new("X", "RSI", SignalStrength::Neutral, 0.5, "desc");
    assert_eq!(signal.timeframe(), "unknown");
    assert!(signal.value().is_none());
    assert!(signal.trading_implication().is_none());
    assert!(signal.details().is_empty());
}

#[test]
fn test_signal_json_roundtrip_skips_empty_fields() {
    let signal = Signal::new("X", "RSI", SignalStrength::Neutral, 0.5, "desc");
    let json = serde_json::to_value(&signal).unwrap();
    assert!(json.get("value").is_none());
    assert!(json.get("details").is_none());
    let back: Signal = serde_json::from_value(json).unwrap();
    assert_eq!(back, signal);
}

#[test]
fn test_vocabulary_default_and_extension() {
    let vocab = SignalVocabulary::default();
    assert!(vocab.contains("MA_CROSS"));
    assert!(vocab.contains("VWAP"));
    assert!(!vocab.contains("ORDER_FLOW"));

    let vocab = vocab.with_category("ORDER_FLOW");
    assert!(vocab.contains("ORDER_FLOW"));
    assert_eq!(vocab.categories().count(), 13);
}
