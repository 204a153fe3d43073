//! Unit tests for contradiction resolution

use signal_curator::models::{Signal, SignalDirection, SignalStrength};
use signal_curator::signals::contradiction::default_exclusive_categories;
use signal_curator::signals::{ContradictionResolver, SidePolicy};

fn signal(name: &str, category: &str, strength: SignalStrength, confidence: f64) -> Signal {
    Signal::new(name, category, strength, confidence, "contradiction test")
}

#[test]
fn test_stronger_side_survives() {
    let signals = vec![
        signal("MA BULL", "MA_CROSS", SignalStrength::Bullish, 0.8),
        signal("MA BEAR", "MA_CROSS", SignalStrength::Bearish, 0.3),
    ];

    let (kept, events) = ContradictionResolver::default().resolve(signals);
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].name(), "MA BULL");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].category, "MA_CROSS");
    assert_eq!(events[0].kept_side, SignalDirection::Bullish);
    assert_eq!(events[0].discarded, vec!["MA BEAR".to_string()]);
}

#[test]
fn test_bearish_side_can_win() {
    let signals = vec![
        signal("BULL", "MACD", SignalStrength::Bullish, 0.6),
        signal("BEAR", "MACD", SignalStrength::StrongBearish, 0.9),
    ];
    let (kept, events) = ContradictionResolver::default().resolve(signals);
    assert_eq!(kept[0].name(), "BEAR");
    assert_eq!(events[0].kept_side, SignalDirection::Bearish);
}

#[test]
fn test_tie_keeps_first_side() {
    let signals = vec![
        signal("BEAR", "MA_CROSS", SignalStrength::Bearish, 0.5),
        signal("BULL", "MA_CROSS", SignalStrength::Bullish, 0.5),
    ];
    let (kept, _) = ContradictionResolver::default().resolve(signals);
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].name(), "BEAR");
}

#[test]
fn test_policies_can_disagree() {
    let signals = vec![
        signal("BULL 1", "MA_CROSS", SignalStrength::Bullish, 0.5),
        signal("BULL 2", "MA_CROSS", SignalStrength::Bullish, 0.5),
        signal("BEAR", "MA_CROSS", SignalStrength::Bearish, 0.7),
    ];

    let max = ContradictionResolver::new(default_exclusive_categories(), SidePolicy::MaxConfidence);
    let (kept, _) = max.resolve(signals.clone());
    assert_eq!(kept.iter().map(|s| s.name()).collect::<Vec<_>>(), vec!["BEAR"]);

    let sum = ContradictionResolver::new(default_exclusive_categories(), SidePolicy::SumConfidence);
    let (kept, events) = sum.resolve(signals);
    assert_eq!(kept.iter().map(|s| s.name()).collect::<Vec<_>>(), vec!["BULL 1", "BULL 2"]);
    assert_eq!(events[0].kept, 2);
}

#[test]
fn test_non_exclusive_and_neutral_pass_through() {
    let signals = vec![
        signal("RSI BULL", "RSI", SignalStrength::Bullish, 0.9),
        signal("RSI BEAR", "RSI", SignalStrength::Bearish, 0.9),
        signal("MA NEUTRAL", "MA_CROSS", SignalStrength::Neutral, 0.5),
        signal("MA BULL", "MA_CROSS", SignalStrength::Bullish, 0.5),
    ];
    let (kept, events) = ContradictionResolver::default().resolve(signals);
    assert_eq!(kept.len(), 4);
    assert!(events.is_empty());
}

#[test]
fn test_detect_contradictions_lists_pairs() {
    let signals = vec![
        signal("A", "MACD", SignalStrength::Bullish, 0.6),
        signal("B", "MACD", SignalStrength::Bearish, 0.6),
        signal("C", "MACD", SignalStrength::StrongBearish, 0.6),
    ];
    let resolver = ContradictionResolver::default();
    let pairs = resolver.detect_contradictions(&signals);
    assert_eq!(pairs.len(), 2);
    assert!(pairs.iter().all(|p| p.category == "MACD" && p.bullish.name() == "A"));
}

#[test]
fn test_policy_from_str() {
    assert_eq!("max".parse::<SidePolicy>().unwrap(), SidePolicy::MaxConfidence);
    assert_eq!(" SUM ".parse::<SidePolicy>().unwrap(), SidePolicy::SumConfidence);
    assert!("median".parse::<SidePolicy>().is_err());
}

#[test]
fn test_both_policies_keep_clear_winner() {
    for policy in [SidePolicy::MaxConfidence, SidePolicy::SumConfidence] {
        let resolver = ContradictionResolver::new(default_exclusive_categories(), policy);
        let (kept, events) = resolver.resolve(vec![
            signal("BULL", "MA_CROSS", SignalStrength::Bullish, 0.9),
            signal("BEAR", "MA_CROSS", SignalStrength::Bearish, 0.6),
        ]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].name(), "BULL");
        assert_eq!(events.len(), 1);
    }
}
