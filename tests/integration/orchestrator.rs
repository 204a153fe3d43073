//! Integration tests for single-symbol analysis
//!
//! Covers the fetch, detect and curate flow plus caching, retries and timeouts.

use crate::test_utils::{busy_snapshot, crossing_inputs, crossing_suite, rsi_suite, test_config, TestAnalyzer};
use signal_curator::config::{CacheConfig, FetchConfig};
use signal_curator::detectors::SuiteSpec;
use signal_curator::error::{AggregationError, AnalysisError, ConfigurationError, SourceError};
use signal_curator::models::{IndicatorMap, SignalDirection, SignalStrength};
use signal_curator::services::StaticIndicatorSource;
use std::time::Duration;
use tokio::sync::watch;
use tokio_test::{assert_err, assert_ok};

#[test]
fn overbought_rsi_yields_one_bearish_signal() {
    let analyzer = TestAnalyzer::new(StaticIndicatorSource::new());
    let inputs = IndicatorMap::new().with("RSI", 71.9);

    let result = assert_ok!(analyzer.orchestrator.analyze_inputs("BTC", "1d", &inputs, &rsi_suite()));

    assert_eq!(result.signal_count(), 1);
    let scored = &result.signals[0];
    assert_eq!(scored.signal.name(), "RSI OVERBOUGHT");
    assert_eq!(scored.signal.category(), "RSI");
    assert_eq!(scored.signal.strength(), SignalStrength::Bearish);
    assert_eq!(scored.signal.confidence(), 0.65);
    assert_eq!(scored.signal.value(), Some(71.9));
    assert_eq!(scored.signal.timeframe(), "1d");
    assert!(scored.quality >= 0.3);
    assert_eq!(result.aggregation.bearish_count, 1);
    assert!(!result.from_cache);
}

#[test]
fn contradicting_crossovers_keep_one_side() {
    let analyzer = TestAnalyzer::new(StaticIndicatorSource::new());

    let result = assert_ok!(analyzer.orchestrator.analyze_inputs(
        "ETH",
        "4h",
        &crossing_inputs(),
        &crossing_suite()
    ));

    assert_eq!(result.quality.input_count, 2);
    assert_eq!(result.quality.contradictions.len(), 1);
    let event = &result.quality.contradictions[0];
    assert_eq!(event.category, "MA_CROSS");
    assert_eq!(event.kept_side, SignalDirection::Bullish);
    assert_eq!(event.discarded, vec!["20/50 MA BEAR CROSS".to_string()]);

    assert_eq!(result.signal_count(), 1);
    assert_eq!(result.signals[0].signal.name(), "10/20 MA BULL CROSS");
    assert_eq!(result.aggregation.bearish_count, 0);
}

#[test]
fn missing_inputs_only_skip_their_detectors() {
    let analyzer = TestAnalyzer::new(StaticIndicatorSource::new());
    let inputs = IndicatorMap::new().with("RSI", 25.0);

    let result = assert_ok!(analyzer.orchestrator.analyze_inputs(
        "SOL",
        "1d",
        &inputs,
        &SuiteSpec::preset("comprehensive")
    ));

    assert_eq!(result.aggregation.detectors_run, 9);
    assert_eq!(result.detector_failure_count(), 8);
    assert_eq!(result.signal_count(), 1);
    assert_eq!(result.signals[0].signal.name(), "RSI OVERSOLD");
}

#[test]
fn analysis_is_deterministic() {
    let analyzer = TestAnalyzer::new(StaticIndicatorSource::new());
    let suite = SuiteSpec::preset("comprehensive");

    let first = assert_ok!(analyzer.orchestrator.analyze_inputs("BTC", "1d", &busy_snapshot(), &suite));
    let second = assert_ok!(analyzer.orchestrator.analyze_inputs("BTC", "1d", &busy_snapshot(), &suite));

    let summary = |r: &signal_curator::models::AnalysisResult| {
        r.signals
            .iter()
            .map(|s| (s.signal.name().to_string(), s.quality))
            .collect::<Vec<_>>()
    };
    assert!(first.signal_count() > 3);
    assert_eq!(summary(&first), summary(&second));
    assert_eq!(first.quality, second.quality);
    assert_ne!(first.analysis_id, second.analysis_id);
}

#[test]
fn results_expose_ranked_and_persistable_signals() {
    let analyzer = TestAnalyzer::new(StaticIndicatorSource::new());
    let result = assert_ok!(analyzer.orchestrator.analyze_inputs(
        "BTC",
        "1d",
        &busy_snapshot(),
        &SuiteSpec::preset("comprehensive")
    ));

    let top = result.top_signals(3);
    assert_eq!(top.len(), 3);
    assert!(top.windows(2).all(|w| w[0].quality >= w[1].quality));

    let records: Vec<_> = result.persistence_records().collect();
    assert_eq!(records.len(), result.signal_count());
    assert!(records.iter().all(|r| r.analysis_id == result.analysis_id));

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["symbol"], "BTC");
}

#[test]
fn unusable_snapshot_fails_the_symbol() {
    let analyzer = TestAnalyzer::new(StaticIndicatorSource::new());

    let err = assert_err!(analyzer.orchestrator.analyze_inputs("BTC", "1d", &IndicatorMap::new(), &rsi_suite()));
    assert!(matches!(err, AnalysisError::Aggregation(AggregationError::EmptyInput { .. })));

    let nan = IndicatorMap::new().with("RSI", f64::NAN);
    let err = assert_err!(analyzer.orchestrator.analyze_inputs("BTC", "1d", &nan, &rsi_suite()));
    assert!(matches!(err, AnalysisError::Aggregation(AggregationError::NoUsableValues { .. })));
}

#[tokio::test]
async fn second_analysis_is_served_from_cache() {
    let source = StaticIndicatorSource::new().with_snapshot("BTC", busy_snapshot());
    let analyzer = TestAnalyzer::new(source);
    let suite = SuiteSpec::preset("basic");

    let first = assert_ok!(analyzer.orchestrator.analyze("BTC", "1d", &suite).await);
    let second = assert_ok!(analyzer.orchestrator.analyze("btc", "1d", &suite).await);

    assert!(!first.from_cache);
    assert!(second.from_cache);
    assert_eq!(first.analysis_id, second.analysis_id);
    assert_eq!(analyzer.source.calls(), 1);
    assert_eq!(analyzer.metrics.cache_hits_total.get(), 1);
    assert_eq!(analyzer.metrics.cache_misses_total.get(), 1);
    assert_eq!(analyzer.metrics.analyses_total.get(), 2);

    // Hits keep the caller's symbol and do not replay latency into the histogram.
    assert_eq!(first.symbol, "BTC");
    assert_eq!(second.symbol, "btc");
    assert_eq!(analyzer.metrics.analysis_duration_seconds.get_sample_count(), 1);

    // A different suite is a different cache entry.
    let other = assert_ok!(analyzer.orchestrator.analyze("BTC", "1d", &SuiteSpec::preset("trend")).await);
    assert!(!other.from_cache);
    assert_eq!(analyzer.source.calls(), 2);
}

#[tokio::test]
async fn disabled_cache_always_fetches() {
    let source = StaticIndicatorSource::new().with_snapshot("BTC", busy_snapshot());
    let config = test_config().with_cache(CacheConfig {
        enabled: false,
        ..CacheConfig::default()
    });
    let analyzer = TestAnalyzer::with_config(source, config);
    assert!(analyzer.orchestrator.cache().is_none());

    for _ in 0..2 {
        assert_ok!(analyzer.orchestrator.analyze("BTC", "1d", &rsi_suite()).await);
    }
    assert_eq!(analyzer.source.calls(), 2);
}

#[tokio::test]
async fn transient_fetch_failures_are_retried() {
    let source = StaticIndicatorSource::new()
        .with_snapshot("ETH", busy_snapshot())
        .with_transient_failures("ETH", 2);
    let analyzer = TestAnalyzer::new(source);

    let result = assert_ok!(analyzer.orchestrator.analyze("ETH", "1d", &rsi_suite()).await);
    assert_eq!(result.signal_count(), 1);
    assert_eq!(analyzer.source.calls(), 3);
}

#[tokio::test]
async fn retries_are_bounded() {
    let source = StaticIndicatorSource::new()
        .with_snapshot("ETH", busy_snapshot())
        .with_transient_failures("ETH", 5);
    let config = test_config().with_fetch(FetchConfig {
        timeout_ms: 2_000,
        retries: 1,
        retry_delay_ms: 5,
    });
    let analyzer = TestAnalyzer::with_config(source, config);

    let err = assert_err!(analyzer.orchestrator.analyze("ETH", "1d", &rsi_suite()).await);
    assert!(matches!(err, AnalysisError::Source(SourceError::Unavailable { .. })));
    assert_eq!(analyzer.source.calls(), 2);
    assert_eq!(analyzer.metrics.analysis_failures_total.get(), 1);
}

#[tokio::test]
async fn missing_symbol_is_not_retried() {
    let analyzer = TestAnalyzer::new(StaticIndicatorSource::new());

    let err = assert_err!(analyzer.orchestrator.analyze("DOGE", "1d", &rsi_suite()).await);
    assert!(matches!(err, AnalysisError::Source(SourceError::NotFound { .. })));
    assert_eq!(analyzer.source.calls(), 1);
}

#[tokio::test]
async fn slow_fetch_times_out() {
    let source = StaticIndicatorSource::new()
        .with_snapshot("BTC", busy_snapshot())
        .with_latency("BTC", Duration::from_millis(500));
    let config = test_config().with_fetch(FetchConfig {
        timeout_ms: 50,
        retries: 0,
        retry_delay_ms: 5,
    });
    let analyzer = TestAnalyzer::with_config(source, config);

    let err = assert_err!(analyzer.orchestrator.analyze("BTC", "1d", &rsi_suite()).await);
    assert_eq!(
        err,
        AnalysisError::Timeout {
            symbol: "BTC".to_string(),
            timeout_ms: 50
        }
    );
}

#[tokio::test]
async fn unknown_preset_fails_before_fetching() {
    let source = StaticIndicatorSource::new().with_snapshot("BTC", busy_snapshot());
    let analyzer = TestAnalyzer::new(source);

    let err = assert_err!(analyzer.orchestrator.analyze("BTC", "1d", &SuiteSpec::preset("scalping")).await);
    assert_eq!(
        err,
        AnalysisError::Configuration(ConfigurationError::UnknownPreset("scalping".to_string()))
    );
    assert_eq!(analyzer.source.calls(), 0);
}

#[tokio::test]
async fn cancellation_abandons_pending_analysis() {
    let source = StaticIndicatorSource::new()
        .with_snapshot("BTC", busy_snapshot())
        .with_latency("BTC", Duration::from_secs(5));
    let analyzer = TestAnalyzer::new(source);
    let (cancel_tx, cancel_rx) = watch::channel(false);

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        let _ = cancel_tx.send(true);
    });

    let err = assert_err!(
        analyzer
            .orchestrator
            .analyze_with_cancel("BTC", "1d", &rsi_suite(), cancel_rx)
            .await
    );
    assert_eq!(err, AnalysisError::Cancelled("BTC".to_string()));
    assert_eq!(analyzer.metrics.analyses_active.get(), 0);
}
