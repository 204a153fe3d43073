//! Shared fixtures for integration tests

use serde_json::json;
use signal_curator::config::{AnalyzerConfig, FetchConfig};
use signal_curator::core::Orchestrator;
use signal_curator::detectors::{DetectorRegistry, DetectorSpec, SuiteSpec};
use signal_curator::metrics::Metrics;
use signal_curator::models::IndicatorMap;
use signal_curator::services::StaticIndicatorSource;
use std::sync::Arc;

/// Test harness around an orchestrator backed by an in-memory source.
#[allow(dead_code)]
pub struct TestAnalyzer {
    pub orchestrator: Arc<Orchestrator>,
    pub source: Arc<StaticIndicatorSource>,
    pub metrics: Arc<Metrics>,
}

impl TestAnalyzer {
    pub fn new(source: StaticIndicatorSource) -> Self {
        Self::with_config(source, test_config())
    }

    pub fn with_config(source: StaticIndicatorSource, config: AnalyzerConfig) -> Self {
        let source = Arc::new(source);
        let metrics = Arc::new(Metrics::new().expect("metrics registry"));
        let registry = Arc::new(DetectorRegistry::with_builtins().expect("builtin registry"));
        let orchestrator = Orchestrator::new(config, registry, source.clone())
            .expect("valid config")
            .with_metrics(metrics.clone());
        Self {
            orchestrator: Arc::new(orchestrator),
            source,
            metrics,
        }
    }
}

/// Defaults with fast retries so failure paths finish quickly.
pub fn test_config() -> AnalyzerConfig {
    AnalyzerConfig::default().with_fetch(FetchConfig {
        timeout_ms: 2_000,
        retries: 2,
        retry_delay_ms: 5,
    })
}

#[allow(dead_code)]
pub fn rsi_suite() -> SuiteSpec {
    SuiteSpec::Explicit(vec![DetectorSpec::new("rsi")])
}

/// Two crossover detectors sharing MA_CROSS that disagree on the latest bar.
#[allow(dead_code)]
pub fn crossing_suite() -> SuiteSpec {
    SuiteSpec::Explicit(vec![
        DetectorSpec::new("ma_crossover").with_params(json!({"fast": 10, "slow": 20})),
        DetectorSpec::new("ma_crossover").with_params(json!({"fast": 20, "slow": 50})),
    ])
}

#[allow(dead_code)]
pub fn crossing_inputs() -> IndicatorMap {
    IndicatorMap::new()
        .with("SMA_10", 105.0)
        .with("SMA_10_prev", 99.0)
        .with("SMA_20", 100.0)
        .with("SMA_20_prev", 100.0)
        .with("SMA_50", 101.0)
        .with("SMA_50_prev", 100.0)
}

/// A snapshot that fires several detector families at once.
#[allow(dead_code)]
pub fn busy_snapshot() -> IndicatorMap {
    IndicatorMap::new()
        .with("Close", 162.0)
        .with("Close_prev", 158.0)
        .with("RSI", 71.9)
        .with("MACD", 0.5)
        .with("MACD_Signal", 0.3)
        .with("MACD_prev", -0.1)
        .with("MACD_Signal_prev", 0.0)
        .with("Stoch_K", 85.0)
        .with("Stoch_D", 80.0)
        .with("ADX", 45.0)
        .with("PLUS_DI", 30.0)
        .with("MINUS_DI", 10.0)
        .with("Volume", 300.0)
        .with("Volume_MA", 100.0)
        .with("SWING_HIGH", 200.0)
        .with("SWING_LOW", 100.0)
}
