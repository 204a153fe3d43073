//! Single-symbol analysis: fetch, detect, curate, package

use crate::config::AnalyzerConfig;
use crate::core::cache::{AnalysisCache, CacheKey};
use crate::detectors::{DetectionContext, DetectorRegistry, Suite, SuiteSpec};
use crate::error::{AnalysisError, ConfigurationError, SourceError};
use crate::metrics::Metrics;
use crate::models::{AggregationResult, AnalysisResult, IndicatorMap, Signal, StageTimings};
use crate::services::IndicatorSource;
use crate::signals::aggregation::panic_message;
use crate::signals::{Aggregator, QualityPipeline};
use backon::{ExponentialBuilder, Retryable};
use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Runs the full curation flow for one symbol at a time.
///
/// Built once and shared by `Arc` across batch tasks.
pub struct Orchestrator {
    config: AnalyzerConfig,
    registry: Arc<DetectorRegistry>,
    source: Arc<dyn IndicatorSource>,
    curator: Arc<Curator>,
    cache: Option<Arc<AnalysisCache>>,
    metrics: Option<Arc<Metrics>>,
}

impl Orchestrator {
    pub fn new(
        config: AnalyzerConfig,
        registry: Arc<DetectorRegistry>,
        source: Arc<dyn IndicatorSource>,
    ) -> Result<Self, ConfigurationError> {
        config.validate()?;
        let pipeline = QualityPipeline::new(config.quality.clone(), registry.vocabulary().clone())?;
        let cache = config
            .cache
            .enabled
            .then(|| Arc::new(AnalysisCache::from_config(&config.cache)));

        Ok(Self {
            curator: Arc::new(Curator {
                aggregator: Aggregator::new(config.aggregator.clone()),
                pipeline,
            }),
            cache,
            metrics: None,
            config,
            registry,
            source,
        })
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn with_cache(mut self, cache: Arc<AnalysisCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn without_cache(mut self) -> Self {
        self.cache = None;
        self
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<DetectorRegistry> {
        &self.registry
    }

    pub fn cache(&self) -> Option<&Arc<AnalysisCache>> {
        self.cache.as_ref()
    }

    pub fn default_suite(&self) -> SuiteSpec {
        SuiteSpec::Preset(self.config.default_suite.clone())
    }

    /// Analyze an indicator snapshot already in hand. No fetch, no cache.
    pub fn analyze_inputs(
        &self,
        symbol: &str,
        timeframe: &str,
        inputs: &IndicatorMap,
        suite: &SuiteSpec,
    ) -> Result<AnalysisResult, AnalysisError> {
        let started = Instant::now();
        let suite = self.registry.build_suite(suite)?;
        let outcome = self
            .curator
            .curate(symbol, timeframe, &suite, inputs, Duration::ZERO, started);
        if let Ok(result) = &outcome {
            self.record_curation(result);
        }
        self.record_outcome(&outcome);
        outcome
    }

    /// Fetch indicators for `symbol` and analyze them, consulting the cache.
    pub async fn analyze(
        &self,
        symbol: &str,
        timeframe: &str,
        suite: &SuiteSpec,
    ) -> Result<AnalysisResult, AnalysisError> {
        let _active = ActiveAnalysis::start(self.metrics.as_deref());
        let outcome = self.analyze_uncounted(symbol, timeframe, suite).await;
        self.record_outcome(&outcome);
        outcome
    }

    /// As [`Orchestrator::analyze`], abandoning the work once `cancel` flips to `true`.
    pub async fn analyze_with_cancel(
        &self,
        symbol: &str,
        timeframe: &str,
        suite: &SuiteSpec,
        cancel: watch::Receiver<bool>,
    ) -> Result<AnalysisResult, AnalysisError> {
        tokio::select! {
            outcome = self.analyze(symbol, timeframe, suite) => outcome,
            _ = cancelled(cancel) => {
                info!(symbol = %symbol, "Analysis cancelled");
                Err(AnalysisError::Cancelled(symbol.to_string()))
            }
        }
    }

    async fn analyze_uncounted(
        &self,
        symbol: &str,
        timeframe: &str,
        suite: &SuiteSpec,
    ) -> Result<AnalysisResult, AnalysisError> {
        let started = Instant::now();
        let key = CacheKey::new(symbol, timeframe, &suite.name());

        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.get(&key).await {
                if let Some(m) = &self.metrics {
                    m.cache_hits_total.inc();
                }
                debug!(symbol = %symbol, timeframe = %timeframe, "Serving analysis from cache");
                return Ok(hit.cached_for(symbol));
            }
            if let Some(m) = &self.metrics {
                m.cache_misses_total.inc();
            }
        }

        let suite = self.registry.build_suite(suite)?;

        let fetch_started = Instant::now();
        let inputs = self.fetch(symbol, timeframe).await?;
        let fetch = fetch_started.elapsed();

        let result = self
            .curate_blocking(symbol, timeframe, suite, inputs, fetch, started)
            .await?;
        self.record_curation(&result);

        if let Some(cache) = &self.cache {
            cache.insert(key, result.clone()).await;
        }
        Ok(result)
    }

    async fn fetch(&self, symbol: &str, timeframe: &str) -> Result<IndicatorMap, AnalysisError> {
        let fetch = &self.config.fetch;
        let source = &self.source;
        let backoff = ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(fetch.retry_delay_ms))
            .with_max_times(fetch.retries);

        let attempt = (|| async move { source.fetch_indicators(symbol, timeframe).await })
            .retry(backoff)
            .when(|err: &SourceError| err.is_retryable())
            .notify(|err: &SourceError, delay: Duration| {
                warn!(symbol = %symbol, error = %err, delay_ms = delay.as_millis() as u64, "Retrying indicator fetch");
            });

        match tokio::time::timeout(fetch.timeout(), attempt).await {
            Ok(outcome) => outcome.map_err(AnalysisError::from),
            Err(_) => {
                warn!(symbol = %symbol, timeout_ms = fetch.timeout_ms, "Indicator fetch timed out");
                Err(AnalysisError::Timeout {
                    symbol: symbol.to_string(),
                    timeout_ms: fetch.timeout_ms,
                })
            }
        }
    }

    /// Runs detection and scoring on the blocking pool.
    async fn curate_blocking(
        &self,
        symbol: &str,
        timeframe: &str,
        suite: Suite,
        inputs: IndicatorMap,
        fetch: Duration,
        started: Instant,
    ) -> Result<AnalysisResult, AnalysisError> {
        let curator = self.curator.clone();
        let owned_symbol = symbol.to_string();
        let owned_timeframe = timeframe.to_string();

        tokio::task::spawn_blocking(move || {
            curator.curate(&owned_symbol, &owned_timeframe, &suite, &inputs, fetch, started)
        })
        .await
        .map_err(|join_err| {
            let reason = if join_err.is_panic() {
                panic_message(join_err.into_panic().as_ref())
            } else {
                "curation task aborted".to_string()
            };
            AnalysisError::TaskFailed {
                symbol: symbol.to_string(),
                reason,
            }
        })?
    }

    fn record_curation(&self, result: &AnalysisResult) {
        let Some(m) = &self.metrics else {
            return;
        };
        let report = &result.quality;
        m.detector_failures_total
            .inc_by(result.aggregation.failed_detectors.len() as u64);
        m.record_dropped("invalid", report.invalid_dropped.len());
        m.record_dropped("contradiction", report.contradiction_dropped());
        m.record_dropped("duplicate", report.duplicates_removed);
        m.record_dropped("below_quality", report.below_quality_dropped);
    }

    fn record_outcome(&self, outcome: &Result<AnalysisResult, AnalysisError>) {
        let Some(m) = &self.metrics else {
            return;
        };
        match outcome {
            Ok(result) => {
                m.analyses_total.inc();
                if !result.from_cache {
                    m.analysis_duration_seconds
                        .observe(result.timings.total.as_secs_f64());
                }
            }
            Err(err) => {
                m.analysis_failures_total.inc();
                debug!(error = %err, "Recorded analysis failure");
            }
        }
    }
}

/// The synchronous half of an analysis: detectors, then the quality pipeline.
struct Curator {
    aggregator: Aggregator,
    pipeline: QualityPipeline,
}

impl Curator {
    fn curate(
        &self,
        symbol: &str,
        timeframe: &str,
        suite: &Suite,
        inputs: &IndicatorMap,
        fetch: Duration,
        started: Instant,
    ) -> Result<AnalysisResult, AnalysisError> {
        let ctx = DetectionContext::new(symbol, timeframe);

        let detect_started = Instant::now();
        let aggregation = self.aggregator.run(&suite.detectors, inputs, &ctx)?;
        let detect = detect_started.elapsed();

        let AggregationResult {
            signals,
            failed_detectors,
            detectors_run,
            ..
        } = aggregation;

        let quality_started = Instant::now();
        let curated = self.pipeline.process(signals);
        let quality = quality_started.elapsed();

        let final_signals: Vec<Signal> = curated.signals.iter().map(|s| s.signal.clone()).collect();
        let summary = AggregationResult::new(final_signals, failed_detectors, detectors_run)
            .with_duplicates_removed(curated.report.duplicates_removed);

        let result = AnalysisResult {
            analysis_id: Uuid::new_v4(),
            symbol: symbol.to_string(),
            timeframe: timeframe.to_string(),
            suite: suite.name.clone(),
            signals: curated.signals,
            aggregation: summary,
            quality: curated.report,
            timings: StageTimings {
                fetch,
                detect,
                quality,
                total: started.elapsed(),
            },
            from_cache: false,
            created_at: Utc::now(),
        };

        info!(
            symbol = %symbol,
            timeframe = %timeframe,
            suite = %result.suite,
            signals = result.signal_count(),
            dropped = result.signals_dropped(),
            failed_detectors = result.detector_failure_count(),
            elapsed_ms = result.timings.total.as_millis() as u64,
            "Analysis complete for {}",
            symbol
        );
        Ok(result)
    }
}

/// Holds the in-flight gauge up until dropped, including on cancellation.
struct ActiveAnalysis<'a>(Option<&'a Metrics>);

impl<'a> ActiveAnalysis<'a> {
    fn start(metrics: Option<&'a Metrics>) -> Self {
        if let Some(m) = metrics {
            m.analyses_active.inc();
        }
        Self(metrics)
    }
}

impl Drop for ActiveAnalysis<'_> {
    fn drop(&mut self) {
        if let Some(m) = self.0 {
            m.analyses_active.dec();
        }
    }
}

/// Resolves once the flag is `true`; never resolves if the sender is gone.
pub(crate) async fn cancelled(mut cancel: watch::Receiver<bool>) {
    loop {
        if *cancel.borrow_and_update() {
            return;
        }
        if cancel.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
