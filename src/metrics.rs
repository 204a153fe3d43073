//! Prometheus metrics for analysis runs

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

/// Counters and timers recorded by the orchestrator.
pub struct Metrics {
    registry: Registry,
    pub analyses_total: IntCounter,
    pub analysis_failures_total: IntCounter,
    pub detector_failures_total: IntCounter,
    pub signals_dropped_total: IntCounterVec,
    pub cache_hits_total: IntCounter,
    pub cache_misses_total: IntCounter,
    pub analysis_duration_seconds: Histogram,
    pub analyses_active: IntGauge,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let analyses_total = IntCounter::new("analyses_total", "Completed symbol analyses")?;
        let analysis_failures_total =
            IntCounter::new("analysis_failures_total", "Symbol analyses that returned an error")?;
        let detector_failures_total = IntCounter::new(
            "detector_failures_total",
            "Detector invocations that failed and were skipped",
        )?;
        let signals_dropped_total = IntCounterVec::new(
            Opts::new("signals_dropped_total", "Signals removed during curation"),
            &["reason"],
        )?;
        let cache_hits_total = IntCounter::new("cache_hits_total", "Analysis cache hits")?;
        let cache_misses_total = IntCounter::new("cache_misses_total", "Analysis cache misses")?;
        let analysis_duration_seconds = Histogram::with_opts(
            HistogramOpts::new("analysis_duration_seconds", "End-to-end analysis latency")
                .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        )?;
        let analyses_active = IntGauge::new("analyses_active", "Analyses currently running")?;

        registry.register(Box::new(analyses_total.clone()))?;
        registry.register(Box::new(analysis_failures_total.clone()))?;
        registry.register(Box::new(detector_failures_total.clone()))?;
        registry.register(Box::new(signals_dropped_total.clone()))?;
        registry.register(Box::new(cache_hits_total.clone()))?;
        registry.register(Box::new(cache_misses_total.clone()))?;
        registry.register(Box::new(analysis_duration_seconds.clone()))?;
        registry.register(Box::new(analyses_active.clone()))?;

        Ok(Self {
            registry,
            analyses_total,
            analysis_failures_total,
            detector_failures_total,
            signals_dropped_total,
            cache_hits_total,
            cache_misses_total,
            analysis_duration_seconds,
            analyses_active,
        })
    }

    pub fn record_dropped(&self, reason: &str, count: usize) {
        if count > 0 {
            self.signals_dropped_total
                .with_label_values(&[reason])
                .inc_by(count as u64);
        }
    }

    /// Render all metrics in the Prometheus text exposition format.
    pub fn gather(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
