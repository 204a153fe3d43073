//! Indicator source interface and an in-memory implementation.

use crate::error::SourceError;
use crate::models::IndicatorMap;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

/// Produces the latest indicator snapshot for a symbol and timeframe.
#[async_trait]
pub trait IndicatorSource: Send + Sync {
    async fn fetch_indicators(&self, symbol: &str, timeframe: &str)
        -> Result<IndicatorMap, SourceError>;
}

/// Serves fixed snapshots, with optional per-symbol latency and failures.
#[derive(Default)]
pub struct StaticIndicatorSource {
    snapshots: HashMap<String, IndicatorMap>,
    latency: HashMap<String, Duration>,
    failures: HashMap<String, SourceError>,
    transient: Mutex<HashMap<String, usize>>,
    calls: AtomicUsize,
}

impl StaticIndicatorSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `{"SYMBOL": {"KEY": value, ...}, ...}`.
    pub fn from_json_str(raw: &str) -> Result<Self, serde_json::Error> {
        let parsed: BTreeMap<String, IndicatorMap> = serde_json::from_str(raw)?;
        Ok(parsed
            .into_iter()
            .fold(Self::new(), |source, (symbol, map)| source.with_snapshot(symbol, map)))
    }

    pub fn with_snapshot(mut self, symbol: impl AsRef<str>, inputs: IndicatorMap) -> Self {
        self.snapshots.insert(normalize(symbol.as_ref()), inputs);
        self
    }

    pub fn with_latency(mut self, symbol: impl AsRef<str>, latency: Duration) -> Self {
        self.latency.insert(normalize(symbol.as_ref()), latency);
        self
    }

    pub fn with_failure(mut self, symbol: impl AsRef<str>, error: SourceError) -> Self {
        self.failures.insert(normalize(symbol.as_ref()), error);
        self
    }

    /// Fail the first `attempts` fetches for `symbol` with a retryable error.
    pub fn with_transient_failures(self, symbol: impl AsRef<str>, attempts: usize) -> Self {
        if let Ok(mut transient) = self.transient.lock() {
            transient.insert(normalize(symbol.as_ref()), attempts);
        }
        self
    }

    pub fn symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.snapshots.keys().cloned().collect();
        symbols.sort();
        symbols
    }

    /// Number of fetches served so far, failures included.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn take_transient(&self, key: &str) -> bool {
        match self.transient.lock() {
            Ok(mut transient) => match transient.get_mut(key) {
                Some(remaining) if *remaining > 0 => {
                    *remaining -= 1;
                    true
                }
                _ => false,
            },
            Err(_) => false,
        }
    }
}

#[async_trait]
impl IndicatorSource for StaticIndicatorSource {
    async fn fetch_indicators(
        &self,
        symbol: &str,
        timeframe: &str,
    ) -> Result<IndicatorMap, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let key = normalize(symbol);

        if let Some(latency) = self.latency.get(&key) {
            tokio::time::sleep(*latency).await;
        }
        if let Some(err) = self.failures.get(&key) {
            return Err(err.clone());
        }
        if self.take_transient(&key) {
            debug!(symbol = %symbol, "Injected transient fetch failure");
            return Err(SourceError::Unavailable {
                symbol: symbol.to_string(),
                reason: "temporarily unavailable".to_string(),
            });
        }

        self.snapshots
            .get(&key)
            .cloned()
            .ok_or_else(|| SourceError::NotFound {
                symbol: symbol.to_string(),
                timeframe: timeframe.to_string(),
            })
    }
}

fn normalize(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}
