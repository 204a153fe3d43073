//! Concurrent multi-symbol analysis with per-symbol failure isolation

use crate::core::orchestrator::{cancelled, Orchestrator};
use crate::detectors::SuiteSpec;
use crate::error::AnalysisError;
use crate::models::AnalysisResult;
use crate::signals::aggregation::panic_message;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;
use tracing::{info, warn};

/// Outcome of every symbol in a batch, keyed by symbol.
#[derive(Debug)]
pub struct BatchResult {
    pub results: BTreeMap<String, Result<AnalysisResult, AnalysisError>>,
    pub elapsed: Duration,
}

impl BatchResult {
    pub fn get(&self, symbol: &str) -> Option<&Result<AnalysisResult, AnalysisError>> {
        self.results.get(symbol)
    }

    pub fn succeeded(&self) -> impl Iterator<Item = (&str, &AnalysisResult)> {
        self.results
            .iter()
            .filter_map(|(s, r)| r.as_ref().ok().map(|a| (s.as_str(), a)))
    }

    pub fn failed(&self) -> impl Iterator<Item = (&str, &AnalysisError)> {
        self.results
            .iter()
            .filter_map(|(s, r)| r.as_ref().err().map(|e| (s.as_str(), e)))
    }

    pub fn success_count(&self) -> usize {
        self.succeeded().count()
    }

    pub fn failure_count(&self) -> usize {
        self.failed().count()
    }
}

/// Fans symbols out to tokio tasks, at most `workers` running at once.
pub struct BatchRunner {
    orchestrator: Arc<Orchestrator>,
    workers: usize,
}

impl BatchRunner {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        let workers = orchestrator.config().worker_concurrency;
        Self {
            orchestrator,
            workers,
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub async fn run<S: AsRef<str>>(
        &self,
        symbols: &[S],
        timeframe: &str,
        suite: &SuiteSpec,
    ) -> BatchResult {
        let (_cancel_tx, cancel_rx) = watch::channel(false);
        self.run_with_cancel(symbols, timeframe, suite, cancel_rx).await
    }

    /// Run the batch; flipping `cancel` to `true` stops symbols that have not
    /// finished. Completed results are kept.
    pub async fn run_with_cancel<S: AsRef<str>>(
        &self,
        symbols: &[S],
        timeframe: &str,
        suite: &SuiteSpec,
        cancel: watch::Receiver<bool>,
    ) -> BatchResult {
        let started = Instant::now();
        let semaphore = Arc::new(Semaphore::new(self.workers.max(1)));
        let unique: BTreeSet<String> = symbols.iter().map(|s| s.as_ref().to_string()).collect();

        info!(
            symbols = unique.len(),
            workers = self.workers,
            timeframe = %timeframe,
            suite = %suite.name(),
            "Starting batch analysis"
        );

        let mut tasks = JoinSet::new();
        let mut task_symbols = HashMap::new();
        for symbol in unique {
            let orchestrator = self.orchestrator.clone();
            let semaphore = semaphore.clone();
            let cancel = cancel.clone();
            let suite = suite.clone();
            let timeframe = timeframe.to_string();
            let task_symbol = symbol.clone();

            let handle = tasks.spawn(async move {
                let permit = tokio::select! {
                    permit = semaphore.acquire_owned() => permit,
                    _ = cancelled(cancel.clone()) => {
                        return (task_symbol.clone(), Err(AnalysisError::Cancelled(task_symbol)));
                    }
                };
                let _permit = match permit {
                    Ok(permit) => permit,
                    Err(err) => {
                        let failure = AnalysisError::TaskFailed {
                            symbol: task_symbol.clone(),
                            reason: err.to_string(),
                        };
                        return (task_symbol, Err(failure));
                    }
                };
                if *cancel.borrow() {
                    return (task_symbol.clone(), Err(AnalysisError::Cancelled(task_symbol)));
                }

                let outcome = orchestrator
                    .analyze_with_cancel(&task_symbol, &timeframe, &suite, cancel)
                    .await;
                (task_symbol, outcome)
            });
            task_symbols.insert(handle.id(), symbol);
        }

        let mut results = BTreeMap::new();
        while let Some(joined) = tasks.join_next_with_id().await {
            match joined {
                Ok((_, (symbol, outcome))) => {
                    if let Err(err) = &outcome {
                        warn!(symbol = %symbol, error = %err, "Symbol analysis failed");
                    }
                    results.insert(symbol, outcome);
                }
                Err(join_err) => {
                    let symbol = task_symbols
                        .get(&join_err.id())
                        .cloned()
                        .unwrap_or_else(|| "<unknown>".to_string());
                    let reason = if join_err.is_panic() {
                        panic_message(join_err.into_panic().as_ref())
                    } else {
                        "task aborted".to_string()
                    };
                    warn!(symbol = %symbol, reason = %reason, "Symbol task failed");
                    results.insert(
                        symbol.clone(),
                        Err(AnalysisError::TaskFailed { symbol, reason }),
                    );
                }
            }
        }

        let batch = BatchResult {
            results,
            elapsed: started.elapsed(),
        };
        info!(
            succeeded = batch.success_count(),
            failed = batch.failure_count(),
            elapsed_ms = batch.elapsed.as_millis() as u64,
            "Batch analysis complete"
        );
        batch
    }
}
