//! Signal Curator batch analyzer
//!
//! Loads indicator snapshots from a JSON file and curates signals for every
//! symbol concurrently. Ctrl-C cancels symbols that have not finished.
//!
//! Usage: batch-analyzer <snapshots.json> [SYMBOL ...]

use dotenvy::dotenv;
use signal_curator::config::{get_environment, AnalyzerConfig};
use signal_curator::core::{BatchRunner, Orchestrator};
use signal_curator::detectors::{DetectorRegistry, SuiteSpec};
use signal_curator::logging;
use signal_curator::metrics::Metrics;
use signal_curator::services::StaticIndicatorSource;
use std::env;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    logging::init_logging();

    let config = AnalyzerConfig::from_env()?;
    info!(environment = %get_environment(), workers = config.worker_concurrency, "Starting batch analyzer");

    let mut args = env::args().skip(1);
    let path = args
        .next()
        .or_else(|| env::var("SNAPSHOT_PATH").ok())
        .ok_or("usage: batch-analyzer <snapshots.json> [SYMBOL ...]")?;
    let raw = std::fs::read_to_string(&path)?;
    let source = Arc::new(StaticIndicatorSource::from_json_str(&raw)?);

    let mut symbols: Vec<String> = args.collect();
    if symbols.is_empty() {
        symbols = source.symbols();
    }
    info!(path = %path, symbols = symbols.len(), "Loaded indicator snapshots");

    let registry = Arc::new(DetectorRegistry::with_builtins()?);
    let metrics = Arc::new(Metrics::new()?);
    let timeframe = config.default_timeframe.clone();
    let suite = SuiteSpec::Preset(config.default_suite.clone());

    let orchestrator = Arc::new(
        Orchestrator::new(config, registry, source)?.with_metrics(metrics.clone()),
    );
    let runner = BatchRunner::new(orchestrator);

    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling pending analyses");
            let _ = cancel_tx.send(true);
        }
    });

    let batch = runner
        .run_with_cancel(&symbols, &timeframe, &suite, cancel_rx)
        .await;

    for (symbol, outcome) in &batch.results {
        match outcome {
            Ok(result) => println!("{}", serde_json::to_string_pretty(result)?),
            Err(err) => error!(symbol = %symbol, error = %err, "Analysis failed"),
        }
    }

    info!(
        succeeded = batch.success_count(),
        failed = batch.failure_count(),
        elapsed_ms = batch.elapsed.as_millis() as u64,
        "Batch finished"
    );
    if env::var("PRINT_METRICS").is_ok() {
        println!("{}", metrics.gather()?);
    }
    Ok(())
}
