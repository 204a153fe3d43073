//! Signal curation engine: detectors, aggregation, quality curation and
//! batch orchestration over named indicator snapshots.

pub mod config;
pub mod core;
pub mod detectors;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod services;
pub mod signals;

pub use error::{AnalysisError, Result};
