//! Core application primitives (orchestration, batching, caching)

pub mod batch;
pub mod cache;
pub mod orchestrator;

pub use batch::{BatchResult, BatchRunner};
pub use cache::{AnalysisCache, CacheKey};
pub use orchestrator::Orchestrator;
