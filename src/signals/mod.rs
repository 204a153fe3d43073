//! Signal aggregation and curation stages.

pub mod aggregation;
pub mod contradiction;
pub mod dedup;
pub mod filter;
pub mod pipeline;
pub mod scoring;
pub mod validation;

pub use aggregation::{Aggregator, AggregatorConfig};
pub use contradiction::{Contradiction, ContradictionResolver, SidePolicy};
pub use dedup::Deduplicator;
pub use filter::SignalFilter;
pub use pipeline::{CuratedSignals, QualityConfig, QualityPipeline};
pub use scoring::{QualityScorer, QualityWeights};
pub use validation::SignalValidator;
