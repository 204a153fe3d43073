//! External data sources feeding the analyzer.

pub mod indicator_source;

pub use indicator_source::{IndicatorSource, StaticIndicatorSource};
