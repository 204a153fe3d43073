//! Runtime configuration loaded from environment variables

use crate::error::ConfigurationError;
use crate::signals::aggregation::AggregatorConfig;
use crate::signals::contradiction::SidePolicy;
use crate::signals::pipeline::QualityConfig;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Deployment environment from `APP_ENV`, defaulting to `development`.
pub fn get_environment() -> String {
    std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string())
}

/// Analysis cache settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub ttl_seconds: u64,
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_seconds: 300,
            capacity: 100,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.enabled && self.capacity == 0 {
            return Err(ConfigurationError::invalid(
                "CACHE_CAPACITY",
                "must be at least 1 when the cache is enabled",
            ));
        }
        Ok(())
    }
}

/// Indicator fetch settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub timeout_ms: u64,
    pub retries: usize,
    pub retry_delay_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            retries: 2,
            retry_delay_ms: 100,
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.timeout_ms == 0 {
            return Err(ConfigurationError::invalid(
                "FETCH_TIMEOUT_MS",
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// Top-level configuration shared by the orchestrator and batch runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub worker_concurrency: usize,
    pub default_suite: String,
    pub default_timeframe: String,
    pub cache: CacheConfig,
    pub fetch: FetchConfig,
    pub aggregator: AggregatorConfig,
    pub quality: QualityConfig,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            worker_concurrency: 4,
            default_suite: "comprehensive".to_string(),
            default_timeframe: "1d".to_string(),
            cache: CacheConfig::default(),
            fetch: FetchConfig::default(),
            aggregator: AggregatorConfig::default(),
            quality: QualityConfig::default(),
        }
    }
}

impl AnalyzerConfig {
    /// Load from the process environment. Call `dotenvy::dotenv()` first to
    /// pick up a local `.env` file.
    pub fn from_env() -> Result<Self, ConfigurationError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigurationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let mut quality = defaults.quality.clone();
        quality.min_quality = parse_or(&lookup, "MIN_SIGNAL_QUALITY", quality.min_quality)?;
        quality.dedup_epsilon = parse_or(&lookup, "DEDUP_EPSILON", quality.dedup_epsilon)?;
        if let Some(policy) = lookup("CONTRADICTION_POLICY") {
            quality.side_policy = policy.parse()?;
        }
        if let Some(list) = lookup("EXCLUSIVE_CATEGORIES") {
            quality.exclusive_categories = list
                .split(',')
                .map(|c| c.trim().to_uppercase())
                .filter(|c| !c.is_empty())
                .collect();
        }

        let config = Self {
            worker_concurrency: parse_or(&lookup, "WORKER_CONCURRENCY", defaults.worker_concurrency)?,
            default_suite: lookup("DEFAULT_SUITE").unwrap_or(defaults.default_suite),
            default_timeframe: lookup("DEFAULT_TIMEFRAME").unwrap_or(defaults.default_timeframe),
            cache: CacheConfig {
                enabled: parse_bool_or(&lookup, "CACHE_ENABLED", defaults.cache.enabled)?,
                ttl_seconds: parse_or(&lookup, "CACHE_TTL_SECONDS", defaults.cache.ttl_seconds)?,
                capacity: parse_or(&lookup, "CACHE_CAPACITY", defaults.cache.capacity)?,
            },
            fetch: FetchConfig {
                timeout_ms: parse_or(&lookup, "FETCH_TIMEOUT_MS", defaults.fetch.timeout_ms)?,
                retries: parse_or(&lookup, "FETCH_RETRIES", defaults.fetch.retries)?,
                retry_delay_ms: defaults.fetch.retry_delay_ms,
            },
            aggregator: AggregatorConfig {
                parallel: parse_bool_or(&lookup, "PARALLEL_DETECTORS", defaults.aggregator.parallel)?,
            },
            quality,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.worker_concurrency == 0 {
            return Err(ConfigurationError::invalid(
                "WORKER_CONCURRENCY",
                "must be at least 1",
            ));
        }
        if self.default_suite.trim().is_empty() {
            return Err(ConfigurationError::invalid("DEFAULT_SUITE", "must not be empty"));
        }
        self.cache.validate()?;
        self.fetch.validate()?;
        self.quality.validate()
    }

    pub fn with_worker_concurrency(mut self, workers: usize) -> Self {
        self.worker_concurrency = workers;
        self
    }

    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_fetch(mut self, fetch: FetchConfig) -> Self {
        self.fetch = fetch;
        self
    }

    pub fn with_quality(mut self, quality: QualityConfig) -> Self {
        self.quality = quality;
        self
    }

    pub fn with_side_policy(mut self, policy: SidePolicy) -> Self {
        self.quality.side_policy = policy;
        self
    }
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> Result<T, ConfigurationError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigurationError::invalid(key, format!("'{}': {}", raw, e))),
        None => Ok(default),
    }
}

fn parse_bool_or<F>(lookup: &F, key: &str, default: bool) -> Result<bool, ConfigurationError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => Err(ConfigurationError::invalid(
                key,
                format!("expected a boolean, got '{}'", other),
            )),
        },
        None => Ok(default),
    }
}
