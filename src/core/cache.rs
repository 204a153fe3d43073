//! TTL + LRU cache of completed analyses

use crate::config::CacheConfig;
use crate::models::AnalysisResult;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub symbol: String,
    pub timeframe: String,
    pub suite: String,
}

impl CacheKey {
    pub fn new(symbol: &str, timeframe: &str, suite: &str) -> Self {
        Self {
            symbol: symbol.trim().to_uppercase(),
            timeframe: timeframe.to_string(),
            suite: suite.to_string(),
        }
    }
}

struct CacheEntry {
    result: AnalysisResult,
    inserted: Instant,
    last_access: u64,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<CacheKey, CacheEntry>,
    clock: u64,
}

impl CacheState {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }
}

/// Bounded result cache shared by concurrent analyses.
///
/// Entries older than the TTL are never returned. When full, the least
/// recently read or written entry is evicted.
pub struct AnalysisCache {
    state: Mutex<CacheState>,
    ttl: Duration,
    capacity: usize,
}

impl AnalysisCache {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            state: Mutex::new(CacheState::default()),
            ttl,
            capacity: capacity.max(1),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.ttl(), config.capacity)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub async fn get(&self, key: &CacheKey) -> Option<AnalysisResult> {
        let mut state = self.state.lock().await;
        let expired = match state.entries.get(key) {
            Some(entry) => entry.inserted.elapsed() >= self.ttl,
            None => return None,
        };
        if expired {
            state.entries.remove(key);
            debug!(symbol = %key.symbol, "Cache entry expired");
            return None;
        }
        let now = state.tick();
        state.entries.get_mut(key).map(|entry| {
            entry.last_access = now;
            entry.result.clone()
        })
    }

    pub async fn insert(&self, key: CacheKey, result: AnalysisResult) {
        let mut state = self.state.lock().await;
        let now = state.tick();

        if !state.entries.contains_key(&key) && state.entries.len() >= self.capacity {
            let ttl = self.ttl;
            state.entries.retain(|_, e| e.inserted.elapsed() < ttl);
        }
        if !state.entries.contains_key(&key) && state.entries.len() >= self.capacity {
            let oldest = state
                .entries
                .iter()
                .min_by_key(|(_, e)| e.last_access)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                debug!(symbol = %oldest.symbol, "Evicting least recently used analysis");
                state.entries.remove(&oldest);
            }
        }

        state.entries.insert(
            key,
            CacheEntry {
                result,
                inserted: Instant::now(),
                last_access: now,
            },
        );
    }

    pub async fn invalidate(&self, key: &CacheKey) -> bool {
        self.state.lock().await.entries.remove(key).is_some()
    }

    pub async fn clear(&self) {
        self.state.lock().await.entries.clear();
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
