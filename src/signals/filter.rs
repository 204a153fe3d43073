//! Ad-hoc filtering, sorting and grouping over signal lists

use crate::models::{Signal, SignalDirection, SignalStrength};
use chrono::{Duration, Utc};
use std::collections::BTreeMap;

/// Composable predicate set; every configured condition must hold.
#[derive(Debug, Clone, Default)]
pub struct SignalFilter {
    strength: Option<SignalStrength>,
    direction: Option<SignalDirection>,
    category: Option<String>,
    excluded_category: Option<String>,
    indicator: Option<String>,
    min_confidence: Option<f64>,
    max_age: Option<Duration>,
}

impl SignalFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strength(mut self, strength: SignalStrength) -> Self {
        self.strength = Some(strength);
        self
    }

    pub fn bullish(mut self) -> Self {
        self.direction = Some(SignalDirection::Bullish);
        self
    }

    pub fn bearish(mut self) -> Self {
        self.direction = Some(SignalDirection::Bearish);
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn exclude_category(mut self, category: impl Into<String>) -> Self {
        self.excluded_category = Some(category.into());
        self
    }

    pub fn indicator(mut self, indicator: impl Into<String>) -> Self {
        self.indicator = Some(indicator.into());
        self
    }

    pub fn min_confidence(mut self, min: f64) -> Self {
        self.min_confidence = Some(min);
        self
    }

    pub fn max_age(mut self, age: Duration) -> Self {
        self.max_age = Some(age);
        self
    }

    pub fn matches(&self, signal: &Signal) -> bool {
        self.strength.map_or(true, |s| signal.strength() == s)
            && self.direction.map_or(true, |d| signal.direction() == d)
            && self.category.as_deref().map_or(true, |c| signal.category() == c)
            && self
                .excluded_category
                .as_deref()
                .map_or(true, |c| signal.category() != c)
            && self
                .indicator
                .as_deref()
                .map_or(true, |i| signal.indicator() == Some(i))
            && self.min_confidence.map_or(true, |m| signal.confidence() >= m)
            && self
                .max_age
                .map_or(true, |age| Utc::now() - signal.timestamp() <= age)
    }

    pub fn apply<'a>(&self, signals: &'a [Signal]) -> Vec<&'a Signal> {
        signals.iter().filter(|s| self.matches(s)).collect()
    }
}

pub fn sort_by_confidence(signals: &mut [Signal], ascending: bool) {
    signals.sort_by(|a, b| {
        let ord = a.confidence().total_cmp(&b.confidence());
        if ascending {
            ord
        } else {
            ord.reverse()
        }
    });
}

pub fn sort_by_timestamp(signals: &mut [Signal], ascending: bool) {
    signals.sort_by(|a, b| {
        let ord = a.timestamp().cmp(&b.timestamp());
        if ascending {
            ord
        } else {
            ord.reverse()
        }
    });
}

/// Most bullish first, most bearish last; stable within a strength.
pub fn sort_by_strength(signals: &mut [Signal]) {
    signals.sort_by_key(|s| s.strength().rank());
}

pub fn group_by_category(signals: &[Signal]) -> BTreeMap<&str, Vec<&Signal>> {
    let mut groups: BTreeMap<&str, Vec<&Signal>> = BTreeMap::new();
    for signal in signals {
        groups.entry(signal.category()).or_default().push(signal);
    }
    groups
}
