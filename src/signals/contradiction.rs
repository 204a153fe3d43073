//! Resolution of opposing signals in mutually exclusive categories

use crate::error::ConfigurationError;
use crate::models::{ContradictionEvent, Signal, SignalDirection};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;
use tracing::{debug, info};

pub const DEFAULT_EXCLUSIVE_CATEGORIES: [&str; 3] = ["MA_CROSS", "MACD", "PRICE_ACTION"];

pub fn default_exclusive_categories() -> BTreeSet<String> {
    DEFAULT_EXCLUSIVE_CATEGORIES.iter().map(|c| c.to_string()).collect()
}

/// How the two sides of a contradiction are compared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SidePolicy {
    /// Side holding the single most confident signal wins.
    #[default]
    MaxConfidence,
    /// Side with the larger total confidence wins.
    SumConfidence,
}

impl SidePolicy {
    fn side_score(self, side: &[&Signal]) -> f64 {
        match self {
            Self::MaxConfidence => side.iter().map(|s| s.confidence()).fold(0.0, f64::max),
            Self::SumConfidence => side.iter().map(|s| s.confidence()).sum(),
        }
    }
}

impl FromStr for SidePolicy {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "max" | "max_confidence" => Ok(Self::MaxConfidence),
            "sum" | "sum_confidence" => Ok(Self::SumConfidence),
            other => Err(ConfigurationError::invalid(
                "CONTRADICTION_POLICY",
                format!("expected 'max' or 'sum', got '{}'", other),
            )),
        }
    }
}

/// An opposing bullish/bearish pair within one exclusive category.
#[derive(Debug, Clone, PartialEq)]
pub struct Contradiction<'a> {
    pub category: &'a str,
    pub bullish: &'a Signal,
    pub bearish: &'a Signal,
}

#[derive(Debug, Clone)]
pub struct ContradictionResolver {
    exclusive: BTreeSet<String>,
    policy: SidePolicy,
}

impl Default for ContradictionResolver {
    fn default() -> Self {
        Self::new(default_exclusive_categories(), SidePolicy::default())
    }
}

impl ContradictionResolver {
    pub fn new(exclusive: BTreeSet<String>, policy: SidePolicy) -> Self {
        Self { exclusive, policy }
    }

    pub fn policy(&self) -> SidePolicy {
        self.policy
    }

    pub fn is_exclusive(&self, category: &str) -> bool {
        self.exclusive.contains(category)
    }

    /// Every bullish/bearish pair in an exclusive category, without dropping any.
    pub fn detect_contradictions<'a>(&'a self, signals: &'a [Signal]) -> Vec<Contradiction<'a>> {
        let mut found = Vec::new();
        for category in &self.exclusive {
            let in_cat = || signals.iter().filter(move |s| s.category() == category.as_str());
            for bullish in in_cat().filter(|s| s.is_bullish()) {
                for bearish in in_cat().filter(|s| s.is_bearish()) {
                    found.push(Contradiction {
                        category,
                        bullish,
                        bearish,
                    });
                }
            }
        }
        found
    }

    /// Keep only the stronger side of each conflicting exclusive category.
    ///
    /// Ties go to the side whose first signal appears earliest. Neutral
    /// signals and non-exclusive categories pass through untouched.
    pub fn resolve(&self, signals: Vec<Signal>) -> (Vec<Signal>, Vec<ContradictionEvent>) {
        let mut discard = vec![false; signals.len()];
        let mut events = Vec::new();

        for category in &self.exclusive {
            let side = |direction: SignalDirection| -> Vec<usize> {
                signals
                    .iter()
                    .enumerate()
                    .filter(|(_, s)| s.category() == category.as_str() && s.direction() == direction)
                    .map(|(i, _)| i)
                    .collect()
            };
            let bullish = side(SignalDirection::Bullish);
            let bearish = side(SignalDirection::Bearish);
            if bullish.is_empty() || bearish.is_empty() {
                continue;
            }

            let score = |idx: &[usize]| {
                let members: Vec<&Signal> = idx.iter().map(|i| &signals[*i]).collect();
                self.policy.side_score(&members)
            };
            let (bull_score, bear_score) = (score(&bullish), score(&bearish));
            let bullish_wins = if bull_score == bear_score {
                bullish[0] < bearish[0]
            } else {
                bull_score > bear_score
            };

            let (kept_side, kept, losers) = if bullish_wins {
                (SignalDirection::Bullish, bullish.len(), bearish)
            } else {
                (SignalDirection::Bearish, bearish.len(), bullish)
            };

            debug!(
                category = %category,
                bullish = bull_score,
                bearish = bear_score,
                kept = ?kept_side,
                "Resolving contradiction"
            );
            for i in &losers {
                discard[*i] = true;
            }
            events.push(ContradictionEvent {
                category: category.clone(),
                kept_side,
                kept,
                discarded: losers.iter().map(|i| signals[*i].name().to_string()).collect(),
            });
        }

        if !events.is_empty() {
            let removed: usize = events.iter().map(|e| e.discarded.len()).sum();
            info!(
                contradictions = events.len(),
                removed,
                "Resolved signal contradictions"
            );
        }

        let survivors = signals
            .into_iter()
            .zip(discard)
            .filter_map(|(s, dropped)| (!dropped).then_some(s))
            .collect();
        (survivors, events)
    }
}
