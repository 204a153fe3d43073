//! Detector registry: kind constructors, categories and named suites

use super::fibonacci::FibonacciDetector;
use super::momentum::{MacdDetector, RsiDetector, StochasticDetector};
use super::moving_average::{MaCrossoverDetector, MaPositionDetector, MaRibbonDetector};
use super::volume::{AdxTrendDetector, VolumeSpikeDetector};
use super::{parse_settings, Detector};
use crate::error::ConfigurationError;
use crate::models::SignalVocabulary;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

pub type DetectorConstructor =
    Arc<dyn Fn(Value) -> Result<Arc<dyn Detector>, ConfigurationError> + Send + Sync>;

/// A detector kind plus its settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorSpec {
    pub kind: String,
    #[serde(default)]
    pub params: Value,
}

impl DetectorSpec {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            params: Value::Null,
        }
    }

    pub fn with_params(mut self, params: Value) -> Self {
        self.params = params;
        self
    }
}

/// Which detectors to run: a registered preset or an explicit list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuiteSpec {
    Preset(String),
    Explicit(Vec<DetectorSpec>),
}

impl SuiteSpec {
    pub fn preset(name: impl Into<String>) -> Self {
        Self::Preset(name.into())
    }

    /// Stable name used for reporting and cache keys.
    pub fn name(&self) -> String {
        match self {
            Self::Preset(name) => name.clone(),
            Self::Explicit(specs) => {
                let body = serde_json::to_string(specs).unwrap_or_default();
                format!("custom:{}", body)
            }
        }
    }
}

/// Detector instances resolved from a [`SuiteSpec`], in run order.
#[derive(Clone)]
pub struct Suite {
    pub name: String,
    pub detectors: Vec<Arc<dyn Detector>>,
}

impl Suite {
    pub fn len(&self) -> usize {
        self.detectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detectors.is_empty()
    }

    pub fn detector_names(&self) -> Vec<&str> {
        self.detectors.iter().map(|d| d.name()).collect()
    }
}

impl fmt::Debug for Suite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Suite")
            .field("name", &self.name)
            .field("detectors", &self.detector_names())
            .finish()
    }
}

fn typed<S, D>(
    kind: &'static str,
    make: fn(S) -> Result<D, ConfigurationError>,
) -> impl Fn(Value) -> Result<Arc<dyn Detector>, ConfigurationError> + Send + Sync + 'static
where
    S: DeserializeOwned + Default + 'static,
    D: Detector + 'static,
{
    move |params| {
        let settings: S = parse_settings(kind, params)?;
        Ok(Arc::new(make(settings)?) as Arc<dyn Detector>)
    }
}

/// Mutable stage of the registry; frozen by [`DetectorRegistryBuilder::build`].
pub struct DetectorRegistryBuilder {
    constructors: BTreeMap<String, DetectorConstructor>,
    presets: BTreeMap<String, Vec<DetectorSpec>>,
    vocabulary: SignalVocabulary,
}

impl DetectorRegistryBuilder {
    fn new() -> Self {
        Self {
            constructors: BTreeMap::new(),
            presets: BTreeMap::new(),
            vocabulary: SignalVocabulary::default(),
        }
    }

    pub fn register<F>(mut self, kind: impl Into<String>, constructor: F) -> Self
    where
        F: Fn(Value) -> Result<Arc<dyn Detector>, ConfigurationError> + Send + Sync + 'static,
    {
        self.constructors.insert(kind.into(), Arc::new(constructor));
        self
    }

    pub fn register_category(mut self, category: impl Into<String>) -> Self {
        self.vocabulary = self.vocabulary.with_category(category);
        self
    }

    pub fn register_preset(mut self, name: impl Into<String>, specs: Vec<DetectorSpec>) -> Self {
        self.presets.insert(name.into(), specs);
        self
    }

    /// Register every built-in detector kind and preset.
    pub fn with_builtins(self) -> Self {
        self.register("ma_crossover", typed("ma_crossover", MaCrossoverDetector::new))
            .register("ma_position", typed("ma_position", MaPositionDetector::new))
            .register("ma_ribbon", typed("ma_ribbon", MaRibbonDetector::new))
            .register("rsi", typed("rsi", RsiDetector::new))
            .register("macd", typed("macd", MacdDetector::new))
            .register("stochastic", typed("stochastic", StochasticDetector::new))
            .register("fibonacci", typed("fibonacci", FibonacciDetector::new))
            .register("volume_spike", typed("volume_spike", VolumeSpikeDetector::new))
            .register("adx", typed("adx", AdxTrendDetector::new))
            .register_preset(
                "basic",
                vec![
                    DetectorSpec::new("ma_crossover").with_params(json!({"fast": 10, "slow": 20})),
                    DetectorSpec::new("rsi"),
                    DetectorSpec::new("macd"),
                ],
            )
            .register_preset(
                "momentum",
                vec![
                    DetectorSpec::new("rsi"),
                    DetectorSpec::new("macd"),
                    DetectorSpec::new("stochastic"),
                ],
            )
            .register_preset(
                "comprehensive",
                vec![
                    DetectorSpec::new("ma_crossover").with_params(json!({"fast": 10, "slow": 20})),
                    DetectorSpec::new("ma_position"),
                    DetectorSpec::new("ma_ribbon"),
                    DetectorSpec::new("rsi"),
                    DetectorSpec::new("macd"),
                    DetectorSpec::new("stochastic"),
                    DetectorSpec::new("fibonacci"),
                    DetectorSpec::new("volume_spike"),
                    DetectorSpec::new("adx"),
                ],
            )
            .register_preset(
                "intraday",
                vec![
                    DetectorSpec::new("ma_crossover").with_params(json!({"fast": 5, "slow": 10})),
                    DetectorSpec::new("rsi").with_params(
                        json!({"period": 7, "key": "RSI_7", "oversold": 25.0, "overbought": 75.0}),
                    ),
                    DetectorSpec::new("macd"),
                ],
            )
            .register_preset(
                "swing",
                vec![
                    DetectorSpec::new("ma_crossover").with_params(json!({"fast": 10, "slow": 30})),
                    DetectorSpec::new("ma_ribbon"),
                    DetectorSpec::new("rsi"),
                    DetectorSpec::new("macd"),
                    DetectorSpec::new("stochastic"),
                ],
            )
            .register_preset(
                "trend",
                vec![
                    DetectorSpec::new("ma_ribbon").with_params(json!({"periods": [20, 50, 100, 200]})),
                    DetectorSpec::new("macd"),
                    DetectorSpec::new("fibonacci"),
                    DetectorSpec::new("adx"),
                ],
            )
    }

    /// Freeze the registry. Every preset must reference registered kinds.
    pub fn build(self) -> Result<DetectorRegistry, ConfigurationError> {
        for (preset, specs) in &self.presets {
            if specs.is_empty() {
                return Err(ConfigurationError::EmptySuite(preset.clone()));
            }
            if let Some(spec) = specs.iter().find(|s| !self.constructors.contains_key(&s.kind)) {
                return Err(ConfigurationError::UnknownDetector(spec.kind.clone()));
            }
        }
        Ok(DetectorRegistry {
            constructors: self.constructors,
            presets: self.presets,
            vocabulary: self.vocabulary,
        })
    }
}

/// Immutable lookup from detector kinds and preset names to instances.
pub struct DetectorRegistry {
    constructors: BTreeMap<String, DetectorConstructor>,
    presets: BTreeMap<String, Vec<DetectorSpec>>,
    vocabulary: SignalVocabulary,
}

impl DetectorRegistry {
    pub fn builder() -> DetectorRegistryBuilder {
        DetectorRegistryBuilder::new()
    }

    /// Registry holding only the built-in kinds and presets.
    pub fn with_builtins() -> Result<Self, ConfigurationError> {
        Self::builder().with_builtins().build()
    }

    pub fn vocabulary(&self) -> &SignalVocabulary {
        &self.vocabulary
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }

    pub fn preset_names(&self) -> impl Iterator<Item = &str> {
        self.presets.keys().map(String::as_str)
    }

    pub fn preset(&self, name: &str) -> Result<&[DetectorSpec], ConfigurationError> {
        self.presets
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| ConfigurationError::UnknownPreset(name.to_string()))
    }

    pub fn create(&self, spec: &DetectorSpec) -> Result<Arc<dyn Detector>, ConfigurationError> {
        let constructor = self
            .constructors
            .get(&spec.kind)
            .ok_or_else(|| ConfigurationError::UnknownDetector(spec.kind.clone()))?;
        let detector = constructor(spec.params.clone())?;
        if !self.vocabulary.contains(detector.category()) {
            return Err(ConfigurationError::invalid(
                spec.kind.clone(),
                format!("category '{}' is not registered", detector.category()),
            ));
        }
        Ok(detector)
    }

    pub fn build_suite(&self, suite: &SuiteSpec) -> Result<Suite, ConfigurationError> {
        let specs = match suite {
            SuiteSpec::Preset(name) => self.preset(name)?,
            SuiteSpec::Explicit(specs) => specs.as_slice(),
        };
        let name = suite.name();
        if specs.is_empty() {
            return Err(ConfigurationError::EmptySuite(name));
        }

        let detectors = specs
            .iter()
            .map(|spec| self.create(spec))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(suite = %name, detectors = detectors.len(), "Built detector suite");
        Ok(Suite { name, detectors })
    }
}
