use crate::pattern::{PatternError, TrafficPattern};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tracesynth_model::{AttributeGenerator, DurationSpec, GeneratorError, ScenarioConfig};

#[derive(Debug, Error, PartialEq)]
pub enum ScenarioError {
    #[error("scenario {name}: end ({end:?}) must be after start ({start:?})")]
    MalformedInterval {
        name: String,
        start: Duration,
        end: Duration,
    },
    #[error("scenario {name}, operation {service}.{operation}: {source}")]
    InvalidOverride {
        name: String,
        service: String,
        operation: String,
        #[source]
        source: GeneratorError,
    },
    #[error("scenario {name}: {source}")]
    InvalidTraffic {
        name: String,
        #[source]
        source: PatternError,
    },
}

/// The per-operation override a single compiled [`Scenario`] contributes.
/// Every field is optional; [`ScenarioResolver::effective_override`] merges
/// these across all currently-active scenarios by priority.
#[derive(Debug, Clone, Default)]
pub struct CompiledOverride {
    pub duration: Option<DurationSpec>,
    pub error_rate: Option<f64>,
}

/// A compiled, time-windowed overlay. `overrides` and `traffic` are
/// pre-compiled at construction so scenario activation at sample time is
/// pure lookup, never fallible.
#[derive(Debug)]
pub struct Scenario {
    pub name: String,
    pub start: Duration,
    pub end: Duration,
    pub priority: i64,
    overrides: HashMap<(String, String), CompiledOverride>,
    attribute_overrides: HashMap<(String, String), HashMap<String, AttributeGenerator>>,
    pub traffic: Option<TrafficPattern>,
    declaration_order: usize,
}

impl Scenario {
    pub fn compile(config: &ScenarioConfig, declaration_order: usize) -> Result<Self, ScenarioError> {
        if config.end <= config.start {
            return Err(ScenarioError::MalformedInterval {
                name: config.name.clone(),
                start: config.start,
                end: config.end,
            });
        }

        let mut overrides = HashMap::new();
        let mut attribute_overrides = HashMap::new();
        for (key, override_cfg) in &config.overrides {
            overrides.insert(
                key.clone(),
                CompiledOverride {
                    duration: override_cfg.duration,
                    error_rate: override_cfg.error_rate,
                },
            );
            let mut attrs = HashMap::with_capacity(override_cfg.attributes.len());
            for (attr_name, attr_cfg) in &override_cfg.attributes {
                let generator = attr_cfg.compile().map_err(|source| ScenarioError::InvalidOverride {
                    name: config.name.clone(),
                    service: key.0.clone(),
                    operation: key.1.clone(),
                    source,
                })?;
                attrs.insert(attr_name.clone(), generator);
            }
            attribute_overrides.insert(key.clone(), attrs);
        }

        let traffic = config
            .traffic
            .as_ref()
            .map(TrafficPattern::compile)
            .transpose()
            .map_err(|source| ScenarioError::InvalidTraffic {
                name: config.name.clone(),
                source,
            })?;

        Ok(Self {
            name: config.name.clone(),
            start: config.start,
            end: config.end,
            priority: config.priority,
            overrides,
            attribute_overrides,
            traffic,
            declaration_order,
        })
    }

    pub fn is_active(&self, elapsed: Duration) -> bool {
        elapsed >= self.start && elapsed < self.end
    }
}

/// The merged result of every active scenario's per-operation override,
/// for one `(service, operation)` key at one instant. `attributes` is
/// key-wise merged: the highest-priority active scenario that sets a given
/// attribute key wins that key, independent of the other fields.
#[derive(Debug, Default)]
pub struct EffectiveOverride<'a> {
    pub duration: Option<DurationSpec>,
    pub error_rate: Option<f64>,
    pub attributes: HashMap<&'a str, &'a AttributeGenerator>,
}

/// Resolves, at any elapsed run time, the set of active scenarios and the
/// effective traffic pattern and per-operation overrides they imply.
/// Immutable after construction.
pub struct ScenarioResolver {
    scenarios: Vec<Scenario>,
    base_traffic: TrafficPattern,
}

impl ScenarioResolver {
    pub fn new(scenarios: Vec<Scenario>, base_traffic: TrafficPattern) -> Self {
        Self {
            scenarios,
            base_traffic,
        }
    }

    /// Active scenarios at `elapsed`, sorted by priority descending, ties
    /// broken by declaration order (stable).
    pub fn active_scenarios(&self, elapsed: Duration) -> Vec<&Scenario> {
        let mut active: Vec<&Scenario> = self
            .scenarios
            .iter()
            .filter(|s| s.is_active(elapsed))
            .collect();
        active.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then(a.declaration_order.cmp(&b.declaration_order))
        });
        active
    }

    pub fn effective_override(&self, key: (&str, &str), elapsed: Duration) -> EffectiveOverride<'_> {
        let active = self.active_scenarios(elapsed);
        let owned_key = (key.0.to_string(), key.1.to_string());
        let mut result = EffectiveOverride::default();
        for scenario in &active {
            if let Some(ov) = scenario.overrides.get(&owned_key) {
                if result.duration.is_none() {
                    result.duration = ov.duration;
                }
                if result.error_rate.is_none() {
                    result.error_rate = ov.error_rate;
                }
            }
            if let Some(attrs) = scenario.attribute_overrides.get(&owned_key) {
                for (name, generator) in attrs {
                    result.attributes.entry(name.as_str()).or_insert(generator);
                }
            }
        }
        result
    }

    /// The effective traffic pattern at `elapsed`: the first (highest
    /// priority) active scenario that declares one, else the base pattern.
    pub fn effective_traffic(&self, elapsed: Duration) -> &TrafficPattern {
        self.active_scenarios(elapsed)
            .into_iter()
            .find_map(|s| s.traffic.as_ref())
            .unwrap_or(&self.base_traffic)
    }

    pub fn rate(&self, elapsed: Duration) -> f64 {
        self.effective_traffic(elapsed).rate(elapsed)
    }
}
