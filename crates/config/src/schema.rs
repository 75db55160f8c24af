//! Serde-deserializable mirror of `tracesynth-model`'s configuration
//! types. Kept as a separate DTO layer (rather than deriving `Deserialize`
//! directly on the model types) because the YAML surface uses string
//! literals (`"10ms +/- 2ms"`, `"100/s"`, `"12%"`) that need the parsers
//! in [`crate::parse`] to become the model's typed fields.

use serde::Deserialize;
use std::collections::HashMap;
use tracesynth_model::AttributeValue;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallStyleDto {
    Parallel,
    Sequential,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CallConditionDto {
    None,
    OnError,
    OnSuccess,
}

/// One `(value, weight)` entry of a weighted-choice generator. Kept as an
/// ordered `Vec`, not a `HashMap`, in [`AttributeGeneratorDto`]: the
/// cumulative-weight array the compiled generator builds iterates choices
/// in declaration order, and that order must be reproducible from the
/// same YAML document for the engine's determinism guarantee.
#[derive(Debug, Deserialize)]
pub struct WeightedChoiceEntryDto {
    pub value: String,
    pub weight: u32,
}

#[derive(Debug, Deserialize)]
pub struct AttributeGeneratorDto {
    #[serde(rename = "static", default)]
    pub static_value: Option<AttributeValue>,
    #[serde(default)]
    pub weighted_choice: Option<Vec<WeightedChoiceEntryDto>>,
    #[serde(default)]
    pub sequence: Option<String>,
    #[serde(default)]
    pub probability: Option<serde_yaml::Value>,
    #[serde(default)]
    pub range: Option<(i64, i64)>,
    #[serde(default)]
    pub distribution: Option<DistributionDto>,
}

#[derive(Debug, Deserialize)]
pub struct DistributionDto {
    pub mean: f64,
    pub stddev: f64,
}

#[derive(Debug, Deserialize)]
pub struct CallDto {
    pub target: String,
    #[serde(default)]
    pub probability: Option<serde_yaml::Value>,
    #[serde(default)]
    pub condition: Option<CallConditionDto>,
    #[serde(default = "default_count")]
    pub count: u32,
    #[serde(default)]
    pub timeout: Option<String>,
    #[serde(default)]
    pub retries: u32,
    #[serde(default)]
    pub retry_backoff: Option<String>,
}

fn default_count() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
pub struct OperationDto {
    pub name: String,
    pub duration: String,
    #[serde(default)]
    pub error_rate: Option<serde_yaml::Value>,
    #[serde(default)]
    pub call_style: Option<CallStyleDto>,
    #[serde(default)]
    pub attributes: HashMap<String, AttributeGeneratorDto>,
    #[serde(default)]
    pub calls: Vec<CallDto>,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default = "default_weight")]
    pub weight: u32,
}

fn default_weight() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
pub struct ServiceDto {
    pub name: String,
    #[serde(default)]
    pub resource_attributes: HashMap<String, AttributeValue>,
    #[serde(default)]
    pub operations: Vec<OperationDto>,
}

#[derive(Debug, Deserialize)]
pub struct OperationOverrideDto {
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub error_rate: Option<serde_yaml::Value>,
    #[serde(default)]
    pub attributes: HashMap<String, AttributeGeneratorDto>,
}

#[derive(Debug, Deserialize)]
pub struct PiecewiseSegmentDto {
    pub start: String,
    pub end: String,
    pub rate: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrafficPatternDto {
    Uniform {
        rate: String,
    },
    Diurnal {
        rate: String,
        peak: f64,
        trough: f64,
        period: String,
    },
    Bursty {
        rate: String,
        burst_multiplier: f64,
        interval: String,
        duration: String,
    },
    Piecewise {
        segments: Vec<PiecewiseSegmentDto>,
    },
    Overlay {
        patterns: Vec<TrafficPatternDto>,
    },
}

#[derive(Debug, Deserialize)]
pub struct ScenarioDto {
    pub name: String,
    pub start: String,
    pub end: String,
    #[serde(default)]
    pub priority: i64,
    #[serde(default)]
    pub overrides: HashMap<String, OperationOverrideDto>,
    #[serde(default)]
    pub traffic: Option<TrafficPatternDto>,
}

/// Top-level YAML document shape: the boundary `tracesynth-config` owns,
/// one level above the validated `tracesynth_model::TopologyConfig` the
/// core consumes.
#[derive(Debug, Deserialize)]
pub struct TopologyDto {
    pub services: Vec<ServiceDto>,
    pub traffic: TrafficPatternDto,
    #[serde(default)]
    pub scenarios: Vec<ScenarioDto>,
}
