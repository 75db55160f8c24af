use crate::generator::AttributeGeneratorConfig;
use crate::span::AttributeValue;
use std::collections::HashMap;
use std::time::Duration;

/// How a call's children are timed relative to the parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CallStyle {
    #[default]
    Parallel,
    Sequential,
}

/// Gates a call on the *caller's* own sampled error outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CallCondition {
    #[default]
    None,
    OnError,
    OnSuccess,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DurationSpec {
    pub mean: Duration,
    pub stddev: Duration,
}

impl DurationSpec {
    pub fn fixed(d: Duration) -> Self {
        Self {
            mean: d,
            stddev: Duration::ZERO,
        }
    }
}

/// One edge in the operation call graph, before target resolution.
#[derive(Debug, Clone)]
pub struct CallConfig {
    pub target_service: String,
    pub target_operation: String,
    pub probability: f64,
    pub condition: CallCondition,
    pub count: u32,
    pub timeout: Option<Duration>,
    pub retries: u32,
    pub retry_backoff: Duration,
}

impl CallConfig {
    pub fn new(target_service: impl Into<String>, target_operation: impl Into<String>) -> Self {
        Self {
            target_service: target_service.into(),
            target_operation: target_operation.into(),
            probability: 1.0,
            condition: CallCondition::None,
            count: 1,
            timeout: None,
            retries: 0,
            retry_backoff: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OperationConfig {
    pub name: String,
    pub duration: DurationSpec,
    pub error_rate: f64,
    pub call_style: CallStyle,
    pub attributes: HashMap<String, AttributeGeneratorConfig>,
    pub calls: Vec<CallConfig>,
    pub domain: Option<String>,
    /// Relative weight for root-operation selection by the emitter; default 1.
    pub weight: u32,
}

impl OperationConfig {
    pub fn new(name: impl Into<String>, duration: DurationSpec) -> Self {
        Self {
            name: name.into(),
            duration,
            error_rate: 0.0,
            call_style: CallStyle::default(),
            attributes: HashMap::new(),
            calls: Vec::new(),
            domain: None,
            weight: 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub name: String,
    pub resource_attributes: HashMap<String, AttributeValue>,
    /// Ordered so iteration (e.g. root-operation enumeration) is
    /// reproducible; insertion order mirrors declaration order.
    pub operations: Vec<OperationConfig>,
}

impl ServiceConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            resource_attributes: HashMap::new(),
            operations: Vec::new(),
        }
    }
}

/// Per-field overrides a [`ScenarioConfig`] applies to one operation.
/// `None` means "leave the base value in place"; `attributes` merges
/// key-wise with the base map rather than replacing it wholesale.
#[derive(Debug, Clone, Default)]
pub struct OperationOverrideConfig {
    pub duration: Option<DurationSpec>,
    pub error_rate: Option<f64>,
    pub attributes: HashMap<String, AttributeGeneratorConfig>,
}

#[derive(Debug, Clone)]
pub struct PiecewiseSegment {
    pub start: Duration,
    pub end: Duration,
    pub rate: f64,
}

#[derive(Debug, Clone)]
pub enum TrafficPatternConfig {
    Uniform {
        rate: f64,
    },
    Diurnal {
        rate: f64,
        peak: f64,
        trough: f64,
        period: Duration,
    },
    Bursty {
        rate: f64,
        burst_multiplier: f64,
        interval: Duration,
        duration: Duration,
    },
    Piecewise {
        segments: Vec<PiecewiseSegment>,
    },
    Overlay {
        patterns: Vec<TrafficPatternConfig>,
    },
}

/// A time-windowed overlay mutating operations and/or traffic.
#[derive(Debug, Clone)]
pub struct ScenarioConfig {
    pub name: String,
    pub start: Duration,
    pub end: Duration,
    pub priority: i64,
    /// Keyed by `(service, operation)`.
    pub overrides: HashMap<(String, String), OperationOverrideConfig>,
    pub traffic: Option<TrafficPatternConfig>,
}

/// The validated, in-memory structure handed to `BuildTopology` — the
/// boundary between an external config loader and the core.
#[derive(Debug, Clone)]
pub struct TopologyConfig {
    pub services: Vec<ServiceConfig>,
    pub traffic: TrafficPatternConfig,
    pub scenarios: Vec<ScenarioConfig>,
}
