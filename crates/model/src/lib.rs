//! Shared value types for TraceSynth: spans, the declarative topology
//! configuration, and attribute generators. No crate in this workspace
//! should need to duplicate these types — `tracesynth-topology`,
//! `tracesynth-sampler`, `tracesynth-traffic`, and `tracesynth-collector`
//! all build directly on top of them.

mod config;
mod generator;
mod span;

pub use config::{
    CallCondition, CallConfig, CallStyle, DurationSpec, OperationConfig,
    OperationOverrideConfig, PiecewiseSegment, ScenarioConfig, ServiceConfig,
    TopologyConfig, TrafficPatternConfig,
};
pub use generator::{AttributeGenerator, AttributeGeneratorConfig, GeneratorError};
pub use span::{AttributeValue, Span, SpanBatch};
