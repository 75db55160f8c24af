//! Traffic pacing patterns and the time-windowed scenario resolver: a pure
//! function of elapsed run time to arrival rate, and the mechanism for
//! resolving per-operation overrides and the active traffic pattern at any
//! instant.

mod pattern;
mod scenario;

pub use pattern::{PatternError, TrafficPattern};
pub use scenario::{CompiledOverride, EffectiveOverride, Scenario, ScenarioError, ScenarioResolver};
