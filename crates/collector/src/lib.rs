//! Span batching, rate limiting, resilient export, sinks, and derived
//! signals fed by the emitter loop.

mod batch;
mod emitter;
mod rate_limiter;
mod resilient;
mod signals;
mod sink;

pub use batch::{BatchConfig, BatchMetrics, BatchProcessor};
pub use emitter::{run_emitter, EmitterConfig, EmitterReport};
pub use rate_limiter::{IntervalRateLimiter, RateLimiter, RateLimiterBoxed, YieldingRateLimiter};
pub use resilient::{
    CircuitBreakerConfig, CircuitBreakerSink, CircuitState, RateLimitedSink, ResilientSinkBuilder,
    RetryConfig, RetryingSink,
};
pub use signals::{DerivedSignals, NullSlowSpanSink, OperationCounters, SlowSpanRecord, SlowSpanSink};
pub use sink::{ExportError, JsonFileSink, NullSink, OtlpSink, Sink, SinkBoxed, StdoutSink};
