//! The trace tree sampler: given a root operation and a seeded random
//! source, walks the compiled topology to produce one rooted tree of
//! spans, honoring active scenario overrides, call conditions,
//! probabilities, counts, timeouts, and retries.

mod ids;
mod sample;

pub use ids::{fresh_span_id, fresh_trace_id};
pub use sample::{sample_trace, DEFAULT_SPAN_BUDGET};
