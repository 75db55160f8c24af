//! Derived signals: per-operation request/error counters and a latency
//! histogram, computed from the emitted span stream. These never feed
//! back into sampling — they are read-only observers.
//!
//! Modeled on `hdrhistogram`'s use for span-duration histograms in the
//! OpenTelemetry SDK; the plain-`u64` counters are sequential, no
//! atomics, since the emitter loop is single-threaded.

use hdrhistogram::Histogram;
use std::collections::HashMap;
use std::time::Duration;
use tracesynth_model::Span;

const HISTOGRAM_MAX_NANOS: u64 = 60 * 1_000_000_000;
const HISTOGRAM_SIGFIGS: u8 = 3;

#[derive(Debug, Default, Clone, Copy)]
pub struct OperationCounters {
    pub requests_total: u64,
    pub errors_total: u64,
}

/// A span whose duration exceeded the configured slow threshold. A
/// value, not a log line: callers decide whether to print it, write it
/// to a sink, or both.
#[derive(Debug, Clone)]
pub struct SlowSpanRecord {
    pub trace_id: u128,
    pub span_id: u64,
    pub service: String,
    pub operation: String,
    pub duration_nanos: u64,
    pub error: bool,
}

struct OperationSignals {
    counters: OperationCounters,
    latency_nanos: Histogram<u64>,
}

impl OperationSignals {
    fn new() -> Self {
        Self {
            counters: OperationCounters::default(),
            latency_nanos: Histogram::new_with_bounds(1, HISTOGRAM_MAX_NANOS, HISTOGRAM_SIGFIGS)
                .expect("static histogram bounds are valid"),
        }
    }
}

/// Aggregates per-operation counters and latency histograms across the
/// span stream, and detects slow spans against a configured threshold.
pub struct DerivedSignals {
    slow_threshold: Duration,
    by_operation: HashMap<(String, String), OperationSignals>,
}

impl DerivedSignals {
    pub fn new(slow_threshold: Duration) -> Self {
        Self {
            slow_threshold,
            by_operation: HashMap::new(),
        }
    }

    /// Folds one span into the aggregate signals, returning a
    /// [`SlowSpanRecord`] if its duration exceeded `slow_threshold`.
    pub fn observe(&mut self, span: &Span) -> Option<SlowSpanRecord> {
        let key = (span.service.clone(), span.operation.clone());
        let signals = self
            .by_operation
            .entry(key)
            .or_insert_with(OperationSignals::new);

        signals.counters.requests_total += 1;
        if span.error {
            signals.counters.errors_total += 1;
        }

        let duration_nanos = span.duration_nanos();
        let _ = signals
            .latency_nanos
            .record(duration_nanos.min(HISTOGRAM_MAX_NANOS));

        if Duration::from_nanos(duration_nanos) > self.slow_threshold {
            Some(SlowSpanRecord {
                trace_id: span.trace_id,
                span_id: span.span_id,
                service: span.service.clone(),
                operation: span.operation.clone(),
                duration_nanos,
                error: span.error,
            })
        } else {
            None
        }
    }

    pub fn counters(&self, service: &str, operation: &str) -> Option<OperationCounters> {
        self.by_operation
            .get(&(service.to_string(), operation.to_string()))
            .map(|s| s.counters)
    }

    pub fn latency_percentile(&self, service: &str, operation: &str, percentile: f64) -> Option<u64> {
        self.by_operation
            .get(&(service.to_string(), operation.to_string()))
            .map(|s| s.latency_nanos.value_at_percentile(percentile))
    }

    pub fn operations(&self) -> impl Iterator<Item = &(String, String)> {
        self.by_operation.keys()
    }
}

/// Destination for slow-span records: data, not log lines. `observe`'s
/// caller decides what a slow span does next.
pub trait SlowSpanSink: Send {
    fn record(&mut self, record: SlowSpanRecord);
}

impl<F: FnMut(SlowSpanRecord) + Send> SlowSpanSink for F {
    fn record(&mut self, record: SlowSpanRecord) {
        self(record)
    }
}

/// A [`SlowSpanSink`] that discards every record, mirroring the sink
/// tree's `NullSink`.
#[derive(Debug, Default)]
pub struct NullSlowSpanSink;

impl SlowSpanSink for NullSlowSpanSink {
    fn record(&mut self, _record: SlowSpanRecord) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(operation: &str, duration_nanos: u64, error: bool) -> Span {
        Span {
            trace_id: 1,
            span_id: 1,
            parent_span_id: 0,
            service: "svc".into(),
            operation: operation.into(),
            start_time: 0,
            end_time: duration_nanos,
            error,
            attributes: Default::default(),
            resource_attributes: Default::default(),
        }
    }

    #[test]
    fn counters_accumulate_per_operation() {
        let mut signals = DerivedSignals::new(Duration::from_secs(1));
        signals.observe(&span("op", 10, false));
        signals.observe(&span("op", 20, true));
        signals.observe(&span("other", 5, false));

        let op = signals.counters("svc", "op").unwrap();
        assert_eq!(op.requests_total, 2);
        assert_eq!(op.errors_total, 1);

        let other = signals.counters("svc", "other").unwrap();
        assert_eq!(other.requests_total, 1);
        assert_eq!(other.errors_total, 0);
    }

    #[test]
    fn slow_span_detected_above_threshold() {
        let mut signals = DerivedSignals::new(Duration::from_millis(5));
        let fast = signals.observe(&span("op", 1_000_000, false));
        assert!(fast.is_none());

        let slow = signals.observe(&span("op", 10_000_000, true));
        let record = slow.expect("10ms span exceeds 5ms threshold");
        assert_eq!(record.duration_nanos, 10_000_000);
        assert!(record.error);
    }

    #[test]
    fn latency_percentile_reflects_observations() {
        let mut signals = DerivedSignals::new(Duration::from_secs(1));
        for ms in 1..=100u64 {
            signals.observe(&span("op", ms * 1_000_000, false));
        }
        let p50 = signals.latency_percentile("svc", "op", 50.0).unwrap();
        assert!(p50 >= 40_000_000 && p50 <= 60_000_000);
    }
}
