//! Pure batching abstraction: groups spans by trace id and decides when
//! to flush, with no concurrency concerns of its own (no `Arc`, no
//! atomic metrics — those live in the emitter/resilient layers when
//! needed).

use crate::sink::{ExportError, SinkBoxed};
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracesynth_model::{Span, SpanBatch};

#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub batch_size_limit: usize,
    pub batch_timeout: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size_limit: 10_000,
            batch_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct BatchMetrics {
    pub spans_exported: u64,
    pub batches_exported: u64,
    pub export_errors: u64,
}

impl BatchMetrics {
    pub fn record_success(&mut self, span_count: u64) {
        self.spans_exported += span_count;
        self.batches_exported += 1;
    }

    pub fn record_error(&mut self) {
        self.export_errors += 1;
    }
}

pub struct BatchProcessor {
    pending: HashMap<u128, Vec<Span>>,
    config: BatchConfig,
    metrics: BatchMetrics,
    last_flush: Instant,
}

impl BatchProcessor {
    pub fn new(config: BatchConfig) -> Self {
        Self {
            pending: HashMap::new(),
            config,
            metrics: BatchMetrics::default(),
            last_flush: Instant::now(),
        }
    }

    pub fn add(&mut self, span: Span) {
        self.pending.entry(span.trace_id).or_default().push(span);
    }

    pub fn total_pending(&self) -> usize {
        self.pending.values().map(Vec::len).sum()
    }

    pub fn should_flush(&self) -> bool {
        !self.pending.is_empty()
            && (self.total_pending() >= self.config.batch_size_limit
                || self.last_flush.elapsed() >= self.config.batch_timeout)
    }

    /// Flushes pending spans through `sink`, blocking until the write
    /// completes. The sink is passed in rather than stored, keeping
    /// batching separate from export concurrency.
    pub async fn flush(&mut self, sink: &dyn SinkBoxed) -> Result<(), ExportError> {
        if self.pending.is_empty() {
            return Ok(());
        }

        let spans: Vec<Span> = self.pending.drain().flat_map(|(_, spans)| spans).collect();
        let span_count = spans.len();
        let batch = SpanBatch::with_spans(spans);

        match sink.write_boxed(batch).await {
            Ok(()) => {
                self.metrics.record_success(span_count as u64);
                self.last_flush = Instant::now();
                Ok(())
            }
            Err(e) => {
                self.metrics.record_error();
                Err(e)
            }
        }
    }

    /// Takes all pending spans as a batch for the caller to export
    /// concurrently, without recording metrics (the caller does that).
    pub fn take_batch(&mut self) -> Option<SpanBatch> {
        if self.pending.is_empty() {
            return None;
        }
        let spans: Vec<Span> = self.pending.drain().flat_map(|(_, spans)| spans).collect();
        self.last_flush = Instant::now();
        Some(SpanBatch::with_spans(spans))
    }

    pub fn metrics(&self) -> &BatchMetrics {
        &self.metrics
    }

    pub fn metrics_mut(&mut self) -> &mut BatchMetrics {
        &mut self.metrics
    }
}
