use crate::sink::{ExportError, Sink};
use tracesynth_model::SpanBatch;

/// Discards every span; useful for benchmarking the emitter loop
/// without I/O.
#[derive(Default)]
pub struct NullSink;

impl NullSink {
    pub fn new() -> Self {
        Self
    }
}

impl Sink for NullSink {
    async fn write(&self, _batch: SpanBatch) -> Result<(), ExportError> {
        Ok(())
    }

    fn name(&self) -> &str {
        "null"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn discards_spans_without_error() {
        let sink = NullSink::new();
        let mut batch = SpanBatch::new();
        for i in 0..100u128 {
            batch.add(tracesynth_model::Span {
                trace_id: i,
                span_id: i as u64,
                parent_span_id: 0,
                service: "svc".into(),
                operation: "op".into(),
                start_time: 0,
                end_time: 1,
                error: false,
                attributes: Default::default(),
                resource_attributes: Default::default(),
            });
        }
        assert!(sink.write(batch).await.is_ok());
    }
}
