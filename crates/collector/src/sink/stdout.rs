use crate::sink::{ExportError, Sink};
use tracesynth_model::SpanBatch;

/// Writes every span in a batch as a line to stdout. Adapted from
/// debasishg's `ringmpsc-rs` `StdoutExporter`.
pub struct StdoutSink {
    verbose: bool,
}

impl StdoutSink {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl Sink for StdoutSink {
    async fn write(&self, batch: SpanBatch) -> Result<(), ExportError> {
        if self.verbose {
            println!("=== exporting {} spans ===", batch.spans.len());
        }
        for span in &batch.spans {
            println!(
                "trace_id={:032x} span_id={:016x} parent={:016x} {}.{} duration={}ns error={}",
                span.trace_id,
                span.span_id,
                span.parent_span_id,
                span.service,
                span.operation,
                span.duration_nanos(),
                span.error,
            );
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "stdout"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writes_without_error() {
        let sink = StdoutSink::new(false);
        let batch = SpanBatch::new();
        assert!(sink.write(batch).await.is_ok());
    }
}
