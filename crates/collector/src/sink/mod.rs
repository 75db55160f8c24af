mod json;
mod null;
mod otlp;
mod stdout;

pub use json::JsonFileSink;
pub use null::NullSink;
pub use otlp::OtlpSink;
pub use stdout::StdoutSink;

use std::future::Future;
use std::pin::Pin;
use thiserror::Error;
use tracesynth_model::SpanBatch;

/// Errors raised delivering a batch to its destination, including
/// `CircuitOpen` for the resilient wrappers in [`crate::resilient`].
#[derive(Debug, Error, Clone)]
pub enum ExportError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("all retry attempts exhausted after {attempts} tries")]
    RetriesExhausted { attempts: u32 },
    #[error("sink operation timed out")]
    Timeout,
    #[error("circuit breaker open: sink unavailable")]
    CircuitOpen,
}

/// A destination for spans. Realizes the external write-span/flush
/// contract at batch granularity rather than one call per span: `write`
/// both appends the batch's spans and flushes them onward, since
/// [`crate::batch::BatchProcessor`] already decides flush timing before
/// a sink ever sees a batch. There is no separate `flush` method on this
/// trait for that reason; `run_emitter`'s consumer loop still issues one
/// final flush when the channel closes, covering whatever the last
/// partial batch holds. Uses native async fn in traits, not
/// `#[async_trait]`.
pub trait Sink: Send + Sync {
    fn write(&self, batch: SpanBatch) -> impl Future<Output = Result<(), ExportError>> + Send;

    fn name(&self) -> &str;
}

/// Object-safe counterpart of [`Sink`] for dynamic dispatch (`Box<dyn
/// SinkBoxed>`), since `impl Future` return types aren't object-safe.
pub trait SinkBoxed: Send + Sync {
    fn write_boxed(
        &self,
        batch: SpanBatch,
    ) -> Pin<Box<dyn Future<Output = Result<(), ExportError>> + Send + '_>>;

    fn name(&self) -> &str;
}

impl<T: Sink> SinkBoxed for T {
    fn write_boxed(
        &self,
        batch: SpanBatch,
    ) -> Pin<Box<dyn Future<Output = Result<(), ExportError>> + Send + '_>> {
        Box::pin(self.write(batch))
    }

    fn name(&self) -> &str {
        Sink::name(self)
    }
}
