//! Parses the `--sink` argument into a constructed [`SinkBoxed`].

use anyhow::{bail, Context};
use std::sync::Arc;
use tracesynth_collector::{JsonFileSink, NullSink, OtlpSink, SinkBoxed, StdoutSink};

pub async fn build_sink(spec: &str) -> anyhow::Result<Arc<dyn SinkBoxed>> {
    let sink: Arc<dyn SinkBoxed> = match spec.split_once(':') {
        None if spec == "stdout" => Arc::new(StdoutSink::new(false)),
        None if spec == "null" => Arc::new(NullSink::new()),
        None => bail!("unknown sink {spec:?}: expected \"stdout\", \"json:<path>\", or \"otlp:<endpoint>\""),
        Some(("json", path)) => {
            if path.is_empty() {
                bail!("json sink requires a file path, e.g. \"json:./spans.jsonl\"");
            }
            Arc::new(JsonFileSink::new(path))
        }
        Some(("otlp", endpoint)) => {
            if endpoint.is_empty() {
                bail!("otlp sink requires an endpoint, e.g. \"otlp:http://localhost:4317\"");
            }
            Arc::new(
                OtlpSink::connect(endpoint.to_string())
                    .await
                    .with_context(|| format!("connecting OTLP sink to {endpoint}"))?,
            )
        }
        Some((scheme, _)) => bail!("unknown sink scheme {scheme:?}: expected \"json\" or \"otlp\""),
    };
    Ok(sink)
}
