use crate::sink::{ExportError, Sink};
use tracesynth_model::SpanBatch;

/// Appends each batch as a line-delimited JSON array to a file.
pub struct JsonFileSink {
    file_path: String,
}

impl JsonFileSink {
    pub fn new(file_path: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
        }
    }
}

impl Sink for JsonFileSink {
    async fn write(&self, batch: SpanBatch) -> Result<(), ExportError> {
        let mut json = serde_json::to_string(&batch.spans)
            .map_err(|e| ExportError::Serialization(e.to_string()))?;
        json.push('\n');

        use tokio::io::AsyncWriteExt;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file_path)
            .await
            .map_err(|e| ExportError::Transport(e.to_string()))?;
        file.write_all(json.as_bytes())
            .await
            .map_err(|e| ExportError::Transport(e.to_string()))?;

        Ok(())
    }

    fn name(&self) -> &str {
        "json_file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};
    use tracesynth_model::Span;

    #[tokio::test]
    async fn appends_one_json_line_per_batch() {
        let nonce = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
        let path = std::env::temp_dir().join(format!("tracesynth-json-sink-test-{nonce}.jsonl"));
        let path_str = path.to_string_lossy().to_string();
        let sink = JsonFileSink::new(path_str.clone());

        let mut batch = SpanBatch::new();
        batch.add(Span {
            trace_id: 1,
            span_id: 1,
            parent_span_id: 0,
            service: "svc".into(),
            operation: "op".into(),
            start_time: 0,
            end_time: 10,
            error: false,
            attributes: Default::default(),
            resource_attributes: Default::default(),
        });

        sink.write(batch).await.unwrap();
        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(contents.lines().count(), 1);
        tokio::fs::remove_file(&path).await.unwrap();
    }
}
