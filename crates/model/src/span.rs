use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::SystemTime;

/// A typed attribute value attached to a span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Array(Vec<String>),
}

impl From<String> for AttributeValue {
    fn from(v: String) -> Self {
        AttributeValue::String(v)
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        AttributeValue::String(v.to_string())
    }
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        AttributeValue::Int(v)
    }
}

impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        AttributeValue::Float(v)
    }
}

impl From<bool> for AttributeValue {
    fn from(v: bool) -> Self {
        AttributeValue::Bool(v)
    }
}

/// A single emitted span, produced by the trace tree sampler and
/// handed off to a sink. Transient: it exists only between sampling
/// and delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Span {
    /// 128-bit trace identifier, shared by every span in the tree.
    pub trace_id: u128,
    /// 64-bit span identifier, unique within the trace.
    pub span_id: u64,
    /// Parent span identifier; zero marks the root span.
    pub parent_span_id: u64,
    pub service: String,
    pub operation: String,
    /// Synthetic wall-clock start, Unix nanoseconds.
    pub start_time: u64,
    /// Synthetic wall-clock end, Unix nanoseconds. Always `>= start_time`.
    pub end_time: u64,
    pub error: bool,
    pub attributes: HashMap<String, AttributeValue>,
    /// Static attributes copied from the owning service's resource attributes.
    pub resource_attributes: HashMap<String, AttributeValue>,
}

impl Span {
    pub fn duration_nanos(&self) -> u64 {
        self.end_time.saturating_sub(self.start_time)
    }
}

/// A batch of spans ready for export.
#[derive(Debug, Clone)]
pub struct SpanBatch {
    pub spans: Vec<Span>,
    pub timestamp: SystemTime,
}

impl SpanBatch {
    pub fn new() -> Self {
        Self {
            spans: Vec::new(),
            timestamp: SystemTime::now(),
        }
    }

    pub fn with_spans(spans: Vec<Span>) -> Self {
        Self {
            spans,
            timestamp: SystemTime::now(),
        }
    }

    pub fn add(&mut self, span: Span) {
        self.spans.push(span);
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }
}

impl Default for SpanBatch {
    fn default() -> Self {
        Self::new()
    }
}
