use crate::sink::{ExportError, Sink};
use opentelemetry_proto::tonic::collector::trace::v1::{
    trace_service_client::TraceServiceClient, ExportTraceServiceRequest,
};
use opentelemetry_proto::tonic::common::v1::{any_value::Value, AnyValue, InstrumentationScope, KeyValue};
use opentelemetry_proto::tonic::resource::v1::Resource;
use opentelemetry_proto::tonic::trace::v1::{span::SpanKind, ResourceSpans, ScopeSpans, Span as ProtoSpan, Status};
use std::collections::HashMap;
use tokio::sync::Mutex;
use tonic::transport::Channel as TonicChannel;
use tonic::Request;
use tracesynth_model::{AttributeValue, Span, SpanBatch};

/// Exports batches to an OTLP/gRPC collector. Modeled on the
/// `otel_load.rs` OTLP client pattern: same `TraceServiceClient` /
/// `ExportTraceServiceRequest` construction, generalized from a
/// hand-rolled load generator into a reusable sink.
pub struct OtlpSink {
    client: Mutex<TraceServiceClient<TonicChannel>>,
    endpoint: String,
}

impl OtlpSink {
    pub async fn connect(endpoint: impl Into<String>) -> Result<Self, ExportError> {
        let endpoint = endpoint.into();
        let client = TraceServiceClient::connect(endpoint.clone())
            .await
            .map_err(|e| ExportError::Transport(e.to_string()))?;
        Ok(Self {
            client: Mutex::new(client),
            endpoint,
        })
    }
}

fn attribute_any_value(value: &AttributeValue) -> AnyValue {
    let inner = match value {
        AttributeValue::String(s) => Value::StringValue(s.clone()),
        AttributeValue::Int(i) => Value::IntValue(*i),
        AttributeValue::Float(f) => Value::DoubleValue(*f),
        AttributeValue::Bool(b) => Value::BoolValue(*b),
        AttributeValue::Array(items) => {
            Value::StringValue(items.join(","))
        }
    };
    AnyValue { value: Some(inner) }
}

fn key_values(attrs: &HashMap<String, AttributeValue>) -> Vec<KeyValue> {
    attrs
        .iter()
        .map(|(k, v)| KeyValue {
            key: k.clone(),
            value: Some(attribute_any_value(v)),
        })
        .collect()
}

fn span_to_proto(span: &Span) -> ProtoSpan {
    ProtoSpan {
        trace_id: span.trace_id.to_be_bytes().to_vec(),
        span_id: span.span_id.to_be_bytes().to_vec(),
        trace_state: String::new(),
        parent_span_id: if span.parent_span_id == 0 {
            vec![]
        } else {
            span.parent_span_id.to_be_bytes().to_vec()
        },
        name: span.operation.clone(),
        kind: SpanKind::Internal as i32,
        flags: 0,
        start_time_unix_nano: span.start_time,
        end_time_unix_nano: span.end_time,
        attributes: key_values(&span.attributes),
        dropped_attributes_count: 0,
        events: vec![],
        dropped_events_count: 0,
        links: vec![],
        dropped_links_count: 0,
        status: Some(Status {
            code: if span.error { 2 } else { 1 },
            message: String::new(),
        }),
    }
}

fn group_by_service(spans: &[Span]) -> Vec<ResourceSpans> {
    let mut by_service: HashMap<&str, Vec<ProtoSpan>> = HashMap::new();
    let mut resource_attrs: HashMap<&str, &HashMap<String, AttributeValue>> = HashMap::new();
    for span in spans {
        by_service
            .entry(span.service.as_str())
            .or_default()
            .push(span_to_proto(span));
        resource_attrs.entry(span.service.as_str()).or_insert(&span.resource_attributes);
    }

    by_service
        .into_iter()
        .map(|(service, spans)| {
            let mut attrs = key_values(resource_attrs.get(service).copied().unwrap_or(&HashMap::new()));
            attrs.push(KeyValue {
                key: "service.name".to_string(),
                value: Some(AnyValue {
                    value: Some(Value::StringValue(service.to_string())),
                }),
            });
            ResourceSpans {
                resource: Some(Resource {
                    attributes: attrs,
                    dropped_attributes_count: 0,
                }),
                scope_spans: vec![ScopeSpans {
                    scope: Some(InstrumentationScope {
                        name: "tracesynth".to_string(),
                        version: env!("CARGO_PKG_VERSION").to_string(),
                        attributes: vec![],
                        dropped_attributes_count: 0,
                    }),
                    spans,
                    schema_url: String::new(),
                }],
                schema_url: String::new(),
            }
        })
        .collect()
}

impl Sink for OtlpSink {
    async fn write(&self, batch: SpanBatch) -> Result<(), ExportError> {
        let resource_spans = group_by_service(&batch.spans);
        let request = Request::new(ExportTraceServiceRequest { resource_spans });

        let mut client = self.client.lock().await;
        client
            .export(request)
            .await
            .map_err(|e| ExportError::Transport(e.to_string()))?;
        Ok(())
    }

    fn name(&self) -> &str {
        &self.endpoint
    }
}
