//! YAML configuration loading for TraceSynth. Reads the declarative
//! topology description the core synthesis engine is not itself
//! responsible for parsing, and turns it into the plain, already-validated
//! `tracesynth_model::TopologyConfig` that
//! `tracesynth_topology::Topology::build` consumes. Never calls
//! `BuildTopology` itself — that stays the caller's responsibility, so
//! this crate has no dependency on `tracesynth-sampler` or
//! `tracesynth-collector`.

mod convert;
mod parse;
mod schema;

pub use convert::ConfigError;
pub use parse::{parse_duration, parse_duration_spec, parse_percentage, parse_rate, ParseError};

use std::path::Path;
use tracesynth_model::TopologyConfig;

/// Parses a YAML document already in memory.
pub fn parse_str(yaml: &str) -> Result<TopologyConfig, ConfigError> {
    let dto: schema::TopologyDto = serde_yaml::from_str(yaml)?;
    convert::convert_topology(&dto)
}

/// Reads and parses a YAML configuration file from disk.
pub fn load_file(path: impl AsRef<Path>) -> Result<TopologyConfig, ConfigError> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_str(&contents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tracesynth_model::{CallCondition, CallStyle, TrafficPatternConfig};

    const SAMPLE: &str = r#"
services:
  - name: frontend
    resource_attributes:
      region: us-east-1
    operations:
      - name: handle_request
        duration: "10ms +/- 2ms"
        error_rate: "2%"
        call_style: sequential
        weight: 3
        attributes:
          http.method:
            weighted_choice:
              - value: GET
                weight: 70
              - value: POST
                weight: 30
        calls:
          - target: backend.query
            probability: "95%"
            condition: on-success
            count: 1
            timeout: "50ms"
            retries: 2
            retry_backoff: "5ms"
  - name: backend
    operations:
      - name: query
        duration: "20ms"
        domain: db
traffic:
  uniform:
    rate: "100/s"
scenarios:
  - name: spike
    start: "5s"
    end: "10s"
    priority: 10
    traffic:
      uniform:
        rate: "500/s"
    overrides:
      backend.query:
        error_rate: "50%"
"#;

    #[test]
    fn parses_full_sample_document() {
        let config = parse_str(SAMPLE).unwrap();
        assert_eq!(config.services.len(), 2);

        let frontend = &config.services[0];
        assert_eq!(frontend.resource_attributes.len(), 1);
        let op = &frontend.operations[0];
        assert_eq!(op.duration.mean, Duration::from_millis(10));
        assert_eq!(op.duration.stddev, Duration::from_millis(2));
        assert!((op.error_rate - 0.02).abs() < 1e-9);
        assert_eq!(op.call_style, CallStyle::Sequential);
        assert_eq!(op.weight, 3);

        let call = &op.calls[0];
        assert_eq!(call.target_service, "backend");
        assert_eq!(call.target_operation, "query");
        assert!((call.probability - 0.95).abs() < 1e-9);
        assert_eq!(call.condition, CallCondition::OnSuccess);
        assert_eq!(call.timeout, Some(Duration::from_millis(50)));
        assert_eq!(call.retries, 2);
        assert_eq!(call.retry_backoff, Duration::from_millis(5));

        match config.traffic {
            TrafficPatternConfig::Uniform { rate } => assert_eq!(rate, 100.0),
            other => panic!("expected uniform traffic, got {other:?}"),
        }

        assert_eq!(config.scenarios.len(), 1);
        let scenario = &config.scenarios[0];
        assert_eq!(scenario.start, Duration::from_secs(5));
        assert_eq!(scenario.end, Duration::from_secs(10));
        assert_eq!(scenario.priority, 10);
        let key = ("backend".to_string(), "query".to_string());
        assert!((scenario.overrides[&key].error_rate.unwrap() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn rejects_malformed_call_target() {
        let yaml = r#"
services:
  - name: a
    operations:
      - name: x
        duration: "1ms"
        calls:
          - target: "no-dot-here"
traffic:
  uniform:
    rate: "1/s"
"#;
        let err = parse_str(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::MalformedTarget(_)));
    }

    #[test]
    fn rejects_invalid_yaml() {
        let err = parse_str("not: valid: yaml: [").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));
    }

    #[test]
    fn loading_missing_file_is_an_io_error() {
        let err = load_file("/nonexistent/tracesynth-config-test.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
