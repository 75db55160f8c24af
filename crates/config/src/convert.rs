//! Converts the deserialized [`crate::schema`] DTOs into
//! `tracesynth-model`'s validated configuration types, running the
//! duration/rate/percentage literal parsers from [`crate::parse`] along
//! the way.

use crate::parse::{parse_duration, parse_duration_spec, parse_percentage, parse_rate, ParseError};
use crate::schema::{
    AttributeGeneratorDto, CallConditionDto, CallDto, CallStyleDto, OperationDto,
    OperationOverrideDto, PiecewiseSegmentDto, ScenarioDto, ServiceDto, TopologyDto,
    TrafficPatternDto,
};
use std::collections::HashMap;
use thiserror::Error;
use tracesynth_model::{
    AttributeGeneratorConfig, CallCondition, CallConfig, CallStyle, OperationConfig,
    OperationOverrideConfig, PiecewiseSegment, ScenarioConfig, ServiceConfig, TopologyConfig,
    TrafficPatternConfig,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading config file {path:?}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("{field}: {source}")]
    Literal {
        field: String,
        #[source]
        source: ParseError,
    },
    #[error("call target {0:?} must be of the form \"service.operation\"")]
    MalformedTarget(String),
    #[error("scenario override key {0:?} must be of the form \"service.operation\"")]
    MalformedOverrideKey(String),
}

fn literal<T>(field: &str, result: Result<T, ParseError>) -> Result<T, ConfigError> {
    result.map_err(|source| ConfigError::Literal {
        field: field.to_string(),
        source,
    })
}

/// Accepts either a bare YAML number (`0.12`) or a percentage-literal
/// string (`"12%"`) for probability/error-rate fields.
fn percentage_value(field: &str, value: &serde_yaml::Value) -> Result<f64, ConfigError> {
    match value {
        serde_yaml::Value::String(s) => literal(field, parse_percentage(s)),
        serde_yaml::Value::Number(n) => {
            let v = n.as_f64().ok_or_else(|| ConfigError::Literal {
                field: field.to_string(),
                source: ParseError::InvalidPercentage(value_repr(value)),
            })?;
            if !(0.0..=1.0).contains(&v) {
                return Err(ConfigError::Literal {
                    field: field.to_string(),
                    source: ParseError::PercentageOutOfRange(v),
                });
            }
            Ok(v)
        }
        other => Err(ConfigError::Literal {
            field: field.to_string(),
            source: ParseError::InvalidPercentage(value_repr(other)),
        }),
    }
}

fn value_repr(value: &serde_yaml::Value) -> String {
    serde_yaml::to_string(value).unwrap_or_default().trim().to_string()
}

fn split_target(target: &str) -> Result<(String, String), ConfigError> {
    target
        .split_once('.')
        .map(|(s, o)| (s.to_string(), o.to_string()))
        .ok_or_else(|| ConfigError::MalformedTarget(target.to_string()))
}

fn convert_generator(dto: &AttributeGeneratorDto) -> Result<AttributeGeneratorConfig, ConfigError> {
    let probability = dto
        .probability
        .as_ref()
        .map(|v| percentage_value("attribute probability", v))
        .transpose()?;
    Ok(AttributeGeneratorConfig {
        static_value: dto.static_value.clone(),
        weighted_choice: dto
            .weighted_choice
            .as_ref()
            .map(|entries| entries.iter().map(|e| (e.value.clone(), e.weight)).collect()),
        sequence: dto.sequence.clone(),
        probability,
        range: dto.range,
        distribution: dto.distribution.as_ref().map(|d| (d.mean, d.stddev)),
    })
}

fn convert_attributes(
    dtos: &HashMap<String, AttributeGeneratorDto>,
) -> Result<HashMap<String, AttributeGeneratorConfig>, ConfigError> {
    dtos.iter()
        .map(|(name, dto)| convert_generator(dto).map(|g| (name.clone(), g)))
        .collect()
}

fn convert_call(dto: &CallDto) -> Result<CallConfig, ConfigError> {
    let (target_service, target_operation) = split_target(&dto.target)?;
    let probability = match &dto.probability {
        Some(v) => percentage_value("call probability", v)?,
        None => 1.0,
    };
    let condition = match dto.condition {
        Some(CallConditionDto::None) | None => CallCondition::None,
        Some(CallConditionDto::OnError) => CallCondition::OnError,
        Some(CallConditionDto::OnSuccess) => CallCondition::OnSuccess,
    };
    let timeout = dto
        .timeout
        .as_deref()
        .map(|s| literal("call timeout", parse_duration(s)))
        .transpose()?;
    let retry_backoff = match &dto.retry_backoff {
        Some(s) => literal("call retry_backoff", parse_duration(s))?,
        None => std::time::Duration::ZERO,
    };
    Ok(CallConfig {
        target_service,
        target_operation,
        probability,
        condition,
        count: dto.count,
        timeout,
        retries: dto.retries,
        retry_backoff,
    })
}

fn convert_operation(dto: &OperationDto) -> Result<OperationConfig, ConfigError> {
    let duration = literal("operation duration", parse_duration_spec(&dto.duration))?;
    let error_rate = match &dto.error_rate {
        Some(v) => percentage_value("operation error_rate", v)?,
        None => 0.0,
    };
    let call_style = match dto.call_style {
        Some(CallStyleDto::Sequential) => CallStyle::Sequential,
        Some(CallStyleDto::Parallel) | None => CallStyle::Parallel,
    };
    let attributes = convert_attributes(&dto.attributes)?;
    let calls = dto.calls.iter().map(convert_call).collect::<Result<Vec<_>, _>>()?;

    Ok(OperationConfig {
        name: dto.name.clone(),
        duration,
        error_rate,
        call_style,
        attributes,
        calls,
        domain: dto.domain.clone(),
        weight: dto.weight,
    })
}

fn convert_service(dto: &ServiceDto) -> Result<ServiceConfig, ConfigError> {
    let operations = dto
        .operations
        .iter()
        .map(convert_operation)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ServiceConfig {
        name: dto.name.clone(),
        resource_attributes: dto.resource_attributes.clone(),
        operations,
    })
}

fn convert_override(dto: &OperationOverrideDto) -> Result<OperationOverrideConfig, ConfigError> {
    let duration = dto
        .duration
        .as_deref()
        .map(|s| literal("scenario override duration", parse_duration_spec(s)))
        .transpose()?;
    let error_rate = match &dto.error_rate {
        Some(v) => Some(percentage_value("scenario override error_rate", v)?),
        None => None,
    };
    let attributes = convert_attributes(&dto.attributes)?;
    Ok(OperationOverrideConfig {
        duration,
        error_rate,
        attributes,
    })
}

fn convert_segment(dto: &PiecewiseSegmentDto) -> Result<PiecewiseSegment, ConfigError> {
    Ok(PiecewiseSegment {
        start: literal("piecewise segment start", parse_duration(&dto.start))?,
        end: literal("piecewise segment end", parse_duration(&dto.end))?,
        rate: literal("piecewise segment rate", parse_rate(&dto.rate))?,
    })
}

fn convert_traffic(dto: &TrafficPatternDto) -> Result<TrafficPatternConfig, ConfigError> {
    Ok(match dto {
        TrafficPatternDto::Uniform { rate } => TrafficPatternConfig::Uniform {
            rate: literal("traffic rate", parse_rate(rate))?,
        },
        TrafficPatternDto::Diurnal {
            rate,
            peak,
            trough,
            period,
        } => TrafficPatternConfig::Diurnal {
            rate: literal("traffic rate", parse_rate(rate))?,
            peak: *peak,
            trough: *trough,
            period: literal("traffic period", parse_duration(period))?,
        },
        TrafficPatternDto::Bursty {
            rate,
            burst_multiplier,
            interval,
            duration,
        } => TrafficPatternConfig::Bursty {
            rate: literal("traffic rate", parse_rate(rate))?,
            burst_multiplier: *burst_multiplier,
            interval: literal("traffic interval", parse_duration(interval))?,
            duration: literal("traffic duration", parse_duration(duration))?,
        },
        TrafficPatternDto::Piecewise { segments } => TrafficPatternConfig::Piecewise {
            segments: segments.iter().map(convert_segment).collect::<Result<Vec<_>, _>>()?,
        },
        TrafficPatternDto::Overlay { patterns } => TrafficPatternConfig::Overlay {
            patterns: patterns.iter().map(convert_traffic).collect::<Result<Vec<_>, _>>()?,
        },
    })
}

fn convert_scenario(dto: &ScenarioDto) -> Result<ScenarioConfig, ConfigError> {
    let start = literal("scenario start", parse_duration(&dto.start))?;
    let end = literal("scenario end", parse_duration(&dto.end))?;
    let mut overrides = HashMap::with_capacity(dto.overrides.len());
    for (key, override_dto) in &dto.overrides {
        let (service, operation) = split_target(key).map_err(|_| ConfigError::MalformedOverrideKey(key.clone()))?;
        overrides.insert((service, operation), convert_override(override_dto)?);
    }
    let traffic = dto.traffic.as_ref().map(convert_traffic).transpose()?;
    Ok(ScenarioConfig {
        name: dto.name.clone(),
        start,
        end,
        priority: dto.priority,
        overrides,
        traffic,
    })
}

/// Converts a fully-parsed [`TopologyDto`] into the validated
/// [`TopologyConfig`] the core's `BuildTopology` consumes.
pub fn convert_topology(dto: &TopologyDto) -> Result<TopologyConfig, ConfigError> {
    let services = dto.services.iter().map(convert_service).collect::<Result<Vec<_>, _>>()?;
    let traffic = convert_traffic(&dto.traffic)?;
    let scenarios = dto
        .scenarios
        .iter()
        .map(convert_scenario)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(TopologyConfig {
        services,
        traffic,
        scenarios,
    })
}
