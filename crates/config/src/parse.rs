//! Hand-written parsers for the literal grammars the YAML config uses for
//! durations, rates, and percentages. No regex dependency: each grammar is
//! small enough that pulling one in would be overkill, matching the
//! minimal-parsing-dependency preference elsewhere in the workspace.

use std::time::Duration;
use thiserror::Error;
use tracesynth_model::DurationSpec;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    #[error("empty duration literal")]
    EmptyDuration,
    #[error("invalid duration literal {0:?}: expected e.g. \"10ms\" or \"10ms +/- 2ms\"")]
    InvalidDuration(String),
    #[error("unknown duration unit {0:?}: expected one of ns, us, ms, s, m, h")]
    UnknownUnit(String),
    #[error("invalid rate literal {0:?}: expected e.g. \"100/s\" or \"5/m\"")]
    InvalidRate(String),
    #[error("unknown rate unit {0:?}: expected one of s, m, h")]
    UnknownRateUnit(String),
    #[error("invalid percentage literal {0:?}: expected e.g. \"12%\" or \"0.12\"")]
    InvalidPercentage(String),
    #[error("percentage {0} out of range [0, 1] (or [0%, 100%])")]
    PercentageOutOfRange(f64),
}

/// Splits a numeric magnitude from its trailing unit suffix, e.g.
/// `"250ms"` -> `(250.0, "ms")`.
fn split_magnitude_unit(token: &str) -> Option<(f64, &str)> {
    let split_at = token.find(|c: char| !c.is_ascii_digit() && c != '.' && c != '-')?;
    let (magnitude, unit) = token.split_at(split_at);
    magnitude.trim().parse::<f64>().ok().map(|m| (m, unit.trim()))
}

fn unit_to_duration(magnitude: f64, unit: &str) -> Result<Duration, ParseError> {
    if magnitude < 0.0 {
        return Err(ParseError::InvalidDuration(format!("{magnitude}{unit}")));
    }
    let seconds = match unit {
        "ns" => magnitude / 1_000_000_000.0,
        "us" | "\u{b5}s" => magnitude / 1_000_000.0,
        "ms" => magnitude / 1_000.0,
        "s" => magnitude,
        "m" => magnitude * 60.0,
        "h" => magnitude * 3600.0,
        other => return Err(ParseError::UnknownUnit(other.to_string())),
    };
    Ok(Duration::from_secs_f64(seconds))
}

/// Parses a single duration literal like `"10ms"` or `"1.5s"`.
pub fn parse_duration(literal: &str) -> Result<Duration, ParseError> {
    let trimmed = literal.trim();
    if trimmed.is_empty() {
        return Err(ParseError::EmptyDuration);
    }
    let (magnitude, unit) =
        split_magnitude_unit(trimmed).ok_or_else(|| ParseError::InvalidDuration(trimmed.to_string()))?;
    unit_to_duration(magnitude, unit)
}

/// Parses a `"mean +/- stddev"` duration spec literal, e.g. `"10ms +/- 2ms"`.
/// A literal with no `+/-` clause is treated as fixed (stddev zero).
pub fn parse_duration_spec(literal: &str) -> Result<DurationSpec, ParseError> {
    let trimmed = literal.trim();
    if trimmed.is_empty() {
        return Err(ParseError::EmptyDuration);
    }
    match trimmed.split_once("+/-") {
        Some((mean_part, stddev_part)) => {
            let mean = parse_duration(mean_part)?;
            let stddev = parse_duration(stddev_part)?;
            Ok(DurationSpec { mean, stddev })
        }
        None => Ok(DurationSpec::fixed(parse_duration(trimmed)?)),
    }
}

/// Parses a rate literal like `"100/s"` or `"5/m"` into traces-per-second.
pub fn parse_rate(literal: &str) -> Result<f64, ParseError> {
    let trimmed = literal.trim();
    let (count_part, unit_part) = trimmed
        .split_once('/')
        .ok_or_else(|| ParseError::InvalidRate(trimmed.to_string()))?;
    let count: f64 = count_part
        .trim()
        .parse()
        .map_err(|_| ParseError::InvalidRate(trimmed.to_string()))?;
    if count < 0.0 {
        return Err(ParseError::InvalidRate(trimmed.to_string()));
    }
    let per_second = match unit_part.trim() {
        "s" => count,
        "m" => count / 60.0,
        "h" => count / 3600.0,
        other => return Err(ParseError::UnknownRateUnit(other.to_string())),
    };
    Ok(per_second)
}

/// Parses a percentage literal: either a trailing-`%` form (`"12%"`,
/// meaning 0.12) or a bare fraction (`"0.12"`). Always validated to
/// `[0, 1]`.
pub fn parse_percentage(literal: &str) -> Result<f64, ParseError> {
    let trimmed = literal.trim();
    if trimmed.is_empty() {
        return Err(ParseError::InvalidPercentage(trimmed.to_string()));
    }
    let value = if let Some(stripped) = trimmed.strip_suffix('%') {
        let pct: f64 = stripped
            .trim()
            .parse()
            .map_err(|_| ParseError::InvalidPercentage(trimmed.to_string()))?;
        pct / 100.0
    } else {
        trimmed
            .parse()
            .map_err(|_| ParseError::InvalidPercentage(trimmed.to_string()))?
    };
    if !(0.0..=1.0).contains(&value) {
        return Err(ParseError::PercentageOutOfRange(value));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_duration_units() {
        assert_eq!(parse_duration("10ms").unwrap(), Duration::from_millis(10));
        assert_eq!(parse_duration("1.5s").unwrap(), Duration::from_millis(1500));
        assert_eq!(parse_duration("500ns").unwrap(), Duration::from_nanos(500));
        assert_eq!(parse_duration("2m").unwrap(), Duration::from_secs(120));
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
    }

    #[test]
    fn rejects_unknown_duration_unit() {
        assert!(matches!(parse_duration("10xy"), Err(ParseError::UnknownUnit(_))));
    }

    #[test]
    fn parses_duration_spec_with_stddev() {
        let spec = parse_duration_spec("10ms +/- 2ms").unwrap();
        assert_eq!(spec.mean, Duration::from_millis(10));
        assert_eq!(spec.stddev, Duration::from_millis(2));
    }

    #[test]
    fn parses_fixed_duration_spec_without_stddev() {
        let spec = parse_duration_spec("10ms").unwrap();
        assert_eq!(spec.mean, Duration::from_millis(10));
        assert_eq!(spec.stddev, Duration::ZERO);
    }

    #[test]
    fn parses_rate_per_second_per_minute_per_hour() {
        assert_eq!(parse_rate("100/s").unwrap(), 100.0);
        assert_eq!(parse_rate("60/m").unwrap(), 1.0);
        assert_eq!(parse_rate("3600/h").unwrap(), 1.0);
    }

    #[test]
    fn parses_percentage_literal_and_fraction() {
        assert_eq!(parse_percentage("12%").unwrap(), 0.12);
        assert_eq!(parse_percentage("0.12").unwrap(), 0.12);
    }

    #[test]
    fn rejects_out_of_range_percentage() {
        assert!(matches!(
            parse_percentage("150%"),
            Err(ParseError::PercentageOutOfRange(_))
        ));
    }
}
