use std::f64::consts::PI;
use std::time::Duration;
use thiserror::Error;
use tracesynth_model::{PiecewiseSegment, TrafficPatternConfig};

#[derive(Debug, Error, PartialEq)]
pub enum PatternError {
    #[error("traffic rate must be >= 0, got {0}")]
    NegativeRate(f64),
    #[error("burst multiplier must be >= 0, got {0}")]
    NegativeMultiplier(f64),
    #[error("period must be > 0, got {0:?}")]
    NonPositivePeriod(Duration),
    #[error("peak must be > 0, got {0}")]
    NonPositivePeak(f64),
    #[error("trough must be >= 0, got {0}")]
    NegativeTrough(f64),
    #[error("bursty interval must be > 0, got {0:?}")]
    NonPositiveInterval(Duration),
    #[error("bursty duration must be > 0, got {0:?}")]
    NonPositiveBurstDuration(Duration),
    #[error("piecewise segment end ({end:?}) must be after start ({start:?})")]
    MalformedSegment { start: Duration, end: Duration },
    #[error("overlay must combine at least one pattern")]
    EmptyOverlay,
}

/// A pure function of elapsed run time to an arrival rate, compiled
/// from a [`TrafficPatternConfig`].
#[derive(Debug, Clone)]
pub enum TrafficPattern {
    Uniform {
        rate: f64,
    },
    Diurnal {
        rate: f64,
        peak: f64,
        trough: f64,
        period: Duration,
    },
    Bursty {
        rate: f64,
        burst_multiplier: f64,
        interval: Duration,
        duration: Duration,
    },
    Piecewise {
        segments: Vec<PiecewiseSegment>,
    },
    Overlay {
        patterns: Vec<TrafficPattern>,
    },
}

impl TrafficPattern {
    pub fn compile(config: &TrafficPatternConfig) -> Result<Self, PatternError> {
        match config {
            TrafficPatternConfig::Uniform { rate } => {
                if *rate < 0.0 {
                    return Err(PatternError::NegativeRate(*rate));
                }
                Ok(TrafficPattern::Uniform { rate: *rate })
            }
            TrafficPatternConfig::Diurnal {
                rate,
                peak,
                trough,
                period,
            } => {
                if *rate < 0.0 {
                    return Err(PatternError::NegativeRate(*rate));
                }
                if *peak <= 0.0 {
                    return Err(PatternError::NonPositivePeak(*peak));
                }
                if *trough < 0.0 {
                    return Err(PatternError::NegativeTrough(*trough));
                }
                if period.is_zero() {
                    return Err(PatternError::NonPositivePeriod(*period));
                }
                Ok(TrafficPattern::Diurnal {
                    rate: *rate,
                    peak: *peak,
                    trough: *trough,
                    period: *period,
                })
            }
            TrafficPatternConfig::Bursty {
                rate,
                burst_multiplier,
                interval,
                duration,
            } => {
                if *rate < 0.0 {
                    return Err(PatternError::NegativeRate(*rate));
                }
                if *burst_multiplier < 0.0 {
                    return Err(PatternError::NegativeMultiplier(*burst_multiplier));
                }
                if interval.is_zero() {
                    return Err(PatternError::NonPositiveInterval(*interval));
                }
                if duration.is_zero() {
                    return Err(PatternError::NonPositiveBurstDuration(*duration));
                }
                Ok(TrafficPattern::Bursty {
                    rate: *rate,
                    burst_multiplier: *burst_multiplier,
                    interval: *interval,
                    duration: *duration,
                })
            }
            TrafficPatternConfig::Piecewise { segments } => {
                for segment in segments {
                    if segment.end <= segment.start {
                        return Err(PatternError::MalformedSegment {
                            start: segment.start,
                            end: segment.end,
                        });
                    }
                    if segment.rate < 0.0 {
                        return Err(PatternError::NegativeRate(segment.rate));
                    }
                }
                Ok(TrafficPattern::Piecewise {
                    segments: segments.clone(),
                })
            }
            TrafficPatternConfig::Overlay { patterns } => {
                if patterns.is_empty() {
                    return Err(PatternError::EmptyOverlay);
                }
                let compiled = patterns
                    .iter()
                    .map(TrafficPattern::compile)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(TrafficPattern::Overlay { patterns: compiled })
            }
        }
    }

    /// Arrival rate in traces per second at the given elapsed run time.
    pub fn rate(&self, elapsed: Duration) -> f64 {
        match self {
            TrafficPattern::Uniform { rate } => *rate,
            TrafficPattern::Diurnal {
                rate,
                peak,
                trough,
                period,
            } => {
                let t = elapsed.as_secs_f64();
                let phase = 2.0 * PI * t / period.as_secs_f64() - PI / 2.0;
                let envelope = trough + (peak - trough) * ((1.0 + phase.sin()) / 2.0) / peak;
                rate * envelope
            }
            TrafficPattern::Bursty {
                rate,
                burst_multiplier,
                interval,
                duration,
            } => {
                let t = elapsed.as_secs_f64();
                let phase = t % interval.as_secs_f64();
                if phase < duration.as_secs_f64() {
                    rate * burst_multiplier
                } else {
                    *rate
                }
            }
            TrafficPattern::Piecewise { segments } => segments
                .iter()
                .find(|segment| elapsed >= segment.start && elapsed < segment.end)
                .map_or(0.0, |segment| segment.rate),
            TrafficPattern::Overlay { patterns } => {
                patterns.iter().map(|p| p.rate(elapsed)).sum()
            }
        }
    }
}
