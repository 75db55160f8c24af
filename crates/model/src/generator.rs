use crate::span::AttributeValue;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

/// Raw, not-yet-validated attribute generator configuration. Exactly one
/// of the optional fields must be set; [`AttributeGeneratorConfig::compile`]
/// enforces this and turns the config into a runnable [`AttributeGenerator`].
#[derive(Debug, Clone, Default)]
pub struct AttributeGeneratorConfig {
    pub static_value: Option<AttributeValue>,
    pub weighted_choice: Option<Vec<(String, u32)>>,
    pub sequence: Option<String>,
    pub probability: Option<f64>,
    pub range: Option<(i64, i64)>,
    pub distribution: Option<(f64, f64)>,
}

#[derive(Debug, Error, PartialEq)]
pub enum GeneratorError {
    #[error("attribute generator must set exactly one kind, found {0}")]
    KindCount(usize),
    #[error("weighted-choice must have at least one value")]
    EmptyChoices,
    #[error("weighted-choice weight for {value:?} must be > 0, got {weight}")]
    NonPositiveWeight { value: String, weight: u32 },
    #[error("range min ({min}) must be <= max ({max})")]
    InvalidRange { min: i64, max: i64 },
    #[error("probability must be within [0, 1], got {0}")]
    ProbabilityOutOfRange(f64),
    #[error("distribution stddev must be >= 0, got {0}")]
    NegativeStddev(f64),
}

impl AttributeGeneratorConfig {
    pub fn compile(&self) -> Result<AttributeGenerator, GeneratorError> {
        let kinds_set = [
            self.static_value.is_some(),
            self.weighted_choice.is_some(),
            self.sequence.is_some(),
            self.probability.is_some(),
            self.range.is_some(),
            self.distribution.is_some(),
        ]
        .iter()
        .filter(|set| **set)
        .count();

        if kinds_set != 1 {
            return Err(GeneratorError::KindCount(kinds_set));
        }

        if let Some(value) = &self.static_value {
            return Ok(AttributeGenerator::Static(value.clone()));
        }

        if let Some(choices) = &self.weighted_choice {
            if choices.is_empty() {
                return Err(GeneratorError::EmptyChoices);
            }
            let mut values = Vec::with_capacity(choices.len());
            let mut cumulative_weights = Vec::with_capacity(choices.len());
            let mut total: u64 = 0;
            for (value, weight) in choices {
                if *weight == 0 {
                    return Err(GeneratorError::NonPositiveWeight {
                        value: value.clone(),
                        weight: *weight,
                    });
                }
                total += u64::from(*weight);
                values.push(value.clone());
                cumulative_weights.push(total);
            }
            return Ok(AttributeGenerator::WeightedChoice {
                values,
                cumulative_weights,
                total,
            });
        }

        if let Some(pattern) = &self.sequence {
            return Ok(AttributeGenerator::Sequence {
                pattern: pattern.clone(),
                counter: AtomicU64::new(1),
            });
        }

        if let Some(p) = self.probability {
            if !(0.0..=1.0).contains(&p) {
                return Err(GeneratorError::ProbabilityOutOfRange(p));
            }
            return Ok(AttributeGenerator::Probability(p));
        }

        if let Some((min, max)) = self.range {
            if min > max {
                return Err(GeneratorError::InvalidRange { min, max });
            }
            return Ok(AttributeGenerator::Range { min, max });
        }

        let (mean, stddev) = self.distribution.unwrap();
        if stddev < 0.0 {
            return Err(GeneratorError::NegativeStddev(stddev));
        }
        Ok(AttributeGenerator::Distribution { mean, stddev })
    }
}

/// The closed set of attribute generator kinds, compiled and ready to
/// sample. `Sequence` owns its counter so that the same generator
/// instance keeps incrementing across every call for the lifetime of
/// the run.
#[derive(Debug)]
pub enum AttributeGenerator {
    Static(AttributeValue),
    WeightedChoice {
        values: Vec<String>,
        cumulative_weights: Vec<u64>,
        total: u64,
    },
    Sequence {
        pattern: String,
        counter: AtomicU64,
    },
    Probability(f64),
    Range {
        min: i64,
        max: i64,
    },
    Distribution {
        mean: f64,
        stddev: f64,
    },
}

impl AttributeGenerator {
    pub fn sample(&self, rng: &mut dyn rand::RngCore) -> AttributeValue {
        match self {
            AttributeGenerator::Static(value) => value.clone(),
            AttributeGenerator::WeightedChoice {
                values,
                cumulative_weights,
                total,
            } => {
                let draw = rng.gen_range(0..*total);
                let idx = cumulative_weights
                    .iter()
                    .position(|cumulative| draw < *cumulative)
                    .unwrap_or(values.len() - 1);
                AttributeValue::String(values[idx].clone())
            }
            AttributeGenerator::Sequence { pattern, counter } => {
                let n = counter.fetch_add(1, Ordering::Relaxed);
                AttributeValue::String(pattern.replace("{n}", &n.to_string()))
            }
            AttributeGenerator::Probability(p) => AttributeValue::Bool(rng.gen_bool(*p)),
            AttributeGenerator::Range { min, max } => {
                AttributeValue::Int(rng.gen_range(*min..=*max))
            }
            AttributeGenerator::Distribution { mean, stddev } => {
                let normal = Normal::new(*mean, stddev.max(f64::MIN_POSITIVE)).unwrap();
                let sample = if *stddev == 0.0 {
                    *mean
                } else {
                    normal.sample(rng)
                };
                AttributeValue::Float(sample)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(7)
    }

    #[test]
    fn rejects_zero_kinds() {
        let cfg = AttributeGeneratorConfig::default();
        assert_eq!(cfg.compile().unwrap_err(), GeneratorError::KindCount(0));
    }

    #[test]
    fn rejects_multiple_kinds() {
        let cfg = AttributeGeneratorConfig {
            static_value: Some(AttributeValue::Bool(true)),
            probability: Some(0.5),
            ..Default::default()
        };
        assert_eq!(cfg.compile().unwrap_err(), GeneratorError::KindCount(2));
    }

    #[test]
    fn rejects_non_positive_weight() {
        let cfg = AttributeGeneratorConfig {
            weighted_choice: Some(vec![("GET".into(), 1), ("POST".into(), 0)]),
            ..Default::default()
        };
        assert!(matches!(
            cfg.compile().unwrap_err(),
            GeneratorError::NonPositiveWeight { .. }
        ));
    }

    #[test]
    fn rejects_inverted_range() {
        let cfg = AttributeGeneratorConfig {
            range: Some((10, 1)),
            ..Default::default()
        };
        assert_eq!(
            cfg.compile().unwrap_err(),
            GeneratorError::InvalidRange { min: 10, max: 1 }
        );
    }

    #[test]
    fn static_generator_always_returns_same_value() {
        let gen = AttributeGeneratorConfig {
            static_value: Some(AttributeValue::String("svc".into())),
            ..Default::default()
        }
        .compile()
        .unwrap();
        let mut r = rng();
        for _ in 0..5 {
            assert_eq!(gen.sample(&mut r), AttributeValue::String("svc".into()));
        }
    }

    #[test]
    fn sequence_generator_increments_each_call() {
        let gen = AttributeGeneratorConfig {
            sequence: Some("req-{n}".into()),
            ..Default::default()
        }
        .compile()
        .unwrap();
        let mut r = rng();
        assert_eq!(gen.sample(&mut r), AttributeValue::String("req-1".into()));
        assert_eq!(gen.sample(&mut r), AttributeValue::String("req-2".into()));
        assert_eq!(gen.sample(&mut r), AttributeValue::String("req-3".into()));
    }

    #[test]
    fn range_generator_stays_within_bounds() {
        let gen = AttributeGeneratorConfig {
            range: Some((5, 5)),
            ..Default::default()
        }
        .compile()
        .unwrap();
        let mut r = rng();
        for _ in 0..10 {
            assert_eq!(gen.sample(&mut r), AttributeValue::Int(5));
        }
    }

    #[test]
    fn weighted_choice_only_emits_declared_values() {
        let gen = AttributeGeneratorConfig {
            weighted_choice: Some(vec![("a".into(), 1), ("b".into(), 1)]),
            ..Default::default()
        }
        .compile()
        .unwrap();
        let mut r = rng();
        for _ in 0..20 {
            let v = gen.sample(&mut r);
            assert!(matches!(v, AttributeValue::String(s) if s == "a" || s == "b"));
        }
    }

    #[test]
    fn zero_stddev_distribution_is_exact() {
        let gen = AttributeGeneratorConfig {
            distribution: Some((42.0, 0.0)),
            ..Default::default()
        }
        .compile()
        .unwrap();
        let mut r = rng();
        assert_eq!(gen.sample(&mut r), AttributeValue::Float(42.0));
    }
}
