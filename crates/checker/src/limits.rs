/// Thresholds the static checker validates the topology against.
/// `max_spans_per_trace` doubles as the sampler's span budget when the
/// checker takes observed samples.
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    pub max_depth: usize,
    pub max_fan_out: u64,
    pub max_spans: u64,
    pub max_spans_per_trace: usize,
    pub samples: usize,
    pub seed: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_depth: 32,
            max_fan_out: 64,
            max_spans: 10_000,
            max_spans_per_trace: 10_000,
            samples: 1_000,
            seed: 0,
        }
    }
}
