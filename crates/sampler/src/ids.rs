use rand::RngCore;

/// A fresh 128-bit trace id, uniformly random from the caller's seeded
/// source. Every source of randomness — including ids — flows from the
/// single seeded RNG threaded through the sampler.
pub fn fresh_trace_id(rng: &mut dyn RngCore) -> u128 {
    let hi = u128::from(rng.next_u64());
    let lo = u128::from(rng.next_u64());
    (hi << 64) | lo
}

/// A fresh, non-zero 64-bit span id. Zero is reserved to mark "no parent"
/// on the root span, so span ids must avoid it.
pub fn fresh_span_id(rng: &mut dyn RngCore) -> u64 {
    loop {
        let candidate = rng.next_u64();
        if candidate != 0 {
            return candidate;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn span_ids_are_never_zero() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for _ in 0..10_000 {
            assert_ne!(fresh_span_id(&mut rng), 0);
        }
    }

    #[test]
    fn trace_ids_use_full_128_bits_across_seeds() {
        let mut a = ChaCha8Rng::seed_from_u64(1);
        let mut b = ChaCha8Rng::seed_from_u64(2);
        assert_ne!(fresh_trace_id(&mut a), fresh_trace_id(&mut b));
    }
}
