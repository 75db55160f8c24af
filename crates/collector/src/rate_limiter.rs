//! Rate limiting abstractions for the sink path, adapted from
//! debasishg's `ringmpsc-rs` `rate_limiter.rs`. Uses native async fn in traits.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tokio::time::{interval, Interval, MissedTickBehavior};

pub trait RateLimiter: Send {
    fn wait(&mut self) -> impl Future<Output = ()> + Send;

    fn target_rate(&self) -> Option<f64> {
        None
    }
}

pub trait RateLimiterBoxed: Send {
    fn wait_boxed(&mut self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;

    fn target_rate(&self) -> Option<f64> {
        None
    }
}

impl<T: RateLimiter> RateLimiterBoxed for T {
    fn wait_boxed(&mut self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(self.wait())
    }

    fn target_rate(&self) -> Option<f64> {
        RateLimiter::target_rate(self)
    }
}

/// Interval-based rate limiter. Missed ticks are skipped (burst mode)
/// rather than queued.
pub struct IntervalRateLimiter {
    interval: Option<Interval>,
    rate_per_sec: f64,
}

impl IntervalRateLimiter {
    pub fn new(period: Duration) -> Self {
        if period.is_zero() {
            return Self {
                interval: None,
                rate_per_sec: f64::INFINITY,
            };
        }

        let mut interval = interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let rate_per_sec = 1.0 / period.as_secs_f64();

        Self {
            interval: Some(interval),
            rate_per_sec,
        }
    }

    pub fn from_rate(rate_per_sec: f64) -> Self {
        assert!(rate_per_sec > 0.0, "rate must be positive");
        let period = Duration::from_secs_f64(1.0 / rate_per_sec);
        let mut limiter = Self::new(period);
        limiter.rate_per_sec = rate_per_sec;
        limiter
    }

    pub fn unlimited() -> Self {
        Self::new(Duration::ZERO)
    }
}

impl RateLimiter for IntervalRateLimiter {
    async fn wait(&mut self) {
        match &mut self.interval {
            Some(interval) => {
                interval.tick().await;
            }
            None => {
                tokio::task::yield_now().await;
            }
        }
    }

    fn target_rate(&self) -> Option<f64> {
        if self.rate_per_sec.is_infinite() {
            None
        } else {
            Some(self.rate_per_sec)
        }
    }
}

/// Yields to the runtime without pacing; used when the ring buffer's
/// backpressure is the only desired rate control.
pub struct YieldingRateLimiter;

impl RateLimiter for YieldingRateLimiter {
    async fn wait(&mut self) {
        tokio::task::yield_now().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn interval_limiter_paces_ticks() {
        let mut limiter = IntervalRateLimiter::from_rate(100.0);
        let start = Instant::now();
        for _ in 0..10 {
            limiter.wait().await;
        }
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(80));
    }

    #[tokio::test]
    async fn unlimited_limiter_never_waits_long() {
        let mut limiter = IntervalRateLimiter::unlimited();
        let start = Instant::now();
        for _ in 0..1000 {
            limiter.wait().await;
        }
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[test]
    fn target_rate_reflects_configuration() {
        let limiter = IntervalRateLimiter::from_rate(250.0);
        assert_eq!(RateLimiter::target_rate(&limiter), Some(250.0));
        let unlimited = IntervalRateLimiter::unlimited();
        assert_eq!(RateLimiter::target_rate(&unlimited), None);
    }
}
