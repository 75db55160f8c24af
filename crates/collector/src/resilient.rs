//! Resilience wrappers around any [`Sink`]: retry with exponential
//! backoff, circuit breaker, and rate limiting. Adapted from
//! debasishg's `ringmpsc-rs` `resilient_exporter.rs`, generalized from
//! its span type to [`tracesynth_model::Span`].

use crate::rate_limiter::RateLimiter;
use crate::sink::{ExportError, Sink};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracesynth_model::SpanBatch;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let delay_ms =
            self.initial_delay.as_millis() as f64 * self.backoff_multiplier.powi((attempt - 1) as i32);
        Duration::from_millis(delay_ms as u64).min(self.max_delay)
    }
}

/// Retries a failing sink up to `config.max_retries` times with
/// exponential backoff. Never retries [`ExportError::CircuitOpen`].
pub struct RetryingSink<S: Sink> {
    inner: S,
    config: RetryConfig,
    total_retries: AtomicU64,
    recovered_writes: AtomicU64,
}

impl<S: Sink> RetryingSink<S> {
    pub fn new(inner: S, config: RetryConfig) -> Self {
        Self {
            inner,
            config,
            total_retries: AtomicU64::new(0),
            recovered_writes: AtomicU64::new(0),
        }
    }

    pub fn with_defaults(inner: S) -> Self {
        Self::new(inner, RetryConfig::default())
    }

    pub fn total_retries(&self) -> u64 {
        self.total_retries.load(Ordering::Relaxed)
    }

    pub fn recovered_writes(&self) -> u64 {
        self.recovered_writes.load(Ordering::Relaxed)
    }
}

impl<S: Sink> Sink for RetryingSink<S> {
    async fn write(&self, batch: SpanBatch) -> Result<(), ExportError> {
        let max_attempts = self.config.max_retries + 1;

        for attempt in 0..max_attempts {
            let delay = self.config.delay_for_attempt(attempt);
            if !delay.is_zero() {
                self.total_retries.fetch_add(1, Ordering::Relaxed);
                sleep(delay).await;
            }

            match self.inner.write(batch.clone()).await {
                Ok(()) => {
                    if attempt > 0 {
                        self.recovered_writes.fetch_add(1, Ordering::Relaxed);
                    }
                    return Ok(());
                }
                Err(e) => {
                    if matches!(e, ExportError::CircuitOpen) {
                        return Err(e);
                    }
                }
            }
        }

        Err(ExportError::RetriesExhausted {
            attempts: max_attempts,
        })
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub reset_timeout: Duration,
    pub success_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout: Duration::from_secs(30),
            success_threshold: 2,
        }
    }
}

struct CircuitBreakerState {
    state: CircuitState,
    consecutive_failures: u32,
    consecutive_successes: u32,
    last_failure_time: Option<Instant>,
}

impl CircuitBreakerState {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            consecutive_successes: 0,
            last_failure_time: None,
        }
    }
}

/// Fails fast once a sink has failed `failure_threshold` times in a row,
/// until `reset_timeout` elapses and a single probe write is allowed
/// through (half-open).
pub struct CircuitBreakerSink<S: Sink> {
    inner: S,
    config: CircuitBreakerConfig,
    state: Mutex<CircuitBreakerState>,
    times_opened: AtomicU32,
}

impl<S: Sink> CircuitBreakerSink<S> {
    pub fn new(inner: S, config: CircuitBreakerConfig) -> Self {
        Self {
            inner,
            config,
            state: Mutex::new(CircuitBreakerState::new()),
            times_opened: AtomicU32::new(0),
        }
    }

    pub fn with_defaults(inner: S) -> Self {
        Self::new(inner, CircuitBreakerConfig::default())
    }

    pub fn state(&self) -> CircuitState {
        self.state.lock().unwrap().state
    }

    pub fn times_opened(&self) -> u32 {
        self.times_opened.load(Ordering::Relaxed)
    }

    fn should_allow_request(&self) -> bool {
        let mut state = self.state.lock().unwrap();
        match state.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                if let Some(last_failure) = state.last_failure_time {
                    if last_failure.elapsed() >= self.config.reset_timeout {
                        state.state = CircuitState::HalfOpen;
                        state.consecutive_successes = 0;
                        return true;
                    }
                }
                false
            }
            CircuitState::HalfOpen => true,
        }
    }

    fn record_success(&self) {
        let mut state = self.state.lock().unwrap();
        match state.state {
            CircuitState::Closed => state.consecutive_failures = 0,
            CircuitState::HalfOpen => {
                state.consecutive_successes += 1;
                if state.consecutive_successes >= self.config.success_threshold {
                    state.state = CircuitState::Closed;
                    state.consecutive_failures = 0;
                }
            }
            CircuitState::Open => {
                state.state = CircuitState::Closed;
                state.consecutive_failures = 0;
            }
        }
    }

    fn record_failure(&self) {
        let mut state = self.state.lock().unwrap();
        state.last_failure_time = Some(Instant::now());
        state.consecutive_successes = 0;
        match state.state {
            CircuitState::Closed => {
                state.consecutive_failures += 1;
                if state.consecutive_failures >= self.config.failure_threshold {
                    state.state = CircuitState::Open;
                    self.times_opened.fetch_add(1, Ordering::Relaxed);
                }
            }
            CircuitState::HalfOpen => {
                state.state = CircuitState::Open;
                self.times_opened.fetch_add(1, Ordering::Relaxed);
            }
            CircuitState::Open => {}
        }
    }
}

impl<S: Sink> Sink for CircuitBreakerSink<S> {
    async fn write(&self, batch: SpanBatch) -> Result<(), ExportError> {
        if !self.should_allow_request() {
            return Err(ExportError::CircuitOpen);
        }
        match self.inner.write(batch).await {
            Ok(()) => {
                self.record_success();
                Ok(())
            }
            Err(e) => {
                self.record_failure();
                Err(e)
            }
        }
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

/// Paces writes through a [`RateLimiter`] before delegating to the inner
/// sink.
pub struct RateLimitedSink<S: Sink, R: RateLimiter> {
    inner: S,
    rate_limiter: tokio::sync::Mutex<R>,
}

impl<S: Sink, R: RateLimiter> RateLimitedSink<S, R> {
    pub fn new(inner: S, rate_limiter: R) -> Self {
        Self {
            inner,
            rate_limiter: tokio::sync::Mutex::new(rate_limiter),
        }
    }
}

impl<S: Sink, R: RateLimiter + Send> Sink for RateLimitedSink<S, R> {
    async fn write(&self, batch: SpanBatch) -> Result<(), ExportError> {
        {
            let mut limiter = self.rate_limiter.lock().await;
            limiter.wait().await;
        }
        self.inner.write(batch).await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

/// Composition order (outer to inner): circuit breaker, then retry, then
/// the base sink.
pub struct ResilientSinkBuilder<S: Sink> {
    inner: S,
    retry_config: Option<RetryConfig>,
    circuit_config: Option<CircuitBreakerConfig>,
}

impl<S: Sink + 'static> ResilientSinkBuilder<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            retry_config: None,
            circuit_config: None,
        }
    }

    pub fn with_retry(mut self, config: RetryConfig) -> Self {
        self.retry_config = Some(config);
        self
    }

    pub fn with_circuit_breaker(mut self, config: CircuitBreakerConfig) -> Self {
        self.circuit_config = Some(config);
        self
    }

    pub fn build_retry_only(self) -> RetryingSink<S> {
        RetryingSink::new(self.inner, self.retry_config.unwrap_or_default())
    }

    pub fn build_circuit_breaker_only(self) -> CircuitBreakerSink<S> {
        CircuitBreakerSink::new(self.inner, self.circuit_config.unwrap_or_default())
    }

    pub fn build_with_retry_and_circuit_breaker(self) -> CircuitBreakerSink<RetryingSink<S>> {
        let retrying = RetryingSink::new(self.inner, self.retry_config.unwrap_or_default());
        CircuitBreakerSink::new(retrying, self.circuit_config.unwrap_or_default())
    }
}
