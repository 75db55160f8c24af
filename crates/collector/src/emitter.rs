//! The emitter loop: a single cooperative timer that decides when the
//! next trace starts, samples it, and hands the resulting spans to a
//! consumer task over [`tracesynth_ring::Channel`] — exactly the
//! handoff the ring crate's own doc comment describes. Emission itself
//! stays single-threaded cooperative: the ring only decouples
//! batching/export I/O from the sampling timer, it never lets two
//! traces sample concurrently.

use crate::batch::{BatchConfig, BatchProcessor};
use crate::signals::{DerivedSignals, SlowSpanSink};
use crate::sink::SinkBoxed;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Exp};
use std::mem::MaybeUninit;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::watch;
use tracesynth_ring::{Channel, Config as RingConfig, Producer};
use tracesynth_sampler::{sample_trace, DEFAULT_SPAN_BUDGET};
use tracesynth_topology::Topology;
use tracesynth_traffic::ScenarioResolver;
use tracesynth_model::Span;

/// Configuration for one emitter run.
#[derive(Debug, Clone)]
pub struct EmitterConfig {
    pub seed: u64,
    pub duration: Option<Duration>,
    pub span_budget: u32,
    pub batch: BatchConfig,
    pub slow_threshold: Duration,
    /// How long to sleep before re-checking `rate(elapsed)` while the
    /// effective rate is zero, or before re-polling an empty channel.
    pub idle_poll_interval: Duration,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            duration: None,
            span_budget: DEFAULT_SPAN_BUDGET,
            batch: BatchConfig::default(),
            slow_threshold: Duration::from_millis(500),
            idle_poll_interval: Duration::from_millis(50),
        }
    }
}

/// Summary of one emitter run, returned once it stops.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmitterReport {
    pub traces_emitted: u64,
    pub spans_emitted: u64,
}

fn unix_nanos_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}

/// Picks a root operation weighted by [`tracesynth_topology::Operation::weight`]
/// across every operation in the topology. Falls back to a uniform draw
/// if every weight is zero.
fn pick_root(topology: &Topology, rng: &mut ChaCha8Rng) -> usize {
    let total: u64 = topology.roots().map(|(_, op)| u64::from(op.weight)).sum();
    if total == 0 {
        return rng.gen_range(0..topology.len());
    }
    let mut draw = rng.gen_range(0..total);
    for (idx, op) in topology.roots() {
        let weight = u64::from(op.weight);
        if draw < weight {
            return idx;
        }
        draw -= weight;
    }
    unreachable!("cumulative weights must cover the draw range")
}

/// Waits for `duration` or until `cancel` signals shutdown, whichever
/// comes first. Returns `true` if cancellation was observed.
async fn wait_or_cancel(duration: Duration, cancel: &mut watch::Receiver<bool>) -> bool {
    if *cancel.borrow() {
        return true;
    }
    tokio::select! {
        _ = tokio::time::sleep(duration) => false,
        changed = cancel.changed() => changed.is_err() || *cancel.borrow(),
    }
}

/// Hands one span to the ring, retrying with the ring's own backoff
/// before giving up and dropping it. This is vanishingly rare in
/// practice: the consumer drains far faster than a single cooperative
/// sampler can produce.
fn push_span(producer: &Producer<Span>, span: Span) {
    match producer.reserve_with_backoff(1) {
        Some(mut reservation) => {
            reservation.as_mut_slice()[0] = MaybeUninit::new(span);
            reservation.commit();
        }
        None => {
            tracing::warn!("span dropped: ring buffer saturated or closed");
        }
    }
}

/// The sampling side of the loop: paces arrivals, samples traces, and
/// pushes their spans into `producer`. Closes the channel once it stops.
#[allow(clippy::too_many_arguments)]
async fn produce(
    topology: &Topology,
    resolver: &ScenarioResolver,
    config: &EmitterConfig,
    producer: &Producer<Span>,
    channel: &Channel<Span>,
    mut cancel: watch::Receiver<bool>,
) -> EmitterReport {
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let start = Instant::now();
    let mut next_arrival = start;
    let mut report = EmitterReport::default();

    loop {
        if *cancel.borrow() {
            break;
        }
        let elapsed = start.elapsed();
        if config.duration.is_some_and(|duration| elapsed >= duration) {
            break;
        }

        let rate = resolver.rate(elapsed);
        if rate <= 0.0 {
            if wait_or_cancel(config.idle_poll_interval, &mut cancel).await {
                break;
            }
            continue;
        }

        let inter_arrival = Exp::new(rate)
            .expect("rate already checked positive")
            .sample(&mut rng);
        next_arrival += Duration::from_secs_f64(inter_arrival);
        let now = Instant::now();
        if next_arrival > now && wait_or_cancel(next_arrival - now, &mut cancel).await {
            break;
        }

        let root = pick_root(topology, &mut rng);
        let trace_elapsed = start.elapsed();
        let spans = sample_trace(
            topology,
            resolver,
            root,
            trace_elapsed,
            unix_nanos_now(),
            config.span_budget,
            &mut rng,
        );

        report.traces_emitted += 1;
        report.spans_emitted += spans.len() as u64;
        for span in spans {
            push_span(producer, span);
        }
    }

    channel.close();
    report
}

/// The batching side of the loop: drains the channel, folds spans into
/// derived signals, and flushes batches through `sink`.
async fn consume(
    channel: &Channel<Span>,
    config: &EmitterConfig,
    sink: Arc<dyn SinkBoxed>,
    signals: &mut DerivedSignals,
    slow_spans: &mut dyn SlowSpanSink,
) {
    let mut batch = BatchProcessor::new(config.batch.clone());

    loop {
        let drained = channel.consume_all_owned(|span: Span| {
            if let Some(record) = signals.observe(&span) {
                slow_spans.record(record);
            }
            batch.add(span);
        });

        if batch.should_flush() {
            if let Err(e) = batch.flush(sink.as_ref()).await {
                tracing::warn!(error = %e, "sink flush failed");
            }
        }

        if drained == 0 {
            if channel.is_closed() {
                break;
            }
            tokio::time::sleep(config.idle_poll_interval).await;
        }
    }

    if let Err(e) = batch.flush(sink.as_ref()).await {
        tracing::warn!(error = %e, "final sink flush failed");
    }
}

/// Runs the emitter loop until `cancel` fires or `config.duration`
/// elapses, sampling traces at the rate `resolver` dictates and
/// forwarding every produced span through `signals` to `sink`.
pub async fn run_emitter(
    topology: &Topology,
    resolver: &ScenarioResolver,
    config: EmitterConfig,
    sink: Arc<dyn SinkBoxed>,
    signals: &mut DerivedSignals,
    slow_spans: &mut dyn SlowSpanSink,
    cancel: watch::Receiver<bool>,
) -> EmitterReport {
    tracing::info!(seed = config.seed, "emitter run starting");

    let channel = Channel::<Span>::new(RingConfig::new(16, 1, false));
    let producer = channel.register().expect("single producer always registers");

    let (report, ()) = tokio::join!(
        produce(topology, resolver, &config, &producer, &channel, cancel),
        consume(&channel, &config, sink, signals, slow_spans)
    );

    tracing::info!(
        traces = report.traces_emitted,
        spans = report.spans_emitted,
        "emitter run stopped"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::NullSink;
    use std::time::Duration as StdDuration;
    use tracesynth_model::{DurationSpec, OperationConfig, ServiceConfig, TopologyConfig, TrafficPatternConfig};
    use tracesynth_topology::StaticRegistry;

    fn single_op_topology() -> Topology {
        let mut svc = ServiceConfig::new("svc");
        svc.operations
            .push(OperationConfig::new("op", DurationSpec::fixed(StdDuration::from_millis(1))));
        let config = TopologyConfig {
            services: vec![svc],
            traffic: TrafficPatternConfig::Uniform { rate: 1000.0 },
            scenarios: vec![],
        };
        Topology::build(&config, &StaticRegistry::new()).unwrap()
    }

    fn resolver(rate: f64) -> ScenarioResolver {
        let pattern = tracesynth_traffic::TrafficPattern::compile(&TrafficPatternConfig::Uniform { rate }).unwrap();
        ScenarioResolver::new(vec![], pattern)
    }

    #[tokio::test]
    async fn stops_after_configured_duration_and_emits_traces() {
        let topo = single_op_topology();
        let resolver = resolver(1000.0);
        let sink: Arc<dyn SinkBoxed> = Arc::new(NullSink::new());
        let (_cancel_tx, cancel_rx) = watch::channel(false);
        let mut signals = DerivedSignals::new(StdDuration::from_secs(1));
        let mut slow_spans = crate::signals::NullSlowSpanSink;

        let config = EmitterConfig {
            seed: 7,
            duration: Some(StdDuration::from_millis(50)),
            ..EmitterConfig::default()
        };

        let report = run_emitter(&topo, &resolver, config, sink, &mut signals, &mut slow_spans, cancel_rx).await;

        assert!(report.traces_emitted > 0);
        assert!(report.spans_emitted >= report.traces_emitted);
    }

    #[tokio::test]
    async fn cancellation_stops_the_loop_promptly() {
        let topo = single_op_topology();
        let resolver = resolver(1000.0);
        let sink: Arc<dyn SinkBoxed> = Arc::new(NullSink::new());
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let mut signals = DerivedSignals::new(StdDuration::from_secs(1));
        let mut slow_spans = crate::signals::NullSlowSpanSink;

        let config = EmitterConfig {
            seed: 1,
            duration: None,
            ..EmitterConfig::default()
        };

        let emit = run_emitter(&topo, &resolver, config, sink, &mut signals, &mut slow_spans, cancel_rx);
        let trigger = async {
            tokio::time::sleep(StdDuration::from_millis(20)).await;
            cancel_tx.send(true).unwrap();
        };

        let (report, ()) = tokio::time::timeout(StdDuration::from_secs(1), async { tokio::join!(emit, trigger) })
            .await
            .expect("emitter should stop shortly after cancellation");
        assert!(report.traces_emitted > 0);
    }

    #[tokio::test]
    async fn zero_rate_scenario_waits_without_emitting() {
        let topo = single_op_topology();
        let resolver = resolver(0.0);
        let sink: Arc<dyn SinkBoxed> = Arc::new(NullSink::new());
        let (_cancel_tx, cancel_rx) = watch::channel(false);
        let mut signals = DerivedSignals::new(StdDuration::from_secs(1));
        let mut slow_spans = crate::signals::NullSlowSpanSink;

        let config = EmitterConfig {
            seed: 3,
            duration: Some(StdDuration::from_millis(30)),
            idle_poll_interval: StdDuration::from_millis(10),
            ..EmitterConfig::default()
        };

        let report = run_emitter(&topo, &resolver, config, sink, &mut signals, &mut slow_spans, cancel_rx).await;
        assert_eq!(report.traces_emitted, 0);
    }
}
