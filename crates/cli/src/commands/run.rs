//! `tracesynth run`: loads a topology, samples traces against it for
//! the configured duration (or until Ctrl-C), and writes the resulting
//! spans to the selected sink.

use crate::cli::RunArgs;
use crate::sink::build_sink;
use anyhow::Context;
use std::time::Duration;
use tokio::sync::watch;
use tracesynth_collector::{DerivedSignals, EmitterConfig, SlowSpanSink, SlowSpanRecord, run_emitter};
use tracesynth_topology::{StaticRegistry, Topology};
use tracesynth_traffic::{Scenario, ScenarioResolver, TrafficPattern};

/// Prints a slow-span record as a structured log line. The record itself
/// is data; this is the CLI choosing to surface it as one.
struct LoggingSlowSpanSink;

impl SlowSpanSink for LoggingSlowSpanSink {
    fn record(&mut self, record: SlowSpanRecord) {
        tracing::warn!(
            trace_id = %format!("{:032x}", record.trace_id),
            span_id = %format!("{:016x}", record.span_id),
            service = %record.service,
            operation = %record.operation,
            duration_ms = record.duration_nanos as f64 / 1_000_000.0,
            error = record.error,
            "slow span"
        );
    }
}

pub async fn execute(args: RunArgs) -> anyhow::Result<()> {
    let config = tracesynth_config::load_file(&args.config)
        .with_context(|| format!("loading topology config from {}", args.config.display()))?;

    let topology = Topology::build(&config, &StaticRegistry::new()).context("building topology")?;

    let scenarios = config
        .scenarios
        .iter()
        .enumerate()
        .map(|(i, s)| Scenario::compile(s, i))
        .collect::<Result<Vec<_>, _>>()
        .context("compiling scenarios")?;
    let base_traffic = TrafficPattern::compile(&config.traffic).context("compiling base traffic pattern")?;
    let resolver = ScenarioResolver::new(scenarios, base_traffic);

    let duration = args
        .duration
        .as_deref()
        .map(tracesynth_config::parse_duration)
        .transpose()
        .context("parsing --duration")?;

    let sink = build_sink(&args.sink).await.context("constructing sink")?;

    let emitter_config = EmitterConfig {
        seed: args.seed,
        duration,
        ..EmitterConfig::default()
    };

    let (cancel_tx, cancel_rx) = watch::channel(false);
    let ctrl_c = tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        let _ = cancel_tx.send(true);
    });

    let mut signals = DerivedSignals::new(Duration::from_millis(500));
    let mut slow_spans = LoggingSlowSpanSink;

    let report = run_emitter(&topology, &resolver, emitter_config, sink, &mut signals, &mut slow_spans, cancel_rx).await;
    ctrl_c.abort();

    println!("traces emitted: {}", report.traces_emitted);
    println!("spans emitted:  {}", report.spans_emitted);
    for (service, operation) in signals.operations() {
        let counters = signals
            .counters(service, operation)
            .expect("operation key came from signals.operations()");
        let p50 = signals.latency_percentile(service, operation, 50.0).unwrap_or(0);
        let p99 = signals.latency_percentile(service, operation, 99.0).unwrap_or(0);
        println!(
            "  {service}.{operation}: requests={} errors={} p50={:.2}ms p99={:.2}ms",
            counters.requests_total,
            counters.errors_total,
            p50 as f64 / 1_000_000.0,
            p99 as f64 / 1_000_000.0,
        );
    }

    Ok(())
}
