use crate::ids::{fresh_span_id, fresh_trace_id};
use rand::{Rng, RngCore};
use rand_distr::{Distribution, Normal};
use std::collections::HashMap;
use std::time::Duration;
use tracesynth_model::{AttributeValue, CallCondition, CallStyle, DurationSpec, Span};
use tracesynth_topology::{Call, Topology};
use tracesynth_traffic::ScenarioResolver;

/// Default per-trace span budget.
pub const DEFAULT_SPAN_BUDGET: u32 = 10_000;

struct Ctx<'a> {
    topology: &'a Topology,
    resolver: &'a ScenarioResolver,
    elapsed: Duration,
    trace_id: u128,
    t0_nanos: u64,
}

impl<'a> Ctx<'a> {
    fn to_nanos(&self, offset: Duration) -> u64 {
        self.t0_nanos.saturating_add(offset.as_nanos() as u64)
    }
}

struct SampleResult {
    end: Duration,
    error: bool,
    index: usize,
}

/// Samples one trace tree rooted at `root`, returning every span produced
/// in an order where a span always appears no later than its parent.
/// `span_budget` bounds the total number of spans the whole trace may
/// produce, decremented once per span and shared across the recursive
/// descent.
pub fn sample_trace(
    topology: &Topology,
    resolver: &ScenarioResolver,
    root: usize,
    elapsed: Duration,
    t0_nanos: u64,
    span_budget: u32,
    rng: &mut dyn RngCore,
) -> Vec<Span> {
    let mut ctx = Ctx {
        topology,
        resolver,
        elapsed,
        trace_id: fresh_trace_id(rng),
        t0_nanos,
    };
    let mut spans = Vec::new();
    let mut budget = span_budget;
    sample_node(&mut ctx, root, 0, Duration::ZERO, &mut budget, rng, &mut spans);
    spans
}

fn sample_duration(spec: DurationSpec, rng: &mut dyn RngCore) -> Duration {
    if spec.stddev.is_zero() {
        return spec.mean;
    }
    let mean = spec.mean.as_secs_f64();
    let stddev = spec.stddev.as_secs_f64();
    let normal = Normal::new(mean, stddev).expect("stddev already checked non-zero");
    let sample = normal.sample(&mut RngAdapter(rng)).max(0.0);
    Duration::from_secs_f64(sample)
}

/// `rand_distr::Distribution::sample` wants a `Rng`, but we only carry a
/// `&mut dyn RngCore` through the recursive descent; this adapts one to
/// the other without pulling the whole sampler generic over `R: Rng`.
struct RngAdapter<'a>(&'a mut dyn RngCore);

impl RngCore for RngAdapter<'_> {
    fn next_u32(&mut self) -> u32 {
        self.0.next_u32()
    }
    fn next_u64(&mut self) -> u64 {
        self.0.next_u64()
    }
    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.0.fill_bytes(dest)
    }
    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.0.try_fill_bytes(dest)
    }
}

fn evaluate_attributes(
    op: &tracesynth_topology::Operation,
    overrides: &tracesynth_traffic::EffectiveOverride<'_>,
    rng: &mut dyn RngCore,
) -> HashMap<String, AttributeValue> {
    let mut out = HashMap::with_capacity(op.attributes.len() + overrides.attributes.len());
    for (name, generator) in &op.attributes {
        if !overrides.attributes.contains_key(name.as_str()) {
            out.insert(name.clone(), generator.sample(rng));
        }
    }
    for (name, generator) in &overrides.attributes {
        out.insert((*name).to_string(), generator.sample(rng));
    }
    out
}

#[allow(clippy::too_many_arguments)]
fn sample_node(
    ctx: &mut Ctx<'_>,
    op_idx: usize,
    parent_span_id: u64,
    start: Duration,
    budget: &mut u32,
    rng: &mut dyn RngCore,
    spans: &mut Vec<Span>,
) -> Option<SampleResult> {
    if *budget == 0 {
        return None;
    }
    *budget -= 1;

    let op = ctx.topology.get(op_idx);
    let overrides = ctx.resolver.effective_override(op.key(), ctx.elapsed);
    let duration_spec = overrides.duration.unwrap_or(op.duration);
    let error_rate = overrides.error_rate.unwrap_or(op.error_rate).clamp(0.0, 1.0);

    let span_id = fresh_span_id(rng);
    let raw_duration = sample_duration(duration_spec, rng);
    let mut error = rng.gen_bool(error_rate);
    let attributes = evaluate_attributes(op, &overrides, rng);

    let index = spans.len();
    spans.push(Span {
        trace_id: ctx.trace_id,
        span_id,
        parent_span_id,
        service: op.service.clone(),
        operation: op.name.clone(),
        start_time: ctx.to_nanos(start),
        end_time: ctx.to_nanos(start + raw_duration),
        error,
        attributes,
        resource_attributes: op.resource_attributes.clone(),
    });

    let mut cursor = start;
    let mut any_child_error = false;

    for call in &op.calls {
        if call.condition == CallCondition::OnError && !error {
            continue;
        }
        if call.condition == CallCondition::OnSuccess && error {
            continue;
        }

        for _ in 0..call.count {
            if !rng.gen_bool(call.probability.clamp(0.0, 1.0)) {
                continue;
            }
            let child_start = match op.call_style {
                CallStyle::Parallel => start,
                CallStyle::Sequential => cursor,
            };
            if let Some(result) = run_call_with_retries(ctx, call, span_id, child_start, budget, rng, spans) {
                any_child_error |= result.error;
                if op.call_style == CallStyle::Sequential {
                    cursor = result.end;
                }
            }
        }
    }

    let own_end = match op.call_style {
        CallStyle::Parallel => start + raw_duration,
        CallStyle::Sequential => (start + raw_duration).max(cursor),
    };
    error = error || any_child_error;
    spans[index].end_time = ctx.to_nanos(own_end);
    spans[index].error = error;

    Some(SampleResult {
        end: own_end,
        error,
        index,
    })
}

/// Runs one child call attempt, including retries: `ATTEMPT -> (child
/// error && retries remaining) -> wait retry_backoff -> ATTEMPT; else ->
/// DONE`. Applies the call's `timeout` by truncating the already-pushed
/// child span in place.
#[allow(clippy::too_many_arguments)]
fn run_call_with_retries(
    ctx: &mut Ctx<'_>,
    call: &Call,
    parent_span_id: u64,
    first_attempt_start: Duration,
    budget: &mut u32,
    rng: &mut dyn RngCore,
    spans: &mut Vec<Span>,
) -> Option<SampleResult> {
    let mut attempt_start = first_attempt_start;
    let mut attempts_left = call.retries;

    loop {
        let mut result = sample_node(ctx, call.target, parent_span_id, attempt_start, budget, rng, spans)?;

        if let Some(timeout) = call.timeout {
            let raw = result.end.saturating_sub(attempt_start);
            if raw > timeout {
                let truncated_end = attempt_start + timeout;
                spans[result.index].end_time = ctx.to_nanos(truncated_end);
                spans[result.index].error = true;
                result.end = truncated_end;
                result.error = true;
            }
        }

        if result.error && attempts_left > 0 {
            attempts_left -= 1;
            attempt_start = result.end + call.retry_backoff;
            continue;
        }
        return Some(result);
    }
}
