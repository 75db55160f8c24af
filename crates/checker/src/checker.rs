use crate::limits::Limits;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use thiserror::Error;
use tracesynth_sampler::{sample_trace, DEFAULT_SPAN_BUDGET};
use tracesynth_topology::Topology;
use tracesynth_traffic::{ScenarioResolver, TrafficPattern};
use tracesynth_model::TrafficPatternConfig;

/// One named check's outcome, matching the CLI report line format:
/// `PASS|FAIL <name>: <actual> (limit: <limit>)`, with optional
/// indented witness detail.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub pass: bool,
    pub actual: String,
    pub limit: String,
    pub path: Option<Vec<String>>,
    pub op_ref: Option<String>,
    pub samples_run: Option<usize>,
}

impl CheckResult {
    /// Renders this result as the lines the checker CLI prints: the
    /// summary line, then any witness path or operation ref indented.
    pub fn format_lines(&self) -> Vec<String> {
        let mut lines = vec![format!(
            "{} {}: {} (limit: {})",
            if self.pass { "PASS" } else { "FAIL" },
            self.name,
            self.actual,
            self.limit
        )];
        if let Some(op_ref) = &self.op_ref {
            lines.push(format!("    worst case: {op_ref}"));
        }
        if let Some(path) = &self.path {
            lines.push(format!("    witness: {}", path.join(" -> ")));
        }
        if let Some(n) = self.samples_run {
            lines.push(format!("    sampled {n} trace(s)"));
        }
        lines
    }
}

/// Raised by the CLI boundary when one or more checks fail; carries every
/// result (not just the failures) so the caller can print a full report.
#[derive(Debug, Error)]
pub struct CheckFailed {
    pub results: Vec<CheckResult>,
}

impl std::fmt::Display for CheckFailed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let failed = self.results.iter().filter(|r| !r.pass).count();
        write!(f, "static check failed: {failed} of {} check(s) did not pass", self.results.len())
    }
}

fn op_ref(topology: &Topology, idx: usize) -> String {
    let op = topology.get(idx);
    format!("{}.{}", op.service, op.name)
}

/// Returns the cycle witness path (as operation refs) reachable from
/// `root`, or `None` if the subtree rooted at `root` is acyclic.
fn find_cycle(topology: &Topology, root: usize) -> Option<Vec<usize>> {
    fn visit(topology: &Topology, node: usize, stack: &mut Vec<usize>, on_stack: &mut HashSet<usize>, done: &mut HashSet<usize>) -> Option<Vec<usize>> {
        if on_stack.contains(&node) {
            let start = stack.iter().position(|&n| n == node).unwrap();
            let mut cycle: Vec<usize> = stack[start..].to_vec();
            cycle.push(node);
            return Some(cycle);
        }
        if done.contains(&node) {
            return None;
        }
        stack.push(node);
        on_stack.insert(node);
        for call in &topology.get(node).calls {
            if let Some(cycle) = visit(topology, call.target, stack, on_stack, done) {
                return Some(cycle);
            }
        }
        stack.pop();
        on_stack.remove(&node);
        done.insert(node);
        None
    }
    let mut stack = Vec::new();
    let mut on_stack = HashSet::new();
    let mut done = HashSet::new();
    visit(topology, root, &mut stack, &mut on_stack, &mut done)
}

/// Longest simple path (in operation hops) from `root` to a leaf. Caller
/// must have already established the subtree is acyclic. Memoized the
/// same way `static_span_bound` is: a fan-in topology where several
/// operations reconverge on a shared downstream call would otherwise
/// recompute that shared subtree once per reconvergence point, growing
/// exponentially with depth.
fn longest_path(
    topology: &Topology,
    root: usize,
    memo: &mut HashMap<usize, (usize, Vec<usize>)>,
) -> (usize, Vec<usize>) {
    if let Some(cached) = memo.get(&root) {
        return cached.clone();
    }
    let op = topology.get(root);
    let result = if op.calls.is_empty() {
        (1, vec![root])
    } else {
        let mut best_len = 1;
        let mut best_path = vec![root];
        for call in &op.calls {
            let (len, path) = longest_path(topology, call.target, memo);
            if len + 1 > best_len {
                best_len = len + 1;
                best_path = std::iter::once(root).chain(path).collect();
            }
        }
        (best_len, best_path)
    };
    memo.insert(root, result.clone());
    result
}

fn fan_out(topology: &Topology, idx: usize) -> u64 {
    topology.get(idx).calls.iter().map(|c| u64::from(c.count)).sum()
}

/// Recursive static upper bound on spans produced by one trace rooted at
/// `root`: `1 + sum(count * child_ub)` per call. `None` means unbounded
/// (a cycle is reachable).
fn static_span_bound(
    topology: &Topology,
    root: usize,
    visiting: &mut HashSet<usize>,
    memo: &mut HashMap<usize, Option<u64>>,
) -> Option<u64> {
    if let Some(cached) = memo.get(&root) {
        return *cached;
    }
    if visiting.contains(&root) {
        return None;
    }
    visiting.insert(root);
    let mut total: Option<u64> = Some(1);
    for call in &topology.get(root).calls {
        let child = static_span_bound(topology, call.target, visiting, memo);
        total = match (total, child) {
            (Some(t), Some(c)) => Some(t.saturating_add(c.saturating_mul(u64::from(call.count)))),
            _ => None,
        };
        if total.is_none() {
            break;
        }
    }
    visiting.remove(&root);
    memo.insert(root, total);
    total
}

/// Runs `samples` trace generations with no active scenarios, returning
/// the largest observed span count across them.
fn observed_max_spans(topology: &Topology, root: usize, limits: &Limits) -> usize {
    let resolver = ScenarioResolver::new(
        vec![],
        TrafficPattern::compile(&TrafficPatternConfig::Uniform { rate: 1.0 }).unwrap(),
    );
    let mut max_spans = 0usize;
    for i in 0..limits.samples {
        let mut rng = ChaCha8Rng::seed_from_u64(limits.seed.wrapping_add(i as u64));
        let budget = limits.max_spans_per_trace.min(DEFAULT_SPAN_BUDGET as usize) as u32;
        let spans = sample_trace(topology, &resolver, root, Duration::ZERO, 0, budget, &mut rng);
        max_spans = max_spans.max(spans.len());
    }
    max_spans
}

/// Runs every static check across every operation as a candidate root,
/// reporting the topology-wide worst case for each.
pub struct Checker<'a> {
    topology: &'a Topology,
}

impl<'a> Checker<'a> {
    pub fn new(topology: &'a Topology) -> Self {
        Self { topology }
    }

    pub fn run(&self, limits: &Limits) -> Vec<CheckResult> {
        vec![
            self.check_max_depth(limits),
            self.check_max_fan_out(limits),
            self.check_max_spans_static(limits),
            self.check_max_spans_observed(limits),
        ]
    }

    fn check_max_depth(&self, limits: &Limits) -> CheckResult {
        let mut worst_depth = 0usize;
        let mut worst_path: Vec<usize> = vec![];
        let mut cyclic = false;
        let mut memo = HashMap::new();

        for (idx, _) in self.topology.iter() {
            if let Some(cycle) = find_cycle(self.topology, idx) {
                cyclic = true;
                worst_depth = limits.max_depth;
                worst_path = cycle;
                break;
            }
            let (depth, path) = longest_path(self.topology, idx, &mut memo);
            if depth > worst_depth {
                worst_depth = depth;
                worst_path = path;
            }
        }

        CheckResult {
            name: "max-depth".to_string(),
            pass: !cyclic && worst_depth <= limits.max_depth,
            actual: worst_depth.to_string(),
            limit: limits.max_depth.to_string(),
            path: Some(worst_path.iter().map(|&i| op_ref(self.topology, i)).collect()),
            op_ref: None,
            samples_run: None,
        }
    }

    fn check_max_fan_out(&self, limits: &Limits) -> CheckResult {
        let mut worst = 0u64;
        let mut worst_op = None;
        for (idx, _) in self.topology.iter() {
            let f = fan_out(self.topology, idx);
            if f > worst {
                worst = f;
                worst_op = Some(idx);
            }
        }
        CheckResult {
            name: "max-fan-out".to_string(),
            pass: worst <= limits.max_fan_out,
            actual: worst.to_string(),
            limit: limits.max_fan_out.to_string(),
            path: None,
            op_ref: worst_op.map(|i| op_ref(self.topology, i)),
            samples_run: None,
        }
    }

    fn check_max_spans_static(&self, limits: &Limits) -> CheckResult {
        let mut memo = HashMap::new();
        let mut worst: Option<u64> = Some(0);
        let mut worst_op = None;
        for (idx, _) in self.topology.iter() {
            let mut visiting = HashSet::new();
            let bound = static_span_bound(self.topology, idx, &mut visiting, &mut memo);
            worst = match (worst, bound) {
                (Some(w), Some(b)) if b > w => {
                    worst_op = Some(idx);
                    Some(b)
                }
                (Some(_), None) => {
                    worst_op = Some(idx);
                    None
                }
                (None, _) => worst,
                (w, _) => w,
            };
        }
        let (pass, actual) = match worst {
            Some(v) => (v <= limits.max_spans, v.to_string()),
            None => (false, "∞".to_string()),
        };
        CheckResult {
            name: "max-spans-static".to_string(),
            pass,
            actual,
            limit: limits.max_spans.to_string(),
            path: None,
            op_ref: worst_op.map(|i| op_ref(self.topology, i)),
            samples_run: None,
        }
    }

    fn check_max_spans_observed(&self, limits: &Limits) -> CheckResult {
        let mut worst = 0usize;
        let mut worst_op = None;
        for (idx, _) in self.topology.iter() {
            let observed = observed_max_spans(self.topology, idx, limits);
            if observed > worst {
                worst = observed;
                worst_op = Some(idx);
            }
        }
        CheckResult {
            name: "max-spans-observed".to_string(),
            pass: worst as u64 <= limits.max_spans_per_trace as u64,
            actual: worst.to_string(),
            limit: limits.max_spans_per_trace.to_string(),
            path: None,
            op_ref: worst_op.map(|i| op_ref(self.topology, i)),
            samples_run: Some(limits.samples),
        }
    }
}

/// Runs every check and returns `Err(CheckFailed)` if any failed,
/// otherwise `Ok(results)`. Matches the CLI's exit-code contract.
pub fn check(topology: &Topology, limits: &Limits) -> Result<Vec<CheckResult>, CheckFailed> {
    let results = Checker::new(topology).run(limits);
    if results.iter().all(|r| r.pass) {
        Ok(results)
    } else {
        Err(CheckFailed { results })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration as StdDuration;
    use tracesynth_model::{CallConfig, DurationSpec, OperationConfig, ServiceConfig, TopologyConfig};
    use tracesynth_topology::StaticRegistry;

    fn build(config: &TopologyConfig) -> Topology {
        Topology::build(config, &StaticRegistry::new()).unwrap()
    }

    /// S7: a cycle `a.x -> b.y -> a.x` fails max-depth and max-spans-static
    /// with the cycle path surfaced as the witness.
    #[test]
    fn s7_cycle_fails_depth_and_static_spans() {
        let mut a = ServiceConfig::new("a");
        let mut x = OperationConfig::new("x", DurationSpec::fixed(StdDuration::from_millis(1)));
        x.calls.push(CallConfig::new("b", "y"));
        a.operations.push(x);

        let mut b = ServiceConfig::new("b");
        let mut y = OperationConfig::new("y", DurationSpec::fixed(StdDuration::from_millis(1)));
        y.calls.push(CallConfig::new("a", "x"));
        b.operations.push(y);

        let config = TopologyConfig {
            services: vec![a, b],
            traffic: TrafficPatternConfig::Uniform { rate: 1.0 },
            scenarios: vec![],
        };
        let topo = build(&config);
        let limits = Limits::default();
        let results = Checker::new(&topo).run(&limits);

        let depth = results.iter().find(|r| r.name == "max-depth").unwrap();
        assert!(!depth.pass);
        assert!(depth.path.as_ref().unwrap().len() >= 2);

        let static_spans = results.iter().find(|r| r.name == "max-spans-static").unwrap();
        assert!(!static_spans.pass);
        assert_eq!(static_spans.actual, "∞");
    }

    /// Invariant 8: max-spans-static is an upper bound on any observed trace.
    #[test]
    fn static_bound_dominates_observed() {
        let mut a = ServiceConfig::new("a");
        let mut x = OperationConfig::new("x", DurationSpec::fixed(StdDuration::from_millis(1)));
        let mut call = CallConfig::new("a", "y");
        call.count = 3;
        x.calls.push(call);
        a.operations.push(x);
        a.operations
            .push(OperationConfig::new("y", DurationSpec::fixed(StdDuration::from_millis(1))));

        let config = TopologyConfig {
            services: vec![a],
            traffic: TrafficPatternConfig::Uniform { rate: 1.0 },
            scenarios: vec![],
        };
        let topo = build(&config);
        let mut limits = Limits::default();
        limits.samples = 200;
        let results = Checker::new(&topo).run(&limits);

        let static_spans: u64 = results
            .iter()
            .find(|r| r.name == "max-spans-static")
            .unwrap()
            .actual
            .parse()
            .unwrap();
        let observed: u64 = results
            .iter()
            .find(|r| r.name == "max-spans-observed")
            .unwrap()
            .actual
            .parse()
            .unwrap();
        assert!(static_spans >= observed);
    }

    #[test]
    fn acyclic_topology_passes_all_checks() {
        let mut svc = ServiceConfig::new("svc");
        svc.operations
            .push(OperationConfig::new("op", DurationSpec::fixed(StdDuration::from_millis(1))));
        let config = TopologyConfig {
            services: vec![svc],
            traffic: TrafficPatternConfig::Uniform { rate: 1.0 },
            scenarios: vec![],
        };
        let topo = build(&config);
        let limits = Limits::default();
        assert!(check(&topo, &limits).is_ok());
    }
}
