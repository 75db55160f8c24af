//! `tracesynth check`: runs the static checker and prints the
//! `PASS|FAIL` report, exiting non-zero if any check failed.

use crate::cli::CheckArgs;
use anyhow::Context;
use tracesynth_checker::{check, Limits};
use tracesynth_topology::{StaticRegistry, Topology};

pub async fn execute(args: CheckArgs) -> anyhow::Result<()> {
    let config = tracesynth_config::load_file(&args.config)
        .with_context(|| format!("loading topology config from {}", args.config.display()))?;
    let topology = Topology::build(&config, &StaticRegistry::new()).context("building topology")?;

    let limits = Limits {
        max_depth: args.max_depth,
        max_fan_out: args.max_fan_out,
        max_spans: args.max_spans,
        max_spans_per_trace: args.max_spans_per_trace,
        samples: args.samples,
        seed: args.seed,
    };

    match check(&topology, &limits) {
        Ok(results) => {
            for result in &results {
                for line in result.format_lines() {
                    println!("{line}");
                }
            }
            Ok(())
        }
        Err(failed) => {
            for result in &failed.results {
                for line in result.format_lines() {
                    println!("{line}");
                }
            }
            std::process::exit(1);
        }
    }
}
