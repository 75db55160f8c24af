//! clap-derive argument surface: two subcommands with typed, inline
//! per-variant options via `Parser`/`Subcommand`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "tracesynth")]
#[command(version, about = "Distributed-tracing telemetry synthesis engine", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Sample traces from a topology and emit them to a sink.
    Run {
        /// Path to the YAML topology description.
        #[arg(long)]
        config: PathBuf,

        /// How long to run for, e.g. "30s", "5m". Runs until Ctrl-C if omitted.
        #[arg(long)]
        duration: Option<String>,

        /// Seed for the deterministic RNG driving arrival pacing and sampling.
        #[arg(long, default_value_t = 0)]
        seed: u64,

        /// Destination for emitted spans: "stdout", "json:<path>", or
        /// "otlp:<endpoint>".
        #[arg(long, default_value = "stdout")]
        sink: String,
    },

    /// Run the static checker against a topology and report pass/fail.
    Check {
        /// Path to the YAML topology description.
        #[arg(long)]
        config: PathBuf,

        /// Seed for the observed-max-spans sampling pass.
        #[arg(long, default_value_t = 0)]
        seed: u64,

        /// Number of traces to sample per candidate root for the
        /// observed-max-spans check.
        #[arg(long, default_value_t = 1_000)]
        samples: usize,

        #[arg(long, default_value_t = 32)]
        max_depth: usize,

        #[arg(long, default_value_t = 64)]
        max_fan_out: u64,

        #[arg(long, default_value_t = 10_000)]
        max_spans: u64,

        #[arg(long, default_value_t = 10_000)]
        max_spans_per_trace: usize,
    },
}

/// Plain argument bundle for [`crate::commands::run::execute`], built
/// from a [`Command::Run`] match arm.
pub struct RunArgs {
    pub config: PathBuf,
    pub duration: Option<String>,
    pub seed: u64,
    pub sink: String,
}

/// Plain argument bundle for [`crate::commands::check::execute`], built
/// from a [`Command::Check`] match arm.
pub struct CheckArgs {
    pub config: PathBuf,
    pub seed: u64,
    pub samples: usize,
    pub max_depth: usize,
    pub max_fan_out: u64,
    pub max_spans: u64,
    pub max_spans_per_trace: usize,
}
