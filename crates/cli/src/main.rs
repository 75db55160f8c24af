//! TraceSynth CLI binary: wires configuration loading, topology
//! construction, the emitter loop, and the static checker into
//! `run`/`check` subcommands.

mod cli;
mod commands;
mod sink;

use clap::Parser;
use cli::{CheckArgs, Cli, Command, RunArgs};
use tracing_subscriber::EnvFilter;

fn install_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    install_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            config,
            duration,
            seed,
            sink,
        } => {
            commands::run::execute(RunArgs {
                config,
                duration,
                seed,
                sink,
            })
            .await
        }
        Command::Check {
            config,
            seed,
            samples,
            max_depth,
            max_fan_out,
            max_spans,
            max_spans_per_trace,
        } => {
            commands::check::execute(CheckArgs {
                config,
                seed,
                samples,
                max_depth,
                max_fan_out,
                max_spans,
                max_spans_per_trace,
            })
            .await
        }
    }
}
