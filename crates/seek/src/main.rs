//! Command-line interface for the `seek` source code search service.

mod cli;

use std::{io, process::ExitCode};

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::{CommandContext, args::Cli, commands};

/// Environment variable holding the log filter.
const LOG_ENV: &str = "SEEK_LOG";

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let ctx = match CommandContext::load(&cli.global) {
        Ok(ctx) => ctx,
        Err(code) => return code,
    };
    commands::run(cli.command, &ctx)
}

/// Logs to stderr, filtered by `SEEK_LOG` (default `info`).
///
/// stdout is reserved for command output and the `serve` protocol.
fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}
