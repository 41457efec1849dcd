//! Command implementations and dispatch.

pub mod build_suggestions;
pub mod config;
pub mod index;
pub mod search;
pub mod serve;
pub mod stats;
pub mod suggest;

use std::process::ExitCode;

use super::{args::Commands, context::CommandContext};

/// Dispatches to the selected subcommand.
pub fn run(command: Commands, ctx: &CommandContext) -> ExitCode {
    match command {
        Commands::Serve => serve::run(ctx),
        Commands::Index(cmd) => index::run(ctx, &cmd),
        Commands::Search(cmd) => search::run(ctx, &cmd),
        Commands::Suggest(cmd) => suggest::run(ctx, &cmd),
        Commands::BuildSuggestions => build_suggestions::run(ctx),
        Commands::Stats { json } => stats::run(ctx, json),
        Commands::Config => config::run(ctx),
    }
}
