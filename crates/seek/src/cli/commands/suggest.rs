//! Implementation of `seek suggest`.

use std::process::ExitCode;

use seek_index::SearchOptions;

use crate::cli::{args::SuggestCommand, context::CommandContext, output::print_json};

/// Prints file name or symbol suggestions, best first.
pub fn run(ctx: &CommandContext, cmd: &SuggestCommand) -> ExitCode {
    let options = if cmd.file_name {
        SearchOptions::SEARCH_FOR_FILE_NAME
    } else {
        SearchOptions::SEARCH_IN_DEFS
    };

    let service = match ctx.service() {
        Ok(service) => service,
        Err(code) => return code,
    };
    let suggestions = service.suggest(&cmd.query, options, cmd.limit);
    service.close();

    if cmd.json {
        return print_json(&suggestions);
    }
    for suggestion in &suggestions {
        println!("{suggestion}");
    }
    ExitCode::SUCCESS
}
