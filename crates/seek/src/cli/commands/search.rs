//! Implementation of `seek search`.

use std::process::ExitCode;

use seek_index::{SearchFilter, SearchRange, SearchRequest};

use crate::cli::{
    args::SearchCommand,
    context::CommandContext,
    output::{print_json, print_results},
};

/// Searches the index and prints matching lines.
pub fn run(ctx: &CommandContext, cmd: &SearchCommand) -> ExitCode {
    let request = build_request(cmd, ctx.config.search.max_results);

    let service = match ctx.service() {
        Ok(service) => service,
        Err(code) => return code,
    };
    let code = match service.search(&request) {
        Ok(results) if cmd.json => print_json(&results),
        Ok(results) => {
            print_results(&results, cmd.start);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: search failed: {e}");
            ExitCode::FAILURE
        }
    };
    service.close();
    code
}

/// Builds the request described by the command line.
fn build_request(cmd: &SearchCommand, max_results: usize) -> SearchRequest {
    let mut request = SearchRequest::new(cmd.query.join(" "), cmd.modes.options());
    if cmd.dir.is_some() || cmd.file.is_some() {
        request.filter = Some(SearchFilter {
            dir_regex: cmd.dir.clone(),
            file_regex: cmd.file.clone(),
        });
    }
    request.range = Some(SearchRange {
        start: cmd.start,
        max_size: cmd.limit.unwrap_or(max_results),
    });
    request
}
