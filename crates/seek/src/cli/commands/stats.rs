//! Implementation of `seek stats`.

use std::process::ExitCode;

use serde::Serialize;

use crate::cli::{
    context::CommandContext,
    output::{key_value_table, print_json},
};

/// JSON output of `seek stats`.
#[derive(Serialize)]
struct StatsOutput {
    /// Index location.
    index_dir: String,
    /// Live documents.
    document_count: u64,
}

/// Shows index statistics.
pub fn run(ctx: &CommandContext, json: bool) -> ExitCode {
    let service = match ctx.service() {
        Ok(service) => service,
        Err(code) => return code,
    };
    let statistics = service.statistics();
    service.close();

    let statistics = match statistics {
        Ok(statistics) => statistics,
        Err(e) => {
            eprintln!("error: failed to read statistics: {e}");
            return ExitCode::FAILURE;
        }
    };
    let output = StatsOutput {
        index_dir: ctx.config.index_dir.display().to_string(),
        document_count: statistics.document_count,
    };
    if json {
        return print_json(&output);
    }
    println!(
        "{}",
        key_value_table(&[
            ("Index directory", output.index_dir),
            ("Documents", output.document_count.to_string()),
            (
                "Suggestions",
                ctx.config.suggest_dir().display().to_string()
            ),
        ])
    );
    ExitCode::SUCCESS
}
