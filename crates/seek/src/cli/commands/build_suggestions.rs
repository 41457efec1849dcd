//! Implementation of `seek build-suggestions`.

use std::process::ExitCode;

use crate::cli::context::CommandContext;

/// Rebuilds both suggestion databases.
pub fn run(ctx: &CommandContext) -> ExitCode {
    let service = match ctx.service() {
        Ok(service) => service,
        Err(code) => return code,
    };
    let code = match service.build_suggestions() {
        Ok(report) => {
            println!(
                "Built suggestions: {} file names, {} symbols",
                report.file_names, report.symbols
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: failed to build suggestions: {e}");
            ExitCode::FAILURE
        }
    };
    service.close();
    code
}
