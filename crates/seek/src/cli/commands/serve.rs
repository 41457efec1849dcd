//! Implementation of `seek serve`: a JSON-lines request loop.
//!
//! Each input line is one [`Request`]; each answer is one [`Response`] line on
//! stdout. Lines that do not parse are answered with an error response. The
//! loop ends at end of input or after a `stop` request.

use std::{
    io::{self, BufRead, Write},
    process::ExitCode,
};

use seek_index::{Request, Response, Service};
use tracing::{debug, info};

use crate::cli::context::CommandContext;

/// Serves requests from stdin until stopped.
pub fn run(ctx: &CommandContext) -> ExitCode {
    let service = match ctx.service() {
        Ok(service) => service,
        Err(code) => return code,
    };
    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();
    let code = match serve_lines(&service, stdin.lock(), &mut stdout) {
        Ok(served) => {
            info!(served, "serve loop finished");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: serve loop failed: {e}");
            ExitCode::FAILURE
        }
    };
    service.close();
    code
}

/// Answers every request line of `input` on `output`; returns the number served.
pub fn serve_lines(
    service: &Service,
    input: impl BufRead,
    output: &mut impl Write,
) -> io::Result<usize> {
    let mut served = 0;
    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let response = match serde_json::from_str::<Request>(&line) {
            Ok(request) => {
                debug!(?request, "request");
                service.handle(request)
            }
            Err(e) => Response::Error {
                message: format!("invalid request: {e}"),
            },
        };
        serde_json::to_writer(&mut *output, &response)?;
        writeln!(output)?;
        output.flush()?;
        served += 1;
        if !service.is_running() {
            break;
        }
    }
    Ok(served)
}
