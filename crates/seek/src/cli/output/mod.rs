//! Rendering and JSON serialization for CLI output.

use std::process::ExitCode;

use comfy_table::{Cell, Table, presets::UTF8_FULL_CONDENSED};
use seek_index::{FileMatches, SearchResults};
use serde::Serialize;

/// Prints `value` as pretty JSON.
pub fn print_json<T: Serialize>(value: &T) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: failed to serialize JSON: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Formats one file's matches, grep style: `path:line:start-end: text`.
pub fn format_file(file: &FileMatches) -> String {
    if file.matches.is_empty() {
        return file.file_path.clone();
    }
    file.matches
        .iter()
        .map(|m| format!("{}:{}: {}", file.file_path, m.location, m.line.trim_end()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Prints search results followed by a hit summary.
pub fn print_results(results: &SearchResults, start: usize) {
    for file in &results.files {
        println!("{}", format_file(file));
    }
    let shown = results.files.len();
    if shown == 0 {
        println!("no matches ({} total hits)", results.total_hits);
    } else {
        println!(
            "files {}-{} of {} total hits",
            start + 1,
            start + shown,
            results.total_hits
        );
    }
}

/// Two-column table of labelled values.
pub fn key_value_table(rows: &[(&str, String)]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec!["Name", "Value"]);
    for (key, value) in rows {
        table.add_row(vec![Cell::new(key), Cell::new(value)]);
    }
    table
}
