//! Clap argument definitions for the `seek` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use seek_index::SearchOptions;

/// Top-level CLI options.
#[derive(Parser)]
#[command(name = "seek")]
#[command(about = "Source code search: indexing, tag search, log search and suggestions")]
pub struct Cli {
    #[command(flatten)]
    /// Options shared by every subcommand.
    pub global: GlobalArgs,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Where the configuration comes from.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Configuration file [default: nearest seek.toml]
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Index directory, overriding the configured one
    #[arg(long, global = true)]
    pub index_dir: Option<PathBuf>,
}

/// Which sub-queries a search or suggestion runs.
#[derive(Args, Debug, Clone, Default)]
pub struct OptionFlags {
    /// Search file contents (the default when no other mode is given)
    #[arg(long)]
    pub source: bool,

    /// Search tags: `kind:` clauses and symbol names
    #[arg(short = 'd', long)]
    pub defs: bool,

    /// Treat the query as a log line and find the code that printed it
    #[arg(short = 'l', long)]
    pub log: bool,

    /// Search file names
    #[arg(short = 'f', long)]
    pub file_name: bool,
}

impl OptionFlags {
    /// Selected options; contents only when nothing was selected.
    pub fn options(&self) -> SearchOptions {
        let flags = [
            (self.source, SearchOptions::SEARCH_IN_SOURCE),
            (self.defs, SearchOptions::SEARCH_IN_DEFS),
            (self.log, SearchOptions::FIND_LOG_TEXT),
            (self.file_name, SearchOptions::SEARCH_FOR_FILE_NAME),
        ];
        let options = flags
            .into_iter()
            .filter(|(set, _)| *set)
            .fold(SearchOptions::from_bits(0), |acc, (_, option)| acc | option);
        if options.is_empty() {
            SearchOptions::SEARCH_IN_SOURCE
        } else {
            options
        }
    }
}

/// Arguments for `seek index`.
#[derive(Args, Debug, Clone)]
pub struct IndexCommand {
    /// Files or directories to index
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// MIME type recorded for every indexed file
    #[arg(long, default_value = "text/plain")]
    pub mime_type: String,

    /// Rebuild the suggestion databases afterwards
    #[arg(long)]
    pub build_suggestions: bool,
}

/// Arguments for `seek search`.
#[derive(Args, Debug, Clone)]
pub struct SearchCommand {
    /// Query text
    #[arg(required = true)]
    pub query: Vec<String>,

    #[command(flatten)]
    /// Search modes.
    pub modes: OptionFlags,

    /// Only files whose directory matches this regex
    #[arg(long)]
    pub dir: Option<String>,

    /// Only files whose name matches this regex
    #[arg(long)]
    pub file: Option<String>,

    /// Rank of the first file to show
    #[arg(long, default_value = "0")]
    pub start: usize,

    /// Maximum files to show [default: 25]
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Arguments for `seek suggest`.
#[derive(Args, Debug, Clone)]
pub struct SuggestCommand {
    /// Text typed so far
    pub query: String,

    /// Suggest file names instead of symbols
    #[arg(short = 'f', long)]
    pub file_name: bool,

    /// Maximum suggestions [default: 10]
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Supported `seek` subcommands.
#[derive(Subcommand)]
pub enum Commands {
    /// Serve JSON-lines requests on stdin, answering on stdout
    #[command(after_help = "\
REQUESTS (one JSON object per line):
  {\"op\": \"search\", \"query\": \"main\", \"options\": 1}
  {\"op\": \"suggest\", \"query\": \"mai\", \"options\": 8, \"limit\": 5}
  {\"op\": \"index_file\", \"file_id\": \"1\", \"file_path\": \"src/main.c\"}
  {\"op\": \"add_field_values\", \"file_id\": \"1\", \"values\": {\"labels\": [\"core\"]}}
  {\"op\": \"build_suggestions\"}
  {\"op\": \"statistics\"}
  {\"op\": \"stop\"}

OPTIONS BITS:
  1 source   2 defs   4 log   8 file name")]
    Serve,

    /// Index files and directories
    Index(IndexCommand),

    /// Search the index
    #[command(after_help = "\
QUERY SYNTAX:
  term              Term must appear
  term1 term2       Both terms (implicit AND)
  \"phrase\"          Exact phrase match
  -term             Term must NOT appear
  term1 OR term2    Either term
  term~2            Fuzzy term
  pars*             Wildcard
  /pa.se/           Regex
  path:src          Field query (path, file, content, labels)

TAG SEARCH (--defs):
  kind:function main      Functions named main
  kind:type,macro         Types or macros

EXAMPLES:
  seek search 'parse OR lex'
  seek search --defs 'kind:function main'
  seek search --log 'connection refused after 3 retries'
  seek search --file-name parser")]
    Search(SearchCommand),

    /// Suggest file names or symbols
    Suggest(SuggestCommand),

    /// Rebuild the suggestion databases from the index
    BuildSuggestions,

    /// Show index statistics
    Stats {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Show effective configuration settings
    Config,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;
    use seek_config::{SearchSettings, SuggestSettings};

    use super::*;

    /// Gets help text for a subcommand's argument.
    fn get_arg_help(cmd: &clap::Command, subcmd: &str, arg: &str) -> String {
        cmd.get_subcommands()
            .find(|c| c.get_name() == subcmd)
            .and_then(|c| c.get_arguments().find(|a| a.get_id() == arg))
            .and_then(|a| a.get_help().map(|h| h.to_string()))
            .unwrap_or_default()
    }

    /// Help text defaults must track the configuration defaults.
    #[test]
    fn cli_help_defaults_match_config() {
        let cmd = Cli::command();

        let max_results = SearchSettings::default().max_results;
        let help = get_arg_help(&cmd, "search", "limit");
        assert!(
            help.contains(&format!("[default: {max_results}]")),
            "search --limit help should contain default {max_results}: {help}"
        );

        let default_limit = SuggestSettings::default().default_limit;
        let help = get_arg_help(&cmd, "suggest", "limit");
        assert!(
            help.contains(&format!("[default: {default_limit}]")),
            "suggest --limit help should contain default {default_limit}: {help}"
        );
    }

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn option_flags() {
        assert_eq!(OptionFlags::default().options(), SearchOptions::SEARCH_IN_SOURCE);

        let flags = OptionFlags {
            defs: true,
            log: true,
            ..OptionFlags::default()
        };
        assert_eq!(
            flags.options(),
            SearchOptions::SEARCH_IN_DEFS | SearchOptions::FIND_LOG_TEXT
        );
    }

    #[test]
    fn parses_search() {
        let cli = Cli::try_parse_from([
            "seek", "--index-dir", "/idx", "search", "--defs", "-n", "5", "kind:function", "main",
        ])
        .unwrap();
        assert_eq!(cli.global.index_dir, Some(PathBuf::from("/idx")));
        let Commands::Search(cmd) = cli.command else {
            panic!("expected search");
        };
        assert_eq!(cmd.query, vec!["kind:function", "main"]);
        assert_eq!(cmd.limit, Some(5));
        assert_eq!(cmd.modes.options(), SearchOptions::SEARCH_IN_DEFS);
    }
}
