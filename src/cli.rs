// SPDX-License-Identifier: MIT OR Apache-2.0

//! CLI argument parsing using clap

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// cfind - live fuzzy search window
///
/// Merges symbols, open windows, grep hits and file names into one ranked
/// list that refreshes while the query is typed.
#[derive(Parser, Debug)]
#[command(name = "cfind")]
#[command(
    author,
    version,
    about,
    long_about = None,
    after_help = "Query syntax:\n  <text>[+<flags>]   flags: s symbols, w windows, g grep, f files (default: sw)\n\nExamples:\n  cfind query 'main+f'\n  cfind score fb foobar baz"
)]
pub struct Cli {
    /// Config file (overrides .cfindrc.toml and ~/.config/cfind/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Root directory for the grep and file sources
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Maximum number of results shown
    #[arg(short = 'm', long, global = true)]
    pub limit: Option<usize>,

    /// Maximum results shown per file (0 disables the cap)
    #[arg(long, global = true)]
    pub per_group_cap: Option<usize>,

    /// Sources used when the query has no `+flags` suffix
    #[arg(long, global = true)]
    pub flags: Option<String>,

    /// Log filter (overrides CFIND_LOG and RUST_LOG)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Output format for results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the search window over stdin/stdout JSON lines (default)
    Serve,

    /// Run one query to completion and print the final results
    #[command(visible_alias = "q")]
    Query {
        /// Query text, optionally followed by `+flags`
        text: String,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Score candidates against a query and show matched positions
    Score {
        query: String,

        /// Candidate strings to score
        #[arg(required = true)]
        candidates: Vec<String>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn serve_is_the_default() {
        let cli = Cli::try_parse_from(["cfind", "--limit", "3"]).expect("parse");
        assert!(cli.command.is_none());
        assert_eq!(cli.limit, Some(3));
    }

    #[test]
    fn global_options_follow_subcommands() {
        let cli = Cli::try_parse_from([
            "cfind", "query", "main+f", "--root", "/tmp", "--format", "json",
        ])
        .expect("parse");
        assert_eq!(cli.root, Some(PathBuf::from("/tmp")));
        match cli.command {
            Some(Commands::Query { text, format }) => {
                assert_eq!(text, "main+f");
                assert_eq!(format, OutputFormat::Json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
