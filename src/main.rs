// SPDX-License-Identifier: MIT OR Apache-2.0

//! cfind - live fuzzy search window
//!
//! Symbols, open windows, grep hits and file names ranked together while
//! the query is typed.

mod cli;
mod host;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use cfind::config::Config;
use cfind::opener::{CommandOpener, Opener};
use cfind::source::SourceSet;
use cli::{Cli, Commands};

const LOG_ENV: &str = "CFIND_LOG";

fn init_tracing(level: Option<&str>) {
    let filter = level
        .and_then(|level| EnvFilter::try_new(level).ok())
        .or_else(|| EnvFilter::try_from_env(LOG_ENV).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("warn"));
    // stdout carries the host protocol
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from_path(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => Config::load(),
    };
    config.merge_limit(cli.limit);
    config.merge_per_group_cap(cli.per_group_cap);
    config.merge_root(cli.root.clone());
    config.merge_default_flags(cli.flags.clone());
    Ok(config)
}

fn search_root(config: &Config) -> Result<PathBuf> {
    match &config.root {
        Some(root) => Ok(root.clone()),
        None => std::env::current_dir().context("resolving current directory"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    let config = load_config(&cli)?;
    let settings = config.settings();
    let opener: Arc<dyn Opener> = Arc::new(CommandOpener::new(config.opener_command()));

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            let root = search_root(&config)?;
            let sources = SourceSet::from_config(&config, &root);
            host::serve(settings, sources, opener).await?;
        }
        Commands::Query { text, format } => {
            let root = search_root(&config)?;
            let sources = SourceSet::from_config(&config, &root);
            host::query_once(settings, sources, opener, &text, format).await?;
        }
        Commands::Score {
            query,
            candidates,
            format,
        } => {
            host::score(&query, &candidates, format)?;
        }
    }

    Ok(())
}
