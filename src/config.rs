// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration file support for cfind
//!
//! Loads configuration from .cfindrc.toml in current directory or ~/.config/cfind/config.toml

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

use crate::errors::ConfigError;
use crate::query::{DEFAULT_FLAGS, DEFAULT_PROMPT};

pub const DEFAULT_LIMIT: usize = 20;
pub const DEFAULT_PER_GROUP_CAP: usize = 5;
pub const DEFAULT_START_DELAY_MS: u64 = 100;
pub const DEFAULT_RENDER_INTERVAL_MS: u64 = 100;
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;
/// Field of acme's index file holding the window name
pub const DEFAULT_WINDOWS_NAME_FIELD: usize = 5;

/// External commands backing the command sources
///
/// Each command is an argv list; `{query}` and `{root}` are substituted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub symbols: Option<Vec<String>>,
    pub grep: Option<Vec<String>>,
    pub windows: Option<Vec<String>>,
    /// Whitespace-separated field of each window line used as its name
    pub windows_name_field: Option<usize>,
    /// Maximum directory depth for the file name source
    pub files_max_depth: Option<usize>,
    /// Include hidden files in the file name source
    pub files_hidden: Option<bool>,
}

impl SourcesConfig {
    pub fn symbols_command(&self) -> Vec<String> {
        self.symbols
            .clone()
            .unwrap_or_else(|| argv(&["L", "sym", "-p", "{query}"]))
    }

    pub fn grep_command(&self) -> Vec<String> {
        self.grep.clone().unwrap_or_else(|| {
            argv(&[
                "rg",
                "--line-number",
                "--column",
                "--max-columns",
                "120",
                "{query}",
                "{root}",
            ])
        })
    }

    pub fn windows_command(&self) -> Vec<String> {
        self.windows
            .clone()
            .unwrap_or_else(|| argv(&["9p", "read", "acme/index"]))
    }

    pub fn windows_name_field(&self) -> usize {
        self.windows_name_field.unwrap_or(DEFAULT_WINDOWS_NAME_FIELD)
    }
}

fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|part| part.to_string()).collect()
}

/// Configuration loaded from .cfindrc.toml or ~/.config/cfind/config.toml
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Text in front of the query on the first line
    pub prompt: Option<String>,
    /// Sources used when the query has no `+flags` suffix
    pub default_flags: Option<String>,
    /// Maximum number of results shown
    pub limit: Option<usize>,
    /// Maximum results shown per file (0 disables the cap)
    pub per_group_cap: Option<usize>,
    /// Delay before sources start, so fast typing never spawns stale work
    pub start_delay_ms: Option<u64>,
    /// Idle time between renders
    pub render_interval_ms: Option<u64>,
    /// Buffered candidates between sources and the ranking loop
    pub channel_capacity: Option<usize>,
    /// Root for the grep and file sources (defaults to current directory)
    pub root: Option<PathBuf>,
    /// Command used to open a result; `{addr}` is substituted
    pub opener: Option<Vec<String>>,
    pub sources: SourcesConfig,
}

impl Config {
    /// Load configuration from files
    ///
    /// Precedence (highest to lowest):
    /// 1. .cfindrc.toml in current directory
    /// 2. ~/.config/cfind/config.toml
    pub fn load() -> Self {
        // Try current directory first
        if let Some(config) = Self::load_quietly(&PathBuf::from(".cfindrc.toml")) {
            return config;
        }

        // Try home directory config
        if let Some(home) = dirs::home_dir() {
            let config_path = home.join(".config").join("cfind").join("config.toml");
            if let Some(config) = Self::load_quietly(&config_path) {
                return config;
            }
        }

        Self::default()
    }

    /// Load an explicitly named file; unlike [`Config::load`] errors surface
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    fn load_quietly(path: &Path) -> Option<Self> {
        if !path.exists() {
            return None;
        }
        match Self::load_from_path(path) {
            Ok(config) => Some(config),
            Err(e) => {
                warn!("{}", e);
                None
            }
        }
    }

    pub fn settings(&self) -> SearchSettings {
        SearchSettings {
            prompt: self.prompt.clone().unwrap_or_else(|| DEFAULT_PROMPT.to_string()),
            default_flags: self
                .default_flags
                .clone()
                .unwrap_or_else(|| DEFAULT_FLAGS.to_string()),
            limit: self.limit.unwrap_or(DEFAULT_LIMIT),
            per_group_cap: self.per_group_cap.unwrap_or(DEFAULT_PER_GROUP_CAP),
            start_delay: Duration::from_millis(
                self.start_delay_ms.unwrap_or(DEFAULT_START_DELAY_MS),
            ),
            render_interval: Duration::from_millis(
                self.render_interval_ms
                    .unwrap_or(DEFAULT_RENDER_INTERVAL_MS)
                    .max(1),
            ),
            channel_capacity: self
                .channel_capacity
                .unwrap_or(DEFAULT_CHANNEL_CAPACITY)
                .max(1),
        }
    }

    pub fn opener_command(&self) -> Vec<String> {
        self.opener
            .clone()
            .unwrap_or_else(|| argv(&["plumb", "{addr}"]))
    }

    /// Merge CLI options with config (CLI wins)
    pub fn merge_limit(&mut self, cli_value: Option<usize>) {
        if cli_value.is_some() {
            self.limit = cli_value;
        }
    }

    pub fn merge_per_group_cap(&mut self, cli_value: Option<usize>) {
        if cli_value.is_some() {
            self.per_group_cap = cli_value;
        }
    }

    pub fn merge_root(&mut self, cli_value: Option<PathBuf>) {
        if cli_value.is_some() {
            self.root = cli_value;
        }
    }

    pub fn merge_default_flags(&mut self, cli_value: Option<String>) {
        if cli_value.is_some() {
            self.default_flags = cli_value;
        }
    }
}

/// Resolved knobs for one search session
#[derive(Debug, Clone)]
pub struct SearchSettings {
    pub prompt: String,
    pub default_flags: String,
    pub limit: usize,
    pub per_group_cap: usize,
    pub start_delay: Duration,
    pub render_interval: Duration,
    pub channel_capacity: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Config::default().settings()
    }
}
