// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for sources, rendering, opening and configuration
//!
//! Each failure class has its own type so callers can decide how loudly to
//! report it: a cancelled source is routine, a failed render ends the round.

use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

/// Failure of a single result producer
#[derive(Debug, Error)]
pub enum SourceError {
    /// The round was superseded while the source was running
    #[error("source cancelled")]
    Cancelled,

    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("'{program}' exited with {status}")]
    Exit { program: String, status: ExitStatus },

    #[error("reading output: {0}")]
    Io(#[from] io::Error),

    #[error("walking {root}: {message}")]
    Walk { root: PathBuf, message: String },

    #[error("source command is empty")]
    EmptyCommand,
}

impl SourceError {
    /// Cancellation is the expected end of a superseded round, not a fault
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SourceError::Cancelled)
    }
}

/// The display rejected a publish
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("render cancelled")]
    Cancelled,

    #[error("display rejected frame: {0}")]
    Display(String),

    #[error("writing frame: {0}")]
    Io(#[from] io::Error),
}

/// Handing an address to the external opener failed
#[derive(Debug, Error)]
pub enum OpenError {
    #[error("opener command is empty")]
    EmptyCommand,

    #[error("failed to start opener '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("opener '{program}' exited with {status} for {address}")]
    Exit {
        program: String,
        address: String,
        status: ExitStatus,
    },
}

/// A `+` suffix character that names no known source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FlagError {
    #[error("unknown flag: {0}")]
    Unknown(char),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Helper functions for creating helpful error messages
pub mod suggestions {
    /// Get suggestion for a source binary that could not be started
    pub fn missing_program_suggestion(program: &str, flag: char) -> String {
        format!(
            "'{}' was not found on PATH; install it, point [sources] at another \
             command in .cfindrc.toml, or remove '{}' after '+' in the query",
            program, flag
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_cancelled_source_errors_are_cancellations() {
        assert!(SourceError::Cancelled.is_cancelled());
        let err = SourceError::Spawn {
            program: "rg".to_string(),
            source: io::Error::new(io::ErrorKind::NotFound, "missing"),
        };
        assert!(!err.is_cancelled());
        assert!(err.to_string().contains("'rg'"));
    }

    #[test]
    fn flag_error_names_the_character() {
        assert_eq!(FlagError::Unknown('z').to_string(), "unknown flag: z");
    }

    #[test]
    fn missing_program_suggestion_is_one_line() {
        let message = suggestions::missing_program_suggestion("L", 's');
        assert!(message.contains("'L'"));
        assert!(message.contains("remove 's'"));
        assert!(!message.contains('\n'));
    }
}
