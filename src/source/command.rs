// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sources backed by an external command's stdout

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::debug;

use super::{CandidateSender, Source};
use crate::address::{parse_output_line, Candidate};
use crate::errors::SourceError;
use crate::query::SourceKind;

/// How each output line becomes a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineFormat {
    /// `file:line[.col]...: text`, falling back to plain text
    Addressed,
    /// Text-only: the n-th whitespace-separated field (whole line if absent)
    Field(usize),
}

impl LineFormat {
    pub fn parse(self, line: &str) -> Option<Candidate> {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            return None;
        }
        match self {
            LineFormat::Addressed => Some(parse_output_line(line)),
            LineFormat::Field(n) => {
                let field = line.split_whitespace().nth(n).unwrap_or_else(|| line.trim());
                Some(Candidate::text(field))
            }
        }
    }
}

pub struct CommandSource {
    kind: SourceKind,
    argv: Vec<String>,
    root: PathBuf,
    format: LineFormat,
    quiet_exit_codes: Vec<i32>,
}

impl CommandSource {
    pub fn new(kind: SourceKind, argv: Vec<String>, root: &Path, format: LineFormat) -> Self {
        Self {
            kind,
            argv,
            root: root.to_path_buf(),
            format,
            quiet_exit_codes: Vec::new(),
        }
    }

    /// Exit codes that mean "finished, nothing more to say"
    pub fn with_quiet_exit_codes(mut self, codes: Vec<i32>) -> Self {
        self.quiet_exit_codes = codes;
        self
    }

    fn expand(&self, query: &str) -> Vec<String> {
        let root = self.root.display().to_string();
        self.argv
            .iter()
            .map(|arg| arg.replace("{query}", query).replace("{root}", &root))
            .collect()
    }
}

#[async_trait]
impl Source for CommandSource {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    async fn stream(&self, query: &str, out: &CandidateSender) -> Result<(), SourceError> {
        let argv = self.expand(query);
        let (program, args) = argv.split_first().ok_or(SourceError::EmptyCommand)?;
        debug!(source = %self.kind, command = ?argv, "spawning source command");

        let mut child = Command::new(program)
            .args(args)
            .current_dir(&self.root)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| SourceError::Spawn {
                program: program.clone(),
                source,
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| SourceError::Io(std::io::Error::other("stdout not captured")))?;
        let mut segments = BufReader::new(stdout).split(b'\n');

        loop {
            let segment = tokio::select! {
                biased;
                _ = out.cancelled() => {
                    if let Err(err) = child.kill().await {
                        debug!(program = %program, error = %err, "failed to kill source command");
                    }
                    return Err(SourceError::Cancelled);
                }
                segment = segments.next_segment() => segment?,
            };
            let Some(bytes) = segment else { break };
            let line = String::from_utf8_lossy(&bytes);
            if let Some(candidate) = self.format.parse(&line) {
                // Dropping `child` on the error path kills the process
                out.send(candidate).await?;
            }
        }

        // On cancellation `child` is dropped here, which kills it
        let status = tokio::select! {
            biased;
            _ = out.cancelled() => return Err(SourceError::Cancelled),
            status = child.wait() => status?,
        };
        if status.success() {
            return Ok(());
        }
        if out.is_cancelled() {
            return Err(SourceError::Cancelled);
        }
        if status
            .code()
            .is_some_and(|code| self.quiet_exit_codes.contains(&code))
        {
            return Ok(());
        }
        Err(SourceError::Exit {
            program: program.clone(),
            status,
        })
    }
}
