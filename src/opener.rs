// SPDX-License-Identifier: MIT OR Apache-2.0

//! Hands a clicked result's address to the editor's open mechanism

use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use crate::errors::OpenError;

const ADDRESS_PLACEHOLDER: &str = "{addr}";

#[async_trait]
pub trait Opener: Send + Sync {
    /// Open `address` (`file[:line[.col][,line[.col]]]`)
    async fn open(&self, address: &str) -> Result<(), OpenError>;
}

/// Runs an external command such as `plumb {addr}`
///
/// When no argument carries the placeholder the address is appended.
pub struct CommandOpener {
    argv: Vec<String>,
}

impl CommandOpener {
    pub fn new(argv: Vec<String>) -> Self {
        Self { argv }
    }

    fn expand(&self, address: &str) -> Vec<String> {
        let mut argv: Vec<String> = self
            .argv
            .iter()
            .map(|arg| arg.replace(ADDRESS_PLACEHOLDER, address))
            .collect();
        if !self.argv.iter().any(|arg| arg.contains(ADDRESS_PLACEHOLDER)) {
            argv.push(address.to_string());
        }
        argv
    }
}

#[async_trait]
impl Opener for CommandOpener {
    async fn open(&self, address: &str) -> Result<(), OpenError> {
        if self.argv.is_empty() {
            return Err(OpenError::EmptyCommand);
        }
        let argv = self.expand(address);
        let (program, args) = argv.split_first().ok_or(OpenError::EmptyCommand)?;
        debug!(command = ?argv, "opening address");

        let status = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .status()
            .await
            .map_err(|source| OpenError::Spawn {
                program: program.clone(),
                source,
            })?;
        if !status.success() {
            return Err(OpenError::Exit {
                program: program.clone(),
                address: address.to_string(),
                status,
            });
        }
        Ok(())
    }
}
