// SPDX-License-Identifier: MIT OR Apache-2.0

//! File name source using the ignore crate (same as ripgrep)

use async_trait::async_trait;
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{CandidateSender, Source};
use crate::address::{Address, Candidate};
use crate::errors::SourceError;
use crate::fuzzy::has_match;
use crate::query::SourceKind;

const WALK_QUEUE_BOUND: usize = 256;

/// Recursive file name search that respects .gitignore
pub struct FileNameSource {
    root: PathBuf,
    max_depth: Option<usize>,
    hidden: bool,
}

impl FileNameSource {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            max_depth: None,
            hidden: false,
        }
    }

    pub fn with_max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    /// Include hidden files and directories
    pub fn with_hidden(mut self, enabled: bool) -> Self {
        self.hidden = enabled;
        self
    }

    fn make_builder(&self) -> WalkBuilder {
        let mut builder = WalkBuilder::new(&self.root);
        builder
            .hidden(!self.hidden)
            .max_depth(self.max_depth)
            .git_ignore(true)
            .git_exclude(true)
            .git_global(true)
            .filter_entry(|entry| {
                entry
                    .file_name()
                    .to_str()
                    .map(|name| name != ".git" && name != ".hg" && name != ".svn")
                    .unwrap_or(true)
            });
        builder
    }
}

/// Walk on a blocking thread, forwarding matching relative paths
///
/// Stops when cancelled or when the receiving side goes away.
fn walk_matching(
    builder: WalkBuilder,
    root: &Path,
    query: &str,
    cancel: &CancellationToken,
    tx: &mpsc::Sender<(String, PathBuf)>,
) -> Result<(), SourceError> {
    for entry in builder.build() {
        if cancel.is_cancelled() {
            return Err(SourceError::Cancelled);
        }
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                debug!(error = %err, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_some_and(|kind| kind.is_file()) {
            continue;
        }
        let path = entry.path();
        let relative = path
            .strip_prefix(root)
            .unwrap_or(path)
            .display()
            .to_string();
        if !has_match(query, &relative) {
            continue;
        }
        if tx.blocking_send((relative, path.to_path_buf())).is_err() {
            return Err(SourceError::Cancelled);
        }
    }
    Ok(())
}

#[async_trait]
impl Source for FileNameSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Files
    }

    async fn stream(&self, query: &str, out: &CandidateSender) -> Result<(), SourceError> {
        let (tx, mut rx) = mpsc::channel(WALK_QUEUE_BOUND);
        let builder = self.make_builder();
        let root = self.root.clone();
        let query_owned = query.to_string();
        let cancel = out.token().clone();
        let walker = tokio::task::spawn_blocking(move || {
            walk_matching(builder, &root, &query_owned, &cancel, &tx)
        });

        loop {
            // Returning drops `rx`, which ends the walk at its next send
            let next = tokio::select! {
                biased;
                _ = out.cancelled() => return Err(SourceError::Cancelled),
                next = rx.recv() => next,
            };
            let Some((relative, path)) = next else { break };
            let address = Address::file(path.display().to_string());
            out.send(Candidate::at(relative, address)).await?;
        }

        walker.await.map_err(|err| SourceError::Walk {
            root: self.root.clone(),
            message: err.to_string(),
        })?
    }
}
