// SPDX-License-Identifier: MIT OR Apache-2.0

//! Result producers and the fan-in that merges them
//!
//! Every source of a round runs as its own task and writes unscored
//! candidates into one bounded channel. The channel closes once the last
//! task drops its sender, which is how the ranking loop learns that all
//! sources are done.

pub mod command;
pub mod files;

use async_trait::async_trait;
use std::collections::HashMap;
use std::io;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::address::Candidate;
use crate::config::Config;
use crate::errors::{suggestions, SourceError};
use crate::query::SourceKind;

pub use command::{CommandSource, LineFormat};
pub use files::FileNameSource;

/// A producer of unscored candidates for one query
#[async_trait]
pub trait Source: Send + Sync {
    fn kind(&self) -> SourceKind;

    /// Stream candidates for `query` into `out` until exhausted
    ///
    /// Implementations must stop promptly once `out` reports cancellation,
    /// returning [`SourceError::Cancelled`].
    async fn stream(&self, query: &str, out: &CandidateSender) -> Result<(), SourceError>;
}

/// Sending half of the merge channel, bound to the round's cancellation
#[derive(Clone)]
pub struct CandidateSender {
    tx: mpsc::Sender<Candidate>,
    cancel: CancellationToken,
}

impl CandidateSender {
    pub fn new(tx: mpsc::Sender<Candidate>, cancel: CancellationToken) -> Self {
        Self { tx, cancel }
    }

    /// Send one candidate, giving up as soon as the round is cancelled
    ///
    /// A full channel never blocks cancellation.
    pub async fn send(&self, candidate: Candidate) -> Result<(), SourceError> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(SourceError::Cancelled),
            sent = self.tx.send(candidate) => sent.map_err(|_| SourceError::Cancelled),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves once the round is cancelled
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }

    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }
}

/// Spawn every source for a round and return the merged stream
///
/// The receiver yields `None` only after all spawned sources terminated.
pub fn fan_in(
    sources: Vec<Arc<dyn Source>>,
    query: &str,
    cancel: &CancellationToken,
    capacity: usize,
) -> mpsc::Receiver<Candidate> {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    for source in sources {
        let out = CandidateSender::new(tx.clone(), cancel.clone());
        let query = query.to_string();
        tokio::spawn(async move {
            let kind = source.kind();
            match source.stream(&query, &out).await {
                Ok(()) => debug!(source = %kind, "source finished"),
                Err(err) if err.is_cancelled() || out.is_cancelled() => {
                    debug!(source = %kind, "source stopped by cancellation")
                }
                Err(err) => report_failure(kind, &err),
            }
        });
    }
    rx
}

fn report_failure(kind: SourceKind, err: &SourceError) {
    if let SourceError::Spawn { program, source } = err {
        if source.kind() == io::ErrorKind::NotFound {
            warn!(
                source = %kind,
                "{}",
                suggestions::missing_program_suggestion(program, kind.code())
            );
            return;
        }
    }
    warn!(source = %kind, error = %err, "source failed");
}

/// The sources available to a session, keyed by flag
#[derive(Clone, Default)]
pub struct SourceSet {
    sources: HashMap<SourceKind, Arc<dyn Source>>,
}

impl SourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// The four built-in sources configured from `config`
    pub fn from_config(config: &Config, root: &Path) -> Self {
        let sources = &config.sources;
        let mut set = Self::new();
        set.insert(Arc::new(CommandSource::new(
            SourceKind::Symbols,
            sources.symbols_command(),
            root,
            LineFormat::Addressed,
        )));
        set.insert(Arc::new(
            CommandSource::new(
                SourceKind::Grep,
                sources.grep_command(),
                root,
                LineFormat::Addressed,
            )
            // grep-style tools exit 1 when nothing matched
            .with_quiet_exit_codes(vec![1]),
        ));
        set.insert(Arc::new(CommandSource::new(
            SourceKind::Windows,
            sources.windows_command(),
            root,
            LineFormat::Field(sources.windows_name_field()),
        )));
        set.insert(Arc::new(
            FileNameSource::new(root)
                .with_max_depth(sources.files_max_depth)
                .with_hidden(sources.files_hidden.unwrap_or(false)),
        ));
        set
    }

    /// Register a source, replacing any other of the same kind
    pub fn insert(&mut self, source: Arc<dyn Source>) {
        self.sources.insert(source.kind(), source);
    }

    pub fn select(&self, kinds: &[SourceKind]) -> Vec<Arc<dyn Source>> {
        kinds
            .iter()
            .filter_map(|kind| {
                let found = self.sources.get(kind).cloned();
                if found.is_none() {
                    warn!(source = %kind, "no source registered");
                }
                found
            })
            .collect()
    }
}
