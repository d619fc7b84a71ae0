// SPDX-License-Identifier: MIT OR Apache-2.0

//! Round driver: scores incoming candidates and renders at a bounded rate
//!
//! One task per round owns the ranking store. It multiplexes three events:
//! cancellation, the render deadline and the next merged candidate. The
//! deadline is re-armed after every firing, so an idle round wakes at most
//! once per interval and renders only when membership changed. When every
//! source is done, one final render is forced.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{sleep, sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::address::{Candidate, SearchResult};
use crate::config::SearchSettings;
use crate::errors::RenderError;
use crate::fuzzy::score_candidate;
use crate::ranking::RankingStore;
use crate::source::{fan_in, Source};

/// Receives every ranked snapshot a round produces
pub trait SnapshotSink: Send {
    fn emit(&mut self, results: Vec<SearchResult>) -> Result<(), RenderError>;
}

impl<F> SnapshotSink for F
where
    F: FnMut(Vec<SearchResult>) -> Result<(), RenderError> + Send,
{
    fn emit(&mut self, results: Vec<SearchResult>) -> Result<(), RenderError> {
        self(results)
    }
}

/// How a round ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundOutcome {
    /// Every source finished and the final snapshot was rendered
    Completed,
    /// A newer edit superseded the round
    Cancelled,
    /// The display rejected a render; the round gave up
    RenderFailed,
}

/// The work started by one query edit
pub struct Round {
    pub generation: u64,
    pub query: String,
    pub sources: Vec<Arc<dyn Source>>,
    pub cancel: CancellationToken,
}

pub struct DebounceScheduler {
    query: String,
    limit: usize,
    per_group_cap: usize,
    interval: Duration,
    store: RankingStore,
}

impl DebounceScheduler {
    pub fn new(query: impl Into<String>, settings: &SearchSettings) -> Self {
        Self {
            query: query.into(),
            limit: settings.limit,
            per_group_cap: settings.per_group_cap,
            interval: settings.render_interval,
            store: RankingStore::new(),
        }
    }

    fn insert(&mut self, candidate: Candidate) {
        let score = score_candidate(&self.query, &candidate.text);
        self.store.insert(candidate.scored(score));
    }

    fn render<S: SnapshotSink>(&mut self, sink: &mut S) -> Result<(), RenderError> {
        let snapshot = self.store.snapshot(self.limit, self.per_group_cap);
        debug!(shown = snapshot.len(), ranked = self.store.len(), "rendering snapshot");
        sink.emit(snapshot)
    }

    /// Drain `candidates` until it closes or `cancel` fires
    pub async fn run<S: SnapshotSink>(
        mut self,
        mut candidates: mpsc::Receiver<Candidate>,
        cancel: &CancellationToken,
        sink: &mut S,
    ) -> RoundOutcome {
        let mut deadline = Instant::now() + self.interval;
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return RoundOutcome::Cancelled,
                _ = sleep_until(deadline) => {
                    if self.store.has_changes() {
                        if let Err(err) = self.render(sink) {
                            return render_failure(err);
                        }
                    }
                    deadline = Instant::now() + self.interval;
                }
                next = candidates.recv() => match next {
                    Some(candidate) => self.insert(candidate),
                    None => {
                        return match self.render(sink) {
                            Ok(()) => RoundOutcome::Completed,
                            Err(err) => render_failure(err),
                        };
                    }
                },
            }
        }
    }
}

fn render_failure(err: RenderError) -> RoundOutcome {
    if matches!(err, RenderError::Cancelled) {
        return RoundOutcome::Cancelled;
    }
    error!(error = %err, "render failed, abandoning round");
    RoundOutcome::RenderFailed
}

/// Run one round from start delay to final render
pub async fn run_round<S: SnapshotSink>(
    round: Round,
    settings: &SearchSettings,
    sink: &mut S,
) -> RoundOutcome {
    // Typing quickly cancels rounds before any source was spawned
    tokio::select! {
        biased;
        _ = round.cancel.cancelled() => return RoundOutcome::Cancelled,
        _ = sleep(settings.start_delay) => {}
    }

    debug!(
        generation = round.generation,
        query = %round.query,
        sources = round.sources.len(),
        "starting round"
    );
    let candidates = fan_in(
        round.sources,
        &round.query,
        &round.cancel,
        settings.channel_capacity,
    );
    let outcome = DebounceScheduler::new(round.query, settings)
        .run(candidates, &round.cancel, sink)
        .await;
    debug!(generation = round.generation, ?outcome, "round finished");
    outcome
}
