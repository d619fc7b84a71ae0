// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query controller for one search window
//!
//! Every edit of the query line supersedes the running round: its token is
//! cancelled and a new round starts. A round publishes through the session
//! lock and re-checks its token under that lock, so once an edit returns no
//! frame of an older round can reach the display.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::address::SearchResult;
use crate::address_index::AddressIndex;
use crate::config::SearchSettings;
use crate::display::{self, Display, Frame};
use crate::errors::{OpenError, RenderError};
use crate::opener::Opener;
use crate::query::{Edit, EditOutcome, QueryBuffer};
use crate::scheduler::{run_round, Round, RoundOutcome};
use crate::source::SourceSet;

/// Whether any round was ever started
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    RoundActive,
}

/// Result of a click in the display
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    /// The click was on the query line, a header or a text-only result
    Unhandled,
    /// The address handed to the opener
    Opened(String),
}

struct ActiveRound {
    generation: u64,
    cancel: CancellationToken,
    handle: Option<JoinHandle<RoundOutcome>>,
}

struct State {
    query: QueryBuffer,
    generation: u64,
    round: Option<ActiveRound>,
    published: AddressIndex,
}

struct Inner {
    settings: SearchSettings,
    sources: SourceSet,
    display: Arc<dyn Display>,
    opener: Arc<dyn Opener>,
    state: Mutex<State>,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Publish a snapshot of the round owning `cancel`
    fn publish(
        &self,
        cancel: &CancellationToken,
        results: Vec<SearchResult>,
    ) -> Result<(), RenderError> {
        let mut state = self.lock();
        if cancel.is_cancelled() {
            return Err(RenderError::Cancelled);
        }

        state.query.ensure_newline();
        let query_line = state.query.line();
        let layout = display::layout(query_line.len(), &results);
        let query = query_line.trim_end_matches('\n').to_string();
        let selection = display::clamp_selection(self.display.selection(), query.len());
        let frame = Frame {
            query,
            lines: layout.lines,
            selection,
        };
        self.display.publish(&frame)?;
        state.published = layout.index;
        Ok(())
    }
}

/// A live search window: query line, rounds and the published results
pub struct Session {
    inner: Arc<Inner>,
}

impl Session {
    pub fn new(
        settings: SearchSettings,
        sources: SourceSet,
        display: Arc<dyn Display>,
        opener: Arc<dyn Opener>,
    ) -> Self {
        let query = QueryBuffer::new(settings.prompt.clone());
        Self {
            inner: Arc::new(Inner {
                settings,
                sources,
                display,
                opener,
                state: Mutex::new(State {
                    query,
                    generation: 0,
                    round: None,
                    published: AddressIndex::new(),
                }),
            }),
        }
    }

    pub fn phase(&self) -> Phase {
        if self.inner.lock().generation == 0 {
            Phase::Idle
        } else {
            Phase::RoundActive
        }
    }

    /// The query line as it currently sits in the display
    pub fn query_line(&self) -> String {
        self.inner.lock().query.line().to_string()
    }

    /// Text placed in the display before the first round renders
    pub fn initial_frame(&self) -> Frame {
        let state = self.inner.lock();
        Frame {
            query: state.query.line().trim_end_matches('\n').to_string(),
            lines: Vec::new(),
            selection: (state.query.prompt().len(), state.query.prompt().len()),
        }
    }

    /// Apply an edit reported by the display
    ///
    /// Edits touching the query line cancel the running round and start a
    /// new one. Must be called from within a tokio runtime.
    pub fn edit(&self, edit: Edit) -> EditOutcome {
        let mut state = self.inner.lock();
        self.inner.display.edited(&edit);
        if state.query.apply(&edit) == EditOutcome::Ignored {
            return EditOutcome::Ignored;
        }

        if let Some(previous) = state.round.take() {
            previous.cancel.cancel();
            debug!(generation = previous.generation, "round superseded");
        }

        let parsed = state.query.parse(&self.inner.settings.default_flags);
        for flag in &parsed.unknown_flags {
            warn!(query = %parsed.text, "{}", flag);
        }
        let sources = if parsed.text.is_empty() {
            Vec::new()
        } else {
            self.inner.sources.select(&parsed.sources)
        };

        state.generation += 1;
        let cancel = CancellationToken::new();
        let round = Round {
            generation: state.generation,
            query: parsed.text,
            sources,
            cancel: cancel.clone(),
        };

        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move {
            let token = round.cancel.clone();
            let publisher = Arc::clone(&inner);
            let mut sink = move |results: Vec<SearchResult>| publisher.publish(&token, results);
            run_round(round, &inner.settings, &mut sink).await
        });

        state.round = Some(ActiveRound {
            generation: state.generation,
            cancel,
            handle: Some(handle),
        });
        EditOutcome::Applied
    }

    pub fn insert(&self, q0: usize, text: impl Into<String>) -> EditOutcome {
        self.edit(Edit::Insert {
            q0,
            text: text.into(),
        })
    }

    pub fn delete(&self, q0: usize, q1: usize) -> EditOutcome {
        self.edit(Edit::Delete { q0, q1 })
    }

    /// Results of the last published frame, in display order
    pub fn results(&self) -> Vec<SearchResult> {
        self.inner.lock().published.results().to_vec()
    }

    /// The published result whose line contains `offset`
    pub fn resolve(&self, offset: i64) -> Option<SearchResult> {
        let state = self.inner.lock();
        let on_query_line =
            usize::try_from(offset).map_or(true, |offset| state.query.contains(offset));
        if on_query_line {
            return None;
        }
        state.published.resolve(offset).cloned()
    }

    /// Resolve a click and hand the address to the opener
    pub async fn click(&self, offset: i64) -> Result<ClickOutcome, OpenError> {
        let Some(address) = self.resolve(offset).and_then(|result| result.address) else {
            return Ok(ClickOutcome::Unhandled);
        };
        let address = address.to_string();
        self.inner.opener.open(&address).await?;
        Ok(ClickOutcome::Opened(address))
    }

    /// Wait for the current round to end
    ///
    /// Returns `None` when there is no round or it was already awaited.
    pub async fn wait(&self) -> Option<RoundOutcome> {
        let handle = {
            let mut state = self.inner.lock();
            state.round.as_mut().and_then(|round| round.handle.take())
        }?;
        match handle.await {
            Ok(outcome) => Some(outcome),
            Err(err) => {
                warn!(error = %err, "round task failed");
                None
            }
        }
    }

    /// Cancel the running round, if any
    pub fn cancel(&self) {
        if let Some(round) = self.inner.lock().round.as_ref() {
            round.cancel.cancel();
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.cancel();
    }
}
