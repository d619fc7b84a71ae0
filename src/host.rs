// SPDX-License-Identifier: MIT OR Apache-2.0

//! Window hosts: the stdio JSON-lines protocol and one-shot queries

use anyhow::{bail, Context, Result};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

use cfind::address::SearchResult;
use cfind::config::SearchSettings;
use cfind::display::{shift_selection, Display, Frame};
use cfind::errors::RenderError;
use cfind::fuzzy::{has_match, match_positions, score_candidate, Score, SCORE_MAX};
use cfind::opener::Opener;
use cfind::query::{Edit, EditOutcome};
use cfind::scheduler::RoundOutcome;
use cfind::session::{ClickOutcome, Session};
use cfind::source::SourceSet;

use crate::cli::OutputFormat;

#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
enum HostEvent {
    Insert { q0: usize, text: String },
    Delete { q0: usize, q1: usize },
    Click { offset: i64 },
    Select { q0: usize, q1: usize },
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum HostMessage<'a> {
    Frame {
        query: &'a str,
        lines: &'a [String],
        selection: (usize, usize),
    },
    Click {
        handled: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        address: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    Error {
        message: String,
    },
}

impl<'a> HostMessage<'a> {
    fn frame(frame: &'a Frame) -> Self {
        HostMessage::Frame {
            query: &frame.query,
            lines: &frame.lines,
            selection: frame.selection,
        }
    }
}

/// Serialized, newline-terminated messages on a shared writer
struct JsonLines<W> {
    out: Mutex<W>,
}

impl<W: Write> JsonLines<W> {
    fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    fn send(&self, message: &HostMessage<'_>) -> io::Result<()> {
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        serde_json::to_writer(&mut *out, message)?;
        out.write_all(b"\n")?;
        out.flush()
    }
}

/// Display backed by JSON frames on stdout
struct StdioDisplay<W> {
    lines: Arc<JsonLines<W>>,
    selection: Mutex<(usize, usize)>,
}

impl<W: Write> StdioDisplay<W> {
    fn new(lines: Arc<JsonLines<W>>, selection: (usize, usize)) -> Self {
        Self {
            lines,
            selection: Mutex::new(selection),
        }
    }

    fn select(&self, q0: usize, q1: usize) {
        *self.selection.lock().unwrap_or_else(PoisonError::into_inner) = (q0.min(q1), q0.max(q1));
    }
}

impl<W: Write + Send> Display for StdioDisplay<W> {
    fn selection(&self) -> (usize, usize) {
        *self.selection.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, frame: &Frame) -> Result<(), RenderError> {
        *self.selection.lock().unwrap_or_else(PoisonError::into_inner) = frame.selection;
        self.lines.send(&HostMessage::frame(frame))?;
        Ok(())
    }

    fn edited(&self, edit: &Edit) {
        let mut selection = self.selection.lock().unwrap_or_else(PoisonError::into_inner);
        *selection = shift_selection(*selection, edit);
    }
}

/// Serve one search window over stdin/stdout until stdin closes
pub async fn serve(
    settings: SearchSettings,
    sources: SourceSet,
    opener: Arc<dyn Opener>,
) -> Result<()> {
    let output = Arc::new(JsonLines::new(io::stdout()));
    let caret = settings.prompt.len();
    let display = Arc::new(StdioDisplay::new(Arc::clone(&output), (caret, caret)));
    let session = Session::new(settings, sources, display.clone(), opener);

    let initial = session.initial_frame();
    output
        .send(&HostMessage::frame(&initial))
        .context("writing initial frame")?;

    let mut events = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = events.next_line().await.context("reading host events")? {
        if line.trim().is_empty() {
            continue;
        }
        let event = match serde_json::from_str::<HostEvent>(&line) {
            Ok(event) => event,
            Err(err) => {
                warn!(error = %err, "ignoring malformed event");
                output.send(&HostMessage::Error {
                    message: format!("parse error: {}", err),
                })?;
                continue;
            }
        };
        debug!(?event, "host event");
        match event {
            HostEvent::Insert { q0, text } => {
                session.insert(q0, text);
            }
            HostEvent::Delete { q0, q1 } => {
                session.delete(q0, q1);
            }
            HostEvent::Select { q0, q1 } => display.select(q0, q1),
            HostEvent::Click { offset } => {
                let reply = match session.click(offset).await {
                    Ok(ClickOutcome::Opened(address)) => HostMessage::Click {
                        handled: true,
                        address: Some(address),
                        error: None,
                    },
                    Ok(ClickOutcome::Unhandled) => HostMessage::Click {
                        handled: false,
                        address: None,
                        error: None,
                    },
                    Err(err) => {
                        warn!(error = %err, "open failed");
                        HostMessage::Click {
                            handled: true,
                            address: None,
                            error: Some(err.to_string()),
                        }
                    }
                };
                output.send(&reply)?;
            }
        }
    }

    // Input closed: let the last round render before exiting
    session.wait().await;
    Ok(())
}

/// Keeps only the most recent frame
#[derive(Default)]
struct LastFrame {
    frame: Mutex<Option<Frame>>,
}

impl Display for LastFrame {
    fn selection(&self) -> (usize, usize) {
        (0, 0)
    }

    fn publish(&self, frame: &Frame) -> Result<(), RenderError> {
        *self.frame.lock().unwrap_or_else(PoisonError::into_inner) = Some(frame.clone());
        Ok(())
    }
}

#[derive(Serialize)]
struct QueryReport<'a> {
    query: &'a str,
    lines: &'a [String],
    results: &'a [SearchResult],
}

/// Run `text` as a single round and print its final frame
pub async fn query_once(
    settings: SearchSettings,
    sources: SourceSet,
    opener: Arc<dyn Opener>,
    text: &str,
    format: OutputFormat,
) -> Result<()> {
    let display = Arc::new(LastFrame::default());
    let caret = settings.prompt.len();
    let session = Session::new(settings, sources, display.clone(), opener);

    let frame = if session.insert(caret, text) == EditOutcome::Applied {
        match session.wait().await {
            Some(RoundOutcome::Completed) => {}
            Some(outcome) => bail!("query round ended with {:?}", outcome),
            None => bail!("query round did not run"),
        }
        display
            .frame
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .context("query produced no frame")?
    } else {
        session.initial_frame()
    };
    let results = session.results();

    match format {
        OutputFormat::Json => {
            let report = QueryReport {
                query: &frame.query,
                lines: &frame.lines,
                results: &results,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Text => print_frame(&frame, &results),
    }
    Ok(())
}

fn print_frame(frame: &Frame, results: &[SearchResult]) {
    println!("{}", frame.query.bold());
    let headers: HashSet<&str> = results
        .iter()
        .filter(|result| result.address.as_ref().is_some_and(|a| a.from_line.is_some()))
        .filter_map(|result| result.group())
        .collect();
    for line in &frame.lines {
        if headers.contains(line.as_str()) {
            println!("{}", line.cyan());
        } else {
            println!("{}", line);
        }
    }
}

#[derive(Serialize)]
struct ScoreReport<'a> {
    candidate: &'a str,
    matched: bool,
    exact: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    score: Option<Score>,
    positions: Vec<usize>,
}

/// Score each candidate against `query`, best first
pub fn score(query: &str, candidates: &[String], format: OutputFormat) -> Result<()> {
    let mut reports: Vec<ScoreReport<'_>> = candidates
        .iter()
        .map(|candidate| {
            let matched = has_match(query, candidate);
            let value = score_candidate(query, candidate);
            let positions = if matched {
                match_positions(query, candidate)
                    .map(|(_, positions)| positions)
                    .unwrap_or_default()
            } else {
                Vec::new()
            };
            ScoreReport {
                candidate,
                matched,
                exact: matched && value == SCORE_MAX,
                score: (matched && value.is_finite()).then_some(value),
                positions,
            }
        })
        .collect();
    reports.sort_by(|a, b| {
        b.matched
            .cmp(&a.matched)
            .then_with(|| b.exact.cmp(&a.exact))
            .then_with(|| {
                b.score
                    .unwrap_or(0.0)
                    .total_cmp(&a.score.unwrap_or(0.0))
            })
    });

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&reports)?),
        OutputFormat::Text => {
            for report in &reports {
                let label = match (report.matched, report.exact, report.score) {
                    (false, _, _) => "-".to_string(),
                    (true, true, _) => "exact".to_string(),
                    (true, false, Some(value)) => format!("{:.3}", value),
                    (true, false, None) => "-".to_string(),
                };
                println!(
                    "{}  {}",
                    format!("{:>8}", label).yellow(),
                    highlight(report.candidate, &report.positions)
                );
            }
        }
    }
    Ok(())
}

fn highlight(candidate: &str, positions: &[usize]) -> String {
    let marked: HashSet<usize> = positions.iter().copied().collect();
    candidate
        .chars()
        .enumerate()
        .map(|(idx, c)| {
            if marked.contains(&idx) {
                c.to_string().green().bold().to_string()
            } else {
                c.to_string()
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_decode_from_json_lines() {
        let event: HostEvent =
            serde_json::from_str(r#"{"event":"insert","q0":2,"text":"fb"}"#).expect("insert");
        assert!(matches!(event, HostEvent::Insert { q0: 2, ref text } if text == "fb"));
        let event: HostEvent =
            serde_json::from_str(r#"{"event":"click","offset":-1}"#).expect("click");
        assert!(matches!(event, HostEvent::Click { offset: -1 }));
        assert!(serde_json::from_str::<HostEvent>(r#"{"event":"scroll"}"#).is_err());
    }

    #[test]
    fn frames_are_written_one_per_line() {
        let lines = Arc::new(JsonLines::new(Vec::new()));
        let display = StdioDisplay::new(Arc::clone(&lines), (2, 2));
        let frame = Frame {
            query: "> fb".to_string(),
            lines: vec!["foobar".to_string()],
            selection: (4, 4),
        };
        display.publish(&frame).expect("publish");
        assert_eq!(display.selection(), (4, 4));

        let written = lines.out.lock().expect("out").clone();
        let text = String::from_utf8(written).expect("utf8");
        assert_eq!(
            text,
            "{\"type\":\"frame\",\"query\":\"> fb\",\"lines\":[\"foobar\"],\"selection\":[4,4]}\n"
        );
    }

    #[test]
    fn selection_is_normalized() {
        let lines = Arc::new(JsonLines::new(Vec::new()));
        let display = StdioDisplay::new(lines, (0, 0));
        display.select(5, 3);
        assert_eq!(display.selection(), (3, 5));
    }

    #[test]
    fn selection_moves_with_edits() {
        let lines = Arc::new(JsonLines::new(Vec::new()));
        let display = StdioDisplay::new(lines, (2, 2));
        display.edited(&Edit::Insert {
            q0: 2,
            text: "abc".to_string(),
        });
        assert_eq!(display.selection(), (5, 5));
        display.edited(&Edit::Delete { q0: 4, q1: 5 });
        assert_eq!(display.selection(), (4, 4));
    }
}
