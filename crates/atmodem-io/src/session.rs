//! Request/response collection over the response channel.
//!
//! Both retrieval variants share one loop: pull lines off the response
//! channel against a fixed deadline until a line ends the response or the
//! deadline passes. They differ only in what counts as success when the
//! deadline passes without an end marker:
//!
//! - after sending a command, *any* reply counts ([`Completion::AnyLine`]);
//! - when passively collecting, only an explicit end marker counts
//!   ([`Completion::EndMarker`]).

use std::time::Duration;

use tokio::time::Instant;
use tracing::trace;

use atmodem_core::Line;

use crate::dispatch::LineQueue;
use crate::matcher::{EndCriteria, EndMatch};

/// Success rule applied when the deadline passes without an end marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Success if at least one line was collected.
    AnyLine,
    /// Success only if an end marker was seen.
    EndMarker,
}

/// Lines collected for one exchange, plus how it ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Whether the exchange counts as successful under its [`Completion`] rule.
    pub success: bool,
    /// What ended the response, if an end marker was seen.
    pub end: Option<EndMatch>,
    /// Every line collected, in arrival order, including the end marker.
    pub lines: Vec<Line>,
}

impl Response {
    /// Whether an end marker (criterion or prompt) was seen.
    pub fn terminated(&self) -> bool {
        self.end.is_some()
    }

    /// The last line collected; the end marker when [`terminated`](Self::terminated).
    pub fn final_line(&self) -> Option<&Line> {
        self.lines.last()
    }

    pub fn into_lines(self) -> Vec<Line> {
        self.lines
    }
}

/// Collect lines from `queue` until one ends the response or `timeout`
/// elapses.
///
/// The deadline is fixed on entry; each wait uses whatever budget remains.
/// A timed-out wait, or a closed queue, ends collection.
pub async fn collect(
    queue: &LineQueue,
    criteria: &EndCriteria,
    prompt: Option<char>,
    timeout: Duration,
    completion: Completion,
) -> Response {
    let deadline = Instant::now() + timeout;
    let mut lines = Vec::new();

    while Instant::now() < deadline {
        let line = match queue.pop_until(deadline).await {
            Ok(line) => line,
            Err(e) => {
                trace!(error = %e, collected = lines.len(), "response collection stopped");
                break;
            }
        };

        let end = criteria.find_end(&line, prompt);
        lines.push(line);
        if end.is_some() {
            return Response {
                success: true,
                end,
                lines,
            };
        }
    }

    let success = match completion {
        Completion::AnyLine => !lines.is_empty(),
        Completion::EndMarker => false,
    };
    Response {
        success,
        end: None,
        lines,
    }
}
