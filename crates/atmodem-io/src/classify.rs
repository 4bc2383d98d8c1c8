//! Async/sync line classification and async-event observers.
//!
//! A line is an unsolicited result code (URC) if it starts with one of the
//! configured async prefixes, e.g. `+CREG:` or `+UUSORD:`. Everything else
//! is treated as part of a command response.

use atmodem_core::Line;

/// Which channel a line belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Unsolicited event; goes to the async channel.
    Async,
    /// Command response; goes to the response channel.
    Sync,
}

/// Classify a line against the async prefixes, in order.
///
/// Prefixes are expected to be disjoint; if they are not, the first one
/// that matches wins.
pub fn classify<S: AsRef<str>>(line: &str, async_prefixes: &[S]) -> Classification {
    if async_prefixes
        .iter()
        .any(|prefix| line.starts_with(prefix.as_ref()))
    {
        Classification::Async
    } else {
        Classification::Sync
    }
}

/// Callback for unsolicited lines.
///
/// Observers run synchronously on the reader task, before the line is
/// enqueued on the async channel. They must not block.
pub trait AsyncObserver: Send + Sync + 'static {
    fn on_async_event(&self, line: &Line);
}

impl<F> AsyncObserver for F
where
    F: Fn(&Line) + Send + Sync + 'static,
{
    fn on_async_event(&self, line: &Line) {
        self(line)
    }
}

/// Registered observers, invoked in registration order.
#[derive(Default)]
pub struct ObserverSet {
    observers: Vec<Box<dyn AsyncObserver>>,
}

impl ObserverSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, observer: Box<dyn AsyncObserver>) {
        self.observers.push(observer);
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    pub fn notify(&self, line: &Line) {
        for observer in &self.observers {
            observer.on_async_event(line);
        }
    }
}

impl std::fmt::Debug for ObserverSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverSet")
            .field("observers", &self.observers.len())
            .finish()
    }
}
