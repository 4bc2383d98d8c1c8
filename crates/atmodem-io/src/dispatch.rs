//! Bounded line channels: one for command responses, one for async events.
//!
//! The reader task is the only producer. Consumers on any task dequeue with
//! an explicit timeout. What happens when a channel is full is decided by
//! the [`Backpressure`] policy; the default drops the incoming line so that
//! modem ingestion never stalls behind a slow consumer.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::debug;

use atmodem_core::Line;
use atmodem_core::error::{Error, Result};

use crate::classify::Classification;

/// Default capacity of each channel.
pub const DEFAULT_CAPACITY: usize = 10;

/// What a full channel does with a new line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backpressure {
    /// Discard the incoming line. The reader never waits.
    #[default]
    DropNewest,
    /// Evict the oldest queued line to make room. The reader never waits.
    DropOldest,
    /// Wait up to the given time for a consumer to make room, then discard
    /// the incoming line.
    Block(Duration),
}

/// Outcome of [`LineQueue::push`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    /// The line was queued.
    Queued,
    /// The channel was full (or closed) and the incoming line was lost.
    Dropped,
    /// The line was queued after evicting the oldest one, returned here.
    Evicted(Line),
}

struct Inner {
    name: &'static str,
    capacity: usize,
    policy: Backpressure,
    lines: Mutex<VecDeque<Line>>,
    readable: Notify,
    writable: Notify,
    dropped: AtomicU64,
    closed: AtomicBool,
}

/// A bounded FIFO of [`Line`]s shared between the reader task and consumers.
///
/// Cloning yields another handle to the same queue.
#[derive(Clone)]
pub struct LineQueue {
    inner: Arc<Inner>,
}

impl LineQueue {
    pub fn new(name: &'static str, capacity: usize, policy: Backpressure) -> Self {
        LineQueue {
            inner: Arc::new(Inner {
                name,
                capacity,
                policy,
                lines: Mutex::new(VecDeque::with_capacity(capacity)),
                readable: Notify::new(),
                writable: Notify::new(),
                dropped: AtomicU64::new(0),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Enqueue a line according to the backpressure policy.
    pub async fn push(&self, line: Line) -> PushOutcome {
        if self.is_closed() {
            self.record_drop(&line);
            return PushOutcome::Dropped;
        }

        match self.inner.policy {
            Backpressure::DropNewest => match self.try_push(line) {
                Ok(()) => PushOutcome::Queued,
                Err(line) => {
                    self.record_drop(&line);
                    PushOutcome::Dropped
                }
            },
            // Nothing to evict from a zero-capacity queue.
            Backpressure::DropOldest if self.inner.capacity == 0 => {
                self.record_drop(&line);
                PushOutcome::Dropped
            }
            Backpressure::DropOldest => {
                let evicted = {
                    let mut lines = self.lock();
                    let evicted = if lines.len() >= self.inner.capacity {
                        lines.pop_front()
                    } else {
                        None
                    };
                    lines.push_back(line);
                    evicted
                };
                self.inner.readable.notify_one();
                match evicted {
                    Some(old) => {
                        self.record_drop(&old);
                        PushOutcome::Evicted(old)
                    }
                    None => PushOutcome::Queued,
                }
            }
            Backpressure::Block(timeout) => self.push_blocking(line, timeout).await,
        }
    }

    async fn push_blocking(&self, mut line: Line, timeout: Duration) -> PushOutcome {
        let deadline = Instant::now() + timeout;
        loop {
            let writable = self.inner.writable.notified();
            tokio::pin!(writable);
            writable.as_mut().enable();

            match self.try_push(line) {
                Ok(()) => return PushOutcome::Queued,
                Err(back) => line = back,
            }
            if self.is_closed() {
                break;
            }
            if tokio::time::timeout_at(deadline, writable).await.is_err() {
                match self.try_push(line) {
                    Ok(()) => return PushOutcome::Queued,
                    Err(back) => {
                        line = back;
                        break;
                    }
                }
            }
        }
        self.record_drop(&line);
        PushOutcome::Dropped
    }

    /// Enqueue without waiting. Hands the line back if the queue is full.
    pub fn try_push(&self, line: Line) -> std::result::Result<(), Line> {
        {
            let mut lines = self.lock();
            if lines.len() >= self.inner.capacity {
                return Err(line);
            }
            lines.push_back(line);
        }
        self.inner.readable.notify_one();
        Ok(())
    }

    /// Dequeue the oldest line if one is available.
    pub fn try_pop(&self) -> Option<Line> {
        let line = self.lock().pop_front();
        if line.is_some() {
            self.inner.writable.notify_one();
        }
        line
    }

    /// Dequeue the oldest line, waiting up to `timeout`.
    ///
    /// Returns [`Error::Timeout`] if nothing arrived, or
    /// [`Error::ChannelClosed`] once the queue is closed and empty.
    pub async fn pop_timeout(&self, timeout: Duration) -> Result<Line> {
        self.pop_until(Instant::now() + timeout).await
    }

    /// Dequeue the oldest line, waiting until `deadline`.
    pub async fn pop_until(&self, deadline: Instant) -> Result<Line> {
        loop {
            let readable = self.inner.readable.notified();
            tokio::pin!(readable);
            readable.as_mut().enable();

            if let Some(line) = self.try_pop() {
                return Ok(line);
            }
            if self.is_closed() {
                return Err(Error::ChannelClosed);
            }
            if tokio::time::timeout_at(deadline, readable).await.is_err() {
                return self.try_pop().ok_or(Error::Timeout);
            }
        }
    }

    /// Close the queue. Queued lines stay available; waiting consumers and
    /// producers are woken, and later pushes are dropped.
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::Release);
        self.inner.readable.notify_waiters();
        self.inner.writable.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    pub fn policy(&self) -> Backpressure {
        self.inner.policy
    }

    pub fn name(&self) -> &'static str {
        self.inner.name
    }

    /// Lines lost to backpressure since construction.
    pub fn dropped(&self) -> u64 {
        self.inner.dropped.load(Ordering::Relaxed)
    }

    fn record_drop(&self, line: &Line) {
        let total = self.inner.dropped.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(
            channel = self.inner.name,
            line = %line,
            total,
            "channel full, line dropped"
        );
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Line>> {
        // No critical section can leave the deque half-modified.
        self.inner
            .lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for LineQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineQueue")
            .field("name", &self.inner.name)
            .field("len", &self.len())
            .field("capacity", &self.inner.capacity)
            .field("policy", &self.inner.policy)
            .field("dropped", &self.dropped())
            .finish()
    }
}

/// The pair of channels fed by the classifier.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    responses: LineQueue,
    events: LineQueue,
}

impl Dispatcher {
    pub fn new(response_capacity: usize, async_capacity: usize, policy: Backpressure) -> Self {
        Dispatcher {
            responses: LineQueue::new("response", response_capacity, policy),
            events: LineQueue::new("async", async_capacity, policy),
        }
    }

    /// Deliver a classified line to its channel.
    pub async fn dispatch(&self, line: Line, class: Classification) -> PushOutcome {
        match class {
            Classification::Sync => self.responses.push(line).await,
            Classification::Async => self.events.push(line).await,
        }
    }

    pub fn responses(&self) -> &LineQueue {
        &self.responses
    }

    pub fn events(&self) -> &LineQueue {
        &self.events
    }

    /// Close both channels.
    pub fn close(&self) {
        self.responses.close();
        self.events.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(s: &str) -> Line {
        Line::from(s)
    }

    fn drain(queue: &LineQueue) -> Vec<String> {
        let mut out = Vec::new();
        while let Some(l) = queue.try_pop() {
            out.push(l.into_string());
        }
        out
    }

    // -----------------------------------------------------------------------
    // FIFO basics
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn fifo_order_preserved() {
        let q = LineQueue::new("test", 4, Backpressure::DropNewest);
        for s in ["a", "b", "c"] {
            assert_eq!(q.push(line(s)).await, PushOutcome::Queued);
        }
        assert_eq!(q.len(), 3);
        assert_eq!(drain(&q), vec!["a", "b", "c"]);
        assert!(q.is_empty());
    }

    #[tokio::test]
    async fn pop_timeout_returns_queued_line() {
        let q = LineQueue::new("test", 4, Backpressure::DropNewest);
        q.push(line("OK")).await;
        let got = q.pop_timeout(Duration::from_millis(10)).await.unwrap();
        assert_eq!(got, "OK");
    }

    #[tokio::test]
    async fn pop_timeout_times_out_when_empty() {
        let q = LineQueue::new("test", 4, Backpressure::DropNewest);
        let start = std::time::Instant::now();
        let result = q.pop_timeout(Duration::from_millis(30)).await;
        assert!(matches!(result, Err(Error::Timeout)));
        assert!(start.elapsed() >= Duration::from_millis(25));
    }

    #[tokio::test]
    async fn pop_wakes_on_push_from_other_task() {
        let q = LineQueue::new("test", 4, Backpressure::DropNewest);
        let producer = q.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            producer.push(line("+CSQ: 20,99")).await;
        });
        let got = q.pop_timeout(Duration::from_millis(500)).await.unwrap();
        assert_eq!(got, "+CSQ: 20,99");
    }

    #[tokio::test]
    async fn zero_timeout_still_returns_available_line() {
        let q = LineQueue::new("test", 4, Backpressure::DropNewest);
        q.push(line("OK")).await;
        assert_eq!(q.pop_timeout(Duration::ZERO).await.unwrap(), "OK");
    }

    // -----------------------------------------------------------------------
    // Backpressure
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn drop_newest_loses_exactly_the_overflowing_line() {
        let q = LineQueue::new("test", 3, Backpressure::DropNewest);
        for s in ["1", "2", "3"] {
            assert_eq!(q.push(line(s)).await, PushOutcome::Queued);
        }
        assert_eq!(q.push(line("4")).await, PushOutcome::Dropped);
        assert_eq!(q.dropped(), 1);
        assert_eq!(drain(&q), vec!["1", "2", "3"]);
    }

    #[tokio::test]
    async fn drop_oldest_evicts_front() {
        let q = LineQueue::new("test", 3, Backpressure::DropOldest);
        for s in ["1", "2", "3"] {
            assert_eq!(q.push(line(s)).await, PushOutcome::Queued);
        }
        assert_eq!(q.push(line("4")).await, PushOutcome::Evicted(line("1")));
        assert_eq!(q.dropped(), 1);
        assert_eq!(drain(&q), vec!["2", "3", "4"]);
    }

    #[tokio::test]
    async fn zero_capacity_holds_nothing() {
        for policy in [
            Backpressure::DropNewest,
            Backpressure::DropOldest,
            Backpressure::Block(Duration::from_millis(10)),
        ] {
            let q = LineQueue::new("test", 0, policy);
            assert_eq!(q.push(line("a")).await, PushOutcome::Dropped);
            assert!(q.is_empty());
            assert_eq!(q.dropped(), 1);
        }
    }

    #[tokio::test]
    async fn block_waits_for_consumer() {
        let q = LineQueue::new("test", 1, Backpressure::Block(Duration::from_millis(500)));
        q.push(line("1")).await;

        let consumer = q.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            consumer.try_pop();
        });

        assert_eq!(q.push(line("2")).await, PushOutcome::Queued);
        assert_eq!(q.dropped(), 0);
        assert_eq!(drain(&q), vec!["2"]);
    }

    #[tokio::test]
    async fn block_drops_after_timeout() {
        let q = LineQueue::new("test", 1, Backpressure::Block(Duration::from_millis(20)));
        q.push(line("1")).await;
        assert_eq!(q.push(line("2")).await, PushOutcome::Dropped);
        assert_eq!(q.dropped(), 1);
        assert_eq!(drain(&q), vec!["1"]);
    }

    // -----------------------------------------------------------------------
    // Close
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn close_wakes_waiting_consumer() {
        let q = LineQueue::new("test", 4, Backpressure::DropNewest);
        let closer = q.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            closer.close();
        });
        let result = q.pop_timeout(Duration::from_secs(5)).await;
        assert!(matches!(result, Err(Error::ChannelClosed)));
    }

    #[tokio::test]
    async fn close_keeps_queued_lines() {
        let q = LineQueue::new("test", 4, Backpressure::DropNewest);
        q.push(line("OK")).await;
        q.close();
        assert_eq!(q.pop_timeout(Duration::ZERO).await.unwrap(), "OK");
        assert!(matches!(
            q.pop_timeout(Duration::ZERO).await,
            Err(Error::ChannelClosed)
        ));
    }

    #[tokio::test]
    async fn push_after_close_is_dropped() {
        let q = LineQueue::new("test", 4, Backpressure::DropNewest);
        q.close();
        assert_eq!(q.push(line("late")).await, PushOutcome::Dropped);
        assert_eq!(q.dropped(), 1);
    }

    // -----------------------------------------------------------------------
    // Dispatcher
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn dispatcher_routes_by_classification() {
        let d = Dispatcher::new(4, 4, Backpressure::DropNewest);
        d.dispatch(line("+CREG: 1,5"), Classification::Async).await;
        d.dispatch(line("OK"), Classification::Sync).await;

        assert_eq!(drain(d.events()), vec!["+CREG: 1,5"]);
        assert_eq!(drain(d.responses()), vec!["OK"]);
    }

    #[tokio::test]
    async fn dispatcher_channels_are_independent() {
        let d = Dispatcher::new(1, 1, Backpressure::DropNewest);
        d.dispatch(line("+CREG: 1"), Classification::Async).await;
        // A full async channel does not affect the response channel.
        assert_eq!(
            d.dispatch(line("+CREG: 2"), Classification::Async).await,
            PushOutcome::Dropped
        );
        assert_eq!(
            d.dispatch(line("OK"), Classification::Sync).await,
            PushOutcome::Queued
        );
        assert_eq!(d.events().dropped(), 1);
        assert_eq!(d.responses().dropped(), 0);
    }

    #[tokio::test]
    async fn dispatcher_close_closes_both() {
        let d = Dispatcher::new(2, 2, Backpressure::DropNewest);
        d.close();
        assert!(d.responses().is_closed());
        assert!(d.events().is_closed());
    }
}
