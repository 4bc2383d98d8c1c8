//! IO task types and implementation for the AT line engine.
//!
//! One tokio task owns the transport exclusively. It reads bytes, frames
//! them into lines, classifies each line and pushes it onto the response or
//! async channel. Callers never touch the transport: outbound bytes are
//! handed to the task over a request channel, and inbound lines are pulled
//! from the two line channels with explicit timeouts.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use atmodem_core::Line;
use atmodem_core::error::{Error, Result};
use atmodem_core::transport::Transport;

use crate::classify::{Classification, ObserverSet, classify};
use crate::config::ModemConfig;
use crate::dispatch::Dispatcher;
use crate::framer::{FrameResult, LineFramer};
use crate::session::{self, Completion, Response};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A request sent from the handle to the IO task.
pub enum Request {
    /// Write bytes to the transport.
    Write {
        data: Vec<u8>,
        reply: oneshot::Sender<Result<()>>,
    },
    /// Graceful shutdown; returns the transport for recovery.
    Shutdown {
        reply: oneshot::Sender<Box<dyn Transport>>,
    },
}

/// Counters exposed for observability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IoStats {
    /// Lines discarded for exceeding `max_line_len`.
    pub framing_overflows: u64,
    /// Response lines lost to backpressure.
    pub responses_dropped: u64,
    /// Async lines lost to backpressure.
    pub events_dropped: u64,
}

/// Handle to the IO task.
pub struct ModemIo {
    req_tx: mpsc::Sender<Request>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
    dispatcher: Dispatcher,
    config: Arc<ModemConfig>,
    overflows: Arc<AtomicU64>,
}

impl ModemIo {
    /// Write raw bytes with no line terminator.
    ///
    /// Used for payload after a `>` prompt (`AT+CMGS`, `AT+USOWR`, ...).
    pub async fn send_raw(&self, data: &[u8]) -> Result<()> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.req_tx
            .send(Request::Write {
                data: data.to_vec(),
                reply: reply_tx,
            })
            .await
            .map_err(|_| Error::NotConnected)?;

        match reply_rx.await {
            Ok(result) => result,
            Err(_) => Err(Error::NotConnected),
        }
    }

    /// Write a command followed by the configured line terminator.
    ///
    /// Does not wait for a reply.
    pub async fn send_command(&self, command: &str) -> Result<()> {
        validate_command(command)?;
        let mut data = Vec::with_capacity(command.len() + self.config.line_terminator.len());
        data.extend_from_slice(command.as_bytes());
        data.extend_from_slice(self.config.line_terminator.as_bytes());
        self.send_raw(&data).await
    }

    /// Dequeue one line from the response channel.
    pub async fn get_response(&self, timeout: Duration) -> Result<Line> {
        self.dispatcher.responses().pop_timeout(timeout).await
    }

    /// Dequeue one line from the async event channel.
    pub async fn get_async_event(&self, timeout: Duration) -> Result<Line> {
        self.dispatcher.events().pop_timeout(timeout).await
    }

    /// Send a command and collect its response.
    ///
    /// Collection stops at the first line that satisfies the end criteria
    /// (or contains the prompt), or when `timeout` has elapsed since the
    /// call. Without an end marker the exchange still counts as successful
    /// if the modem said anything at all.
    ///
    /// Invalid commands are rejected before anything is written. Only
    /// argument and transport failures are errors; silence is reported
    /// through [`Response::success`].
    pub async fn send_and_await(&self, command: &str, timeout: Duration) -> Result<Response> {
        self.send_command(command).await?;
        Ok(self.collect(timeout, Completion::AnyLine).await)
    }

    /// [`send_and_await`](Self::send_and_await) with the configured
    /// `command_timeout`.
    pub async fn send_and_await_default(&self, command: &str) -> Result<Response> {
        self.send_and_await(command, self.config.command_timeout)
            .await
    }

    /// Collect response lines without sending anything.
    ///
    /// Unlike [`send_and_await`](Self::send_and_await), success requires an
    /// explicit end marker.
    pub async fn collect_responses(&self, timeout: Duration) -> Response {
        self.collect(timeout, Completion::EndMarker).await
    }

    async fn collect(&self, timeout: Duration, completion: Completion) -> Response {
        session::collect(
            self.dispatcher.responses(),
            &self.config.end_criteria,
            self.config.prompt,
            timeout,
            completion,
        )
        .await
    }

    /// Snapshot of the overflow and drop counters.
    pub fn stats(&self) -> IoStats {
        IoStats {
            framing_overflows: self.overflows.load(Ordering::Relaxed),
            responses_dropped: self.dispatcher.responses().dropped(),
            events_dropped: self.dispatcher.events().dropped(),
        }
    }

    /// The configuration the IO task was started with.
    pub fn config(&self) -> &ModemConfig {
        &self.config
    }

    /// Whether the IO task is still running.
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Ask the IO task to stop at its next loop iteration. The transport is
    /// dropped; use [`shutdown`](Self::shutdown) to recover it instead.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Shut down the IO task and recover the transport.
    pub async fn shutdown(self) -> Result<Box<dyn Transport>> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let _ = self
            .req_tx
            .send(Request::Shutdown { reply: reply_tx })
            .await;
        let transport = reply_rx.await.map_err(|_| Error::NotConnected)?;
        let _ = self.task.await;
        Ok(transport)
    }
}

/// Reject commands that cannot be sent as a single line.
fn validate_command(command: &str) -> Result<()> {
    if command.is_empty() {
        return Err(Error::InvalidArgument("command must not be empty".into()));
    }
    if command.contains(['\r', '\n']) {
        return Err(Error::InvalidArgument(format!(
            "command {command:?} must not contain CR or LF"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Spawn
// ---------------------------------------------------------------------------

/// Spawn the IO task. Returns the handle for sending commands and reading
/// lines.
///
/// The configuration is validated first; nothing is spawned if it is
/// rejected.
pub fn spawn_io_task(
    transport: Box<dyn Transport>,
    config: ModemConfig,
    observers: ObserverSet,
) -> Result<ModemIo> {
    config.validate()?;

    let config = Arc::new(config);
    let dispatcher = Dispatcher::new(
        config.response_capacity,
        config.async_capacity,
        config.backpressure,
    );
    let overflows = Arc::new(AtomicU64::new(0));
    let (req_tx, req_rx) = mpsc::channel::<Request>(32);
    let cancel = CancellationToken::new();

    let pipeline = LinePipeline {
        framer: LineFramer::new(config.prompt_byte(), config.max_line_len),
        config: Arc::clone(&config),
        observers,
        dispatcher: dispatcher.clone(),
        overflows: Arc::clone(&overflows),
    };

    let task = tokio::spawn(io_loop(transport, pipeline, req_rx, cancel.clone()));

    Ok(ModemIo {
        req_tx,
        cancel,
        task,
        dispatcher,
        config,
        overflows,
    })
}

// ---------------------------------------------------------------------------
// Line pipeline
// ---------------------------------------------------------------------------

/// Bytes in, classified lines out. Owned by the IO task.
struct LinePipeline {
    framer: LineFramer,
    config: Arc<ModemConfig>,
    observers: ObserverSet,
    dispatcher: Dispatcher,
    overflows: Arc<AtomicU64>,
}

impl LinePipeline {
    async fn ingest(&mut self, bytes: &[u8]) {
        for &b in bytes {
            match self.framer.feed(b) {
                FrameResult::Pending => {}
                FrameResult::Line(line) => {
                    route_line(line, &self.config, &self.observers, &self.dispatcher).await;
                }
                FrameResult::Overflow { discarded } => {
                    self.overflows.fetch_add(1, Ordering::Relaxed);
                    let error = Error::FramingOverflow {
                        limit: self.config.max_line_len,
                    };
                    warn!(discarded, error = %error, "discarding partial line");
                }
            }
        }
    }
}

/// Classify a completed line and deliver it.
///
/// Observers see an async line before it is enqueued.
async fn route_line(
    line: Line,
    config: &ModemConfig,
    observers: &ObserverSet,
    dispatcher: &Dispatcher,
) -> Classification {
    let class = classify(&line, &config.async_prefixes);
    trace!(direction = "RX", line = %line, class = ?class);
    if class == Classification::Async {
        observers.notify(&line);
    }
    dispatcher.dispatch(line, class).await;
    class
}

// ---------------------------------------------------------------------------
// IO Loop
// ---------------------------------------------------------------------------

/// Bytes requested from the transport per receive call.
const READ_CHUNK: usize = 256;

/// Closes both line channels when the IO task ends, including by panic,
/// so consumers see `ChannelClosed` rather than timing out.
struct CloseOnExit(Dispatcher);

impl Drop for CloseOnExit {
    fn drop(&mut self) {
        self.0.close();
    }
}

/// The main IO loop. Runs as a spawned Tokio task.
///
/// Uses `tokio::select! { biased; }` to prioritize:
/// 1. Cancellation
/// 2. Outbound requests
/// 3. Reading from the modem
async fn io_loop(
    mut transport: Box<dyn Transport>,
    mut pipeline: LinePipeline,
    mut req_rx: mpsc::Receiver<Request>,
    cancel: CancellationToken,
) {
    debug!("modem IO task started");
    let _close_on_exit = CloseOnExit(pipeline.dispatcher.clone());
    let read_timeout = pipeline.config.read_timeout;
    let idle_sleep = pipeline.config.idle_sleep;

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                debug!("modem IO task cancelled");
                break;
            }

            req = req_rx.recv() => {
                match req {
                    Some(Request::Write { data, reply }) => {
                        trace!(
                            direction = "TX",
                            data = %String::from_utf8_lossy(&data).trim_end(),
                            bytes = data.len()
                        );
                        let result = transport.send(&data).await;
                        if let Err(ref e) = result {
                            warn!(error = %e, "transport write failed");
                        }
                        let _ = reply.send(result);
                    }
                    Some(Request::Shutdown { reply }) => {
                        debug!("modem IO task shutdown requested");
                        pipeline.dispatcher.close();
                        let _ = reply.send(transport);
                        return;
                    }
                    None => {
                        debug!("request channel closed, exiting IO task");
                        break;
                    }
                }
            }

            // Idle: wait for bytes from the modem.
            received = async {
                let mut buf = [0u8; READ_CHUNK];
                match transport.receive(&mut buf, read_timeout).await {
                    Ok(n) if n > 0 => Ok(Some((buf, n))),
                    Ok(_) | Err(Error::Timeout) => {
                        // Nothing ready; yield briefly so the loop can pick
                        // up requests or cancellation.
                        tokio::time::sleep(idle_sleep).await;
                        Ok(None)
                    }
                    Err(e) => Err(e),
                }
            } => {
                match received {
                    Ok(Some((buf, n))) => pipeline.ingest(&buf[..n]).await,
                    Ok(None) => {}
                    Err(e @ (Error::NotConnected | Error::ConnectionLost)) => {
                        warn!(error = %e, "transport gone, stopping IO task");
                        break;
                    }
                    Err(e) => {
                        warn!(error = %e, "transport receive failed");
                        tokio::time::sleep(idle_sleep).await;
                    }
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
