//! Mock transport for deterministic testing of the line engine.
//!
//! [`MockTransport`] implements the [`Transport`] trait with pre-loaded
//! request/response pairs. Unlike a real modem it never interprets what it
//! is sent; it only replays scripted replies and whatever bytes a test
//! injects through a [`MockHandle`].
//!
//! # Example
//!
//! ```
//! use atmodem_test_harness::MockTransport;
//!
//! let mut mock = MockTransport::new();
//! // When the engine sends "AT+CSQ\r\n", the modem answers with a reading.
//! mock.expect(b"AT+CSQ\r\n", b"\r\n+CSQ: 20,99\r\n\r\nOK\r\n");
//!
//! // Keep a handle to inject unsolicited codes after the mock is moved.
//! let handle = mock.handle();
//! handle.inject(b"\r\n+CREG: 5\r\n");
//! ```

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::Notify;

use atmodem_core::error::{Error, Result};
use atmodem_core::transport::Transport;

/// A pre-loaded request/response pair for the mock transport.
#[derive(Debug, Clone)]
struct Expectation {
    /// The exact bytes we expect to be sent.
    request: Vec<u8>,
    /// The bytes the modem "emits" once the request is seen.
    response: Vec<u8>,
    /// How long after the request the response becomes readable.
    delay: Duration,
}

#[derive(Debug)]
struct State {
    expectations: VecDeque<Expectation>,
    /// Bytes waiting to be returned by `receive()`.
    rx: VecDeque<u8>,
    /// Upper bound on bytes returned per `receive()`; 0 means unlimited.
    chunk_size: usize,
    connected: bool,
    sent_log: Vec<Vec<u8>>,
}

#[derive(Debug)]
struct Shared {
    state: Mutex<State>,
    readable: Notify,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn push_rx(&self, bytes: &[u8]) {
        self.lock().rx.extend(bytes.iter().copied());
        self.readable.notify_waiters();
    }

    fn read_into(&self, buf: &mut [u8]) -> Result<Option<usize>> {
        let mut state = self.lock();
        if !state.connected {
            return Err(Error::NotConnected);
        }
        if state.rx.is_empty() {
            return Ok(None);
        }
        let mut n = state.rx.len().min(buf.len());
        if state.chunk_size > 0 {
            n = n.min(state.chunk_size);
        }
        for (slot, byte) in buf.iter_mut().zip(state.rx.drain(..n)) {
            *slot = byte;
        }
        Ok(Some(n))
    }
}

/// A mock [`Transport`] for testing the line engine without hardware.
///
/// Expectations are consumed in order. When `send()` is called, the sent
/// data is recorded and matched against the next expectation; on a match
/// the response is queued for `receive()`, optionally after a delay. A
/// mismatch is an error. With no expectations left, sends succeed and the
/// modem stays silent.
#[derive(Debug)]
pub struct MockTransport {
    shared: Arc<Shared>,
}

/// Cloneable handle to a [`MockTransport`], usable after the transport has
/// been handed to the IO task.
#[derive(Debug, Clone)]
pub struct MockHandle {
    shared: Arc<Shared>,
}

impl MockTransport {
    /// Create a new mock transport in the connected state.
    pub fn new() -> Self {
        MockTransport {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    expectations: VecDeque::new(),
                    rx: VecDeque::new(),
                    chunk_size: 0,
                    connected: true,
                    sent_log: Vec::new(),
                }),
                readable: Notify::new(),
            }),
        }
    }

    /// A handle sharing this transport's state.
    pub fn handle(&self) -> MockHandle {
        MockHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Add an expected request/response pair.
    ///
    /// When `send()` is called with data matching `request`, the following
    /// `receive()` calls return `response`.
    pub fn expect(&mut self, request: &[u8], response: &[u8]) {
        self.handle().expect(request, response);
    }

    /// Like [`expect`](Self::expect), but the response only becomes
    /// readable `delay` after the request is sent.
    pub fn expect_delayed(&mut self, request: &[u8], response: &[u8], delay: Duration) {
        self.handle().expect_delayed(request, response, delay);
    }

    /// Limit how many bytes a single `receive()` returns, to exercise
    /// framing across reads. 0 removes the limit.
    pub fn set_chunk_size(&mut self, chunk_size: usize) {
        self.shared.lock().chunk_size = chunk_size;
    }

    /// Return all data sent through this transport, one element per
    /// `send()` call.
    pub fn sent_data(&self) -> Vec<Vec<u8>> {
        self.handle().sent_data()
    }

    /// Return the number of expectations that have not yet been consumed.
    pub fn remaining_expectations(&self) -> usize {
        self.handle().remaining_expectations()
    }

    /// Set the connected state of the mock transport.
    ///
    /// When set to `false`, subsequent `send()` and `receive()` calls will
    /// return [`Error::NotConnected`].
    pub fn set_connected(&mut self, connected: bool) {
        self.handle().set_connected(connected);
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockHandle {
    /// Add an expected request/response pair.
    pub fn expect(&self, request: &[u8], response: &[u8]) {
        self.expect_delayed(request, response, Duration::ZERO);
    }

    /// Add an expected request/response pair with a reply delay.
    pub fn expect_delayed(&self, request: &[u8], response: &[u8], delay: Duration) {
        self.shared.lock().expectations.push_back(Expectation {
            request: request.to_vec(),
            response: response.to_vec(),
            delay,
        });
    }

    /// Make bytes readable immediately, as if the modem emitted them on its
    /// own (unsolicited result codes, late replies, noise).
    pub fn inject(&self, bytes: &[u8]) {
        self.shared.push_rx(bytes);
    }

    /// Every `send()` payload so far, in order.
    pub fn sent_data(&self) -> Vec<Vec<u8>> {
        self.shared.lock().sent_log.clone()
    }

    /// Sent payloads decoded as text, for readable assertions.
    pub fn sent_text(&self) -> Vec<String> {
        self.shared
            .lock()
            .sent_log
            .iter()
            .map(|d| String::from_utf8_lossy(d).into_owned())
            .collect()
    }

    /// Return the number of expectations that have not yet been consumed.
    pub fn remaining_expectations(&self) -> usize {
        self.shared.lock().expectations.len()
    }

    /// Set the connected state of the mock transport.
    pub fn set_connected(&self, connected: bool) {
        self.shared.lock().connected = connected;
        self.shared.readable.notify_waiters();
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        let expectation = {
            let mut state = self.shared.lock();
            if !state.connected {
                return Err(Error::NotConnected);
            }

            // Record what was sent.
            state.sent_log.push(data.to_vec());

            match state.expectations.pop_front() {
                Some(expectation) if data != expectation.request.as_slice() => {
                    return Err(Error::Transport(format!(
                        "unexpected send data: expected {:?}, got {:?}",
                        String::from_utf8_lossy(&expectation.request),
                        String::from_utf8_lossy(data)
                    )));
                }
                other => other,
            }
        };

        if let Some(expectation) = expectation {
            if expectation.delay.is_zero() {
                self.shared.push_rx(&expectation.response);
            } else {
                let shared = Arc::clone(&self.shared);
                tokio::spawn(async move {
                    tokio::time::sleep(expectation.delay).await;
                    shared.push_rx(&expectation.response);
                });
            }
        }
        Ok(())
    }

    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        let readable = self.shared.readable.notified();
        tokio::pin!(readable);
        readable.as_mut().enable();

        if let Some(n) = self.shared.read_into(buf)? {
            return Ok(n);
        }
        let _ = tokio::time::timeout(timeout, readable).await;
        self.shared.read_into(buf)?.ok_or(Error::Timeout)
    }

    async fn close(&mut self) -> Result<()> {
        let mut state = self.shared.lock();
        state.connected = false;
        state.rx.clear();
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.shared.lock().connected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atmodem_core::transport::Transport;

    #[tokio::test]
    async fn mock_transport_basic_send_receive() {
        let mut mock = MockTransport::new();
        mock.expect(b"AT\r\n", b"OK\r\n");

        mock.send(b"AT\r\n").await.unwrap();

        let mut buf = [0u8; 64];
        let n = mock
            .receive(&mut buf, Duration::from_millis(100))
            .await
            .unwrap();
        assert_eq!(&buf[..n], b"OK\r\n");
    }

    #[tokio::test]
    async fn mock_transport_tracks_sent_data() {
        let mut mock = MockTransport::new();
        mock.send(b"ATE0\r\n").await.unwrap();
        mock.send(b"AT+CMEE=2\r\n").await.unwrap();

        assert_eq!(
            mock.sent_data(),
            vec![b"ATE0\r\n".to_vec(), b"AT+CMEE=2\r\n".to_vec()]
        );
        assert_eq!(mock.handle().sent_text(), vec!["ATE0\r\n", "AT+CMEE=2\r\n"]);
    }

    #[tokio::test]
    async fn mock_transport_wrong_data_errors() {
        let mut mock = MockTransport::new();
        mock.expect(b"AT\r\n", b"OK\r\n");

        let result = mock.send(b"ATZ\r\n").await;
        assert!(matches!(result.unwrap_err(), Error::Transport(_)));
    }

    #[tokio::test]
    async fn mock_transport_silent_without_expectations() {
        let mut mock = MockTransport::new();
        mock.send(b"AT\r\n").await.unwrap();

        let mut buf = [0u8; 64];
        let result = mock.receive(&mut buf, Duration::from_millis(10)).await;
        assert!(matches!(result.unwrap_err(), Error::Timeout));
    }

    #[tokio::test]
    async fn mock_transport_receive_wakes_on_inject() {
        let mut mock = MockTransport::new();
        let handle = mock.handle();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            handle.inject(b"+CREG: 5\r\n");
        });

        let mut buf = [0u8; 64];
        let n = mock
            .receive(&mut buf, Duration::from_millis(500))
            .await
            .unwrap();
        assert_eq!(&buf[..n], b"+CREG: 5\r\n");
    }

    #[tokio::test]
    async fn mock_transport_delayed_response() {
        let mut mock = MockTransport::new();
        mock.expect_delayed(b"AT\r\n", b"OK\r\n", Duration::from_millis(30));
        mock.send(b"AT\r\n").await.unwrap();

        let mut buf = [0u8; 64];
        let early = mock.receive(&mut buf, Duration::from_millis(1)).await;
        assert!(matches!(early, Err(Error::Timeout)));

        let n = mock
            .receive(&mut buf, Duration::from_millis(500))
            .await
            .unwrap();
        assert_eq!(&buf[..n], b"OK\r\n");
    }

    #[tokio::test]
    async fn mock_transport_chunked_receive() {
        let mut mock = MockTransport::new();
        mock.set_chunk_size(2);
        mock.handle().inject(b"OK\r\n");

        let mut buf = [0u8; 64];
        let n = mock
            .receive(&mut buf, Duration::from_millis(10))
            .await
            .unwrap();
        assert_eq!(&buf[..n], b"OK");
        let n = mock
            .receive(&mut buf, Duration::from_millis(10))
            .await
            .unwrap();
        assert_eq!(&buf[..n], b"\r\n");
    }

    #[tokio::test]
    async fn mock_transport_partial_receive() {
        let mut mock = MockTransport::new();
        mock.handle().inject(&[0xAA, 0xBB, 0xCC, 0xDD]);

        // Read with a buffer smaller than the pending data.
        let mut buf = [0u8; 2];
        let n = mock
            .receive(&mut buf, Duration::from_millis(100))
            .await
            .unwrap();
        assert_eq!(&buf[..n], &[0xAA, 0xBB]);

        let n = mock
            .receive(&mut buf, Duration::from_millis(100))
            .await
            .unwrap();
        assert_eq!(&buf[..n], &[0xCC, 0xDD]);
    }

    #[tokio::test]
    async fn mock_transport_disconnect() {
        let mut mock = MockTransport::new();
        assert!(mock.is_connected());

        mock.close().await.unwrap();
        assert!(!mock.is_connected());

        let result = mock.send(b"AT\r\n").await;
        assert!(matches!(result.unwrap_err(), Error::NotConnected));

        let mut buf = [0u8; 8];
        let result = mock.receive(&mut buf, Duration::from_millis(10)).await;
        assert!(matches!(result.unwrap_err(), Error::NotConnected));
    }

    #[tokio::test]
    async fn mock_transport_remaining_expectations() {
        let mut mock = MockTransport::new();
        mock.expect(b"ATE0\r\n", b"OK\r\n");
        mock.expect(b"AT\r\n", b"OK\r\n");
        assert_eq!(mock.remaining_expectations(), 2);

        mock.send(b"ATE0\r\n").await.unwrap();
        assert_eq!(mock.remaining_expectations(), 1);

        mock.send(b"AT\r\n").await.unwrap();
        assert_eq!(mock.remaining_expectations(), 0);
    }
}
