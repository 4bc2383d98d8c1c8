//! Transport trait for modem communication.
//!
//! The [`Transport`] trait abstracts over the byte link to a modem. The
//! serial implementation lives in `atmodem-transport`; a scripted mock for
//! tests lives in `atmodem-test-harness`.
//!
//! The transport must be opened and configured (baud rate, flow control) by
//! the caller before the IO task takes ownership of it.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;

/// Asynchronous byte-level transport to a modem.
///
/// Line framing and classification are handled by the IO task that
/// consumes this trait; implementations only move bytes.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Write raw bytes to the modem.
    ///
    /// Implementations should not return until all bytes have been handed
    /// to the underlying link.
    async fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Receive bytes from the modem into the provided buffer.
    ///
    /// Returns the number of bytes read. Waits up to `timeout` for data;
    /// returns [`Error::Timeout`](crate::error::Error::Timeout) if nothing
    /// arrived. This is the "byte available" check of the reader loop.
    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize>;

    /// Close the transport.
    ///
    /// Subsequent `send()`/`receive()` calls should return
    /// [`Error::NotConnected`](crate::error::Error::NotConnected).
    async fn close(&mut self) -> Result<()>;

    /// Whether the transport is currently open.
    fn is_connected(&self) -> bool;
}
