//! Transport implementations for atmodem.
//!
//! This crate provides the serial implementation of the
//! [`Transport`](atmodem_core::Transport) trait from `atmodem-core`:
//!
//! - [`SerialTransport`]: UART and USB CDC-ACM ports a modem is attached to
//!
//! # Example
//!
//! ```no_run
//! use atmodem_transport::SerialTransport;
//! use atmodem_core::transport::Transport;
//! use std::time::Duration;
//!
//! # async fn example() -> atmodem_core::Result<()> {
//! let mut transport = SerialTransport::open("/dev/ttyACM0", 115200).await?;
//!
//! transport.send(b"ATI\r\n").await?;
//!
//! let mut buf = [0u8; 256];
//! let n = transport.receive(&mut buf, Duration::from_secs(1)).await?;
//! # Ok(())
//! # }
//! ```

pub mod serial;

pub use serial::{DataBits, FlowControl, Parity, SerialConfig, SerialTransport, StopBits};
