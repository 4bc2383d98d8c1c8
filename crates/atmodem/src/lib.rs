//! # atmodem -- Line Engine for AT-Command Cellular Modems
//!
//! `atmodem` is an asynchronous Rust library for talking to cellular
//! modules (u-blox, Quectel, SIMCom, ...) over the AT command set. It owns
//! the serial link in a single background task, frames the modem's output
//! into lines, separates unsolicited result codes from command responses,
//! and offers deadline-bounded request/response exchanges on top.
//!
//! ## Quick Start
//!
//! ```no_run
//! use atmodem::ModemBuilder;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let modem = ModemBuilder::new()
//!         .serial_port("/dev/ttyUSB2")
//!         .async_prefixes(["+CREG:", "+CEREG:"])
//!         .build()
//!         .await?;
//!
//!     let response = modem.send_and_await("AT+CSQ", Duration::from_secs(1)).await?;
//!     if response.success {
//!         for line in &response.lines {
//!             println!("{line}");
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! The library is organized as a workspace of focused crates:
//!
//! | Crate                  | Purpose                                              |
//! |------------------------|------------------------------------------------------|
//! | `atmodem-core`         | [`Transport`], [`PowerControl`], [`Line`], errors    |
//! | `atmodem-io`           | Framing, classification, line channels, IO task      |
//! | `atmodem-transport`    | Serial transport over `tokio-serial`                 |
//! | `atmodem-test-harness` | Scripted mock modem for tests                        |
//! | **`atmodem`**          | This facade crate -- re-exports plus [`ModemBuilder`] |
//!
//! ## Unsolicited Result Codes
//!
//! Lines starting with a configured async prefix never appear in a command
//! response. They are delivered to callbacks registered with
//! [`ModemBuilder::on_async_event`] and queued on a separate channel:
//!
//! ```no_run
//! # use std::time::Duration;
//! # async fn example(modem: &atmodem::ModemIo) {
//! while let Ok(event) = modem.get_async_event(Duration::from_secs(30)).await {
//!     println!("URC: {event}");
//! }
//! # }
//! ```
//!
//! ## Data Prompts
//!
//! Commands such as `AT+CMGS` answer with a bare `>` and wait for payload.
//! Enable prompt mode with [`ModemBuilder::prompt`], then send the payload
//! with [`ModemIo::send_raw`] and pick up the final result with
//! [`ModemIo::collect_responses`].

pub mod builder;

pub use atmodem_core::*;
pub use atmodem_io::{
    AsyncObserver, Backpressure, Completion, EndCriteria, EndCriterion, EndMatch, IoStats,
    ModemConfig, ModemIo, Response,
};
pub use atmodem_transport::{FlowControl, SerialConfig, SerialTransport};
pub use builder::ModemBuilder;

/// Lower-level pieces of the line engine: the framer, classifier,
/// dispatcher and matcher, for callers that drive them directly.
pub mod io {
    pub use atmodem_io::*;
}
