//! atmodem-core: Core traits, types, and error definitions for atmodem.
//!
//! This crate defines the collaborator abstractions the AT line engine is
//! built on, without pulling in tokio-serial or any concrete transport.
//!
//! # Key types
//!
//! - [`Transport`] -- byte-level link to the modem
//! - [`PowerControl`] -- one-shot power-on sequencing
//! - [`Line`] -- one framed line of modem output
//! - [`Error`] / [`Result`] -- error handling

pub mod error;
pub mod line;
pub mod power;
pub mod transport;

// Re-export key types at crate root for ergonomic `use atmodem_core::*`.
pub use error::{Error, Result};
pub use line::Line;
pub use power::{AlwaysOn, PowerControl};
pub use transport::Transport;
