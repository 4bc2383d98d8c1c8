//! One-shot modem power sequencing.
//!
//! Pin assignments and pulse timing belong to the board, not to this
//! library. The startup sequence only needs to know *when* to run it:
//! `power_on`, then the transport, then the IO task.

use async_trait::async_trait;

use crate::error::Result;

/// Board-specific power-on sequence for a modem.
///
/// Called exactly once during startup, before the reader task starts.
#[async_trait]
pub trait PowerControl: Send + Sync {
    /// Run the power-on sequence (e.g. pulse the PWR_ON line).
    async fn power_on(&mut self) -> Result<()>;
}

/// Power control for modems that are already powered (USB dongles,
/// development kits with an always-on supply).
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysOn;

#[async_trait]
impl PowerControl for AlwaysOn {
    async fn power_on(&mut self) -> Result<()> {
        Ok(())
    }
}
