//! Mock power control for testing the startup sequence.

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use atmodem_core::error::{Error, Result};
use atmodem_core::power::PowerControl;

/// A [`PowerControl`] that counts calls and can be told to fail.
///
/// Clones share the same counters, so a test can keep one and hand the
/// other to the builder.
#[derive(Debug, Clone, Default)]
pub struct MockPowerControl {
    calls: Arc<AtomicUsize>,
    fail: Arc<AtomicBool>,
}

impl MockPowerControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// A power control whose `power_on` always fails.
    pub fn failing() -> Self {
        let power = Self::new();
        power.set_fail(true);
        power
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// How many times `power_on` has been called.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PowerControl for MockPowerControl {
    async fn power_on(&mut self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::Transport("mock power-on failure".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn counts_calls_across_clones() {
        let power = MockPowerControl::new();
        let mut moved = power.clone();
        moved.power_on().await.unwrap();
        moved.power_on().await.unwrap();
        assert_eq!(power.calls(), 2);
    }

    #[tokio::test]
    async fn failing_power_on() {
        let mut power = MockPowerControl::failing();
        assert!(matches!(power.power_on().await, Err(Error::Transport(_))));
        assert_eq!(power.calls(), 1);

        power.set_fail(false);
        assert!(power.power_on().await.is_ok());
    }
}
