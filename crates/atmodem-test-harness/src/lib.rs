//! atmodem-test-harness: Test utilities and mock collaborators for atmodem.
//!
//! This crate provides [`MockTransport`] for deterministic unit testing of
//! the line engine without a real modem, and [`MockPowerControl`] for
//! exercising the startup sequence.

pub mod mock_power;
pub mod mock_serial;

pub use mock_power::MockPowerControl;
pub use mock_serial::{MockHandle, MockTransport};
