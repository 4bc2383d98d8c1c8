//! Configuration for the modem IO task.
//!
//! Everything here is fixed before the reader task starts and never changes
//! while it runs.

use std::time::Duration;

use atmodem_core::error::{Error, Result};

use crate::dispatch::{Backpressure, DEFAULT_CAPACITY};
use crate::framer::DEFAULT_MAX_LINE_LEN;
use crate::matcher::EndCriteria;

/// Configuration for the modem IO task.
#[derive(Debug, Clone)]
pub struct ModemConfig {
    /// Line prefixes that mark an unsolicited result code.
    pub async_prefixes: Vec<String>,
    /// Criteria that end a command response.
    pub end_criteria: EndCriteria,
    /// Prompt character; `Some` enables prompt mode.
    pub prompt: Option<char>,
    /// Capacity of the response channel.
    pub response_capacity: usize,
    /// Capacity of the async event channel.
    pub async_capacity: usize,
    /// What a full channel does with a new line.
    pub backpressure: Backpressure,
    /// Upper bound on a single line before it is discarded.
    pub max_line_len: usize,
    /// Appended to every command by `send_command` / `send_and_await`.
    pub line_terminator: String,
    /// How long a single transport receive waits for bytes.
    pub read_timeout: Duration,
    /// Pause after a receive that yielded nothing.
    pub idle_sleep: Duration,
    /// Timeout used by `send_and_await_default`.
    pub command_timeout: Duration,
    /// Settle time after the IO task starts, before the modem is usable.
    pub startup_delay: Duration,
}

impl Default for ModemConfig {
    fn default() -> Self {
        ModemConfig {
            async_prefixes: Vec::new(),
            end_criteria: EndCriteria::standard(),
            prompt: None,
            response_capacity: DEFAULT_CAPACITY,
            async_capacity: DEFAULT_CAPACITY,
            backpressure: Backpressure::default(),
            max_line_len: DEFAULT_MAX_LINE_LEN,
            line_terminator: "\r\n".to_string(),
            read_timeout: Duration::from_millis(50),
            idle_sleep: Duration::from_millis(10),
            command_timeout: Duration::from_millis(5000),
            startup_delay: Duration::ZERO,
        }
    }
}

impl ModemConfig {
    /// Check the configuration before the IO task starts.
    pub fn validate(&self) -> Result<()> {
        if self.response_capacity == 0 {
            return Err(Error::InvalidArgument(
                "response_capacity must be at least 1".into(),
            ));
        }
        if self.async_capacity == 0 {
            return Err(Error::InvalidArgument(
                "async_capacity must be at least 1".into(),
            ));
        }
        if self.max_line_len == 0 {
            return Err(Error::InvalidArgument(
                "max_line_len must be at least 1".into(),
            ));
        }
        if self.line_terminator.is_empty() {
            return Err(Error::InvalidArgument(
                "line_terminator must not be empty".into(),
            ));
        }
        if let Some(p) = self.prompt {
            if !p.is_ascii() || p == '\r' || p == '\n' {
                return Err(Error::InvalidArgument(format!(
                    "prompt character {p:?} must be ASCII and not CR/LF"
                )));
            }
        }
        if self.async_prefixes.iter().any(|p| p.is_empty()) {
            return Err(Error::InvalidArgument(
                "async prefixes must not be empty strings".into(),
            ));
        }
        Ok(())
    }

    /// The prompt character as a byte, for the framer.
    pub(crate) fn prompt_byte(&self) -> Option<u8> {
        self.prompt.filter(char::is_ascii).map(|c| c as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ModemConfig::default();
        assert!(config.async_prefixes.is_empty());
        assert_eq!(config.end_criteria, EndCriteria::standard());
        assert_eq!(config.prompt, None);
        assert_eq!(config.response_capacity, 10);
        assert_eq!(config.async_capacity, 10);
        assert_eq!(config.backpressure, Backpressure::DropNewest);
        assert_eq!(config.max_line_len, 4096);
        assert_eq!(config.line_terminator, "\r\n");
        assert_eq!(config.command_timeout, Duration::from_millis(5000));
        assert_eq!(config.startup_delay, Duration::ZERO);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_capacity_rejected() {
        let config = ModemConfig {
            response_capacity: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidArgument(_))));

        let config = ModemConfig {
            async_capacity: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn zero_max_line_len_rejected() {
        let config = ModemConfig {
            max_line_len: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn empty_terminator_rejected() {
        let config = ModemConfig {
            line_terminator: String::new(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn newline_prompt_rejected() {
        let config = ModemConfig {
            prompt: Some('\n'),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn non_ascii_prompt_rejected() {
        let config = ModemConfig {
            prompt: Some('»'),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn empty_async_prefix_rejected() {
        let config = ModemConfig {
            async_prefixes: vec![String::new()],
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn prompt_byte_conversion() {
        let config = ModemConfig {
            prompt: Some('>'),
            ..Default::default()
        };
        assert_eq!(config.prompt_byte(), Some(b'>'));
        assert_eq!(ModemConfig::default().prompt_byte(), None);
    }
}
