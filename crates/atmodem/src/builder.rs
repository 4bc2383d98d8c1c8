//! ModemBuilder -- fluent builder for starting the modem line engine.
//!
//! Separates configuration from construction so that callers can set up
//! serial port parameters, async prefixes, end criteria and timeouts before
//! the modem is powered and the IO task is started.
//!
//! # Example
//!
//! ```no_run
//! use atmodem::ModemBuilder;
//! use std::time::Duration;
//!
//! # async fn example() -> atmodem::Result<()> {
//! let modem = ModemBuilder::new()
//!     .serial_port("/dev/ttyUSB2")
//!     .async_prefixes(["+CREG:", "+CEREG:", "+UUSORD:"])
//!     .prompt('>')
//!     .command_timeout(Duration::from_secs(3))
//!     .build()
//!     .await?;
//!
//! let response = modem.send_and_await_default("AT+CSQ").await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use tracing::{debug, info};

use atmodem_core::Line;
use atmodem_core::error::{Error, Result};
use atmodem_core::power::{AlwaysOn, PowerControl};
use atmodem_core::transport::Transport;
use atmodem_io::classify::ObserverSet;
use atmodem_io::config::ModemConfig;
use atmodem_io::dispatch::Backpressure;
use atmodem_io::io::{ModemIo, spawn_io_task};
use atmodem_io::matcher::{EndCriteria, EndCriterion};
use atmodem_transport::{FlowControl, SerialConfig, SerialTransport};

/// Fluent builder for a running modem ([`ModemIo`]).
///
/// Every setting has a default, so the simplest usage is:
///
/// ```ignore
/// let modem = ModemBuilder::new()
///     .serial_port("/dev/ttyACM0")
///     .build()
///     .await?;
/// ```
pub struct ModemBuilder {
    config: ModemConfig,
    serial_port: Option<String>,
    serial_config: SerialConfig,
    power: Box<dyn PowerControl>,
    observers: ObserverSet,
}

impl ModemBuilder {
    pub fn new() -> Self {
        ModemBuilder {
            config: ModemConfig::default(),
            serial_port: None,
            serial_config: SerialConfig::default(),
            power: Box::new(AlwaysOn),
            observers: ObserverSet::new(),
        }
    }

    /// Replace the whole line engine configuration.
    pub fn config(mut self, config: ModemConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the serial port path (e.g. `/dev/ttyUSB2` or `COM5`).
    pub fn serial_port(mut self, port: &str) -> Self {
        self.serial_port = Some(port.to_string());
        self
    }

    /// Override the baud rate (default: 115200).
    pub fn baud_rate(mut self, baud: u32) -> Self {
        self.serial_config.baud_rate = baud;
        self
    }

    /// Override the flow control mode (default: RTS/CTS).
    pub fn flow_control(mut self, flow: FlowControl) -> Self {
        self.serial_config.flow_control = flow;
        self
    }

    /// Replace the full serial configuration.
    pub fn serial_config(mut self, config: SerialConfig) -> Self {
        self.serial_config = config;
        self
    }

    /// Board-specific power-on sequence, run once before the IO task
    /// starts (default: [`AlwaysOn`]).
    pub fn power_control(mut self, power: impl PowerControl + 'static) -> Self {
        self.power = Box::new(power);
        self
    }

    /// Add one unsolicited result code prefix (e.g. `"+CREG:"`).
    pub fn async_prefix(mut self, prefix: &str) -> Self {
        self.config.async_prefixes.push(prefix.to_string());
        self
    }

    /// Add several unsolicited result code prefixes.
    pub fn async_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.config
            .async_prefixes
            .extend(prefixes.into_iter().map(|p| p.as_ref().to_string()));
        self
    }

    /// Replace the end-of-response criteria.
    pub fn end_criteria(mut self, criteria: EndCriteria) -> Self {
        self.config.end_criteria = criteria;
        self
    }

    /// Append one end-of-response pattern (`"NO CARRIER"`, `"+CME ERROR:*"`).
    pub fn end_pattern(mut self, pattern: &str) -> Self {
        self.config.end_criteria.push(EndCriterion::parse(pattern));
        self
    }

    /// Enable prompt mode with the given character (usually `'>'`).
    pub fn prompt(mut self, prompt: char) -> Self {
        self.config.prompt = Some(prompt);
        self
    }

    pub fn response_capacity(mut self, capacity: usize) -> Self {
        self.config.response_capacity = capacity;
        self
    }

    pub fn async_capacity(mut self, capacity: usize) -> Self {
        self.config.async_capacity = capacity;
        self
    }

    /// What a full channel does with a new line (default: drop it).
    pub fn backpressure(mut self, policy: Backpressure) -> Self {
        self.config.backpressure = policy;
        self
    }

    pub fn max_line_len(mut self, len: usize) -> Self {
        self.config.max_line_len = len;
        self
    }

    /// Terminator appended to commands (default: `"\r\n"`).
    pub fn line_terminator(mut self, terminator: &str) -> Self {
        self.config.line_terminator = terminator.to_string();
        self
    }

    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.config.read_timeout = timeout;
        self
    }

    pub fn idle_sleep(mut self, sleep: Duration) -> Self {
        self.config.idle_sleep = sleep;
        self
    }

    /// Default timeout for `send_and_await_default` (default: 5s).
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.config.command_timeout = timeout;
        self
    }

    /// Time to let the modem settle after the IO task starts (default: 0).
    /// Modules that emit a boot banner typically need a few seconds.
    pub fn startup_delay(mut self, delay: Duration) -> Self {
        self.config.startup_delay = delay;
        self
    }

    /// Register a callback invoked from the IO task for every async line,
    /// before the line is queued.
    ///
    /// The callback must not block; it runs on the reader.
    pub fn on_async_event<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Line) + Send + Sync + 'static,
    {
        self.observers.register(Box::new(callback));
        self
    }

    /// Start the modem on a caller-provided transport.
    ///
    /// This is the entry point for testing (pass a `MockTransport` from
    /// `atmodem-test-harness`) and for callers that open the link
    /// themselves. The transport is already open, so the power-on sequence
    /// runs just before the IO task starts.
    pub async fn build_with_transport(self, transport: Box<dyn Transport>) -> Result<ModemIo> {
        let ModemBuilder {
            config,
            mut power,
            observers,
            ..
        } = self;
        config.validate()?;

        power_on(power.as_mut()).await?;
        start(transport, config, observers).await
    }

    /// Power the modem, open the serial port and start the IO task.
    ///
    /// Requires that [`serial_port()`](Self::serial_port) has been called.
    pub async fn build(self) -> Result<ModemIo> {
        let ModemBuilder {
            config,
            serial_port,
            serial_config,
            mut power,
            observers,
        } = self;
        let port = serial_port
            .ok_or_else(|| Error::InvalidArgument("serial_port is required for build()".into()))?;
        config.validate()?;
        serial_config.validate()?;

        power_on(power.as_mut()).await?;
        let transport = SerialTransport::open_with_config(&port, serial_config).await?;
        start(Box::new(transport), config, observers).await
    }
}

impl Default for ModemBuilder {
    fn default() -> Self {
        Self::new()
    }
}

async fn power_on(power: &mut dyn PowerControl) -> Result<()> {
    debug!("running modem power-on sequence");
    power.power_on().await
}

async fn start(
    transport: Box<dyn Transport>,
    config: ModemConfig,
    observers: ObserverSet,
) -> Result<ModemIo> {
    let delay = config.startup_delay;
    let io = spawn_io_task(transport, config, observers)?;
    if !delay.is_zero() {
        debug!(delay_ms = delay.as_millis() as u64, "waiting for modem to settle");
        tokio::time::sleep(delay).await;
    }
    info!("modem line engine started");
    Ok(io)
}
