// atmodem-term -- CLI tool for exercising the AT line engine against a real
// modem or a scripted mock transport.
//
// Usage:
//   atmodem-term --port /dev/ttyUSB2 send AT+CSQ
//   atmodem-term --port /dev/ttyUSB2 probe
//   atmodem-term --port /dev/ttyUSB2 monitor --duration 60
//   atmodem-term --port /dev/ttyUSB2 sms +15551234567 "hello"
//   atmodem-term --mock probe
//
// Logging goes to stderr and is controlled by RUST_LOG (or -v / -vv).

use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use atmodem::{FlowControl, ModemBuilder, ModemIo, Response};
use atmodem_test_harness::MockTransport;

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// Unsolicited result codes most modules emit once network registration
/// reporting is enabled.
const DEFAULT_URC_PREFIXES: &[&str] = &[
    "+CREG:", "+CGREG:", "+CEREG:", "+CMTI:", "+CRING:", "RING", "+CGEV:",
];

/// atmodem-term -- talk to an AT-command modem from the command line.
#[derive(Parser)]
#[command(name = "atmodem-term", version, about)]
struct Cli {
    /// Serial port path (e.g. /dev/ttyUSB2, COM5).
    /// Required unless --mock is used.
    #[arg(long)]
    port: Option<String>,

    /// Baud rate.
    #[arg(long, default_value_t = 115_200)]
    baud: u32,

    /// Disable RTS/CTS flow control (USB AT ports usually ignore it).
    #[arg(long)]
    no_flow_control: bool,

    /// Line prefix that marks an unsolicited result code. Repeatable.
    /// Defaults to the common registration, SMS and ring URCs.
    #[arg(long = "urc")]
    urc_prefixes: Vec<String>,

    /// Default timeout per command, in milliseconds.
    #[arg(long, default_value_t = 5000)]
    timeout: u64,

    /// Time to let the modem settle after opening, in milliseconds.
    #[arg(long, default_value_t = 0)]
    startup_delay: u64,

    /// Use a scripted mock transport instead of a real serial port.
    /// Useful for verifying CLI parsing and builder wiring without hardware.
    #[arg(long)]
    mock: bool,

    /// Increase log verbosity (-v: debug, -vv: trace). RUST_LOG wins if set.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Send one command and print its response.
    Send {
        /// The AT command, without line terminator (e.g. AT+CSQ).
        command: String,

        /// Override the command timeout, in milliseconds.
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Query identity, firmware, signal quality and operator.
    Probe,

    /// Print unsolicited result codes as they arrive.
    Monitor {
        /// Duration in seconds (0 = run until Ctrl-C).
        #[arg(long, default_value_t = 0)]
        duration: u64,
    },

    /// Send a text-mode SMS (exercises the `>` data prompt).
    Sms {
        /// Destination number in international format.
        number: String,
        /// Message text.
        text: String,
    },
}

// ---------------------------------------------------------------------------
// Modem construction
// ---------------------------------------------------------------------------

fn builder_for(cli: &Cli) -> ModemBuilder {
    let mut builder = ModemBuilder::new()
        .baud_rate(cli.baud)
        .command_timeout(Duration::from_millis(cli.timeout))
        .startup_delay(Duration::from_millis(cli.startup_delay));

    builder = if cli.urc_prefixes.is_empty() {
        builder.async_prefixes(DEFAULT_URC_PREFIXES)
    } else {
        builder.async_prefixes(&cli.urc_prefixes)
    };

    if cli.no_flow_control {
        builder = builder.flow_control(FlowControl::None);
    }
    if matches!(cli.command, Command::Sms { .. }) {
        builder = builder.prompt('>');
    }
    builder
}

/// A mock modem that answers the commands this tool sends.
fn mock_transport(cli: &Cli) -> MockTransport {
    let mut mock = MockTransport::new();
    match &cli.command {
        Command::Send { command, .. } => {
            mock.expect(format!("{command}\r\n").as_bytes(), b"\r\nOK\r\n");
        }
        Command::Probe => {
            for (cmd, reply) in probe_script() {
                mock.expect(cmd.as_bytes(), reply.as_bytes());
            }
        }
        Command::Monitor { .. } => {
            let handle = mock.handle();
            handle.inject(b"\r\n+CREG: 2\r\n\r\n+CREG: 5\r\n\r\n+CMTI: \"SM\",3\r\n");
        }
        Command::Sms { number, text } => {
            mock.expect(b"AT+CMGF=1\r\n", b"\r\nOK\r\n");
            mock.expect(format!("AT+CMGS=\"{number}\"\r\n").as_bytes(), b"\r\n> ");
            let mut payload = text.as_bytes().to_vec();
            payload.push(CTRL_Z);
            mock.expect(&payload, b"\r\n+CMGS: 42\r\n\r\nOK\r\n");
        }
    }
    mock
}

fn probe_script() -> [(&'static str, &'static str); 4] {
    [
        ("ATI\r\n", "\r\nMock Cellular Module\r\nRevision 1.0\r\n\r\nOK\r\n"),
        ("AT+CGMR\r\n", "\r\nMOCK01.00.000\r\n\r\nOK\r\n"),
        ("AT+CSQ\r\n", "\r\n+CSQ: 20,99\r\n\r\nOK\r\n"),
        ("AT+COPS?\r\n", "\r\n+COPS: 0,0,\"Mock Telecom\",7\r\n\r\nOK\r\n"),
    ]
}

async fn create_modem(cli: &Cli) -> Result<ModemIo> {
    let builder = builder_for(cli);

    if cli.mock {
        let modem = builder
            .build_with_transport(Box::new(mock_transport(cli)))
            .await
            .context("failed to start modem with mock transport")?;
        println!("Connected (mock transport)");
        Ok(modem)
    } else {
        let port = cli
            .port
            .as_deref()
            .context("--port is required when not using --mock")?;
        let modem = builder
            .serial_port(port)
            .build()
            .await
            .with_context(|| format!("failed to open modem on {port} at {} baud", cli.baud))?;
        println!("Connected to {port} at {} baud", cli.baud);
        Ok(modem)
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

const CTRL_Z: u8 = 0x1A;

fn print_response(command: &str, response: &Response) {
    for line in &response.lines {
        println!("  {line}");
    }
    if !response.success {
        println!("  ({command}: no response)");
    } else if !response.terminated() {
        println!("  ({command}: no final result code before timeout)");
    }
}

async fn cmd_send(modem: &ModemIo, command: &str, timeout: Option<u64>) -> Result<()> {
    let start = Instant::now();
    let response = match timeout {
        Some(ms) => {
            modem
                .send_and_await(command, Duration::from_millis(ms))
                .await?
        }
        None => modem.send_and_await_default(command).await?,
    };
    print_response(command, &response);
    println!("({} ms)", start.elapsed().as_millis());

    if !response.success {
        bail!("{command}: modem did not answer");
    }
    Ok(())
}

async fn cmd_probe(modem: &ModemIo) -> Result<()> {
    for command in ["ATI", "AT+CGMR", "AT+CSQ", "AT+COPS?"] {
        println!("{command}");
        let response = modem.send_and_await_default(command).await?;
        print_response(command, &response);
    }
    Ok(())
}

async fn cmd_monitor(modem: &ModemIo, duration_secs: u64) -> Result<()> {
    println!("Monitoring unsolicited result codes (Ctrl-C to stop)...");

    let deadline = if duration_secs > 0 {
        Some(Instant::now() + Duration::from_secs(duration_secs))
    } else {
        None
    };

    loop {
        let timeout = match deadline {
            Some(dl) => {
                let remaining = dl.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    println!("Monitor duration elapsed.");
                    break;
                }
                remaining
            }
            None => Duration::from_secs(3600),
        };

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!("Interrupted.");
                break;
            }
            event = modem.get_async_event(timeout) => match event {
                Ok(line) => println!("[urc] {line}"),
                Err(atmodem::Error::Timeout) => {
                    if deadline.is_some() {
                        println!("Monitor duration elapsed.");
                        break;
                    }
                }
                Err(e) => {
                    println!("Event channel closed: {e}");
                    break;
                }
            },
        }
    }

    let stats = modem.stats();
    if stats.events_dropped > 0 {
        println!("[warning] {} events dropped (consumer too slow)", stats.events_dropped);
    }
    Ok(())
}

async fn cmd_sms(modem: &ModemIo, number: &str, text: &str) -> Result<()> {
    let response = modem.send_and_await_default("AT+CMGF=1").await?;
    if !response.terminated() || response.final_line().is_some_and(|l| l != "OK") {
        print_response("AT+CMGF=1", &response);
        bail!("modem refused text mode");
    }

    let command = format!("AT+CMGS=\"{number}\"");
    let response = modem.send_and_await_default(&command).await?;
    if response.end != Some(atmodem::EndMatch::Prompt) {
        print_response(&command, &response);
        bail!("modem did not prompt for message text");
    }

    let mut payload = text.as_bytes().to_vec();
    payload.push(CTRL_Z);
    modem.send_raw(&payload).await?;

    // Network submission can take far longer than a local command.
    let response = modem.collect_responses(Duration::from_secs(60)).await;
    print_response("AT+CMGS", &response);
    if !response.success {
        bail!("no final result code after message submission");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "atmodem=debug,atmodem_io=debug,atmodem_transport=debug",
        _ => "atmodem=trace,atmodem_io=trace,atmodem_transport=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if cli.mock && cli.port.is_some() {
        bail!("--mock and --port are mutually exclusive");
    }

    let modem = create_modem(&cli).await?;

    let result = match &cli.command {
        Command::Send { command, timeout } => cmd_send(&modem, command, *timeout).await,
        Command::Probe => cmd_probe(&modem).await,
        Command::Monitor { duration } => cmd_monitor(&modem, *duration).await,
        Command::Sms { number, text } => cmd_sms(&modem, number, text).await,
    };

    let stats = modem.stats();
    tracing::debug!(
        framing_overflows = stats.framing_overflows,
        responses_dropped = stats.responses_dropped,
        events_dropped = stats.events_dropped,
        "session statistics"
    );

    if let Ok(mut transport) = modem.shutdown().await {
        transport.close().await.ok();
    }
    result
}
