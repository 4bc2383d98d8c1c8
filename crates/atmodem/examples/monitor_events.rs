//! Monitor network registration events.
//!
//! Enables unsolicited registration reporting and prints every URC as it
//! arrives, both from a callback running on the IO task and from the async
//! event channel. Useful for watching a module attach to the network or
//! for debugging coverage problems.
//!
//! # Requirements
//!
//! - A cellular module on a serial or USB AT port
//! - Serial port path adjusted for your system
//!
//! # Usage
//!
//! ```sh
//! RUST_LOG=atmodem_io=debug cargo run -p atmodem --example monitor_events
//! ```

use std::time::Duration;

use atmodem::ModemBuilder;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let serial_port = "/dev/ttyUSB2";
    println!("Opening modem on {}...", serial_port);

    let modem = ModemBuilder::new()
        .serial_port(serial_port)
        .async_prefixes(["+CREG:", "+CGREG:", "+CEREG:"])
        .on_async_event(|line| {
            // Runs on the IO task: keep it short.
            tracing::info!(urc = %line, "registration change");
        })
        .startup_delay(Duration::from_secs(1))
        .build()
        .await?;

    // Ask for registration URCs with location information.
    for command in ["AT+CREG=2", "AT+CGREG=2", "AT+CEREG=2"] {
        let response = modem.send_and_await_default(command).await?;
        println!("{command}: {:?}", response.final_line().map(|l| l.as_str()));
    }

    println!("Monitoring for 60 seconds...\n");

    let deadline = tokio::time::Instant::now() + Duration::from_secs(60);
    let start = tokio::time::Instant::now();

    loop {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        if remaining.is_zero() {
            break;
        }

        match modem.get_async_event(remaining).await {
            Ok(line) => {
                let elapsed = start.elapsed();
                println!(
                    "{:>6}.{:03}s {}",
                    elapsed.as_secs(),
                    elapsed.subsec_millis(),
                    line
                );
            }
            Err(atmodem::Error::Timeout) => break,
            Err(e) => {
                println!("Event channel closed: {e}");
                break;
            }
        }
    }

    let stats = modem.stats();
    println!(
        "\nMonitoring complete. {} events dropped, {} oversize lines discarded.",
        stats.events_dropped, stats.framing_overflows
    );
    modem.shutdown().await?;
    Ok(())
}
