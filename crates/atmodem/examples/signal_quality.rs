//! Poll signal quality.
//!
//! Sends `AT+CSQ` every five seconds and prints the raw reading. Shows the
//! basic request/response pattern: send a command, check `success`, and
//! read the information lines that precede the final result code.
//!
//! # Usage
//!
//! ```sh
//! cargo run -p atmodem --example signal_quality -- /dev/ttyACM0
//! ```

use std::time::Duration;

use atmodem::ModemBuilder;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let serial_port = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "/dev/ttyUSB2".to_string());

    let modem = ModemBuilder::new()
        .serial_port(&serial_port)
        .command_timeout(Duration::from_secs(2))
        .build()
        .await?;

    // Echo off so responses do not start with the command itself.
    modem.send_and_await_default("ATE0").await?;

    for _ in 0..12 {
        let response = modem.send_and_await_default("AT+CSQ").await?;
        if !response.success {
            println!("no answer from modem");
        }
        for line in response.lines.iter().filter(|l| l.starts_with("+CSQ:")) {
            println!("{line}");
        }
        tokio::time::sleep(Duration::from_secs(5)).await;
    }

    modem.shutdown().await?;
    Ok(())
}
