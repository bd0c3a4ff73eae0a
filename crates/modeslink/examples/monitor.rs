//! Monitor a Beast/Radarcape receiver on a serial device.
//!
//! Opens an input session on the given device (default `/dev/beast`),
//! lets the engine discover the baud rate and receiver family, and prints
//! every delivered message. Watch the log output (RUST_LOG=debug) to see
//! the autobaud hunt, receiver detection, and settings pushes happen.
//!
//! # Usage
//!
//! ```sh
//! RUST_LOG=modeslink=debug cargo run -p modeslink --example monitor -- /dev/ttyUSB0
//! ```

use modeslink::beast::SessionBuilder;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "/dev/beast".to_string());

    println!("Opening {path}... (ctrl-c to stop)");

    let session = SessionBuilder::new(&path).build();
    session.set_message_notifier(|message| {
        let hex: String = message
            .payload
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect();
        println!(
            "{:12} ts={:014} ({}) signal={:3} {}",
            message.message_type.to_string(),
            message.timestamp,
            message.timestamp_kind,
            message.signal,
            hex
        );
    });
    session.start()?;

    tokio::signal::ctrl_c().await?;
    println!("Closing session");
    session.close().await;
    Ok(())
}
