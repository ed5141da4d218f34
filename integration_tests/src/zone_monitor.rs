//! Live zone monitor.
//!
//! Connects to the encoder, subscribes to zone notifications and prints each
//! one until the link goes quiet for too long or drops.

mod ble_client;
mod zone;

use std::time::Duration;

use clap::Parser;
use colored::Colorize;
use tokio_stream::StreamExt;

use ble_client::{EncoderClient, DEVICE_NAME};
use zone::Zone;

/// Idle timeout used when none is requested
const FOREVER: Duration = Duration::from_secs(365 * 24 * 60 * 60);

#[derive(Parser)]
#[command(name = "zone-monitor")]
#[command(about = "Print zone notifications from the BLE encoder")]
struct Args {
    /// Advertised device name
    #[arg(short, long, default_value = DEVICE_NAME)]
    name: String,

    /// BLE scan timeout in seconds
    #[arg(long, default_value = "10")]
    scan_timeout: u64,

    /// Stop after this many seconds without a notification (0 = never)
    #[arg(long, default_value = "0")]
    idle_timeout: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    println!("Scanning for \"{}\"...", args.name);
    let client =
        EncoderClient::connect_by_name(&args.name, Duration::from_secs(args.scan_timeout)).await?;
    println!("{}", "Connected, waiting for zone changes".green());

    let stream = client.zone_stream().await?;
    client.enable_notifications().await?;

    let idle = match args.idle_timeout {
        0 => FOREVER,
        secs => Duration::from_secs(secs),
    };
    let stream = stream.timeout(idle);
    tokio::pin!(stream);

    let mut last: Option<Zone> = None;
    while let Some(item) = stream.next().await {
        let Ok(notification) = item else {
            println!("{}", "No notification within idle timeout".yellow());
            break;
        };

        match Zone::from_payload(&notification.value) {
            Some(zone) => {
                let repeat = if last == Some(zone) { " (repeat!)".red().to_string() } else { String::new() };
                println!("zone: {}{}", zone.label(), repeat);
                last = Some(zone);
            }
            None => println!("{} {:02x?}", "unexpected payload".red(), notification.value),
        }
    }

    if client.is_connected().await.unwrap_or(false) {
        client.disconnect().await?;
    }
    Ok(())
}
