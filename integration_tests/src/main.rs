//! Integration tests for the BLE encoder firmware.
//!
//! Run after flashing the firmware. The host needs a Bluetooth adapter.

mod ble_client;
mod zone;

use std::time::Duration;

use clap::Parser;
use colored::Colorize;

use ble_client::{EncoderClient, DEVICE_NAME};
use tests::{print_results, run_all_tests};

#[derive(Parser)]
#[command(name = "integration-tests")]
#[command(about = "Integration tests for the BLE encoder firmware")]
struct Args {
    /// Advertised device name
    #[arg(short, long, default_value = DEVICE_NAME)]
    name: String,

    /// BLE scan timeout in seconds
    #[arg(long, default_value = "10")]
    scan_timeout: u64,

    /// Seconds to collect zone notifications (turn the knob meanwhile)
    #[arg(short, long, default_value = "10")]
    watch: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    println!("{}", "BLE Encoder Integration Tests".bold());
    println!("Device: \"{}\"", args.name);
    println!();

    println!("Scanning...");
    let client =
        EncoderClient::connect_by_name(&args.name, Duration::from_secs(args.scan_timeout)).await?;
    println!("{}", "Connected!".green());

    println!("\nRunning tests...\n");

    let results = run_all_tests(&client, Duration::from_secs(args.watch)).await;
    print_results(&results);

    client.disconnect().await?;

    // Exit with error code if any tests failed
    let failed = results.iter().filter(|r| !r.passed).count();
    if failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}
