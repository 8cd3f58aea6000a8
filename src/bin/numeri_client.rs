//! Load generator for the number deduplication server.
//!
//! Opens several connections and sends sequential 9-digit numbers over
//! them round-robin, printing every acknowledgement.
//!
//! Run with:
//! ```bash
//! cargo run --bin numeri_client -- --connections 4 --count 1000
//! ```

use std::net::SocketAddr;

use anyhow::{bail, Context, Result};
use clap::Parser;
use numeri::client::Client;
use numeri::protocol::PAYLOAD_LEN;
use tracing::{debug, info, Level};

/// Highest number that fits the 9-digit payload.
const MAX_NUMBER: u64 = 999_999_999;

/// Sends sequential numbers to a numeri server.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:4000")]
    addr: SocketAddr,

    /// Number of concurrent connections
    #[arg(short, long, default_value = "4")]
    connections: usize,

    /// Numbers to send per connection
    #[arg(short = 'n', long, default_value = "1000")]
    count: u64,

    /// First number sent
    #[arg(short, long, default_value = "100000000")]
    start: u64,

    /// Send "terminate" once every connection is done
    #[arg(short, long)]
    terminate: bool,

    /// Log debug events
    #[arg(short, long)]
    verbose: bool,
}

/// Renders a number as a zero-padded 9-digit payload.
fn payload(number: u64) -> [u8; PAYLOAD_LEN] {
    let mut payload = [b'0'; PAYLOAD_LEN];
    let digits = number.to_string();
    payload[PAYLOAD_LEN - digits.len()..].copy_from_slice(digits.as_bytes());
    payload
}

async fn drive(addr: SocketAddr, numbers: Vec<u64>) -> Result<usize> {
    let mut client = Client::connect(addr).await?;
    let acked = client
        .pipeline(numbers.into_iter().map(payload), |ack| println!("{}", ack))
        .await?;
    Ok(acked)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .with_writer(std::io::stderr)
        .init();

    if args.connections == 0 {
        bail!("--connections must be at least 1");
    }
    let total = args.count.saturating_mul(args.connections as u64);
    let last = args.start.saturating_add(total.saturating_sub(1));
    if total > 0 && last > MAX_NUMBER {
        bail!(
            "numbers would exceed {} digits (last would be {})",
            PAYLOAD_LEN,
            last
        );
    }

    let mut batches = vec![Vec::new(); args.connections];
    for (i, number) in (args.start..args.start + total).enumerate() {
        batches[i % args.connections].push(number);
    }

    let mut tasks = Vec::with_capacity(args.connections);
    for (i, numbers) in batches.into_iter().enumerate() {
        debug!(connection = i, numbers = numbers.len(), "starting connection");
        tasks.push(tokio::spawn(drive(args.addr, numbers)));
    }

    let mut acked = 0;
    for task in tasks {
        acked += task.await.context("connection task panicked")??;
    }
    info!(sent = total, acked, "done");

    if args.terminate {
        let mut client = Client::connect(args.addr).await?;
        client.terminate().await?;
        client.finish().await?;
        info!("terminate sent");
    }
    Ok(())
}
