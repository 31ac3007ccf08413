//! Download a shared file by its code
//!
//! Run with: cargo run --bin fetch -- <host> <code> [dest_dir]

use anyhow::{Context, Result, anyhow};
use peerlink_core::share::fetch;
use std::path::PathBuf;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .init();

    let mut args = std::env::args().skip(1);
    let (Some(host), Some(code)) = (args.next(), args.next()) else {
        return Err(anyhow!("usage: fetch <host> <code> [dest_dir]"));
    };
    let code: u16 = code
        .parse()
        .with_context(|| format!("share code must be a number, got {:?}", code))?;
    let dest_dir = args.next().map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));

    let addr = tokio::net::lookup_host((host.as_str(), code))
        .await?
        .next()
        .ok_or_else(|| anyhow!("cannot resolve {}", host))?;

    let received = fetch(addr, &dest_dir).await?;
    println!(
        "Saved {} ({} bytes) to {}",
        received.file_name,
        received.bytes,
        received.path.display()
    );
    Ok(())
}
