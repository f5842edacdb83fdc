//! sourcescope - audit preparation for on-chain contracts
//!
//! Resolves proxy contracts to their real logic address, fetches verified
//! source, strips comments, and triages files for manual security review.

use clap::Parser;
use eyre::Result;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use sourcescope::{resolve_chain, Blacklist, Pipeline};

#[derive(Parser)]
#[command(name = "sourcescope")]
#[command(about = "Prepare on-chain contract source for manual security audit")]
#[command(version)]
struct Cli {
    /// Contract addresses to prepare
    #[arg(required = true)]
    addresses: Vec<String>,

    /// Chain name or numeric chain id
    #[arg(short, long, default_value = "ethereum")]
    chain: String,

    /// Output directory for audit-ready source trees
    #[arg(short, long, default_value = "./audit")]
    output: PathBuf,

    /// JSON array of literal path substrings to skip entirely
    #[arg(long)]
    blacklist: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    FmtSubscriber::builder()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    // Unsupported chains fail fast, before any network traffic.
    let chain = resolve_chain(&cli.chain)?;
    let blacklist = Blacklist::load(cli.blacklist.as_deref());

    let mut addresses = Vec::with_capacity(cli.addresses.len());
    for raw in &cli.addresses {
        match sourcescope::resolver::validate_address(raw) {
            Some(address) => addresses.push(address),
            None => eprintln!("⚠️  Skipping invalid address: {raw}"),
        }
    }
    if addresses.is_empty() {
        eyre::bail!("No valid addresses to process");
    }

    let pipeline = Pipeline::new(chain, blacklist, cli.output.clone())?;

    let mut reports = Vec::new();
    for address in addresses {
        // one failing address never aborts its siblings
        reports.extend(pipeline.process_address(address).await);
    }

    println!("\n📊 Run summary ({} on {}):", reports.len(), chain.name);
    for report in &reports {
        println!("   {}", report.summary());
    }

    let failures = reports.iter().filter(|r| !r.success).count();
    if failures > 0 {
        println!("\n⚠️  {} of {} passes produced no audit-ready files", failures, reports.len());
    }
    println!("📁 Output written to {}", cli.output.display());

    Ok(())
}
