//! Teller Simulator
//!
//! Drives the ledger engine under concurrent load and audits every
//! account afterwards.

use clap::Parser;
use rust_decimal::Decimal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod metrics;
mod runner;
mod workload;

use runner::SimulationRunner;
use workload::Workload;

/// Teller Simulator CLI
#[derive(Parser, Debug)]
#[command(name = "simulator")]
#[command(about = "Concurrency simulation for the Teller ledger engine")]
struct Args {
    /// Number of accounts to open
    #[arg(short, long, default_value = "8")]
    accounts: usize,

    /// Number of concurrent workers
    #[arg(short, long, default_value = "16")]
    workers: usize,

    /// Operations per worker
    #[arg(short, long, default_value = "500")]
    operations: usize,

    /// Workload to run
    #[arg(long, default_value = "mixed")]
    workload: String,

    /// Opening balance per account
    #[arg(long, default_value = "1000.00")]
    opening_balance: Decimal,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let workload = Workload::load(&args.workload)?;

    let runner = SimulationRunner::new(
        args.accounts,
        args.workers,
        args.operations,
        args.opening_balance,
        args.seed,
    );
    let report = runner.run(workload).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    if !report.consistent {
        anyhow::bail!("ledger audit failed");
    }
    Ok(())
}
