//! Create a date-partitioned copy of a table and load one partition.

use anyhow::Context;
use clap::Parser;

use partition_watch::ops::PartitionedCopy;
use partition_watch::{logging, MonitorConfig, PgBackend};

#[derive(Parser)]
#[command(name = "partition-copy")]
#[command(about = "Copy a table into a date-partitioned target table")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Source table (fully qualified)
    source: String,
    /// Target table to create/load (fully qualified)
    target: String,
    /// Partition value to load into (YYYY-MM-DD)
    partition_value: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_logging();
    let config = MonitorConfig::from_env();

    let backend = PgBackend::new(config.database_url.clone());
    let copier = PartitionedCopy::new(&backend, &config.partition_column);
    let outcome = copier
        .copy(&cli.source, &cli.target, &cli.partition_value)
        .await;
    backend.close().await;

    let copied = outcome.context("partition copy failed")?;
    println!(
        "copied {copied} rows from {} into {} (partition {})",
        cli.source, cli.target, cli.partition_value
    );
    Ok(())
}
