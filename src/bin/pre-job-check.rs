//! Pre-job gating check.
//!
//! Polls one table until its max partition date equals the target, then
//! exits 0; exits 1 after the attempt budget runs out. Either way a
//! matching notification is sent. Progress goes to standard output.

use std::process;
use std::time::Duration;

use clap::Parser;
use tracing::warn;

use partition_watch::{logging, MonitorConfig, NotificationSink, PgBackend, PollingGate, WeComSink};

#[derive(Parser)]
#[command(name = "pre-job-check")]
#[command(about = "Block until an upstream table has produced the target partition")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Fully qualified table to poll
    table: String,
    /// Target partition date (YYYY-MM-DD)
    target_date: String,
    /// Attempt budget; an unparsable value falls back to the default
    max_attempts: Option<String>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init_logging();
    let config = MonitorConfig::from_env();

    let max_attempts = match cli.max_attempts.as_deref() {
        None => config.default_max_attempts,
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            warn!(
                raw,
                fallback = config.default_max_attempts,
                "invalid attempt budget, using default"
            );
            config.default_max_attempts
        }),
    };

    println!("=== pre-job gating check ===");
    println!("table: {}", cli.table);
    println!("target date: {}", cli.target_date);
    println!("max attempts: {max_attempts}");

    let backend = PgBackend::new(config.database_url.clone());
    let sink = WeComSink::new(config.webhook_url.clone());
    let gate = PollingGate::new(
        &cli.table,
        &cli.target_date,
        max_attempts,
        Duration::from_secs(config.poll_interval_secs),
        &config.partition_column,
    );

    let outcome = gate.run(&backend).await;
    backend.close().await;

    for attempt in &outcome.attempts {
        println!(
            "attempt {}/{}: observed {}",
            attempt.attempt,
            gate.max_attempts(),
            attempt.observed.as_deref().unwrap_or("nothing")
        );
    }

    if outcome.matched() {
        println!("gating check passed");
        let message = format!(
            "✅ **Upstream check passed**\n> table: `{}`\n> target date: {}\n> upstream partition is in place",
            cli.table, cli.target_date
        );
        notify(&sink, &message).await;
        process::exit(0);
    }

    println!(
        "gating check exhausted after {} attempts (last observation: {})",
        outcome.attempts.len(),
        outcome.last_observation().unwrap_or("nothing")
    );
    let message = format!(
        "❌ **Upstream check failed**\n> table: `{}`\n> target date: {}\n> still unmatched after {} attempts",
        cli.table,
        cli.target_date,
        outcome.attempts.len()
    );
    notify(&sink, &message).await;
    process::exit(1);
}

async fn notify(sink: &WeComSink, message: &str) {
    if let Err(e) = sink.send_markdown(message).await {
        println!("notification delivery failed: {e}");
    }
}
