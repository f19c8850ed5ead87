//! Log bandwidth report
//!
//! Reads function execution logs as NDJSON on standard input and prints,
//! for every hour, the functions that read and wrote the most bytes.
//!
//! ```text
//! platform logs --jsonl | log-bandwidth --utc --top 5
//! ```
//!
//! Ctrl+C stops reading and prints what was collected so far.

use clap::Parser;
use mailroom::cli::{exit_if_interrupted, run_logs, LogsArgs};
use mailroom::config::Config;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "log-bandwidth")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Per-hour function bandwidth from NDJSON logs on stdin")]
struct Cli {
    #[command(flatten)]
    logs: LogsArgs,

    /// Config file (default: search standard locations)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::resolve(cli.config.as_deref())?;
    mailroom::logging::init(&config.logging);
    tracing::debug!(source = ?config.source, "Configuration loaded");

    let options = cli.logs.resolve(&config.logs)?;
    let outcome = run_logs(&options).await?;
    exit_if_interrupted(&outcome);

    Ok(())
}
