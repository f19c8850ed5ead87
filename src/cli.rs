//! Command-line plumbing shared by `mailroom logs` and `log-bandwidth`

use crate::config::LogsConfig;
use crate::logs::{
    interrupt_signal, open_input, read_into, Aggregator, BucketZone, LogsResult, ReadOutcome,
    Report, ReportFormat,
};
use anyhow::Context;
use clap::Args;
use std::io::Write;
use std::path::PathBuf;

/// Flags for the log bandwidth report
#[derive(Debug, Clone, Default, Args)]
pub struct LogsArgs {
    /// Bucket hours in UTC instead of local time
    #[arg(long)]
    pub utc: bool,

    /// Bucket hours in local time even if config says UTC
    #[arg(long, conflicts_with = "utc")]
    pub local: bool,

    /// Functions shown per hour [default: 10]
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub top: Option<u32>,

    /// Output format (table, json, csv)
    #[arg(short, long)]
    pub format: Option<ReportFormat>,

    /// Print exact byte counts instead of KiB/MiB
    #[arg(long)]
    pub bytes: bool,

    /// Read logs from a file instead of standard input
    #[arg(short, long)]
    pub input: Option<PathBuf>,
}

/// Flags merged with configured defaults
#[derive(Debug, Clone, PartialEq)]
pub struct LogsOptions {
    pub zone: BucketZone,
    pub top: usize,
    pub format: ReportFormat,
    pub exact_bytes: bool,
    pub input: Option<PathBuf>,
}

impl LogsArgs {
    /// Fill unset flags from config
    pub fn resolve(&self, config: &LogsConfig) -> anyhow::Result<LogsOptions> {
        let format = match self.format {
            Some(format) => format,
            None => config
                .format
                .parse()
                .context("Invalid report format in config")?,
        };

        let top = self.top.map(|n| n as usize).unwrap_or(config.top).max(1);

        Ok(LogsOptions {
            zone: BucketZone::from_utc_flag(self.utc || (config.utc && !self.local)),
            top,
            format,
            exact_bytes: self.bytes,
            input: self.input.clone(),
        })
    }
}

/// Read, aggregate and print; returns how the read ended
///
/// A closed stdout (e.g. piping into `head`) is not treated as an error.
pub async fn run_logs(options: &LogsOptions) -> anyhow::Result<ReadOutcome> {
    let source = open_input(options.input.as_deref())
        .await
        .with_context(|| match &options.input {
            Some(path) => format!("Failed to open {}", path.display()),
            None => "Failed to open standard input".to_string(),
        })?;

    let mut aggregator = Aggregator::new(options.zone);
    let outcome = read_into(source, &mut aggregator, interrupt_signal()).await?;

    let stats = aggregator.stats();
    tracing::info!(
        lines = stats.lines,
        events = stats.events,
        malformed = stats.malformed,
        hours = aggregator.bucket_count(),
        interrupted = outcome.interrupted,
        "Finished reading logs"
    );

    let report = Report::build(&aggregator, options.top);

    let stdout = std::io::stdout();
    let mut out = std::io::BufWriter::new(stdout.lock());
    write_report(&report, &mut out, options.format, options.exact_bytes)
        .context("Failed to write report")?;

    Ok(outcome)
}

/// Render and flush a report, ignoring a reader that went away
pub fn write_report<W: Write>(
    report: &Report,
    out: &mut W,
    format: ReportFormat,
    exact_bytes: bool,
) -> LogsResult<()> {
    let written = report
        .render(&mut *out, format, exact_bytes)
        .and_then(|()| out.flush().map_err(Into::into));

    match written {
        Err(e) if e.is_broken_pipe() => {
            tracing::debug!("Output closed before report finished");
            Ok(())
        }
        other => other,
    }
}

/// End the process after an interrupted read
///
/// Standard input is read on a blocking thread that cannot be cancelled, so
/// waiting for the runtime to wind down would hang until the next line.
pub fn exit_if_interrupted(outcome: &ReadOutcome) {
    if outcome.interrupted {
        std::process::exit(0);
    }
}
