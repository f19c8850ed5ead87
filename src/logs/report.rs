//! Report building and rendering
//!
//! A [`Report`] is a snapshot of an [`Aggregator`]: one [`HourReport`] per
//! bucket, rows ranked by total bytes and cut to the top N. Bucket totals
//! always cover every function, including the ones cut off.

use super::aggregate::{Aggregator, HourBucket};
use super::error::{LogsError, LogsResult};
use super::types::{BucketZone, FunctionUsage, LineStats};
use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use std::cmp::Ordering;
use std::io::Write;

/// Rows shown per hour unless told otherwise
pub const DEFAULT_TOP: usize = 10;

/// Output format for a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    #[default]
    Table,
    Json,
    Csv,
}

impl std::str::FromStr for ReportFormat {
    type Err = LogsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "table" | "text" => Ok(Self::Table),
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            other => Err(LogsError::UnknownFormat(other.to_string())),
        }
    }
}

impl std::fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Table => write!(f, "table"),
            Self::Json => write!(f, "json"),
            Self::Csv => write!(f, "csv"),
        }
    }
}

/// One ranked function within an hour
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FunctionRow {
    pub function: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    pub read_bytes: u64,
    pub write_bytes: u64,
    pub total_bytes: u64,
    pub usage: FunctionUsage,
}

/// Ranked usage for one hour bucket
#[derive(Debug, Clone, Serialize)]
pub struct HourReport {
    pub start: DateTime<FixedOffset>,
    /// Sum over every function in the hour, shown or not
    pub totals: FunctionUsage,
    pub total_bytes: u64,
    /// Number of distinct functions in the hour
    pub functions: usize,
    pub rows: Vec<FunctionRow>,
    /// Functions left out by the top-N cut
    pub omitted: usize,
}

/// Full report across all hours
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub zone: BucketZone,
    pub top: usize,
    pub hours: Vec<HourReport>,
    pub stats: LineStats,
}

/// Ordering used for rows: most bytes first, then most calls, then name
fn rank(a: &FunctionRow, b: &FunctionRow) -> Ordering {
    b.total_bytes
        .cmp(&a.total_bytes)
        .then_with(|| b.usage.calls.cmp(&a.usage.calls))
        .then_with(|| a.function.cmp(&b.function))
}

impl HourReport {
    fn build(bucket: &HourBucket, top: usize) -> Self {
        let mut rows: Vec<FunctionRow> = bucket
            .functions()
            .iter()
            .map(|(name, usage)| FunctionRow {
                function: name.clone(),
                kind: bucket.kind_of(name).map(str::to_string),
                read_bytes: usage.read_bytes(),
                write_bytes: usage.write_bytes(),
                total_bytes: usage.total_bytes(),
                usage: *usage,
            })
            .collect();

        rows.sort_by(rank);

        let functions = rows.len();
        rows.truncate(top);
        let totals = bucket.totals();

        Self {
            start: bucket.start,
            total_bytes: totals.total_bytes(),
            totals,
            functions,
            omitted: functions - rows.len(),
            rows,
        }
    }
}

impl Report {
    /// Snapshot an aggregator, keeping at most `top` rows per hour
    pub fn build(aggregator: &Aggregator, top: usize) -> Self {
        let hours = aggregator
            .buckets()
            .map(|bucket| HourReport::build(bucket, top))
            .collect();

        Self {
            zone: aggregator.zone(),
            top,
            hours,
            stats: aggregator.stats(),
        }
    }

    /// Bytes across every hour
    pub fn grand_total_bytes(&self) -> u64 {
        self.hours
            .iter()
            .fold(0u64, |acc, h| acc.saturating_add(h.total_bytes))
    }

    /// Write the report in the requested format
    pub fn render<W: Write>(
        &self,
        out: &mut W,
        format: ReportFormat,
        exact_bytes: bool,
    ) -> LogsResult<()> {
        match format {
            ReportFormat::Table => self.render_table(out, exact_bytes),
            ReportFormat::Json => self.render_json(out),
            ReportFormat::Csv => self.render_csv(out),
        }
    }

    fn render_table<W: Write>(&self, out: &mut W, exact_bytes: bool) -> LogsResult<()> {
        let size = |bytes: u64| {
            if exact_bytes {
                bytes.to_string()
            } else {
                format_bytes(bytes)
            }
        };

        if self.hours.is_empty() {
            writeln!(out, "No function executions found")?;
        }

        for hour in &self.hours {
            writeln!(
                out,
                "{} {}  total {}  calls {}  functions {}",
                hour.start.format("%Y-%m-%d %H:00"),
                self.zone.label(&hour.start),
                size(hour.total_bytes),
                hour.totals.calls,
                hour.functions
            )?;
            writeln!(
                out,
                "  {:<40} {:>8} {:>12} {:>12} {:>12} {:>9}",
                "FUNCTION", "CALLS", "READ", "WRITE", "TOTAL", "AVG MS"
            )?;

            for row in &hour.rows {
                let avg = row
                    .usage
                    .average_ms()
                    .map(|ms| format!("{:.1}", ms))
                    .unwrap_or_else(|| "-".to_string());

                writeln!(
                    out,
                    "  {:<40} {:>8} {:>12} {:>12} {:>12} {:>9}",
                    row.function,
                    row.usage.calls,
                    size(row.read_bytes),
                    size(row.write_bytes),
                    size(row.total_bytes),
                    avg
                )?;
            }

            if hour.omitted > 0 {
                writeln!(out, "  ... and {} more", hour.omitted)?;
            }
            writeln!(out)?;
        }

        writeln!(
            out,
            "{} across {} hour(s); {}",
            size(self.grand_total_bytes()),
            self.hours.len(),
            self.stats
        )?;

        Ok(())
    }

    fn render_json<W: Write>(&self, out: &mut W) -> LogsResult<()> {
        serde_json::to_writer_pretty(&mut *out, &self.hours)?;
        writeln!(out)?;
        Ok(())
    }

    fn render_csv<W: Write>(&self, out: &mut W) -> LogsResult<()> {
        let mut writer = csv::Writer::from_writer(out);

        writer.write_record([
            "hour",
            "function",
            "kind",
            "calls",
            "failures",
            "database_read_bytes",
            "database_write_bytes",
            "file_read_bytes",
            "file_write_bytes",
            "vector_read_bytes",
            "vector_write_bytes",
            "total_bytes",
            "execution_ms",
        ])?;

        for hour in &self.hours {
            let start = hour.start.to_rfc3339();
            for row in &hour.rows {
                let u = &row.usage;
                writer.write_record([
                    start.clone(),
                    row.function.clone(),
                    row.kind.clone().unwrap_or_default(),
                    u.calls.to_string(),
                    u.failures.to_string(),
                    u.database_read_bytes.to_string(),
                    u.database_write_bytes.to_string(),
                    u.file_read_bytes.to_string(),
                    u.file_write_bytes.to_string(),
                    u.vector_read_bytes.to_string(),
                    u.vector_write_bytes.to_string(),
                    row.total_bytes.to_string(),
                    format!("{:.3}", u.execution_ms),
                ])?;
            }
        }

        writer.flush()?;
        Ok(())
    }
}

/// Human-readable size in binary units
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];

    if bytes < 1024 {
        return format!("{} B", bytes);
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    format!("{:.1} {}", value, UNITS[unit])
}
