//! Function log bandwidth aggregation
//!
//! Turns a platform function log stream (NDJSON) into an hourly report of
//! which functions moved the most bytes:
//!
//! - **event**: parse and classify one log line
//! - **aggregate**: hour → function → usage buckets
//! - **report**: rank, truncate and render (table, json, csv)
//! - **reader**: stream lines from stdin or a file, stop on Ctrl+C
//! - **error**: error types
//!
//! # Data flow
//!
//! ```text
//!   stdin ─► reader ─► event::parse_line ─► Aggregator ─► Report ─► stdout
//!                        (skip malformed)    (hour, fn)    (top N)
//! ```

pub mod aggregate;
pub mod error;
pub mod event;
pub mod reader;
pub mod report;
pub mod types;

pub use aggregate::{Aggregator, HourBucket};
pub use error::{LogsError, LogsResult};
pub use event::{parse_line, LineOutcome, UsageEvent};
pub use reader::{interrupt_signal, open_input, read_into, LineSource, ReadOutcome};
pub use report::{format_bytes, FunctionRow, HourReport, Report, ReportFormat, DEFAULT_TOP};
pub use types::{BucketZone, FunctionUsage, LineStats};
