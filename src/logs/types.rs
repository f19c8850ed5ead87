//! Core data types for log bandwidth aggregation
//!
//! - `FunctionUsage`: accumulated counters for one function
//! - `BucketZone`: which clock hour buckets follow
//! - `LineStats`: what happened to each input line

use chrono::{DateTime, FixedOffset, Local, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// Usage counters accumulated for one function (or one whole hour)
///
/// All counters are non-negative and saturate instead of wrapping.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct FunctionUsage {
    /// Number of executions seen
    pub calls: u64,
    /// Executions that reported a failure status
    pub failures: u64,
    pub database_read_bytes: u64,
    pub database_write_bytes: u64,
    pub file_read_bytes: u64,
    pub file_write_bytes: u64,
    pub vector_read_bytes: u64,
    pub vector_write_bytes: u64,
    /// Sum of reported execution time in milliseconds
    pub execution_ms: f64,
}

impl FunctionUsage {
    /// All bytes read from database, file storage and vector indexes
    pub fn read_bytes(&self) -> u64 {
        self.database_read_bytes
            .saturating_add(self.file_read_bytes)
            .saturating_add(self.vector_read_bytes)
    }

    /// All bytes written to database, file storage and vector indexes
    pub fn write_bytes(&self) -> u64 {
        self.database_write_bytes
            .saturating_add(self.file_write_bytes)
            .saturating_add(self.vector_write_bytes)
    }

    /// Read plus write bytes
    pub fn total_bytes(&self) -> u64 {
        self.read_bytes().saturating_add(self.write_bytes())
    }

    /// Average execution time per call, if any calls were seen
    pub fn average_ms(&self) -> Option<f64> {
        if self.calls == 0 {
            None
        } else {
            Some(self.execution_ms / self.calls as f64)
        }
    }

    /// Add another set of counters into this one
    pub fn merge(&mut self, other: &FunctionUsage) {
        self.calls = self.calls.saturating_add(other.calls);
        self.failures = self.failures.saturating_add(other.failures);
        self.database_read_bytes = self
            .database_read_bytes
            .saturating_add(other.database_read_bytes);
        self.database_write_bytes = self
            .database_write_bytes
            .saturating_add(other.database_write_bytes);
        self.file_read_bytes = self.file_read_bytes.saturating_add(other.file_read_bytes);
        self.file_write_bytes = self.file_write_bytes.saturating_add(other.file_write_bytes);
        self.vector_read_bytes = self.vector_read_bytes.saturating_add(other.vector_read_bytes);
        self.vector_write_bytes = self
            .vector_write_bytes
            .saturating_add(other.vector_write_bytes);
        self.execution_ms += other.execution_ms;
    }
}

/// Clock used to cut events into hour buckets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BucketZone {
    /// The machine's local time zone
    #[default]
    Local,
    /// Coordinated Universal Time
    Utc,
}

impl BucketZone {
    pub fn from_utc_flag(utc: bool) -> Self {
        if utc {
            Self::Utc
        } else {
            Self::Local
        }
    }

    /// Start of the hour containing `timestamp`, expressed in this zone
    pub fn hour_start(&self, timestamp: DateTime<Utc>) -> DateTime<FixedOffset> {
        let zoned = match self {
            Self::Utc => timestamp.fixed_offset(),
            Self::Local => timestamp.with_timezone(&Local).fixed_offset(),
        };

        zoned
            .with_minute(0)
            .and_then(|d| d.with_second(0))
            .and_then(|d| d.with_nanosecond(0))
            .unwrap_or(zoned)
    }

    /// Label appended to hour headings
    pub fn label(&self, start: &DateTime<FixedOffset>) -> String {
        match self {
            Self::Utc => "UTC".to_string(),
            Self::Local => start.format("%:z").to_string(),
        }
    }
}

impl std::fmt::Display for BucketZone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Utc => write!(f, "utc"),
        }
    }
}

/// Counts of how input lines were handled
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LineStats {
    /// Every line read, blank ones included
    pub lines: u64,
    /// Lines that contributed to a bucket
    pub events: u64,
    /// Valid lines that were not function executions
    pub irrelevant: u64,
    /// Lines that could not be parsed
    pub malformed: u64,
}

impl std::fmt::Display for LineStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} lines: {} events, {} irrelevant, {} malformed",
            self.lines, self.events, self.irrelevant, self.malformed
        )
    }
}
