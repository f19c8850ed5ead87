//! # Mailroom
//!
//! Operations tooling for a newsletter platform: the jobs that run next to
//! the web app rather than inside it.
//!
//! ## Modules
//!
//! - [`logs`]: streaming function-log bandwidth aggregation and reports
//! - [`backfill`]: user store abstraction and the onboarding backfill
//! - [`config`]: TOML configuration with environment overrides
//! - [`logging`]: tracing subscriber setup
//! - [`cli`]: flags shared by the command-line tools
//!
//! ## Quick Start
//!
//! ```rust
//! use mailroom::logs::{Aggregator, BucketZone, Report, ReportFormat};
//!
//! let mut aggregator = Aggregator::new(BucketZone::Utc);
//! aggregator.ingest_line(
//!     r#"{"timestamp":1700000000000,"identifier":"messages:list","usage":{"database_read_bytes":2048}}"#,
//! );
//! aggregator.ingest_line("not json"); // skipped
//!
//! let report = Report::build(&aggregator, 10);
//! assert_eq!(report.hours[0].total_bytes, 2048);
//!
//! let mut out = Vec::new();
//! report.render(&mut out, ReportFormat::Table, false).unwrap();
//! ```

pub mod backfill;
pub mod cli;
pub mod config;
pub mod logging;
pub mod logs;

// Re-export top-level types for convenience
pub use logs::{
    Aggregator, BucketZone, FunctionUsage, LineStats, LogsError, LogsResult, Report,
    ReportFormat, UsageEvent,
};

pub use backfill::{
    backfill_onboarding, BackfillError, BackfillOptions, BackfillReport, BackfillResult,
    MemoryUserStore, NewUser, SqliteUserStore, UserRecord, UserStore,
};

pub use config::{BackfillConfig, Config, ConfigError, LoggingConfig, LogsConfig};
