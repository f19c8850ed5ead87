//! NDJSON log line parsing
//!
//! Turns one line of a function log stream into a typed [`UsageEvent`].
//! The parser accepts the two shapes the platform emits:
//!
//! ```text
//! {"topic":"function_execution","timestamp":1700000000000,
//!  "function":{"path":"messages:list","type":"query"},
//!  "execution_time_ms":12,"status":"success",
//!  "usage":{"database_read_bytes":2048,"database_write_bytes":0}}
//!
//! {"_topic":"_execution_record","_timestamp":"2023-11-14T22:13:20Z",
//!  "identifier":"messages:list","usage":{"databaseReadBytes":2048}}
//! ```
//!
//! Anything else is either irrelevant (valid JSON about something else) or
//! malformed (not JSON, wrong field types, unusable timestamp).

use super::types::FunctionUsage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

/// Topics that describe a function execution
const EXECUTION_TOPICS: &[&str] = &["function_execution", "_execution_record"];

/// Numeric timestamps below this are taken to be seconds, not milliseconds
const SECONDS_THRESHOLD: f64 = 1e11;

/// One function execution with its resource usage
#[derive(Debug, Clone, PartialEq)]
pub struct UsageEvent {
    pub timestamp: DateTime<Utc>,
    /// Function identifier, e.g. `messages:list`
    pub function: String,
    /// Function kind when the log reports it (query, mutation, action)
    pub kind: Option<String>,
    /// Counters for this single call (`calls == 1`)
    pub usage: FunctionUsage,
}

/// What a single input line turned out to be
#[derive(Debug, Clone, PartialEq)]
pub enum LineOutcome {
    Event(UsageEvent),
    Irrelevant,
    Malformed,
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    #[serde(default, alias = "_topic")]
    topic: Option<String>,
    #[serde(default, alias = "_timestamp")]
    timestamp: Option<RawTimestamp>,
    #[serde(default)]
    function: Option<RawFunction>,
    #[serde(default)]
    identifier: Option<String>,
    #[serde(default, rename = "udfPath")]
    udf_path: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default, alias = "executionTimeMs")]
    execution_time_ms: Option<f64>,
    #[serde(default)]
    usage: Option<RawUsage>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Number(f64),
    Text(String),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawFunction {
    Path(String),
    Detailed {
        #[serde(default)]
        path: Option<String>,
        #[serde(default, rename = "type")]
        kind: Option<String>,
    },
}

#[derive(Debug, Default, Deserialize)]
struct RawUsage {
    #[serde(default, alias = "databaseReadBytes", deserialize_with = "byte_count")]
    database_read_bytes: u64,
    #[serde(default, alias = "databaseWriteBytes", deserialize_with = "byte_count")]
    database_write_bytes: u64,
    #[serde(default, alias = "fileReadBytes", deserialize_with = "byte_count")]
    file_read_bytes: u64,
    #[serde(default, alias = "fileWriteBytes", deserialize_with = "byte_count")]
    file_write_bytes: u64,
    #[serde(default, alias = "vectorReadBytes", deserialize_with = "byte_count")]
    vector_read_bytes: u64,
    #[serde(default, alias = "vectorWriteBytes", deserialize_with = "byte_count")]
    vector_write_bytes: u64,
}

/// Byte counts arrive as integers, or as whole-valued floats (`2048.0`)
/// from some exporters. Fractions, negatives and strings are rejected.
fn byte_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Count {
        Int(u64),
        Float(f64),
    }

    match Count::deserialize(deserializer)? {
        Count::Int(n) => Ok(n),
        Count::Float(f)
            if f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f < u64::MAX as f64 =>
        {
            Ok(f as u64)
        }
        Count::Float(f) => Err(serde::de::Error::custom(format!(
            "invalid byte count {}",
            f
        ))),
    }
}

impl RawTimestamp {
    fn to_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            RawTimestamp::Number(n) => {
                if !n.is_finite() {
                    return None;
                }
                let millis = if n.abs() < SECONDS_THRESHOLD {
                    n * 1000.0
                } else {
                    *n
                };
                DateTime::from_timestamp_millis(millis as i64)
            }
            RawTimestamp::Text(s) => DateTime::parse_from_rfc3339(s.trim())
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
        }
    }
}

impl RawEvent {
    fn function_path(&self) -> Option<(String, Option<String>)> {
        let (path, kind) = match &self.function {
            Some(RawFunction::Path(p)) => (Some(p.as_str()), None),
            Some(RawFunction::Detailed { path, kind }) => (path.as_deref(), kind.as_deref()),
            None => (None, None),
        };

        path.or(self.identifier.as_deref())
            .or(self.udf_path.as_deref())
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(|p| (p.to_string(), kind.map(str::to_string)))
    }
}

/// Classify and parse one input line
pub fn parse_line(line: &str) -> LineOutcome {
    let line = line.trim();
    if line.is_empty() {
        return LineOutcome::Irrelevant;
    }

    let raw: RawEvent = match serde_json::from_str(line) {
        Ok(raw) => raw,
        Err(_) => return LineOutcome::Malformed,
    };

    if let Some(topic) = raw.topic.as_deref() {
        if !EXECUTION_TOPICS.contains(&topic) {
            return LineOutcome::Irrelevant;
        }
    }

    let Some((function, kind)) = raw.function_path() else {
        return LineOutcome::Irrelevant;
    };

    let Some(timestamp) = raw.timestamp.as_ref().and_then(RawTimestamp::to_datetime) else {
        return LineOutcome::Malformed;
    };

    let execution_ms = match raw.execution_time_ms {
        Some(ms) if ms.is_finite() && ms >= 0.0 => ms,
        Some(_) => return LineOutcome::Malformed,
        None => 0.0,
    };

    let u = raw.usage.unwrap_or_default();
    let failed = raw
        .status
        .as_deref()
        .map(|s| s.eq_ignore_ascii_case("failure") || s.eq_ignore_ascii_case("error"))
        .unwrap_or(false);

    LineOutcome::Event(UsageEvent {
        timestamp,
        function,
        kind,
        usage: FunctionUsage {
            calls: 1,
            failures: u64::from(failed),
            database_read_bytes: u.database_read_bytes,
            database_write_bytes: u.database_write_bytes,
            file_read_bytes: u.file_read_bytes,
            file_write_bytes: u.file_write_bytes,
            vector_read_bytes: u.vector_read_bytes,
            vector_write_bytes: u.vector_write_bytes,
            execution_ms,
        },
    })
}
