//! Log aggregation error types

use thiserror::Error;

/// Errors that can occur while reading logs or writing a report
#[derive(Error, Debug)]
pub enum LogsError {
    /// Reading input or writing output failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON report serialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// CSV report output failed
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Unknown report format name
    #[error("Unknown report format: {0} (expected table, json or csv)")]
    UnknownFormat(String),
}

impl LogsError {
    /// Whether this error means the reader of our output went away
    pub fn is_broken_pipe(&self) -> bool {
        match self {
            LogsError::Io(e) => e.kind() == std::io::ErrorKind::BrokenPipe,
            LogsError::Csv(e) => matches!(
                e.kind(),
                csv::ErrorKind::Io(io) if io.kind() == std::io::ErrorKind::BrokenPipe
            ),
            LogsError::Serialization(e) => {
                e.io_error_kind() == Some(std::io::ErrorKind::BrokenPipe)
            }
            _ => false,
        }
    }
}

/// Result type alias for log operations
pub type LogsResult<T> = Result<T, LogsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LogsError::UnknownFormat("xml".to_string());
        assert_eq!(
            err.to_string(),
            "Unknown report format: xml (expected table, json or csv)"
        );
    }

    #[test]
    fn test_broken_pipe_detection() {
        let err: LogsError =
            std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed").into();
        assert!(err.is_broken_pipe());

        let err: LogsError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(!err.is_broken_pipe());
    }

    #[test]
    fn test_broken_pipe_inside_csv_and_json_errors() {
        let pipe = || std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");

        let err: LogsError = csv::Error::from(pipe()).into();
        assert!(err.is_broken_pipe());

        let err: LogsError = serde_json::Error::io(pipe()).into();
        assert!(err.is_broken_pipe());

        let err: LogsError = serde_json::from_str::<u64>("nope").unwrap_err().into();
        assert!(!err.is_broken_pipe());
        assert!(!LogsError::UnknownFormat("xml".to_string()).is_broken_pipe());
    }
}
