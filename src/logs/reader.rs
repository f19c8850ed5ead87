//! Input streaming
//!
//! Reads NDJSON line by line into an [`Aggregator`] until end of input or
//! until the shutdown future resolves. An interrupted read is not an error:
//! whatever was aggregated so far is still reported.

use super::aggregate::Aggregator;
use super::error::LogsResult;
use std::future::Future;
use std::path::Path;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

/// How a read pass ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOutcome {
    /// Lines consumed from the input
    pub lines: u64,
    /// True when the shutdown signal cut the read short
    pub interrupted: bool,
}

/// Boxed line source: stdin or a file
pub type LineSource = Box<dyn AsyncBufRead + Unpin + Send>;

/// Open a file, or standard input when no path is given
pub async fn open_input(path: Option<&Path>) -> LogsResult<LineSource> {
    match path {
        Some(path) => {
            let file = tokio::fs::File::open(path).await?;
            tracing::debug!(path = %path.display(), "Reading logs from file");
            Ok(Box::new(BufReader::new(file)))
        }
        None => {
            tracing::debug!("Reading logs from standard input");
            Ok(Box::new(BufReader::new(tokio::io::stdin())))
        }
    }
}

/// Resolves on Ctrl+C; never resolves if the handler cannot be installed
pub async fn interrupt_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Interrupt received, reporting what was read so far"),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    }
}

/// Stream every line of `reader` into `aggregator`
pub async fn read_into<R, F>(
    mut reader: R,
    aggregator: &mut Aggregator,
    shutdown: F,
) -> LogsResult<ReadOutcome>
where
    R: AsyncBufRead + Unpin,
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    let mut buf = Vec::with_capacity(4096);
    let mut lines = 0u64;

    loop {
        buf.clear();

        let read = tokio::select! {
            biased;
            _ = &mut shutdown => {
                // The reader is dropped here; errors from closing it don't matter
                return Ok(ReadOutcome { lines, interrupted: true });
            }
            read = reader.read_until(b'\n', &mut buf) => read,
        };

        match read {
            Ok(0) => break,
            Ok(_) => {
                lines += 1;
                match std::str::from_utf8(&buf) {
                    Ok(line) => {
                        aggregator.ingest_line(line);
                    }
                    Err(_) => aggregator.ingest_undecodable(),
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }

    tracing::debug!(lines, "Reached end of input");
    Ok(ReadOutcome {
        lines,
        interrupted: false,
    })
}
