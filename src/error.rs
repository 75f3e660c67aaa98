//! Error taxonomy for the monitoring pipeline.
//!
//! Only [`ScanError`] and [`StoreError`] abort a cycle. Embedding and
//! generation failures are not errors: they surface as [`Degradation`]
//! values on the cycle outcome.

use std::path::PathBuf;

use thiserror::Error;

/// The watched tree could not be scanned. No snapshot is produced.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The scan root does not exist.
    #[error("scan root {} does not exist", .0.display())]
    MissingRoot(PathBuf),
    /// The scan root exists but is not a directory.
    #[error("scan root {} is not a directory", .0.display())]
    NotADirectory(PathBuf),
    /// A directory inside the walk could not be read.
    #[error("failed to read {}: {message}", path.display())]
    Unreadable {
        /// Directory that failed.
        path: PathBuf,
        /// Underlying error text.
        message: String,
    },
}

/// The persisted history could not be read or written.
#[derive(Debug, Error)]
pub enum StoreError {
    /// SQLite reported an error.
    #[error("snapshot store error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// The store file's directory could not be created.
    #[error("failed to prepare store directory: {0}")]
    Io(#[from] std::io::Error),
    /// A row could not be decoded back into an entry.
    #[error("corrupt history entry {id}: {message}")]
    Corrupt {
        /// Row identifier.
        id: i64,
        /// What failed to decode.
        message: String,
    },
    /// The requested entry does not exist.
    #[error("history entry {0} not found")]
    NotFound(i64),
    /// A report was already attached to the entry.
    #[error("history entry {0} already has a report")]
    ReportExists(i64),
}

/// Failure of a whole monitoring cycle.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// Scanning failed.
    #[error(transparent)]
    Scan(#[from] ScanError),
    /// Persisting or querying history failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// A previous cycle is still running.
    #[error("a scan cycle is already in flight")]
    CycleInFlight,
}

/// A non-fatal fallback taken during a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Degradation {
    /// Embedding failed; no neighbors were retrieved.
    Retrieval(String),
    /// Text generation failed; the narrative is the deterministic fallback.
    Generation(String),
}

impl std::fmt::Display for Degradation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Retrieval(reason) => write!(f, "retrieval degraded: {reason}"),
            Self::Generation(reason) => write!(f, "generation degraded: {reason}"),
        }
    }
}
