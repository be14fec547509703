use std::{io, path::PathBuf};

/// Every failure the library reports. Malformed input rows are not errors;
/// they are skipped by the index and only logged.
#[derive(Debug, thiserror::Error)]
pub enum TrialError {
    /// Nothing to parse. The load attempt failed but can be retried with new input.
    #[error("input text is empty")]
    EmptyInput,

    #[error("column `{column}` not found in header")]
    ColumnNotFound { column: String },

    #[error("no trial {trial} for participant {participant}")]
    KeyNotFound { participant: i64, trial: i64 },

    #[error("no trial table loaded")]
    NoTableLoaded,

    /// The writer was used before `initialize` succeeded.
    #[error("output writer is not initialized")]
    NotInitialized,

    #[error("existing file {path:?} has header {found:?}, expected {expected:?}")]
    HeaderMismatch {
        path: PathBuf,
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("writing {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("reading {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("config {path:?}: {reason}")]
    Config { path: PathBuf, reason: String },
}

pub type Result<T> = std::result::Result<T, TrialError>;
