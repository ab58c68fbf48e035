use std::path::PathBuf;

/// Errors surfaced by the fleet simulator.
///
/// Every variant here is fatal per the process's error-handling policy:
/// there is no retry and no partial-state cleanup. `main` prints the
/// `Display` text and exits non-zero.
#[derive(Debug, thiserror::Error)]
pub enum SlowionError {
    #[error("invalid option: {0}")]
    InvalidOption(String),

    #[error("output directory {0} already exists")]
    OutputDirExists(PathBuf),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("signal container error: {0}")]
    Container(String),

    #[error("malformed intermediate file {path}: {reason}")]
    Intermediate { path: PathBuf, reason: String },

    #[error("invariant violated: {0}")]
    Invariant(String),

    #[error("worker thread panicked: {0}")]
    WorkerPanic(String),
}

impl SlowionError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SlowionError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, SlowionError>;
