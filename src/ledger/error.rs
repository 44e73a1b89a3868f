//! Error types for the upload ledger.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading or persisting the ledger.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// The ledger file exists but is not valid UTF-8 text.
    #[error("Ledger at {path} is not valid UTF-8: {source}")]
    Decoding {
        path: PathBuf,
        source: std::string::FromUtf8Error,
    },

    /// The ledger file exists but could not be read.
    #[error("Failed to read ledger at {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The durable write failed; the in-memory append was rolled back.
    #[error("Failed to persist ledger to {path}: {source}")]
    Persist {
        path: PathBuf,
        source: std::io::Error,
    },

    /// An identifier that is already recorded was appended again.
    #[error("Photo {0} is already recorded in the ledger")]
    DuplicateIdentifier(String),

    /// The identifier cannot be represented in the line-based record format.
    #[error("Photo identifier {0:?} contains a comma or line break")]
    InvalidIdentifier(String),

    /// Another process holds the ledger lock.
    #[error("Another gyazo-uploader instance is using this ledger (lock: {0})")]
    Locked(PathBuf),

    /// Failed to spawn a blocking task.
    #[error("Failed to spawn blocking task: {0}")]
    Spawn(#[from] tokio::task::JoinError),
}
