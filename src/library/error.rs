use std::path::PathBuf;

use thiserror::Error;

/// Failure to enumerate the library or to produce upload bytes for a photo.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Photo library not found at {0}")]
    LibraryNotFound(PathBuf),

    #[error("Photo {id} no longer exists at {path}")]
    NotFound { id: String, path: PathBuf },

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Photo {0} is empty")]
    Empty(String),

    #[error("Photo {0} is neither JPEG nor PNG")]
    UnsupportedFormat(String),

    #[error("Failed to scan photo library: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Failed to spawn blocking task: {0}")]
    Spawn(#[from] tokio::task::JoinError),
}
