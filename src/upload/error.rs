use thiserror::Error;

use crate::ledger::LedgerError;
use crate::library::FetchError;

/// Typed upload errors enabling retry classification.
///
/// Timeouts surface as [`UploadError::Http`] like any other transport
/// failure.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("HTTP error uploading {id}: {source}")]
    Http { id: String, source: reqwest::Error },

    #[error("Upload of {id} rejected with HTTP {status}: {body}")]
    HttpStatus { id: String, status: u16, body: String },

    #[error("Invalid upload response for {id}: {reason}")]
    InvalidResponse { id: String, reason: String },

    #[error("Upload response for {id} has no image_id")]
    MissingImageId { id: String },
}

impl UploadError {
    /// Whether this error is transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            UploadError::Http { .. } => true,
            UploadError::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            UploadError::InvalidResponse { .. } => false,
            UploadError::MissingImageId { .. } => false,
        }
    }
}

/// Why a single photo in a batch was not uploaded.
#[derive(Debug, Error)]
pub enum ItemError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Upload(#[from] UploadError),

    /// Uploaded, but the ledger could not record it.
    #[error("Uploaded but not recorded: {0}")]
    Persist(#[from] LedgerError),
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("An upload batch is already running")]
    Busy,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(status: u16) -> UploadError {
        UploadError::HttpStatus {
            id: "x".into(),
            status,
            body: String::new(),
        }
    }

    #[test]
    fn test_client_errors_not_retryable() {
        for code in [400, 401, 403, 404, 413] {
            assert!(!status(code).is_retryable(), "{} should not retry", code);
        }
    }

    #[test]
    fn test_rate_limit_and_server_errors_retryable() {
        for code in [429, 500, 502, 503] {
            assert!(status(code).is_retryable(), "{} should retry", code);
        }
    }

    #[test]
    fn test_bad_response_not_retryable() {
        assert!(!UploadError::MissingImageId { id: "x".into() }.is_retryable());
        assert!(!UploadError::InvalidResponse {
            id: "x".into(),
            reason: "not json".into()
        }
        .is_retryable());
    }

    #[test]
    fn test_http_connection_error_retryable() {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let err = rt
            .block_on(reqwest::Client::new().get("http://127.0.0.1:1").send())
            .unwrap_err();
        let e = UploadError::Http {
            id: "x".into(),
            source: err,
        };
        assert!(e.is_retryable());
    }
}
