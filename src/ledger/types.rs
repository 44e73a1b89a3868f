//! Types for the upload ledger.

/// One uploaded photo: the local identifier and the id Gyazo assigned to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    /// Identifier assigned by the photo library.
    pub local_identifier: String,
    /// `image_id` returned by the upload endpoint. Empty for identifier-only
    /// records.
    pub remote_id: String,
}

impl LedgerEntry {
    pub fn new(local_identifier: impl Into<String>, remote_id: impl Into<String>) -> Self {
        Self {
            local_identifier: local_identifier.into(),
            remote_id: remote_id.into(),
        }
    }
}

/// Whether newly appended entries keep their remote id. Records already in
/// the ledger are rewritten as they were read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordFormat {
    /// `local_identifier,remote_id` per line.
    #[default]
    WithRemoteId,
    /// `local_identifier` per line.
    IdentifierOnly,
}

impl RecordFormat {
    pub fn from_record_remote_id(record_remote_id: bool) -> Self {
        if record_remote_id {
            Self::WithRemoteId
        } else {
            Self::IdentifierOnly
        }
    }
}
