//! Upload ledger: the durable record of which local photos were uploaded.
//!
//! The ledger is the only source of truth for "has this photo been uploaded".
//! It is loaded once at startup, mutated only through [`Ledger::append`], and
//! rewritten in full after every append so a crash loses at most the photo
//! that was in flight.

pub mod error;
pub mod format;
pub mod store;
pub mod types;

use std::collections::HashSet;

pub use error::LedgerError;
pub use store::{FileLedgerStore, LedgerStore};
pub use types::{LedgerEntry, RecordFormat};

/// Ordered upload record with an identifier set mirrored for O(1) lookups.
pub struct Ledger {
    entries: Vec<LedgerEntry>,
    identifiers: HashSet<String>,
    format: RecordFormat,
    store: Box<dyn LedgerStore>,
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("location", &self.store.location())
            .field("entries", &self.entries.len())
            .field("format", &self.format)
            .finish_non_exhaustive()
    }
}

impl Ledger {
    /// Load the ledger from `store`.
    ///
    /// A missing or blank record yields an empty ledger. A record that exists
    /// but cannot be read fails with [`LedgerError::Read`], and one that is not
    /// valid UTF-8 with [`LedgerError::Decoding`].
    pub async fn load(
        store: Box<dyn LedgerStore>,
        format: RecordFormat,
    ) -> Result<Self, LedgerError> {
        let location = store.location().to_path_buf();
        let bytes = store.read().await.map_err(|source| LedgerError::Read {
            path: location.clone(),
            source,
        })?;

        let entries = match bytes {
            None => {
                tracing::debug!(path = %location.display(), "No ledger yet, starting empty");
                Vec::new()
            }
            Some(bytes) => {
                let text = String::from_utf8(bytes).map_err(|source| LedgerError::Decoding {
                    path: location.clone(),
                    source,
                })?;
                format::parse(&text)
            }
        };

        let mut ledger = Self {
            entries: Vec::with_capacity(entries.len()),
            identifiers: HashSet::with_capacity(entries.len()),
            format,
            store,
        };
        for entry in entries {
            if ledger.identifiers.contains(&entry.local_identifier) {
                tracing::warn!(
                    id = %entry.local_identifier,
                    "Duplicate ledger record, keeping the first one"
                );
                continue;
            }
            ledger.identifiers.insert(entry.local_identifier.clone());
            ledger.entries.push(entry);
        }

        tracing::debug!(
            path = %location.display(),
            count = ledger.entries.len(),
            "Ledger loaded"
        );
        Ok(ledger)
    }

    /// Identifiers of every uploaded photo.
    pub fn identifiers(&self) -> &HashSet<String> {
        &self.identifiers
    }

    /// Entries in upload order.
    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, local_identifier: &str) -> bool {
        self.identifiers.contains(local_identifier)
    }

    /// Remote id recorded for `local_identifier`, if any.
    pub fn remote_id(&self, local_identifier: &str) -> Option<&str> {
        if !self.contains(local_identifier) {
            return None;
        }
        self.entries
            .iter()
            .find(|e| e.local_identifier == local_identifier)
            .map(|e| e.remote_id.as_str())
    }

    pub fn location(&self) -> &std::path::Path {
        self.store.location()
    }

    /// Record one upload and persist the whole ledger.
    ///
    /// Returns the new entry count once the write is durable. If the write
    /// fails the entry is removed again before [`LedgerError::Persist`] is
    /// returned, so it is never observable without being on disk.
    pub async fn append(
        &mut self,
        local_identifier: &str,
        remote_id: &str,
    ) -> Result<usize, LedgerError> {
        if !format::is_valid_identifier(local_identifier) {
            return Err(LedgerError::InvalidIdentifier(local_identifier.to_string()));
        }
        if self.identifiers.contains(local_identifier) {
            tracing::warn!(
                id = %local_identifier,
                "Refusing to record a photo that is already in the ledger"
            );
            return Err(LedgerError::DuplicateIdentifier(
                local_identifier.to_string(),
            ));
        }

        let remote_id = match self.format {
            RecordFormat::WithRemoteId => remote_id,
            RecordFormat::IdentifierOnly => "",
        };
        self.entries
            .push(LedgerEntry::new(local_identifier, remote_id));
        self.identifiers.insert(local_identifier.to_string());

        let contents = format::serialize(&self.entries);
        if let Err(source) = self.store.write(contents.as_bytes()).await {
            self.entries.pop();
            self.identifiers.remove(local_identifier);
            return Err(LedgerError::Persist {
                path: self.store.location().to_path_buf(),
                source,
            });
        }

        Ok(self.entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::store::MemoryLedgerStore;
    use super::*;
    use std::sync::Arc;

    async fn ledger_with(store: &Arc<MemoryLedgerStore>) -> Ledger {
        Ledger::load(
            Box::new(store.clone()),
            RecordFormat::WithRemoteId,
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_load_absent_is_empty() {
        let store = Arc::new(MemoryLedgerStore::default());
        let ledger = ledger_with(&store).await;
        assert!(ledger.is_empty());
        assert!(ledger.identifiers().is_empty());
    }

    #[tokio::test]
    async fn test_load_blank_is_empty() {
        let store = Arc::new(MemoryLedgerStore::with_contents("\n\n"));
        let ledger = ledger_with(&store).await;
        assert!(ledger.is_empty());
    }

    #[tokio::test]
    async fn test_load_invalid_utf8_is_decoding_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("identifiers.csv");
        std::fs::write(&path, [0x61, 0x2c, 0xff, 0xfe, 0x0a]).unwrap();
        let store = FileLedgerStore::open(&path).await.unwrap();
        let result = Ledger::load(Box::new(store), RecordFormat::WithRemoteId).await;
        assert!(matches!(result, Err(LedgerError::Decoding { .. })));
    }

    #[tokio::test]
    async fn test_load_keeps_first_duplicate() {
        let store = Arc::new(MemoryLedgerStore::with_contents("a,x\nb,y\na,z\n"));
        let ledger = ledger_with(&store).await;
        assert_eq!(
            ledger.entries(),
            &[LedgerEntry::new("a", "x"), LedgerEntry::new("b", "y")]
        );
        assert_eq!(ledger.remote_id("a"), Some("x"));
    }

    #[tokio::test]
    async fn test_append_persists_full_ledger() {
        let store = Arc::new(MemoryLedgerStore::default());
        let mut ledger = ledger_with(&store).await;
        assert_eq!(ledger.append("a", "x").await.unwrap(), 1);
        assert_eq!(ledger.append("b", "y").await.unwrap(), 2);
        assert_eq!(store.contents().as_deref(), Some("a,x\nb,y\n"));
        assert_eq!(store.write_count(), 2);
    }

    #[tokio::test]
    async fn test_round_trip_preserves_order() {
        let store = Arc::new(MemoryLedgerStore::default());
        {
            let mut ledger = ledger_with(&store).await;
            ledger.append("a", "x").await.unwrap();
            ledger.append("b", "y").await.unwrap();
        }
        let reloaded = ledger_with(&store).await;
        assert_eq!(
            reloaded.entries(),
            &[LedgerEntry::new("a", "x"), LedgerEntry::new("b", "y")]
        );
    }

    #[tokio::test]
    async fn test_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("identifiers.csv");
        {
            let store = FileLedgerStore::open(&path).await.unwrap();
            let mut ledger = Ledger::load(Box::new(store), RecordFormat::WithRemoteId)
                .await
                .unwrap();
            ledger.append("a", "x").await.unwrap();
            ledger.append("b", "y").await.unwrap();
        }
        let store = FileLedgerStore::open(&path).await.unwrap();
        let ledger = Ledger::load(Box::new(store), RecordFormat::WithRemoteId)
            .await
            .unwrap();
        assert_eq!(
            ledger.entries(),
            &[LedgerEntry::new("a", "x"), LedgerEntry::new("b", "y")]
        );
    }

    #[tokio::test]
    async fn test_failed_persist_rolls_back() {
        let store = Arc::new(MemoryLedgerStore::default());
        let mut ledger = ledger_with(&store).await;
        ledger.append("a", "x").await.unwrap();

        store.set_fail_writes(true);
        let err = ledger.append("b", "y").await.unwrap_err();
        assert!(matches!(err, LedgerError::Persist { .. }));
        assert!(!ledger.contains("b"));
        assert!(!ledger.identifiers().contains("b"));
        assert_eq!(ledger.len(), 1);
        assert_eq!(store.contents().as_deref(), Some("a,x\n"));

        store.set_fail_writes(false);
        assert_eq!(ledger.append("b", "y").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_append_rejected() {
        let store = Arc::new(MemoryLedgerStore::default());
        let mut ledger = ledger_with(&store).await;
        ledger.append("a", "x").await.unwrap();
        let err = ledger.append("a", "other").await.unwrap_err();
        assert!(matches!(err, LedgerError::DuplicateIdentifier(ref id) if id == "a"));
        assert_eq!(ledger.entries(), &[LedgerEntry::new("a", "x")]);
        assert_eq!(store.write_count(), 1);
    }

    #[tokio::test]
    async fn test_identifiers_never_repeat() {
        let store = Arc::new(MemoryLedgerStore::default());
        let mut ledger = ledger_with(&store).await;
        for id in ["a", "b", "a", "c", "b", "a"] {
            let _ = ledger.append(id, "r").await;
        }
        let ids: Vec<&str> = ledger
            .entries()
            .iter()
            .map(|e| e.local_identifier.as_str())
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(ledger.identifiers().len(), 3);
    }

    #[tokio::test]
    async fn test_invalid_identifier_rejected() {
        let store = Arc::new(MemoryLedgerStore::default());
        let mut ledger = ledger_with(&store).await;
        let err = ledger.append("a,b.jpg", "x").await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidIdentifier(_)));
        assert!(ledger.is_empty());
    }

    #[tokio::test]
    async fn test_identifier_only_format() {
        let store = Arc::new(MemoryLedgerStore::default());
        let mut ledger = Ledger::load(
            Box::new(store.clone()),
            RecordFormat::IdentifierOnly,
        )
        .await
        .unwrap();
        ledger.append("a", "x").await.unwrap();
        ledger.append("b", "y").await.unwrap();
        assert_eq!(store.contents().as_deref(), Some("a\nb\n"));

        let reloaded = ledger_with(&store).await;
        assert!(reloaded.contains("a"));
        assert_eq!(reloaded.remote_id("b"), Some(""));
    }

    #[tokio::test]
    async fn test_identifier_only_keeps_recorded_remote_ids() {
        let store = Arc::new(MemoryLedgerStore::with_contents("a,x\nb,y\n"));
        let mut ledger = Ledger::load(
            Box::new(store.clone()),
            RecordFormat::IdentifierOnly,
        )
        .await
        .unwrap();
        ledger.append("c", "z").await.unwrap();
        assert_eq!(store.contents().as_deref(), Some("a,x\nb,y\nc\n"));
        assert_eq!(ledger.remote_id("a"), Some("x"));
        assert_eq!(ledger.remote_id("c"), Some(""));
    }

    #[tokio::test]
    async fn test_mixed_ledger_rewritten_as_is() {
        let store = Arc::new(MemoryLedgerStore::with_contents("a\nb,y\n"));
        let mut ledger = ledger_with(&store).await;
        ledger.append("c", "z").await.unwrap();
        assert_eq!(store.contents().as_deref(), Some("a\nb,y\nc,z\n"));
    }

    #[tokio::test]
    async fn test_load_skips_records_without_identifier() {
        let store = Arc::new(MemoryLedgerStore::with_contents(",x\na,y\n"));
        let ledger = ledger_with(&store).await;
        assert_eq!(ledger.entries(), &[LedgerEntry::new("a", "y")]);
    }

    #[tokio::test]
    async fn test_load_unreadable_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("identifiers.csv");
        std::fs::create_dir(&path).unwrap();
        let store = FileLedgerStore::open(&path).await.unwrap();
        let result = Ledger::load(Box::new(store), RecordFormat::WithRemoteId).await;
        assert!(matches!(result, Err(LedgerError::Read { .. })));
    }
}
