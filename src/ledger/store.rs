//! Durable storage backends for the ledger.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use fs4::fs_std::FileExt;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::error::LedgerError;

/// Where the ledger bytes live.
///
/// `write` replaces the whole record; a successful return means the bytes
/// are durable.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Read the full record. `Ok(None)` means it does not exist yet.
    async fn read(&self) -> io::Result<Option<Vec<u8>>>;

    /// Replace the full record.
    async fn write(&self, contents: &[u8]) -> io::Result<()>;

    /// Human-readable location for logs and errors.
    fn location(&self) -> &Path;
}

#[async_trait]
impl<T: LedgerStore + ?Sized> LedgerStore for std::sync::Arc<T> {
    async fn read(&self) -> io::Result<Option<Vec<u8>>> {
        (**self).read().await
    }

    async fn write(&self, contents: &[u8]) -> io::Result<()> {
        (**self).write(contents).await
    }

    fn location(&self) -> &Path {
        (**self).location()
    }
}

/// Plain-text file store.
///
/// Holds an exclusive advisory lock on `<file>.lock` for its lifetime so two
/// uploader processes never write the same ledger.
pub struct FileLedgerStore {
    path: PathBuf,
    lock_file: std::fs::File,
}

impl std::fmt::Debug for FileLedgerStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileLedgerStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl FileLedgerStore {
    /// Open the store, creating the parent directory and taking the lock.
    /// The ledger file itself is not created until the first write.
    pub async fn open(path: &Path) -> Result<Self, LedgerError> {
        let path = path.to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|source| LedgerError::Persist {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        let lock_path = sibling(&path, "lock");
        let lock_file = tokio::task::spawn_blocking({
            let lock_path = lock_path.clone();
            move || {
                let file = std::fs::File::create(&lock_path).map_err(|source| {
                    LedgerError::Persist {
                        path: lock_path.clone(),
                        source,
                    }
                })?;
                file.try_lock_exclusive()
                    .map_err(|_| LedgerError::Locked(lock_path.clone()))?;
                Ok::<std::fs::File, LedgerError>(file)
            }
        })
        .await??;

        tracing::debug!(path = %path.display(), "Ledger lock acquired");
        Ok(Self { path, lock_file })
    }
}

impl Drop for FileLedgerStore {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.lock_file) {
            tracing::debug!(error = %e, "Failed to release ledger lock");
        }
    }
}

#[async_trait]
impl LedgerStore for FileLedgerStore {
    async fn read(&self) -> io::Result<Option<Vec<u8>>> {
        match fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Write to `<file>.tmp`, fsync, then rename over the ledger so a crash
    /// leaves either the old or the new file, never a truncated one.
    async fn write(&self, contents: &[u8]) -> io::Result<()> {
        let tmp_path = sibling(&self.path, "tmp");
        let result = async {
            let mut file = fs::File::create(&tmp_path).await?;
            file.write_all(contents).await?;
            file.sync_all().await?;
            drop(file);
            fs::rename(&tmp_path, &self.path).await
        }
        .await;

        if result.is_err() {
            let _ = fs::remove_file(&tmp_path).await;
        }
        result
    }

    fn location(&self) -> &Path {
        &self.path
    }
}

/// `identifiers.csv` -> `identifiers.csv.<suffix>`
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}

/// In-memory store for tests. Writes can be made to fail on demand.
#[cfg(test)]
#[derive(Default)]
pub(crate) struct MemoryLedgerStore {
    contents: std::sync::Mutex<Option<Vec<u8>>>,
    fail_writes: std::sync::atomic::AtomicBool,
    writes: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl MemoryLedgerStore {
    pub(crate) fn with_contents(contents: &str) -> Self {
        let store = Self::default();
        *store.contents.lock().unwrap() = Some(contents.as_bytes().to_vec());
        store
    }

    pub(crate) fn set_fail_writes(&self, fail: bool) {
        self.fail_writes
            .store(fail, std::sync::atomic::Ordering::SeqCst);
    }

    pub(crate) fn contents(&self) -> Option<String> {
        self.contents
            .lock()
            .unwrap()
            .as_ref()
            .map(|b| String::from_utf8_lossy(b).into_owned())
    }

    pub(crate) fn write_count(&self) -> usize {
        self.writes.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn read(&self) -> io::Result<Option<Vec<u8>>> {
        Ok(self.contents.lock().unwrap().clone())
    }

    async fn write(&self, contents: &[u8]) -> io::Result<()> {
        if self.fail_writes.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(io::Error::other("disk full"));
        }
        *self.contents.lock().unwrap() = Some(contents.to_vec());
        self.writes.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(())
    }

    fn location(&self) -> &Path {
        Path::new(":memory:")
    }
}
