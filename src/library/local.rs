use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Local, Utc};
use walkdir::WalkDir;

use super::error::FetchError;
use super::{ImageFormat, LocalPhotoRef, PhotoData, PhotoSource};
use crate::ledger::format::is_valid_identifier;

/// A directory tree of JPEG/PNG files.
///
/// Photo identifiers are paths relative to the root with `/` separators, so
/// they stay stable when the library is moved. Enumeration is depth-first in
/// file-name order.
#[derive(Debug, Clone)]
pub struct DirectoryLibrary {
    root: PathBuf,
}

impl DirectoryLibrary {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, photo: &LocalPhotoRef) -> PathBuf {
        photo
            .id
            .split('/')
            .fold(self.root.clone(), |path, part| path.join(part))
    }
}

/// Relative path with `/` separators, or `None` if it is not valid UTF-8.
fn identifier_for(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Option<Vec<&str>> = relative.components().map(|c| c.as_os_str().to_str()).collect();
    Some(parts?.join("/"))
}

fn is_hidden(entry: &walkdir::DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with('.'))
}

/// Blocking scan of `root`, run on the blocking pool.
fn scan(root: &Path) -> Result<Vec<LocalPhotoRef>, FetchError> {
    let mut photos = Vec::new();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_hidden(e));

    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let is_image = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(ImageFormat::from_extension)
            .is_some();
        if !is_image {
            continue;
        }

        let id = match identifier_for(root, path) {
            Some(id) if is_valid_identifier(&id) => id,
            _ => {
                tracing::warn!(
                    "Skipping {}: path cannot be recorded in the ledger",
                    path.display()
                );
                continue;
            }
        };

        let metadata = match super::exif::read_metadata(path) {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!("Failed to read EXIF from {}: {}", path.display(), e);
                Default::default()
            }
        };

        let created_at = metadata
            .taken_at
            .and_then(|naive| naive.and_local_timezone(Local).earliest())
            .map(|local| local.with_timezone(&Utc))
            .or_else(|| {
                entry
                    .metadata()
                    .ok()
                    .and_then(|m| m.modified().ok())
                    .map(DateTime::<Utc>::from)
            });

        photos.push(LocalPhotoRef {
            id,
            created_at,
            location: metadata.location,
        });
    }

    Ok(photos)
}

#[async_trait]
impl PhotoSource for DirectoryLibrary {
    async fn list_photos(&self) -> Result<Vec<LocalPhotoRef>, FetchError> {
        if !tokio::fs::try_exists(&self.root).await.unwrap_or(false) {
            return Err(FetchError::LibraryNotFound(self.root.clone()));
        }
        let root = self.root.clone();
        let photos = tokio::task::spawn_blocking(move || scan(&root)).await??;
        tracing::debug!(
            root = %self.root.display(),
            count = photos.len(),
            "Scanned photo library"
        );
        Ok(photos)
    }

    async fn fetch_bytes(&self, photo: &LocalPhotoRef) -> Result<PhotoData, FetchError> {
        let path = self.path_for(photo);
        let bytes = match tokio::fs::read(&path).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(FetchError::NotFound {
                    id: photo.id.clone(),
                    path,
                });
            }
            Err(source) => return Err(FetchError::Io { path, source }),
        };

        if bytes.is_empty() {
            return Err(FetchError::Empty(photo.id.clone()));
        }
        let format = ImageFormat::sniff(&bytes)
            .ok_or_else(|| FetchError::UnsupportedFormat(photo.id.clone()))?;
        let file_name = photo
            .id
            .rsplit('/')
            .next()
            .unwrap_or(photo.id.as_str())
            .to_string();

        Ok(PhotoData {
            bytes,
            file_name,
            format,
        })
    }
}
