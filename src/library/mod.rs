//! Photo library: where photos to upload come from.
//!
//! The uploader only needs two things from a library: an ordered list of
//! photo references and a way to turn one reference into uploadable bytes.
//! [`PhotoSource`] captures that; [`local::DirectoryLibrary`] implements it
//! over a directory tree of JPEG and PNG files.

pub mod error;
pub mod exif;
pub mod local;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use error::FetchError;
pub use local::DirectoryLibrary;

/// Latitude/longitude in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoLocation {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoLocation {
    /// `"lat,lon"` with six decimals, sent as the upload description.
    pub fn describe(&self) -> String {
        format!("{:.6},{:.6}", self.latitude, self.longitude)
    }
}

/// A photo as the library knows it. Immutable once listed.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalPhotoRef {
    /// Stable library identifier, the ledger key.
    pub id: String,
    pub created_at: Option<DateTime<Utc>>,
    pub location: Option<GeoLocation>,
}

impl LocalPhotoRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            created_at: None,
            location: None,
        }
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    pub fn with_location(mut self, location: GeoLocation) -> Self {
        self.location = Some(location);
        self
    }
}

/// Image encodings the upload endpoint accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
}

impl ImageFormat {
    /// Detect the encoding from magic bytes.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n";
        if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(Self::Jpeg)
        } else if bytes.starts_with(PNG_MAGIC) {
            Some(Self::Png)
        } else {
            None
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
        }
    }

    /// Whether a file extension looks like an uploadable image.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            _ => None,
        }
    }
}

/// Bytes ready for upload, with what the multipart file part needs.
#[derive(Debug, Clone)]
pub struct PhotoData {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub format: ImageFormat,
}

/// A library of photos that can be listed and read.
#[async_trait]
pub trait PhotoSource: Send + Sync {
    /// All photos in library enumeration order.
    async fn list_photos(&self) -> Result<Vec<LocalPhotoRef>, FetchError>;

    /// Bytes for one photo. A photo that disappeared since listing is an
    /// error, never a panic.
    async fn fetch_bytes(&self, photo: &LocalPhotoRef) -> Result<PhotoData, FetchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniff_jpeg_and_png() {
        assert_eq!(
            ImageFormat::sniff(&[0xFF, 0xD8, 0xFF, 0xE0, 0x00]),
            Some(ImageFormat::Jpeg)
        );
        assert_eq!(
            ImageFormat::sniff(b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR"),
            Some(ImageFormat::Png)
        );
        assert_eq!(ImageFormat::sniff(b"GIF89a"), None);
        assert_eq!(ImageFormat::sniff(&[]), None);
    }

    #[test]
    fn test_extension_case_insensitive() {
        assert_eq!(ImageFormat::from_extension("JPG"), Some(ImageFormat::Jpeg));
        assert_eq!(ImageFormat::from_extension("jpeg"), Some(ImageFormat::Jpeg));
        assert_eq!(ImageFormat::from_extension("Png"), Some(ImageFormat::Png));
        assert_eq!(ImageFormat::from_extension("heic"), None);
    }

    #[test]
    fn test_location_description() {
        let loc = GeoLocation {
            latitude: 35.681236,
            longitude: 139.767125,
        };
        assert_eq!(loc.describe(), "35.681236,139.767125");
    }

    #[test]
    fn test_photo_ref_builders() {
        let created = DateTime::from_timestamp(1_650_000_000, 0).unwrap();
        let photo = LocalPhotoRef::new("a.jpg").with_created_at(created);
        assert_eq!(photo.created_at, Some(created));
        assert!(photo.location.is_none());
    }
}
