//! Gyazo upload endpoint client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;

use super::error::UploadError;
use crate::library::{LocalPhotoRef, PhotoData};

pub const DEFAULT_ENDPOINT: &str = "https://upload.gyazo.com/api/upload";

/// Value of the `app` form field, shown as the source app on Gyazo.
const APP_NAME: &str = "gyazo-uploader";

/// Longest response body kept in an error message.
const MAX_ERROR_BODY: usize = 512;

/// Sends one photo to the image host and returns its remote id.
#[async_trait]
pub trait Uploader: Send + Sync {
    async fn send(&self, data: &PhotoData, photo: &LocalPhotoRef) -> Result<String, UploadError>;
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    image_id: Option<String>,
    permalink_url: Option<String>,
}

/// Multipart client for `POST /api/upload`.
#[derive(Clone)]
pub struct GyazoClient {
    client: Client,
    endpoint: String,
    access_token: String,
}

impl std::fmt::Debug for GyazoClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GyazoClient")
            .field("endpoint", &self.endpoint)
            .field("access_token", &"<redacted>")
            .finish_non_exhaustive()
    }
}

impl GyazoClient {
    /// `timeout` bounds each whole request; hitting it is an ordinary
    /// transport error.
    pub fn new(
        endpoint: impl Into<String>,
        access_token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("gyazo-uploader/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            access_token: access_token.into(),
        })
    }

    fn build_form(&self, data: &PhotoData, photo: &LocalPhotoRef) -> Result<Form, UploadError> {
        let mut form = Form::new()
            .text("access_token", self.access_token.clone())
            .text("app", APP_NAME);
        for (name, value) in metadata_fields(photo) {
            form = form.text(name, value);
        }
        let part = Part::bytes(data.bytes.clone())
            .file_name(data.file_name.clone())
            .mime_str(data.format.mime_type())
            .map_err(|source| UploadError::Http {
                id: photo.id.clone(),
                source,
            })?;
        Ok(form.part("imagedata", part))
    }
}

/// Optional text fields derived from photo metadata.
fn metadata_fields(photo: &LocalPhotoRef) -> Vec<(&'static str, String)> {
    let mut fields = Vec::new();
    if let Some(created) = photo.created_at {
        fields.push(("created_at", created.timestamp().to_string()));
    }
    if let Some(location) = photo.location {
        fields.push(("desc", location.describe()));
    }
    fields
}

/// Interpret a response from the upload endpoint.
fn parse_response(id: &str, status: u16, body: &str) -> Result<String, UploadError> {
    if !(200..300).contains(&status) {
        let mut body = body.trim().to_string();
        if body.len() > MAX_ERROR_BODY {
            let mut cut = MAX_ERROR_BODY;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            body.truncate(cut);
        }
        return Err(UploadError::HttpStatus {
            id: id.to_string(),
            status,
            body,
        });
    }

    let response: UploadResponse =
        serde_json::from_str(body).map_err(|e| UploadError::InvalidResponse {
            id: id.to_string(),
            reason: e.to_string(),
        })?;

    match response.image_id.filter(|s| !s.is_empty()) {
        Some(image_id) => {
            if let Some(url) = &response.permalink_url {
                tracing::debug!(id = %id, url = %url, "Upload accepted");
            }
            Ok(image_id)
        }
        None => Err(UploadError::MissingImageId { id: id.to_string() }),
    }
}

#[async_trait]
impl Uploader for GyazoClient {
    async fn send(&self, data: &PhotoData, photo: &LocalPhotoRef) -> Result<String, UploadError> {
        let form = self.build_form(data, photo)?;
        tracing::debug!(
            id = %photo.id,
            size_bytes = data.bytes.len(),
            "uploading",
        );

        let http_err = |source| UploadError::Http {
            id: photo.id.clone(),
            source,
        };
        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(http_err)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(http_err)?;

        parse_response(&photo.id, status, &body)
    }
}
