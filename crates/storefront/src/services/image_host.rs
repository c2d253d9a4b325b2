//! Image CDN uploads.
//!
//! The CDN accepts unsigned uploads restricted by an upload preset, so the
//! storefront never holds an API secret for it. Uploads go through the
//! [`ImageHost`] trait; [`CloudinaryClient`] is the production
//! implementation and tests substitute an in-memory host.

use std::future::Future;

use futures::future::join_all;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use thiserror::Error;
use tracing::instrument;

use crate::config::CloudinaryConfig;

/// Errors that can occur when uploading to the image CDN.
#[derive(Debug, Error)]
pub enum ImageHostError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// CDN refused the upload.
    #[error("Upload rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// Upload succeeded but the response had no delivery URL.
    #[error("Upload response missing secure_url")]
    MissingUrl,
}

/// A file ready to be uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub content_type: String,
}

/// Something that stores images and hands back a public URL.
pub trait ImageHost: Send + Sync {
    /// Upload one image and return its delivery URL.
    fn upload(&self, file: UploadFile) -> impl Future<Output = Result<String, ImageHostError>> + Send;
}

/// Upload every file concurrently and collect each outcome separately.
///
/// There is no concurrency cap and one failure never cancels the others;
/// the result vector lines up with the input order.
pub async fn upload_all<H: ImageHost>(
    host: &H,
    files: Vec<UploadFile>,
) -> Vec<Result<String, ImageHostError>> {
    join_all(files.into_iter().map(|file| host.upload(file))).await
}

// =============================================================================
// CloudinaryClient
// =============================================================================

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UploadErrorBody {
    error: UploadErrorDetail,
}

#[derive(Debug, Deserialize)]
struct UploadErrorDetail {
    message: String,
}

/// Unsigned-upload client for the image CDN.
#[derive(Clone)]
pub struct CloudinaryClient {
    client: reqwest::Client,
    upload_url: String,
    upload_preset: String,
}

impl CloudinaryClient {
    /// Create a new upload client.
    #[must_use]
    pub fn new(config: &CloudinaryConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .unwrap_or_default();

        Self {
            client,
            upload_url: config.upload_url(),
            upload_preset: config.upload_preset.clone(),
        }
    }
}

impl ImageHost for CloudinaryClient {
    #[instrument(skip_all, fields(filename = %file.filename, size = file.bytes.len()))]
    async fn upload(&self, file: UploadFile) -> Result<String, ImageHostError> {
        let part = Part::bytes(file.bytes)
            .file_name(file.filename)
            .mime_str(&file.content_type)?;
        let form = Form::new()
            .part("file", part)
            .text("upload_preset", self.upload_preset.clone());

        let response = self
            .client
            .post(&self.upload_url)
            .multipart(form)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<UploadErrorBody>(&body)
                .map_or_else(|_| status.to_string(), |b| b.error.message);
            tracing::warn!(status = %status, message = %message, "Image upload rejected");
            return Err(ImageHostError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str::<UploadResponse>(&body)
            .ok()
            .and_then(|r| r.secure_url)
            .filter(|url| !url.is_empty())
            .ok_or(ImageHostError::MissingUrl)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// In-memory host that fails for filenames listed in `failing`.
    #[derive(Default)]
    pub(crate) struct FakeHost {
        pub calls: AtomicUsize,
        pub failing: Vec<String>,
        pub uploaded: Mutex<Vec<String>>,
    }

    impl ImageHost for FakeHost {
        async fn upload(&self, file: UploadFile) -> Result<String, ImageHostError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.contains(&file.filename) {
                return Err(ImageHostError::Rejected {
                    status: 400,
                    message: "bad image".to_string(),
                });
            }
            if let Ok(mut uploaded) = self.uploaded.lock() {
                uploaded.push(file.filename.clone());
            }
            Ok(format!(
                "https://res.cloudinary.com/pgcards/image/upload/{}",
                file.filename
            ))
        }
    }

    pub(crate) fn file(name: &str) -> UploadFile {
        UploadFile {
            bytes: vec![1, 2, 3],
            filename: name.to_string(),
            content_type: "image/jpeg".to_string(),
        }
    }

    #[tokio::test]
    async fn test_upload_all_settles_each_file() {
        let host = FakeHost {
            failing: vec!["b.jpg".to_string()],
            ..FakeHost::default()
        };

        let results = upload_all(&host, vec![file("a.jpg"), file("b.jpg"), file("c.jpg")]).await;

        assert_eq!(host.calls.load(Ordering::SeqCst), 3);
        assert_eq!(results.len(), 3);
        assert!(results[0].as_ref().is_ok_and(|u| u.ends_with("/a.jpg")));
        assert!(results[1].is_err());
        assert!(results[2].as_ref().is_ok_and(|u| u.ends_with("/c.jpg")));
    }

    #[tokio::test]
    async fn test_upload_all_empty() {
        let host = FakeHost::default();
        assert!(upload_all(&host, Vec::new()).await.is_empty());
        assert_eq!(host.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_client_targets_unsigned_endpoint() {
        let client = CloudinaryClient::new(&CloudinaryConfig {
            cloud_name: "pgcards".to_string(),
            upload_preset: "unsigned_cards".to_string(),
        });
        assert_eq!(
            client.upload_url,
            "https://api.cloudinary.com/v1_1/pgcards/image/upload"
        );
        assert_eq!(client.upload_preset, "unsigned_cards");
    }
}
