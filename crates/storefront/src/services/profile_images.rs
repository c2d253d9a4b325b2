//! Image URLs for a profile save.
//!
//! Uploads normally happen as soon as the visitor crops an image. When one
//! failed, its bytes were retained in [`PendingUploads`]; saving the profile
//! retries them here. A retry that fails again degrades to an empty URL so
//! the save itself never blocks on the CDN.

use super::image_host::{ImageHost, UploadFile, upload_all};
use super::pending_uploads::{ImageSlot, PendingUploads};
use crate::profile::{ProfileForm, ResolvedImages};

/// Resolve the final image URLs for a save.
pub async fn resolve_images<H: ImageHost>(
    host: &H,
    pending: &PendingUploads,
    upload_key: &str,
    form: &ProfileForm,
) -> ResolvedImages {
    let profile_picture = retry_single(
        host,
        pending,
        upload_key,
        ImageSlot::ProfilePicture,
        &form.profile_picture,
    )
    .await;
    let cover_image =
        retry_single(host, pending, upload_key, ImageSlot::Cover, &form.cover_image).await;

    let mut carousel_images: Vec<String> = form
        .carousel_images
        .iter()
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty())
        .collect();

    let retained = pending.carousel(upload_key).await;
    if !retained.is_empty() {
        let files: Vec<UploadFile> = retained.iter().map(|(_, f)| UploadFile::clone(f)).collect();
        let results = upload_all(host, files).await;
        for ((index, _), result) in retained.into_iter().zip(results) {
            match result {
                Ok(url) => {
                    pending.clear(upload_key, ImageSlot::Carousel(index)).await;
                    carousel_images.push(url);
                }
                Err(e) => {
                    tracing::warn!(error = %e, index, "Carousel image retry failed, dropping it");
                }
            }
        }
    }

    ResolvedImages {
        profile_picture,
        cover_image,
        carousel_images,
    }
}

async fn retry_single<H: ImageHost>(
    host: &H,
    pending: &PendingUploads,
    upload_key: &str,
    slot: ImageSlot,
    current: &str,
) -> String {
    let Some(file) = pending.get(upload_key, slot).await else {
        return current.trim().to_string();
    };

    match host.upload(UploadFile::clone(&file)).await {
        Ok(url) => {
            pending.clear(upload_key, slot).await;
            url
        }
        Err(e) => {
            tracing::warn!(error = %e, ?slot, "Image retry failed, saving without it");
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::services::image_host::tests::{FakeHost, file};

    #[tokio::test]
    async fn test_no_pending_keeps_form_urls() {
        let host = FakeHost::default();
        let pending = PendingUploads::default();
        let form = ProfileForm {
            profile_picture: " https://cdn/p.png ".to_string(),
            carousel_images: vec!["https://cdn/1.jpg".to_string(), String::new()],
            ..ProfileForm::default()
        };

        let images = resolve_images(&host, &pending, "w", &form).await;
        assert_eq!(images.profile_picture, "https://cdn/p.png");
        assert_eq!(images.cover_image, "");
        assert_eq!(images.carousel_images, vec!["https://cdn/1.jpg".to_string()]);
        assert_eq!(host.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_retry_success_and_failure() {
        let host = FakeHost {
            failing: vec!["cover.jpg".to_string()],
            ..FakeHost::default()
        };
        let pending = PendingUploads::default();
        pending.retain("w", ImageSlot::ProfilePicture, file("me.png")).await;
        pending.retain("w", ImageSlot::Cover, file("cover.jpg")).await;

        let images = resolve_images(&host, &pending, "w", &ProfileForm::default()).await;

        assert!(images.profile_picture.ends_with("/me.png"));
        assert_eq!(images.cover_image, "");
        assert!(pending.get("w", ImageSlot::ProfilePicture).await.is_none());
        assert!(pending.get("w", ImageSlot::Cover).await.is_some());
    }

    #[tokio::test]
    async fn test_carousel_retries_settle_independently() {
        let host = FakeHost {
            failing: vec!["c1.jpg".to_string()],
            ..FakeHost::default()
        };
        let pending = PendingUploads::default();
        for (i, name) in ["c0.jpg", "c1.jpg", "c2.jpg"].into_iter().enumerate() {
            pending.retain("w", ImageSlot::Carousel(i), file(name)).await;
        }

        let images = resolve_images(&host, &pending, "w", &ProfileForm::default()).await;

        assert_eq!(host.calls.load(Ordering::SeqCst), 3);
        assert_eq!(images.carousel_images.len(), 2);
        assert!(images.carousel_images[0].ends_with("/c0.jpg"));
        assert!(images.carousel_images[1].ends_with("/c2.jpg"));
    }
}
