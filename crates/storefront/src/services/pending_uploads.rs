//! Cropped images whose upload failed, kept for a retry at save time.
//!
//! Entries are keyed by the wizard's upload key plus the image slot and
//! expire after 30 minutes, so an abandoned wizard leaves nothing behind.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;

use super::image_host::UploadFile;

/// Which image on the profile a pending upload belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageSlot {
    ProfilePicture,
    Cover,
    Carousel(usize),
}

impl ImageSlot {
    fn key(self, upload_key: &str) -> String {
        match self {
            Self::ProfilePicture => format!("{upload_key}:profile_picture"),
            Self::Cover => format!("{upload_key}:cover_image"),
            Self::Carousel(index) => format!("{upload_key}:carousel:{index}"),
        }
    }
}

/// TTL cache of upload bytes awaiting a retry.
#[derive(Clone)]
pub struct PendingUploads {
    cache: Cache<String, Arc<UploadFile>>,
}

impl Default for PendingUploads {
    fn default() -> Self {
        Self::new(Duration::from_secs(30 * 60))
    }
}

impl PendingUploads {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(1_000)
                .time_to_live(ttl)
                .build(),
        }
    }

    /// Keep a file for a later retry.
    pub async fn retain(&self, upload_key: &str, slot: ImageSlot, file: UploadFile) {
        self.cache.insert(slot.key(upload_key), Arc::new(file)).await;
    }

    /// The retained file for a slot, if any.
    pub async fn get(&self, upload_key: &str, slot: ImageSlot) -> Option<Arc<UploadFile>> {
        self.cache.get(&slot.key(upload_key)).await
    }

    /// Forget a slot once it has uploaded.
    pub async fn clear(&self, upload_key: &str, slot: ImageSlot) {
        self.cache.invalidate(&slot.key(upload_key)).await;
    }

    /// Carousel slots retained for a wizard, in index order.
    pub async fn carousel(&self, upload_key: &str) -> Vec<(usize, Arc<UploadFile>)> {
        self.cache.run_pending_tasks().await;
        let prefix = format!("{upload_key}:carousel:");
        let mut entries: Vec<(usize, Arc<UploadFile>)> = self
            .cache
            .iter()
            .filter_map(|(key, file)| {
                key.strip_prefix(&prefix)
                    .and_then(|i| i.parse().ok())
                    .map(|i| (i, file))
            })
            .collect();
        entries.sort_by_key(|(i, _)| *i);
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::image_host::tests::file;

    #[tokio::test]
    async fn test_retain_and_clear() {
        let pending = PendingUploads::default();
        pending
            .retain("wiz1", ImageSlot::ProfilePicture, file("me.png"))
            .await;

        let kept = pending.get("wiz1", ImageSlot::ProfilePicture).await;
        assert_eq!(kept.map(|f| f.filename.clone()).as_deref(), Some("me.png"));
        assert!(pending.get("wiz2", ImageSlot::ProfilePicture).await.is_none());

        pending.clear("wiz1", ImageSlot::ProfilePicture).await;
        assert!(pending.get("wiz1", ImageSlot::ProfilePicture).await.is_none());
    }

    #[tokio::test]
    async fn test_carousel_sorted_by_index() {
        let pending = PendingUploads::default();
        pending.retain("w", ImageSlot::Carousel(2), file("c.jpg")).await;
        pending.retain("w", ImageSlot::Carousel(0), file("a.jpg")).await;
        pending.retain("other", ImageSlot::Carousel(1), file("x.jpg")).await;

        let names: Vec<_> = pending
            .carousel("w")
            .await
            .into_iter()
            .map(|(i, f)| (i, f.filename.clone()))
            .collect();
        assert_eq!(names, vec![(0, "a.jpg".to_string()), (2, "c.jpg".to_string())]);
    }

    #[tokio::test]
    async fn test_entries_expire() {
        let pending = PendingUploads::new(Duration::from_millis(20));
        pending.retain("w", ImageSlot::Cover, file("cover.jpg")).await;
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(pending.get("w", ImageSlot::Cover).await.is_none());
    }
}
