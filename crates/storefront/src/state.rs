//! Application state shared across handlers.

use std::sync::Arc;

use crate::backend::BackendClient;
use crate::config::StorefrontConfig;
use crate::content::ContentStore;
use crate::services::{CloudinaryClient, PendingUploads, ProfileWriteQueue};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// backend client, the image CDN client and the in-process coordination
/// structures (write queue, pending uploads).
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    backend: BackendClient,
    images: CloudinaryClient,
    pending_uploads: PendingUploads,
    profile_writes: ProfileWriteQueue,
    content: ContentStore,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(config: StorefrontConfig, content: ContentStore) -> Self {
        let backend = BackendClient::new(&config.api);
        let images = CloudinaryClient::new(&config.cloudinary);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                backend,
                images,
                pending_uploads: PendingUploads::default(),
                profile_writes: ProfileWriteQueue::new(),
                content,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the REST backend client.
    #[must_use]
    pub fn backend(&self) -> &BackendClient {
        &self.inner.backend
    }

    /// Get a reference to the image CDN client.
    #[must_use]
    pub fn images(&self) -> &CloudinaryClient {
        &self.inner.images
    }

    /// Cropped images awaiting an upload retry.
    #[must_use]
    pub fn pending_uploads(&self) -> &PendingUploads {
        &self.inner.pending_uploads
    }

    /// Per-profile write serialiser.
    #[must_use]
    pub fn profile_writes(&self) -> &ProfileWriteQueue {
        &self.inner.profile_writes
    }

    /// Loaded blog posts.
    #[must_use]
    pub fn content(&self) -> &ContentStore {
        &self.inner.content
    }
}
