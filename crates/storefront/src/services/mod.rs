//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `image_host` - Unsigned uploads to the image CDN
//! - `image_crop` - Server-side crop and re-encode per image target
//! - `pending_uploads` - Retained bytes for uploads that failed
//! - `profile_images` - Image URL resolution (with retries) at save time
//! - `profile_sync` - Ordered, version-stamped profile writes

pub mod image_crop;
pub mod image_host;
pub mod pending_uploads;
pub mod profile_images;
pub mod profile_sync;

pub use image_crop::{CropRect, CropTarget, ImageError, crop_image};
pub use image_host::{CloudinaryClient, ImageHost, ImageHostError, UploadFile, upload_all};
pub use pending_uploads::{ImageSlot, PendingUploads};
pub use profile_images::resolve_images;
pub use profile_sync::{ProfileWriteQueue, WriteOutcome, WriteTicket};
