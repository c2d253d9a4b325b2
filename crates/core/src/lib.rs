//! PG Cards Core - Shared types library.
//!
//! This crate provides common types used across all PG Cards components:
//! - `storefront` - Marketing site, shop, checkout wizard, admin panel
//! - `cli` - Offline tools for QR codes, vCards and profile previews
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O and no HTTP
//! clients. The REST backend owns persistence; these types describe the
//! identifiers and enums exchanged with it.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, prices, emails, themes and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
