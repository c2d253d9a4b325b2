//! Session-held models for the storefront.
//!
//! Backend records live in [`crate::backend::types`] and profile records in
//! [`crate::profile`]; this module holds what the storefront itself keeps
//! per visitor.

pub mod session;

pub use session::{CurrentUser, Flash, FlashKind, Preferences, keys as session_keys};
