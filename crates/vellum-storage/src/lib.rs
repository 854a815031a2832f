//! Vellum Storage Library
//!
//! Storage abstraction for the content backing media files, with a local filesystem
//! implementation.
//!
//! # Storage key format
//!
//! Keys are relative paths such as `media/logo.png`. Trashed content lives under a
//! configurable prefix: `{trash_prefix}/{media_id}/{original_key}`. Keys must not contain
//! `..` or a leading `/`.

pub mod keys;
pub mod local;
pub mod traits;

// Re-export commonly used types
pub use keys::trash_key;
pub use local::LocalStorage;
pub use traits::{Storage, StorageError, StorageResult};
