//! Data models for the application
//!
//! Media items (files, folders and their dependent records), access rules and
//! publishable content.

mod access;
mod content;
mod media;

pub use access::*;
pub use content::*;
pub use media::*;
