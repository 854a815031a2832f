//! Vellum Services
//!
//! Business operations over media trees and publishable content: recursive deletion with
//! trash moves, archive flag propagation, access checks and content status transitions.

pub mod access;
pub mod content;
pub mod events;
pub mod file_mover;
pub mod media;

pub use access::{AccessControlService, RuleAccessControl};
pub use content::{ContentService, DefaultContentService};
pub use events::BroadcastEventPublisher;
pub use file_mover::{FileMover, TrashFileMover};
pub use media::MediaService;
