//! Hooks for observers of media changes
//!
//! Services announce completed deletions and archive flag changes through an injected
//! `MediaEventPublisher`, so cache invalidation or audit logging can subscribe without
//! the services depending on them.

use crate::models::Media;

/// Notification raised after a media mutation has completed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaEvent {
    /// A file and all its stored versions were moved to trash; carries the primary version
    FileDeleted(Media),
    /// A folder's own records were deleted after its subtree was removed
    FolderDeleted(Media),
    MediaArchived(Media),
    MediaUnarchived(Media),
}

impl MediaEvent {
    pub fn media(&self) -> &Media {
        match self {
            MediaEvent::FileDeleted(m)
            | MediaEvent::FolderDeleted(m)
            | MediaEvent::MediaArchived(m)
            | MediaEvent::MediaUnarchived(m) => m,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            MediaEvent::FileDeleted(_) => "media_file_deleted",
            MediaEvent::FolderDeleted(_) => "media_folder_deleted",
            MediaEvent::MediaArchived(_) => "media_archived",
            MediaEvent::MediaUnarchived(_) => "media_unarchived",
        }
    }
}

/// Fire-and-forget publisher of media events.
///
/// Implementations must not block and must not fail the mutation that raised the event.
pub trait MediaEventPublisher: Send + Sync {
    fn publish(&self, event: MediaEvent);
}

/// No-op implementation for when nobody observes media events
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpEventPublisher;

impl MediaEventPublisher for NoOpEventPublisher {
    fn publish(&self, _event: MediaEvent) {}
}
