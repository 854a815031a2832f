//! Shared key generation for storage backends.

use uuid::Uuid;

/// Storage key for the trashed copy of `storage_key`.
///
/// Produces `{trash_prefix}/{media_id}/{storage_key}`, so versions of different media
/// never collide inside the trash even when they shared a file name.
pub fn trash_key(trash_prefix: &str, media_id: Uuid, storage_key: &str) -> String {
    format!(
        "{}/{}/{}",
        trash_prefix.trim_end_matches('/'),
        media_id,
        storage_key.trim_start_matches('/')
    )
}
