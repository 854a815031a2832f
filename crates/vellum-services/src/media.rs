//! Deletion and archival of media trees
//!
//! Deletion never fails past a single item: problems are logged and reported as `false`.
//! The only error `delete` returns is a version mismatch, which callers must be able to
//! tell apart so they can refresh and retry. Archive propagation is the opposite: every
//! item is saved on its own and the first failure is returned, leaving the already
//! changed items in the accumulator.

use futures::future::{BoxFuture, FutureExt};
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;
use vellum_core::models::{AccessLevel, Media, MediaKind, Principal};
use vellum_core::{AppError, MediaEvent, MediaEventPublisher};
use vellum_db::{MediaInclude, MediaRepository, UnitOfWork};

use crate::access::AccessControlService;
use crate::file_mover::FileMover;

#[derive(Clone)]
pub struct MediaService {
    repository: Arc<dyn MediaRepository>,
    unit_of_work: Arc<dyn UnitOfWork>,
    access_control: Arc<dyn AccessControlService>,
    file_mover: Arc<dyn FileMover>,
    events: Arc<dyn MediaEventPublisher>,
    /// Global switch; per-call enforcement only applies when this is on
    access_control_enabled: bool,
}

impl MediaService {
    pub fn new(
        repository: Arc<dyn MediaRepository>,
        unit_of_work: Arc<dyn UnitOfWork>,
        access_control: Arc<dyn AccessControlService>,
        file_mover: Arc<dyn FileMover>,
        events: Arc<dyn MediaEventPublisher>,
        access_control_enabled: bool,
    ) -> Self {
        Self {
            repository,
            unit_of_work,
            access_control,
            file_mover,
            events,
            access_control_enabled,
        }
    }

    /// Delete a media item and, for folders, its whole subtree.
    ///
    /// Returns `Ok(true)` when the item is gone (including when it never existed) and
    /// `Ok(false)` when any part of the deletion failed. A non-zero `expected_version`
    /// that differs from the stored version fails with `AppError::ConcurrencyConflict`
    /// before anything is touched.
    #[tracing::instrument(skip(self, principal), fields(media.id = %id, principal = %principal.name))]
    pub async fn delete(
        &self,
        id: Uuid,
        expected_version: Option<i32>,
        enforce_security: bool,
        principal: &Principal,
    ) -> Result<bool, AppError> {
        let media = match self.repository.find(id, MediaInclude::NONE).await {
            Ok(Some(media)) => media,
            Ok(None) => {
                tracing::debug!(media_id = %id, "Media already deleted");
                return Ok(true);
            }
            Err(e) => {
                tracing::error!(media_id = %id, error = %e, "Failed to load media for deletion");
                return Ok(false);
            }
        };

        check_version(&media, expected_version)?;

        let deleted = match &media.kind {
            MediaKind::File(_) => self.delete_file(&media, enforce_security, principal).await,
            MediaKind::Folder => {
                let mut visited = HashSet::new();
                self.delete_folder(&media, enforce_security, principal, &mut visited)
                    .await
            }
            MediaKind::Unknown { discriminator } => {
                tracing::warn!(
                    media_id = %media.id,
                    kind = %discriminator,
                    "Unknown media type, deleting record and dependents only"
                );
                self.delete_unknown(&media).await
            }
        };

        Ok(deleted)
    }

    async fn delete_file(&self, file: &Media, enforce_security: bool, principal: &Principal) -> bool {
        match self.trash_file_versions(file, enforce_security, principal).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(media_id = %file.id, error = %e, "Failed to delete media file");
                false
            }
        }
    }

    async fn trash_file_versions(
        &self,
        file: &Media,
        enforce_security: bool,
        principal: &Principal,
    ) -> Result<(), AppError> {
        let versions = self
            .repository
            .find_versions(file.id, MediaInclude::ALL)
            .await?;

        let Some(primary) = versions
            .iter()
            .find(|v| v.id == file.id)
            .or_else(|| versions.first())
        else {
            tracing::debug!(media_id = %file.id, "No file versions left to delete");
            return Ok(());
        };

        if enforce_security && self.access_control_enabled {
            self.access_control
                .demand_access(primary, principal, AccessLevel::ReadWrite)
                .await?;
        }

        self.file_mover.move_to_trash(&versions).await?;

        tracing::info!(
            media_id = %file.id,
            versions = versions.len(),
            "Media file moved to trash"
        );
        self.events.publish(MediaEvent::FileDeleted(primary.clone()));
        Ok(())
    }

    /// Children first, then the folder's own records in one transaction. The first child
    /// that cannot be deleted aborts the folder; siblings after it are never attempted.
    fn delete_folder<'a>(
        &'a self,
        folder: &'a Media,
        enforce_security: bool,
        principal: &'a Principal,
        visited: &'a mut HashSet<Uuid>,
    ) -> BoxFuture<'a, bool> {
        async move {
            if !visited.insert(folder.id) {
                tracing::error!(folder_id = %folder.id, "Folder reached twice, hierarchy contains a cycle");
                return false;
            }

            let children = match self.repository.find_children(folder.id).await {
                Ok(children) => children,
                Err(e) => {
                    tracing::error!(folder_id = %folder.id, error = %e, "Failed to load folder children");
                    return false;
                }
            };

            for child in &children {
                let deleted = match &child.kind {
                    MediaKind::File(_) => self.delete_file(child, enforce_security, principal).await,
                    MediaKind::Folder => {
                        // A version of an earlier sibling goes with that sibling's records
                        match self.repository.find(child.id, MediaInclude::NONE).await {
                            Ok(Some(_)) => {
                                self.delete_folder(child, enforce_security, principal, visited)
                                    .await
                            }
                            Ok(None) => {
                                tracing::debug!(media_id = %child.id, "Child folder already deleted");
                                continue;
                            }
                            Err(e) => {
                                tracing::error!(media_id = %child.id, error = %e, "Failed to reload child folder");
                                false
                            }
                        }
                    }
                    MediaKind::Unknown { discriminator } => {
                        tracing::warn!(
                            media_id = %child.id,
                            kind = %discriminator,
                            "Unknown media type in folder"
                        );
                        self.delete_unknown(child).await
                    }
                };

                if !deleted {
                    tracing::warn!(
                        folder_id = %folder.id,
                        child_id = %child.id,
                        "Child deletion failed, aborting folder deletion"
                    );
                    return false;
                }
            }

            match self.delete_folder_records(folder).await {
                Ok(()) => {
                    tracing::info!(folder_id = %folder.id, "Media folder deleted");
                    self.events.publish(MediaEvent::FolderDeleted(folder.clone()));
                    true
                }
                Err(e) => {
                    tracing::error!(folder_id = %folder.id, error = %e, "Failed to delete media folder");
                    false
                }
            }
        }
        .boxed()
    }

    async fn delete_folder_records(&self, folder: &Media) -> Result<(), AppError> {
        // Read before begin: the transaction may hold the pool's last connection
        let versions = self
            .repository
            .find_versions(folder.id, MediaInclude::DEPENDENTS)
            .await?;

        let mut tx = self.unit_of_work.begin().await?;
        for version in &versions {
            for tag in &version.tags {
                tx.delete_tag(tag).await?;
            }
            for category in &version.categories {
                tx.delete_category(category).await?;
            }
            tx.delete_media(version).await?;
        }

        tx.commit().await
    }

    async fn delete_unknown(&self, media: &Media) -> bool {
        match self.delete_record_with_dependents(media.id).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(media_id = %media.id, error = %e, "Failed to delete media record");
                false
            }
        }
    }

    async fn delete_record_with_dependents(&self, id: Uuid) -> Result<(), AppError> {
        let Some(media) = self.repository.find(id, MediaInclude::ALL).await? else {
            return Ok(());
        };

        let mut tx = self.unit_of_work.begin().await?;
        for tag in &media.tags {
            tx.delete_tag(tag).await?;
        }
        for category in &media.categories {
            tx.delete_category(category).await?;
        }
        for rule in &media.access_rules {
            tx.delete_access_rule(rule).await?;
        }
        tx.delete_media(&media).await?;
        tx.commit().await
    }

    /// Archive every descendant of `media`, appending each item that changed to `changed`
    pub async fn archive_sub_medias(
        &self,
        media: &Media,
        changed: &mut Vec<Media>,
    ) -> Result<(), AppError> {
        let mut visited = HashSet::from([media.id]);
        self.propagate_archive_flag(media.id, true, changed, &mut visited)
            .await
    }

    /// Unarchive every descendant of `media`, appending each item that changed to `changed`
    pub async fn unarchive_sub_medias(
        &self,
        media: &Media,
        changed: &mut Vec<Media>,
    ) -> Result<(), AppError> {
        let mut visited = HashSet::from([media.id]);
        self.propagate_archive_flag(media.id, false, changed, &mut visited)
            .await
    }

    fn propagate_archive_flag<'a>(
        &'a self,
        parent_id: Uuid,
        archived: bool,
        changed: &'a mut Vec<Media>,
        visited: &'a mut HashSet<Uuid>,
    ) -> BoxFuture<'a, Result<(), AppError>> {
        async move {
            let children = self.repository.find_children(parent_id).await?;

            for mut child in children {
                if !visited.insert(child.id) {
                    tracing::warn!(media_id = %child.id, "Media visited twice, skipping");
                    continue;
                }

                if child.is_archived != archived {
                    child.is_archived = archived;
                    let saved = self.repository.save(&child).await?;
                    changed.push(saved);
                }

                // Unchanged children still have descendants to visit
                self.propagate_archive_flag(child.id, archived, changed, visited)
                    .await?;
            }

            Ok(())
        }
        .boxed()
    }

    /// Archive a media item and its descendants, returning every item that changed, root first
    #[tracing::instrument(skip(self, principal), fields(media.id = %id))]
    pub async fn archive_media(
        &self,
        id: Uuid,
        expected_version: Option<i32>,
        enforce_security: bool,
        principal: &Principal,
    ) -> Result<Vec<Media>, AppError> {
        self.set_archived(id, true, expected_version, enforce_security, principal)
            .await
    }

    /// Unarchive a media item and its descendants, returning every item that changed, root first
    #[tracing::instrument(skip(self, principal), fields(media.id = %id))]
    pub async fn unarchive_media(
        &self,
        id: Uuid,
        expected_version: Option<i32>,
        enforce_security: bool,
        principal: &Principal,
    ) -> Result<Vec<Media>, AppError> {
        self.set_archived(id, false, expected_version, enforce_security, principal)
            .await
    }

    async fn set_archived(
        &self,
        id: Uuid,
        archived: bool,
        expected_version: Option<i32>,
        enforce_security: bool,
        principal: &Principal,
    ) -> Result<Vec<Media>, AppError> {
        let mut media = self
            .repository
            .find(id, MediaInclude::ALL)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Media {} not found", id)))?;

        check_version(&media, expected_version)?;

        if enforce_security && self.access_control_enabled {
            self.access_control
                .demand_access(&media, principal, AccessLevel::ReadWrite)
                .await?;
        }

        let mut changed = Vec::new();
        if media.is_archived != archived {
            media.is_archived = archived;
            media = self.repository.save(&media).await?;
            changed.push(media.clone());
        }

        let result = if archived {
            self.archive_sub_medias(&media, &mut changed).await
        } else {
            self.unarchive_sub_medias(&media, &mut changed).await
        };

        // Saved items stay saved even when propagation stopped early
        for item in &changed {
            let event = if archived {
                MediaEvent::MediaArchived(item.clone())
            } else {
                MediaEvent::MediaUnarchived(item.clone())
            };
            self.events.publish(event);
        }
        result?;

        tracing::info!(
            media_id = %id,
            archived,
            changed = changed.len(),
            "Archive flag propagated"
        );
        Ok(changed)
    }
}

fn check_version(media: &Media, expected_version: Option<i32>) -> Result<(), AppError> {
    match expected_version {
        Some(expected) if expected > 0 && expected != media.version => {
            Err(AppError::ConcurrencyConflict {
                entity: "media",
                id: media.id,
                expected,
                actual: media.version,
            })
        }
        _ => Ok(()),
    }
}
