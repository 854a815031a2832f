use async_trait::async_trait;
use std::sync::Arc;
use vellum_core::models::Media;
use vellum_core::AppError;
use vellum_db::UnitOfWork;
use vellum_storage::{trash_key, Storage};

/// Moves the backing content of file versions out of the live media area
#[async_trait]
pub trait FileMover: Send + Sync {
    /// Move every given version to trash. The caller supplies already-loaded records.
    async fn move_to_trash(&self, versions: &[Media]) -> Result<(), AppError>;
}

/// Renames stored objects under the trash prefix and hides their records.
///
/// Records are kept as history with their trash key, so a restore tool can bring them back.
/// Objects are renamed back when the records cannot be marked.
#[derive(Clone)]
pub struct TrashFileMover {
    storage: Arc<dyn Storage>,
    unit_of_work: Arc<dyn UnitOfWork>,
    trash_prefix: String,
}

impl TrashFileMover {
    pub fn new(
        storage: Arc<dyn Storage>,
        unit_of_work: Arc<dyn UnitOfWork>,
        trash_prefix: impl Into<String>,
    ) -> Self {
        Self {
            storage,
            unit_of_work,
            trash_prefix: trash_prefix.into(),
        }
    }

    /// Rename each stored object, recording `(from, to)` in `renamed` as it goes
    async fn move_objects<'a>(
        &self,
        versions: &'a [Media],
        renamed: &mut Vec<(String, String)>,
    ) -> Result<Vec<(&'a Media, Option<String>)>, AppError> {
        let mut records = Vec::with_capacity(versions.len());

        for media in versions {
            let Some(file) = media.as_file() else {
                tracing::debug!(media_id = %media.id, "Skipping non-file version");
                continue;
            };

            let trashed_key = match file.storage_key.as_deref() {
                Some(key) => {
                    let target = trash_key(&self.trash_prefix, media.id, key);
                    if self.storage.exists(key).await? {
                        self.storage.rename(key, &target).await?;
                        renamed.push((key.to_string(), target.clone()));
                        Some(target)
                    } else if self.storage.exists(&target).await? {
                        // Moved by an earlier attempt whose records were never marked
                        tracing::info!(
                            media_id = %media.id,
                            trash_key = %target,
                            "Stored file already in trash"
                        );
                        Some(target)
                    } else {
                        tracing::warn!(
                            media_id = %media.id,
                            storage_key = %key,
                            "Stored file missing, trashing record only"
                        );
                        None
                    }
                }
                None => None,
            };

            records.push((media, trashed_key));
        }

        Ok(records)
    }

    async fn mark_records(&self, records: &[(&Media, Option<String>)]) -> Result<(), AppError> {
        let mut tx = self.unit_of_work.begin().await?;
        for (media, trashed_key) in records {
            tx.mark_trashed(media, trashed_key.as_deref()).await?;
        }
        tx.commit().await
    }

    /// Put renamed objects back under their live keys. Failures are logged.
    async fn restore_objects(&self, renamed: &[(String, String)]) {
        for (from, to) in renamed.iter().rev() {
            if let Err(e) = self.storage.rename(to, from).await {
                tracing::error!(
                    error = %e,
                    storage_key = %from,
                    trash_key = %to,
                    "Failed to restore stored file from trash"
                );
            }
        }
    }
}

#[async_trait]
impl FileMover for TrashFileMover {
    #[tracing::instrument(skip(self, versions), fields(versions = versions.len()))]
    async fn move_to_trash(&self, versions: &[Media]) -> Result<(), AppError> {
        let mut renamed = Vec::new();

        let outcome = match self.move_objects(versions, &mut renamed).await {
            Ok(records) => self.mark_records(&records).await.map(|_| records.len()),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(count) => {
                tracing::info!(moved = count, "Moved file versions to trash");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    renamed = renamed.len(),
                    "Trash move failed, restoring stored files"
                );
                self.restore_objects(&renamed).await;
                Err(e)
            }
        }
    }
}
