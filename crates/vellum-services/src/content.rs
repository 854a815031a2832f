//! Status transitions of publishable content
//!
//! A published item keeps its id for its whole life. Edits are staged in a draft that
//! points at it through `original_id`, and every publish snapshots the previous
//! published state as an archived history record pointing at it the same way.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;
use vellum_core::models::{Content, ContentStatus};
use vellum_core::AppError;
use vellum_db::ContentRepository;

#[async_trait]
pub trait ContentService: Send + Sync {
    /// Store `content` under `requested_status` and return the resulting record
    async fn save_content_with_status_update(
        &self,
        content: Content,
        requested_status: ContentStatus,
    ) -> Result<Content, AppError>;

    /// Turn an archived history record back into the pending draft of its published item
    async fn restore_content_from_archive(&self, content: &Content) -> Result<Content, AppError>;
}

#[derive(Clone)]
pub struct DefaultContentService {
    repository: Arc<dyn ContentRepository>,
}

impl DefaultContentService {
    pub fn new(repository: Arc<dyn ContentRepository>) -> Self {
        Self { repository }
    }

    /// Insert new content or save a known one
    async fn upsert(&self, content: &Content) -> Result<Content, AppError> {
        match self.repository.find(content.id).await? {
            Some(_) => self.repository.save(content).await,
            None => self.repository.insert(content).await,
        }
    }

    async fn find_published(&self, id: Uuid) -> Result<Option<Content>, AppError> {
        Ok(self
            .repository
            .find(id)
            .await?
            .filter(|c| c.status == ContentStatus::Published))
    }

    /// Create or refresh the draft linked to `published_id` with the given name and html
    async fn store_draft(
        &self,
        published_id: Uuid,
        name: &str,
        html: &str,
    ) -> Result<Content, AppError> {
        match self.repository.find_draft(published_id).await? {
            Some(mut draft) => {
                draft.name = name.to_string();
                draft.html = html.to_string();
                self.repository.save(&draft).await
            }
            None => {
                let mut draft = Content::new(name, html);
                draft.original_id = Some(published_id);
                self.repository.insert(&draft).await
            }
        }
    }

    /// Stored copy of `content`, rejecting a stale version before anything is written
    async fn stored_if_current(&self, content: &Content) -> Result<Option<Content>, AppError> {
        let stored = self.repository.find(content.id).await?;
        if let Some(stored) = &stored {
            if stored.version != content.version {
                return Err(AppError::ConcurrencyConflict {
                    entity: "content",
                    id: content.id,
                    expected: content.version,
                    actual: stored.version,
                });
            }
        }
        Ok(stored)
    }

    async fn archive_snapshot(&self, published: &Content) -> Result<Content, AppError> {
        let mut snapshot = Content::new(published.name.clone(), published.html.clone());
        snapshot.status = ContentStatus::Archived;
        snapshot.original_id = Some(published.id);
        snapshot.published_on = published.published_on;
        self.repository.insert(&snapshot).await
    }

    async fn save_as_draft(&self, mut content: Content) -> Result<Content, AppError> {
        if content.status == ContentStatus::Published {
            // Edits of a live item go to its draft, the live item stays untouched
            if self.find_published(content.id).await?.is_some() {
                return self
                    .store_draft(content.id, &content.name, &content.html)
                    .await;
            }
        }

        content.status = ContentStatus::Draft;
        self.upsert(&content).await
    }

    async fn publish(&self, content: Content) -> Result<Content, AppError> {
        let now = Utc::now();

        // Publishing a draft applies it onto its published item
        if content.status == ContentStatus::Draft {
            if let Some(original_id) = content.original_id {
                self.stored_if_current(&content).await?;
                let Some(mut published) = self.find_published(original_id).await? else {
                    return Err(AppError::NotFound(format!(
                        "Published content {} for draft {} not found",
                        original_id, content.id
                    )));
                };

                self.archive_snapshot(&published).await?;
                published.name = content.name;
                published.html = content.html;
                published.published_on.get_or_insert(now);
                let published = self.repository.save(&published).await?;
                self.repository.delete(content.id).await?;

                tracing::info!(
                    content_id = %published.id,
                    draft_id = %content.id,
                    "Draft published"
                );
                return Ok(published);
            }
        }

        let stored = self.stored_if_current(&content).await?;
        let mut content = content;
        if let Some(stored) = &stored {
            if stored.status == ContentStatus::Published {
                self.archive_snapshot(stored).await?;
            }
        }

        content.status = ContentStatus::Published;
        content.original_id = None;
        content.published_on.get_or_insert(now);

        let published = match stored {
            Some(_) => self.repository.save(&content).await?,
            None => self.repository.insert(&content).await?,
        };
        tracing::info!(content_id = %published.id, "Content published");
        Ok(published)
    }
}

#[async_trait]
impl ContentService for DefaultContentService {
    #[tracing::instrument(skip(self, content), fields(content.id = %content.id, status = %requested_status))]
    async fn save_content_with_status_update(
        &self,
        mut content: Content,
        requested_status: ContentStatus,
    ) -> Result<Content, AppError> {
        match requested_status {
            ContentStatus::Preview => {
                content.status = ContentStatus::Preview;
                Ok(content)
            }
            ContentStatus::Draft => self.save_as_draft(content).await,
            ContentStatus::Published => self.publish(content).await,
            ContentStatus::Archived => Err(AppError::InvalidInput(
                "Content is archived by publishing a newer version".to_string(),
            )),
        }
    }

    #[tracing::instrument(skip(self, content), fields(content.id = %content.id))]
    async fn restore_content_from_archive(&self, content: &Content) -> Result<Content, AppError> {
        if content.status != ContentStatus::Archived {
            return Err(AppError::InvalidInput(format!(
                "Content {} is {}, only archived content can be restored",
                content.id, content.status
            )));
        }
        let Some(original_id) = content.original_id else {
            return Err(AppError::InvalidInput(format!(
                "Archived content {} has no published item",
                content.id
            )));
        };

        if self.find_published(original_id).await?.is_none() {
            return Err(AppError::NotFound(format!(
                "Published content {} not found",
                original_id
            )));
        }

        let draft = self
            .store_draft(original_id, &content.name, &content.html)
            .await?;
        tracing::info!(
            content_id = %original_id,
            archived_id = %content.id,
            draft_id = %draft.id,
            "Archived content restored as draft"
        );
        Ok(draft)
    }
}
