use async_trait::async_trait;
use sqlx::{PgPool, Postgres};
use std::collections::HashMap;
use uuid::Uuid;
use vellum_core::models::{AccessRule, Media, MediaCategory, MediaRow, MediaTag};
use vellum_core::AppError;

use crate::traits::{MediaInclude, MediaRepository};

pub(crate) const MEDIA_COLUMNS: &str = "id, version, kind, title, media_type, is_archived, \
     folder_id, original_id, file_name, file_extension, file_size, storage_key, public_url, \
     created_at, updated_at";

/// Postgres-backed media repository
#[derive(Clone)]
pub struct PgMediaRepository {
    pool: PgPool,
}

impl PgMediaRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Attach the requested related collections to already loaded media
    async fn load_related(
        &self,
        media: &mut [Media],
        include: MediaInclude,
    ) -> Result<(), AppError> {
        if media.is_empty() || include == MediaInclude::NONE {
            return Ok(());
        }

        let ids: Vec<Uuid> = media.iter().map(|m| m.id).collect();
        let positions: HashMap<Uuid, usize> =
            ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();

        if include.tags {
            let tags = sqlx::query_as::<Postgres, MediaTag>(
                "SELECT id, media_id, tag_id, tag_name FROM media_tags WHERE media_id = ANY($1)",
            )
            .bind(&ids)
            .fetch_all(&self.pool)
            .await?;

            for tag in tags {
                if let Some(&i) = positions.get(&tag.media_id) {
                    media[i].tags.push(tag);
                }
            }
        }

        if include.categories {
            let categories = sqlx::query_as::<Postgres, MediaCategory>(
                "SELECT id, media_id, category_id, category_name FROM media_categories WHERE media_id = ANY($1)",
            )
            .bind(&ids)
            .fetch_all(&self.pool)
            .await?;

            for category in categories {
                if let Some(&i) = positions.get(&category.media_id) {
                    media[i].categories.push(category);
                }
            }
        }

        if include.access_rules {
            let rules = sqlx::query_as::<Postgres, AccessRule>(
                "SELECT id, media_id, identity, is_for_role, access_level FROM media_access_rules WHERE media_id = ANY($1)",
            )
            .bind(&ids)
            .fetch_all(&self.pool)
            .await?;

            for rule in rules {
                if let Some(&i) = positions.get(&rule.media_id) {
                    media[i].access_rules.push(rule);
                }
            }
        }

        Ok(())
    }
}

#[async_trait]
impl MediaRepository for PgMediaRepository {
    #[tracing::instrument(skip(self), fields(db.table = "media", db.operation = "select", db.record_id = %id))]
    async fn find(&self, id: Uuid, include: MediaInclude) -> Result<Option<Media>, AppError> {
        let row = sqlx::query_as::<Postgres, MediaRow>(&format!(
            "SELECT {} FROM media WHERE id = $1 AND trashed_at IS NULL",
            MEDIA_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut media = vec![Media::from(row)];
        self.load_related(&mut media, include).await?;
        Ok(media.pop())
    }

    #[tracing::instrument(skip(self), fields(db.table = "media", db.operation = "select", db.record_id = %id))]
    async fn find_versions(
        &self,
        id: Uuid,
        include: MediaInclude,
    ) -> Result<Vec<Media>, AppError> {
        let rows = sqlx::query_as::<Postgres, MediaRow>(&format!(
            "SELECT {} FROM media WHERE (id = $1 OR original_id = $1) AND trashed_at IS NULL ORDER BY created_at ASC, id ASC",
            MEDIA_COLUMNS
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let mut media: Vec<Media> = rows.into_iter().map(Media::from).collect();
        self.load_related(&mut media, include).await?;
        Ok(media)
    }

    #[tracing::instrument(skip(self), fields(db.table = "media", db.operation = "select", db.record_id = %folder_id))]
    async fn find_children(&self, folder_id: Uuid) -> Result<Vec<Media>, AppError> {
        let rows = sqlx::query_as::<Postgres, MediaRow>(&format!(
            "SELECT {} FROM media WHERE folder_id = $1 AND trashed_at IS NULL ORDER BY created_at ASC, id ASC",
            MEDIA_COLUMNS
        ))
        .bind(folder_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Media::from).collect())
    }

    #[tracing::instrument(skip(self, media), fields(db.table = "media", db.operation = "update", db.record_id = %media.id))]
    async fn save(&self, media: &Media) -> Result<Media, AppError> {
        let row = sqlx::query_as::<Postgres, MediaRow>(&format!(
            r#"
            UPDATE media
            SET title = $3, is_archived = $4, folder_id = $5, version = version + 1, updated_at = NOW()
            WHERE id = $1 AND version = $2 AND trashed_at IS NULL
            RETURNING {}
            "#,
            MEDIA_COLUMNS
        ))
        .bind(media.id)
        .bind(media.version)
        .bind(&media.title)
        .bind(media.is_archived)
        .bind(media.folder_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let mut saved = Media::from(row);
                saved.tags = media.tags.clone();
                saved.categories = media.categories.clone();
                saved.access_rules = media.access_rules.clone();
                Ok(saved)
            }
            None => {
                let actual = sqlx::query_scalar::<Postgres, i32>(
                    "SELECT version FROM media WHERE id = $1 AND trashed_at IS NULL",
                )
                .bind(media.id)
                .fetch_optional(&self.pool)
                .await?;

                match actual {
                    Some(actual) => Err(AppError::ConcurrencyConflict {
                        entity: "media",
                        id: media.id,
                        expected: media.version,
                        actual,
                    }),
                    None => Err(AppError::NotFound(format!("Media {} not found", media.id))),
                }
            }
        }
    }
}
