use async_trait::async_trait;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;
use vellum_core::models::{Content, ContentRow, ContentStatus};
use vellum_core::AppError;

use crate::traits::ContentRepository;

const CONTENT_COLUMNS: &str =
    "id, version, name, html, status, original_id, published_on, created_at, updated_at";

/// Postgres-backed content repository
#[derive(Clone)]
pub struct PgContentRepository {
    pool: PgPool,
}

impl PgContentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ContentRepository for PgContentRepository {
    #[tracing::instrument(skip(self), fields(db.table = "contents", db.operation = "select", db.record_id = %id))]
    async fn find(&self, id: Uuid) -> Result<Option<Content>, AppError> {
        let row = sqlx::query_as::<Postgres, ContentRow>(&format!(
            "SELECT {} FROM contents WHERE id = $1",
            CONTENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Content::try_from).transpose()
    }

    #[tracing::instrument(skip(self), fields(db.table = "contents", db.operation = "select", db.record_id = %original_id))]
    async fn find_draft(&self, original_id: Uuid) -> Result<Option<Content>, AppError> {
        let row = sqlx::query_as::<Postgres, ContentRow>(&format!(
            "SELECT {} FROM contents WHERE original_id = $1 AND status = $2 ORDER BY updated_at DESC LIMIT 1",
            CONTENT_COLUMNS
        ))
        .bind(original_id)
        .bind(ContentStatus::Draft.as_i16())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Content::try_from).transpose()
    }

    #[tracing::instrument(skip(self), fields(db.table = "contents", db.operation = "select", db.record_id = %original_id))]
    async fn find_history(&self, original_id: Uuid) -> Result<Vec<Content>, AppError> {
        let rows = sqlx::query_as::<Postgres, ContentRow>(&format!(
            "SELECT {} FROM contents WHERE original_id = $1 AND status = $2 ORDER BY created_at DESC",
            CONTENT_COLUMNS
        ))
        .bind(original_id)
        .bind(ContentStatus::Archived.as_i16())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Content::try_from).collect()
    }

    #[tracing::instrument(skip(self, content), fields(db.table = "contents", db.operation = "insert", db.record_id = %content.id))]
    async fn insert(&self, content: &Content) -> Result<Content, AppError> {
        let row = sqlx::query_as::<Postgres, ContentRow>(&format!(
            r#"
            INSERT INTO contents (id, version, name, html, status, original_id, published_on, created_at, updated_at)
            VALUES ($1, 1, $2, $3, $4, $5, $6, NOW(), NOW())
            RETURNING {}
            "#,
            CONTENT_COLUMNS
        ))
        .bind(content.id)
        .bind(&content.name)
        .bind(&content.html)
        .bind(content.status.as_i16())
        .bind(content.original_id)
        .bind(content.published_on)
        .fetch_one(&self.pool)
        .await?;

        Content::try_from(row)
    }

    #[tracing::instrument(skip(self, content), fields(db.table = "contents", db.operation = "update", db.record_id = %content.id))]
    async fn save(&self, content: &Content) -> Result<Content, AppError> {
        let row = sqlx::query_as::<Postgres, ContentRow>(&format!(
            r#"
            UPDATE contents
            SET name = $3, html = $4, status = $5, original_id = $6, published_on = $7,
                version = version + 1, updated_at = NOW()
            WHERE id = $1 AND version = $2
            RETURNING {}
            "#,
            CONTENT_COLUMNS
        ))
        .bind(content.id)
        .bind(content.version)
        .bind(&content.name)
        .bind(&content.html)
        .bind(content.status.as_i16())
        .bind(content.original_id)
        .bind(content.published_on)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = row {
            return Content::try_from(row);
        }

        let actual =
            sqlx::query_scalar::<Postgres, i32>("SELECT version FROM contents WHERE id = $1")
                .bind(content.id)
                .fetch_optional(&self.pool)
                .await?;

        match actual {
            Some(actual) => Err(AppError::ConcurrencyConflict {
                entity: "content",
                id: content.id,
                expected: content.version,
                actual,
            }),
            None => Err(AppError::NotFound(format!(
                "Content {} not found",
                content.id
            ))),
        }
    }

    #[tracing::instrument(skip(self), fields(db.table = "contents", db.operation = "delete", db.record_id = %id))]
    async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM contents WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
