//! Database transaction utilities
//!
//! `PgUnitOfWork` opens `PgMediaTransaction`s, which group the record removals of a
//! media deletion so they commit or roll back together.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use vellum_core::models::{AccessRule, Media, MediaCategory, MediaTag};
use vellum_core::AppError;

use crate::traits::{MediaTransaction, UnitOfWork};

/// Unit of work backed by a Postgres pool
#[derive(Clone)]
pub struct PgUnitOfWork {
    pool: PgPool,
}

impl PgUnitOfWork {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn begin(&self) -> Result<Box<dyn MediaTransaction>, AppError> {
        let transaction = self.pool.begin().await?;
        Ok(Box::new(PgMediaTransaction {
            transaction: Some(transaction),
        }))
    }
}

/// A Postgres transaction over the media tables.
///
/// sqlx rolls the transaction back when it is dropped without a commit.
pub struct PgMediaTransaction {
    transaction: Option<Transaction<'static, Postgres>>,
}

impl PgMediaTransaction {
    fn tx(&mut self) -> Result<&mut Transaction<'static, Postgres>, AppError> {
        self.transaction.as_mut().ok_or_else(|| {
            AppError::Internal("Transaction was already committed".to_string())
        })
    }
}

#[async_trait]
impl MediaTransaction for PgMediaTransaction {
    #[tracing::instrument(skip(self, tag), fields(db.table = "media_tags", db.operation = "delete", db.record_id = %tag.id))]
    async fn delete_tag(&mut self, tag: &MediaTag) -> Result<(), AppError> {
        sqlx::query("DELETE FROM media_tags WHERE id = $1")
            .bind(tag.id)
            .execute(&mut **self.tx()?)
            .await?;
        Ok(())
    }

    #[tracing::instrument(skip(self, category), fields(db.table = "media_categories", db.operation = "delete", db.record_id = %category.id))]
    async fn delete_category(&mut self, category: &MediaCategory) -> Result<(), AppError> {
        sqlx::query("DELETE FROM media_categories WHERE id = $1")
            .bind(category.id)
            .execute(&mut **self.tx()?)
            .await?;
        Ok(())
    }

    #[tracing::instrument(skip(self, rule), fields(db.table = "media_access_rules", db.operation = "delete", db.record_id = %rule.id))]
    async fn delete_access_rule(&mut self, rule: &AccessRule) -> Result<(), AppError> {
        sqlx::query("DELETE FROM media_access_rules WHERE id = $1")
            .bind(rule.id)
            .execute(&mut **self.tx()?)
            .await?;
        Ok(())
    }

    #[tracing::instrument(skip(self, media), fields(db.table = "media", db.operation = "delete", db.record_id = %media.id))]
    async fn delete_media(&mut self, media: &Media) -> Result<(), AppError> {
        sqlx::query("DELETE FROM media WHERE id = $1")
            .bind(media.id)
            .execute(&mut **self.tx()?)
            .await?;
        Ok(())
    }

    #[tracing::instrument(skip(self, media), fields(db.table = "media", db.operation = "update", db.record_id = %media.id))]
    async fn mark_trashed(
        &mut self,
        media: &Media,
        trash_key: Option<&str>,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE media
            SET trashed_at = NOW(), storage_key = COALESCE($2, storage_key),
                version = version + 1, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(media.id)
        .bind(trash_key)
        .execute(&mut **self.tx()?)
        .await?;
        Ok(())
    }

    async fn commit(mut self: Box<Self>) -> Result<(), AppError> {
        if let Some(tx) = self.transaction.take() {
            tx.commit().await?;
        }
        Ok(())
    }
}

impl Drop for PgMediaTransaction {
    fn drop(&mut self) {
        if self.transaction.is_some() {
            tracing::warn!("Media transaction dropped without commit - rolling back");
        }
    }
}
