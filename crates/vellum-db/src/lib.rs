//! Vellum Database Library
//!
//! Repository contracts (`traits`) and their Postgres implementations (`db`).

pub mod db;
pub mod traits;

pub use db::{PgContentRepository, PgMediaRepository, PgMediaTransaction, PgUnitOfWork};
pub use traits::{ContentRepository, MediaInclude, MediaRepository, MediaTransaction, UnitOfWork};

use anyhow::Context;
use sqlx::PgPool;

/// Apply the bundled schema migrations
pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database migrations applied");
    Ok(())
}
