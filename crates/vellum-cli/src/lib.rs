//! Wiring shared by the `vellum` binary: tracing setup and service construction.

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use vellum_core::models::Principal;
use vellum_core::Config;
use vellum_db::{PgMediaRepository, PgUnitOfWork};
use vellum_services::{BroadcastEventPublisher, MediaService, RuleAccessControl, TrashFileMover};
use vellum_storage::LocalStorage;

/// Filter used when `RUST_LOG` is not set
pub const DEFAULT_LOG_FILTER: &str = "vellum=info";

/// Initialize tracing for the CLI. Set `LOG_FORMAT=json` for JSON lines.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

pub async fn connect(config: &Config) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_timeout_seconds))
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")
}

/// Build a media service over Postgres and local storage
pub async fn media_service(
    config: &Config,
    pool: PgPool,
    events: Arc<BroadcastEventPublisher>,
) -> anyhow::Result<MediaService> {
    let storage = LocalStorage::new(&config.local_storage_path)
        .await
        .with_context(|| {
            format!(
                "Failed to open local storage at {}",
                config.local_storage_path
            )
        })?;

    let unit_of_work = Arc::new(PgUnitOfWork::new(pool.clone()));
    let file_mover = TrashFileMover::new(
        Arc::new(storage),
        unit_of_work.clone(),
        config.trash_prefix.clone(),
    );

    Ok(MediaService::new(
        Arc::new(PgMediaRepository::new(pool)),
        unit_of_work,
        Arc::new(RuleAccessControl::from_config(config)),
        Arc::new(file_mover),
        events,
        config.access_control_enabled,
    ))
}

/// Principal for the acting user; roles are trimmed and blanks dropped
pub fn principal(name: &str, roles: &[String]) -> Principal {
    let roles = roles
        .iter()
        .map(|r| r.trim())
        .filter(|r| !r.is_empty())
        .map(str::to_string)
        .collect();
    Principal::new(name.trim(), roles)
}
