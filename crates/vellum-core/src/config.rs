//! Configuration module
//!
//! Settings for the database pool, local storage and trash location, and the
//! access-control switches used by the media services.

use std::env;

use crate::models::AccessLevel;

// Common constants
const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const LOCAL_STORAGE_PATH: &str = "./data/media";
const TRASH_PREFIX: &str = "trash";
const ADMINISTRATOR_ROLES: &str = "admin";

/// Application configuration
#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    pub environment: String,
    // Storage configuration
    pub local_storage_path: String,
    /// Key prefix under which trashed file content is kept
    pub trash_prefix: String,
    // Access control configuration
    /// Global switch; callers may still request enforcement per operation
    pub access_control_enabled: bool,
    /// Level granted on items that carry no explicit access rules
    pub default_access_level: AccessLevel,
    /// Roles that always get read-write access
    pub administrator_roles: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = lookup("ENVIRONMENT")
            .or_else(|| lookup("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let default_access_level = match lookup("DEFAULT_ACCESS_LEVEL") {
            Some(raw) => raw
                .parse::<AccessLevel>()
                .map_err(|e| anyhow::anyhow!("DEFAULT_ACCESS_LEVEL is invalid: {}", e))?,
            None => AccessLevel::ReadWrite,
        };

        let administrator_roles = lookup("ADMINISTRATOR_ROLES")
            .unwrap_or_else(|| ADMINISTRATOR_ROLES.to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let config = Config {
            database_url: lookup("DATABASE_URL")
                .ok_or_else(|| anyhow::anyhow!("DATABASE_URL must be set"))?,
            db_max_connections: lookup("DB_MAX_CONNECTIONS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(MAX_CONNECTIONS),
            db_timeout_seconds: lookup("DB_TIMEOUT_SECONDS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(CONNECTION_TIMEOUT_SECS),
            environment,
            local_storage_path: lookup("LOCAL_STORAGE_PATH")
                .unwrap_or_else(|| LOCAL_STORAGE_PATH.to_string()),
            trash_prefix: lookup("TRASH_PREFIX").unwrap_or_else(|| TRASH_PREFIX.to_string()),
            access_control_enabled: lookup("ACCESS_CONTROL_ENABLED")
                .map(|s| s.to_lowercase())
                .and_then(|s| s.parse().ok())
                .unwrap_or(true),
            default_access_level,
            administrator_roles,
        };

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !self.database_url.starts_with("postgres://")
            && !self.database_url.starts_with("postgresql://")
        {
            return Err(anyhow::anyhow!(
                "DATABASE_URL must be a valid PostgreSQL connection string"
            ));
        }

        if self.db_max_connections == 0 {
            return Err(anyhow::anyhow!("DB_MAX_CONNECTIONS must be greater than 0"));
        }

        let prefix = self.trash_prefix.trim();
        if prefix.is_empty() {
            return Err(anyhow::anyhow!("TRASH_PREFIX must not be empty"));
        }
        if prefix.contains("..") || prefix.starts_with('/') {
            return Err(anyhow::anyhow!(
                "TRASH_PREFIX must be a relative storage key prefix"
            ));
        }

        Ok(())
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }
}
