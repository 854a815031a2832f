use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[cfg(feature = "sqlx")]
use sqlx::FromRow;

use crate::error::AppError;

/// Lifecycle stage of a publishable content item.
///
/// The numeric values are persisted and define the ordering used by status transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(i16)]
pub enum ContentStatus {
    Preview = 1,
    Draft = 2,
    Published = 3,
    Archived = 4,
}

impl ContentStatus {
    pub fn as_i16(self) -> i16 {
        self as i16
    }
}

impl TryFrom<i16> for ContentStatus {
    type Error = AppError;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(ContentStatus::Preview),
            2 => Ok(ContentStatus::Draft),
            3 => Ok(ContentStatus::Published),
            4 => Ok(ContentStatus::Archived),
            other => Err(AppError::InvalidInput(format!(
                "Unknown content status: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for ContentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ContentStatus::Preview => "preview",
            ContentStatus::Draft => "draft",
            ContentStatus::Published => "published",
            ContentStatus::Archived => "archived",
        };
        f.write_str(name)
    }
}

/// A publishable content item.
///
/// Drafts and archived history records point at the published item through `original_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    pub id: Uuid,
    pub version: i32,
    pub name: String,
    pub html: String,
    pub status: ContentStatus,
    pub original_id: Option<Uuid>,
    pub published_on: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Content {
    /// New, unsaved content item
    pub fn new(name: impl Into<String>, html: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            version: 1,
            name: name.into(),
            html: html.into(),
            status: ContentStatus::Draft,
            original_id: None,
            published_on: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Database row for the `contents` table
#[derive(Debug, Clone)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
pub struct ContentRow {
    pub id: Uuid,
    pub version: i32,
    pub name: String,
    pub html: String,
    pub status: i16,
    pub original_id: Option<Uuid>,
    pub published_on: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ContentRow> for Content {
    type Error = AppError;

    fn try_from(row: ContentRow) -> Result<Self, Self::Error> {
        Ok(Content {
            id: row.id,
            version: row.version,
            name: row.name,
            html: row.html,
            status: ContentStatus::try_from(row.status)?,
            original_id: row.original_id,
            published_on: row.published_on,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
