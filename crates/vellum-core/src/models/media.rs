use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(feature = "sqlx")]
use sqlx::FromRow;

use super::access::AccessRule;

/// Persisted discriminator of a file record
pub const MEDIA_KIND_FILE: &str = "file";
/// Persisted discriminator of a folder record
pub const MEDIA_KIND_FOLDER: &str = "folder";

/// What kind of asset a media item holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "media_type", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Image,
    File,
    Video,
    Audio,
}

/// File-specific part of a media item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaFile {
    pub file_name: String,
    pub file_extension: Option<String>,
    pub file_size: i64,
    /// Storage key of the backing content; `None` while an upload is still pending
    pub storage_key: Option<String>,
    pub public_url: Option<String>,
}

/// Concrete variant of a media item.
///
/// Folders do not embed their children: children are the media items whose
/// `folder_id` points at the folder and are resolved through the repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum MediaKind {
    File(MediaFile),
    Folder,
    /// A persisted discriminator this build does not model (legacy data)
    Unknown { discriminator: String },
}

impl MediaKind {
    pub fn discriminator(&self) -> &str {
        match self {
            MediaKind::File(_) => MEDIA_KIND_FILE,
            MediaKind::Folder => MEDIA_KIND_FOLDER,
            MediaKind::Unknown { discriminator } => discriminator,
        }
    }
}

/// Tag assignment owned by a media item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
pub struct MediaTag {
    pub id: Uuid,
    pub media_id: Uuid,
    pub tag_id: Uuid,
    pub tag_name: String,
}

/// Category assignment owned by a media item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
pub struct MediaCategory {
    pub id: Uuid,
    pub media_id: Uuid,
    pub category_id: Uuid,
    pub category_name: String,
}

/// A stored asset (file or folder) in the media tree.
///
/// Several records can describe one logical item: every stored version other than
/// the original points back to it through `original_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Media {
    pub id: Uuid,
    /// Optimistic concurrency token, bumped on every save
    pub version: i32,
    pub title: String,
    pub media_type: MediaType,
    pub is_archived: bool,
    pub folder_id: Option<Uuid>,
    pub original_id: Option<Uuid>,
    #[serde(default)]
    pub tags: Vec<MediaTag>,
    #[serde(default)]
    pub categories: Vec<MediaCategory>,
    #[serde(default)]
    pub access_rules: Vec<AccessRule>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: MediaKind,
}

impl Media {
    /// New, unsaved file record at version 1
    pub fn new_file(title: impl Into<String>, folder_id: Option<Uuid>, file: MediaFile) -> Self {
        Self::new(title.into(), MediaType::File, folder_id, MediaKind::File(file))
    }

    /// New, unsaved folder record at version 1
    pub fn new_folder(title: impl Into<String>, folder_id: Option<Uuid>) -> Self {
        Self::new(title.into(), MediaType::File, folder_id, MediaKind::Folder)
    }

    fn new(title: String, media_type: MediaType, folder_id: Option<Uuid>, kind: MediaKind) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            version: 1,
            title,
            media_type,
            is_archived: false,
            folder_id,
            original_id: None,
            tags: Vec::new(),
            categories: Vec::new(),
            access_rules: Vec::new(),
            created_at: now,
            updated_at: now,
            kind,
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(self.kind, MediaKind::File(_))
    }

    pub fn is_folder(&self) -> bool {
        matches!(self.kind, MediaKind::Folder)
    }

    pub fn as_file(&self) -> Option<&MediaFile> {
        match &self.kind {
            MediaKind::File(file) => Some(file),
            _ => None,
        }
    }

    /// Whether this record is `id` itself or a stored version of it
    pub fn is_version_of(&self, id: Uuid) -> bool {
        self.id == id || self.original_id == Some(id)
    }
}

/// Flat database row for the `media` table.
///
/// The `kind` column selects the variant; file columns are only meaningful for files.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
pub struct MediaRow {
    pub id: Uuid,
    pub version: i32,
    pub kind: String,
    pub title: String,
    pub media_type: MediaType,
    pub is_archived: bool,
    pub folder_id: Option<Uuid>,
    pub original_id: Option<Uuid>,
    pub file_name: Option<String>,
    pub file_extension: Option<String>,
    pub file_size: Option<i64>,
    pub storage_key: Option<String>,
    pub public_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<MediaRow> for Media {
    fn from(row: MediaRow) -> Self {
        let kind = match row.kind.as_str() {
            MEDIA_KIND_FILE => MediaKind::File(MediaFile {
                file_name: row.file_name.unwrap_or_default(),
                file_extension: row.file_extension,
                file_size: row.file_size.unwrap_or_default(),
                storage_key: row.storage_key,
                public_url: row.public_url,
            }),
            MEDIA_KIND_FOLDER => MediaKind::Folder,
            other => MediaKind::Unknown {
                discriminator: other.to_string(),
            },
        };

        Media {
            id: row.id,
            version: row.version,
            title: row.title,
            media_type: row.media_type,
            is_archived: row.is_archived,
            folder_id: row.folder_id,
            original_id: row.original_id,
            tags: Vec::new(),
            categories: Vec::new(),
            access_rules: Vec::new(),
            created_at: row.created_at,
            updated_at: row.updated_at,
            kind,
        }
    }
}
