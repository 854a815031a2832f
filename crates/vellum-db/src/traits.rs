//! Repository contracts used by the services layer
//!
//! These traits define the minimal persistence interface the media and content services
//! need, so the services can run against Postgres or against in-memory test doubles.

use async_trait::async_trait;
use uuid::Uuid;
use vellum_core::models::{AccessRule, Content, Media, MediaCategory, MediaTag};
use vellum_core::AppError;

/// Related collections to load together with media records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MediaInclude {
    pub tags: bool,
    pub categories: bool,
    pub access_rules: bool,
}

impl MediaInclude {
    /// Only the media rows
    pub const NONE: MediaInclude = MediaInclude {
        tags: false,
        categories: false,
        access_rules: false,
    };

    /// Tags and categories, the records that must go with their owner
    pub const DEPENDENTS: MediaInclude = MediaInclude {
        tags: true,
        categories: true,
        access_rules: false,
    };

    /// Every related collection
    pub const ALL: MediaInclude = MediaInclude {
        tags: true,
        categories: true,
        access_rules: true,
    };
}

/// Read and save access to media records.
///
/// Trashed records are history: none of the queries return them.
#[async_trait]
pub trait MediaRepository: Send + Sync {
    /// Get a media item by ID
    async fn find(&self, id: Uuid, include: MediaInclude) -> Result<Option<Media>, AppError>;

    /// Get every stored version of a logical item: the record `id` itself and every
    /// record whose `original_id` is `id`
    async fn find_versions(&self, id: Uuid, include: MediaInclude)
        -> Result<Vec<Media>, AppError>;

    /// Get the direct children of a folder, oldest first
    async fn find_children(&self, folder_id: Uuid) -> Result<Vec<Media>, AppError>;

    /// Persist a changed media record.
    ///
    /// The write only applies when the stored version still equals `media.version`;
    /// otherwise `AppError::ConcurrencyConflict` is returned. Returns the saved record
    /// with its bumped version.
    async fn save(&self, media: &Media) -> Result<Media, AppError>;
}

/// Opens transactions for multi-row media mutations
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn MediaTransaction>, AppError>;
}

/// A running media transaction.
///
/// Dropping the transaction without calling `commit` rolls back every change made through it.
#[async_trait]
pub trait MediaTransaction: Send {
    async fn delete_tag(&mut self, tag: &MediaTag) -> Result<(), AppError>;

    async fn delete_category(&mut self, category: &MediaCategory) -> Result<(), AppError>;

    async fn delete_access_rule(&mut self, rule: &AccessRule) -> Result<(), AppError>;

    async fn delete_media(&mut self, media: &Media) -> Result<(), AppError>;

    /// Hide a record from all queries, keeping it as history with the new storage key
    async fn mark_trashed(&mut self, media: &Media, trash_key: Option<&str>)
        -> Result<(), AppError>;

    async fn commit(self: Box<Self>) -> Result<(), AppError>;
}

/// Persistence for publishable content
#[async_trait]
pub trait ContentRepository: Send + Sync {
    async fn find(&self, id: Uuid) -> Result<Option<Content>, AppError>;

    /// The pending draft linked to a published item, if any
    async fn find_draft(&self, original_id: Uuid) -> Result<Option<Content>, AppError>;

    /// Archived history records of a published item, newest first
    async fn find_history(&self, original_id: Uuid) -> Result<Vec<Content>, AppError>;

    async fn insert(&self, content: &Content) -> Result<Content, AppError>;

    /// Optimistic save, same contract as `MediaRepository::save`
    async fn save(&self, content: &Content) -> Result<Content, AppError>;

    async fn delete(&self, id: Uuid) -> Result<(), AppError>;
}
