//! Test helpers: in-memory collaborators for the service integration tests.
//!
//! Run from workspace root: `cargo test -p vellum-services`. No database is needed; the
//! in-memory store mirrors the Postgres semantics the services rely on (trashed records
//! are hidden, saves are optimistic, a record cannot be deleted while tags or categories
//! still reference it).

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use uuid::Uuid;
use vellum_core::models::{
    AccessLevel, AccessRule, Content, ContentStatus, Media, MediaCategory, MediaFile, MediaTag,
    Principal,
};
use vellum_core::{AppError, MediaEvent, MediaEventPublisher};
use vellum_db::{ContentRepository, MediaInclude, MediaRepository, MediaTransaction, UnitOfWork};
use vellum_services::{AccessControlService, FileMover, MediaService};

#[derive(Default)]
struct MediaState {
    /// Insertion order doubles as creation order
    records: Vec<Media>,
    trashed: HashMap<Uuid, Option<String>>,
    deleted_media: Vec<Uuid>,
    deleted_tags: Vec<Uuid>,
    deleted_categories: Vec<Uuid>,
    deleted_access_rules: Vec<Uuid>,
    failing_saves: HashSet<Uuid>,
    failing_commits: bool,
    commits: usize,
    saves: Vec<Uuid>,
    single_connection: bool,
    open_transactions: usize,
}

/// Shared in-memory media table, used as repository and unit of work
#[derive(Clone, Default)]
pub struct InMemoryMediaStore {
    state: Arc<Mutex<MediaState>>,
}

impl InMemoryMediaStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, media: Media) -> Media {
        self.state.lock().unwrap().records.push(media.clone());
        media
    }

    pub fn get(&self, id: Uuid) -> Option<Media> {
        self.state
            .lock()
            .unwrap()
            .records
            .iter()
            .find(|m| m.id == id)
            .cloned()
    }

    pub fn is_trashed(&self, id: Uuid) -> bool {
        self.state.lock().unwrap().trashed.contains_key(&id)
    }

    pub fn trash_key_of(&self, id: Uuid) -> Option<String> {
        self.state.lock().unwrap().trashed.get(&id).cloned().flatten()
    }

    pub fn deleted_media(&self) -> Vec<Uuid> {
        self.state.lock().unwrap().deleted_media.clone()
    }

    pub fn deleted_tags(&self) -> Vec<Uuid> {
        self.state.lock().unwrap().deleted_tags.clone()
    }

    pub fn deleted_categories(&self) -> Vec<Uuid> {
        self.state.lock().unwrap().deleted_categories.clone()
    }

    pub fn commits(&self) -> usize {
        self.state.lock().unwrap().commits
    }

    pub fn saved_ids(&self) -> Vec<Uuid> {
        self.state.lock().unwrap().saves.clone()
    }

    pub fn fail_save_of(&self, id: Uuid) {
        self.state.lock().unwrap().failing_saves.insert(id);
    }

    pub fn fail_commits(&self) {
        self.state.lock().unwrap().failing_commits = true;
    }

    pub fn allow_commits(&self) {
        self.state.lock().unwrap().failing_commits = false;
    }

    /// Behave like a pool of one connection: reads fail while a transaction holds it
    pub fn single_connection(&self) {
        self.state.lock().unwrap().single_connection = true;
    }

    pub fn open_transactions(&self) -> usize {
        self.state.lock().unwrap().open_transactions
    }

    fn acquire(&self) -> Result<(), AppError> {
        let state = self.state.lock().unwrap();
        if state.single_connection && state.open_transactions > 0 {
            return Err(AppError::Internal(
                "pool timed out while waiting for an open connection".to_string(),
            ));
        }
        Ok(())
    }

    /// Bump the stored version as if another editor saved the record
    pub fn touch(&self, id: Uuid) {
        let mut state = self.state.lock().unwrap();
        if let Some(media) = state.records.iter_mut().find(|m| m.id == id) {
            media.version += 1;
        }
    }

    pub fn mark_trashed(&self, id: Uuid, key: Option<String>) {
        self.state.lock().unwrap().trashed.insert(id, key);
    }

    /// Live records matching `predicate`, with only the requested collections
    fn query(&self, include: MediaInclude, predicate: impl Fn(&Media) -> bool) -> Vec<Media> {
        let state = self.state.lock().unwrap();
        state
            .records
            .iter()
            .filter(|m| !state.trashed.contains_key(&m.id) && predicate(m))
            .cloned()
            .map(|mut m| {
                if !include.tags {
                    m.tags.clear();
                }
                if !include.categories {
                    m.categories.clear();
                }
                if !include.access_rules {
                    m.access_rules.clear();
                }
                m
            })
            .collect()
    }
}

#[async_trait]
impl MediaRepository for InMemoryMediaStore {
    async fn find(&self, id: Uuid, include: MediaInclude) -> Result<Option<Media>, AppError> {
        self.acquire()?;
        Ok(self.query(include, |m| m.id == id).into_iter().next())
    }

    async fn find_versions(
        &self,
        id: Uuid,
        include: MediaInclude,
    ) -> Result<Vec<Media>, AppError> {
        self.acquire()?;
        Ok(self.query(include, |m| m.is_version_of(id)))
    }

    async fn find_children(&self, folder_id: Uuid) -> Result<Vec<Media>, AppError> {
        self.acquire()?;
        Ok(self.query(MediaInclude::NONE, |m| m.folder_id == Some(folder_id)))
    }

    async fn save(&self, media: &Media) -> Result<Media, AppError> {
        self.acquire()?;
        let mut state = self.state.lock().unwrap();
        if state.failing_saves.contains(&media.id) {
            return Err(AppError::Internal(format!("save of {} failed", media.id)));
        }

        let stored = state
            .records
            .iter_mut()
            .find(|m| m.id == media.id)
            .ok_or_else(|| AppError::NotFound(format!("Media {} not found", media.id)))?;

        if stored.version != media.version {
            return Err(AppError::ConcurrencyConflict {
                entity: "media",
                id: media.id,
                expected: media.version,
                actual: stored.version,
            });
        }

        let mut saved = media.clone();
        saved.version += 1;
        // Collections are not written by save
        saved.tags = stored.tags.clone();
        saved.categories = stored.categories.clone();
        saved.access_rules = stored.access_rules.clone();
        *stored = saved;

        state.saves.push(media.id);
        let mut returned = media.clone();
        returned.version += 1;
        Ok(returned)
    }
}

#[async_trait]
impl UnitOfWork for InMemoryMediaStore {
    async fn begin(&self) -> Result<Box<dyn MediaTransaction>, AppError> {
        self.acquire()?;
        self.state.lock().unwrap().open_transactions += 1;
        Ok(Box::new(InMemoryTransaction {
            state: self.state.clone(),
            pending: Vec::new(),
        }))
    }
}

enum Op {
    DeleteTag(Uuid),
    DeleteCategory(Uuid),
    DeleteAccessRule(Uuid),
    DeleteMedia(Uuid),
    Trash(Uuid, Option<String>),
}

/// Buffers writes and applies them atomically on commit
pub struct InMemoryTransaction {
    state: Arc<Mutex<MediaState>>,
    pending: Vec<Op>,
}

#[async_trait]
impl MediaTransaction for InMemoryTransaction {
    async fn delete_tag(&mut self, tag: &MediaTag) -> Result<(), AppError> {
        self.pending.push(Op::DeleteTag(tag.id));
        Ok(())
    }

    async fn delete_category(&mut self, category: &MediaCategory) -> Result<(), AppError> {
        self.pending.push(Op::DeleteCategory(category.id));
        Ok(())
    }

    async fn delete_access_rule(&mut self, rule: &AccessRule) -> Result<(), AppError> {
        self.pending.push(Op::DeleteAccessRule(rule.id));
        Ok(())
    }

    async fn delete_media(&mut self, media: &Media) -> Result<(), AppError> {
        self.pending.push(Op::DeleteMedia(media.id));
        Ok(())
    }

    async fn mark_trashed(
        &mut self,
        media: &Media,
        trash_key: Option<&str>,
    ) -> Result<(), AppError> {
        self.pending
            .push(Op::Trash(media.id, trash_key.map(str::to_string)));
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        let mut guard = self.state.lock().unwrap();
        if guard.failing_commits {
            return Err(AppError::Internal("commit failed".to_string()));
        }

        // Apply to a copy so a failed commit leaves nothing behind
        let mut records = guard.records.clone();
        let mut trashed = guard.trashed.clone();
        let mut deleted_media = Vec::new();
        let mut deleted_tags = Vec::new();
        let mut deleted_categories = Vec::new();
        let mut deleted_access_rules = Vec::new();

        for op in &self.pending {
            match op {
                Op::DeleteTag(id) => {
                    for media in records.iter_mut() {
                        media.tags.retain(|t| t.id != *id);
                    }
                    deleted_tags.push(*id);
                }
                Op::DeleteCategory(id) => {
                    for media in records.iter_mut() {
                        media.categories.retain(|c| c.id != *id);
                    }
                    deleted_categories.push(*id);
                }
                Op::DeleteAccessRule(id) => {
                    for media in records.iter_mut() {
                        media.access_rules.retain(|r| r.id != *id);
                    }
                    deleted_access_rules.push(*id);
                }
                Op::DeleteMedia(id) => {
                    if let Some(media) = records.iter().find(|m| m.id == *id) {
                        if !media.tags.is_empty() || !media.categories.is_empty() {
                            return Err(AppError::Internal(format!(
                                "foreign key violation deleting media {}",
                                id
                            )));
                        }
                    }
                    records.retain(|m| m.id != *id);
                    deleted_media.push(*id);
                }
                Op::Trash(id, key) => {
                    trashed.insert(*id, key.clone());
                }
            }
        }

        guard.records = records;
        guard.trashed = trashed;
        guard.deleted_media.extend(deleted_media);
        guard.deleted_tags.extend(deleted_tags);
        guard.deleted_categories.extend(deleted_categories);
        guard.deleted_access_rules.extend(deleted_access_rules);
        guard.commits += 1;
        Ok(())
    }
}

impl Drop for InMemoryTransaction {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            state.open_transactions -= 1;
        }
    }
}

/// File mover that trashes records in the store and remembers every call
pub struct RecordingFileMover {
    store: InMemoryMediaStore,
    calls: Mutex<Vec<Vec<Uuid>>>,
    failing: Mutex<HashSet<Uuid>>,
}

impl RecordingFileMover {
    pub fn new(store: InMemoryMediaStore) -> Self {
        Self {
            store,
            calls: Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
        }
    }

    /// Fail any move that includes `id`
    pub fn fail_for(&self, id: Uuid) {
        self.failing.lock().unwrap().insert(id);
    }

    pub fn calls(&self) -> Vec<Vec<Uuid>> {
        self.calls.lock().unwrap().clone()
    }

    pub fn moved(&self) -> HashSet<Uuid> {
        self.calls().into_iter().flatten().collect()
    }
}

#[async_trait]
impl FileMover for RecordingFileMover {
    async fn move_to_trash(&self, versions: &[Media]) -> Result<(), AppError> {
        let ids: Vec<Uuid> = versions.iter().map(|m| m.id).collect();
        let failing = self.failing.lock().unwrap().clone();
        if ids.iter().any(|id| failing.contains(id)) {
            return Err(AppError::Storage("disk unavailable".to_string()));
        }

        for id in &ids {
            self.store.mark_trashed(*id, None);
        }
        self.calls.lock().unwrap().push(ids);
        Ok(())
    }
}

/// Grants read-write everywhere except on the denied items
#[derive(Default)]
pub struct StaticAccessControl {
    denied: Mutex<HashSet<Uuid>>,
    checked: Mutex<Vec<Uuid>>,
}

impl StaticAccessControl {
    pub fn deny(&self, id: Uuid) {
        self.denied.lock().unwrap().insert(id);
    }

    pub fn checked(&self) -> Vec<Uuid> {
        self.checked.lock().unwrap().clone()
    }
}

#[async_trait]
impl AccessControlService for StaticAccessControl {
    async fn get_access_level(
        &self,
        media: &Media,
        _principal: &Principal,
    ) -> Result<AccessLevel, AppError> {
        self.checked.lock().unwrap().push(media.id);
        if self.denied.lock().unwrap().contains(&media.id) {
            Ok(AccessLevel::Read)
        } else {
            Ok(AccessLevel::ReadWrite)
        }
    }
}

#[derive(Default)]
pub struct RecordingPublisher {
    events: Mutex<Vec<MediaEvent>>,
}

impl RecordingPublisher {
    pub fn events(&self) -> Vec<MediaEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.events().iter().map(|e| e.name()).collect()
    }
}

impl MediaEventPublisher for RecordingPublisher {
    fn publish(&self, event: MediaEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// A media service wired to in-memory collaborators
pub struct Harness {
    pub store: InMemoryMediaStore,
    pub mover: Arc<RecordingFileMover>,
    pub access: Arc<StaticAccessControl>,
    pub events: Arc<RecordingPublisher>,
    pub service: MediaService,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_access_control(true)
    }

    pub fn with_access_control(enabled: bool) -> Self {
        let store = InMemoryMediaStore::new();
        let mover = Arc::new(RecordingFileMover::new(store.clone()));
        let access = Arc::new(StaticAccessControl::default());
        let events = Arc::new(RecordingPublisher::default());
        let service = MediaService::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            access.clone(),
            mover.clone(),
            events.clone(),
            enabled,
        );
        Self {
            store,
            mover,
            access,
            events,
            service,
        }
    }
}

pub fn principal() -> Principal {
    Principal::new("editor", vec!["editors".to_string()])
}

pub fn file(title: &str, folder_id: Option<Uuid>) -> Media {
    Media::new_file(
        title,
        folder_id,
        MediaFile {
            file_name: format!("{}.png", title),
            file_extension: Some("png".to_string()),
            file_size: 1024,
            storage_key: Some(format!("media/{}.png", title)),
            public_url: None,
        },
    )
}

pub fn folder(title: &str, folder_id: Option<Uuid>) -> Media {
    Media::new_folder(title, folder_id)
}

/// A stored version of `original`
pub fn version_of(original: &Media, title: &str) -> Media {
    let mut version = file(title, original.folder_id);
    version.original_id = Some(original.id);
    version
}

pub fn archived(mut media: Media) -> Media {
    media.is_archived = true;
    media
}

pub fn with_dependents(mut media: Media) -> Media {
    media.tags.push(MediaTag {
        id: Uuid::new_v4(),
        media_id: media.id,
        tag_id: Uuid::new_v4(),
        tag_name: "brand".to_string(),
    });
    media.categories.push(MediaCategory {
        id: Uuid::new_v4(),
        media_id: media.id,
        category_id: Uuid::new_v4(),
        category_name: "marketing".to_string(),
    });
    media
}

#[derive(Default)]
pub struct InMemoryContentRepository {
    records: Mutex<Vec<Content>>,
}

impl InMemoryContentRepository {
    pub fn add(&self, content: Content) -> Content {
        self.records.lock().unwrap().push(content.clone());
        content
    }

    pub fn get(&self, id: Uuid) -> Option<Content> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id == id)
            .cloned()
    }

    pub fn all(&self) -> Vec<Content> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContentRepository for InMemoryContentRepository {
    async fn find(&self, id: Uuid) -> Result<Option<Content>, AppError> {
        Ok(self.get(id))
    }

    async fn find_draft(&self, original_id: Uuid) -> Result<Option<Content>, AppError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.original_id == Some(original_id) && c.status == ContentStatus::Draft)
            .cloned())
    }

    async fn find_history(&self, original_id: Uuid) -> Result<Vec<Content>, AppError> {
        let mut history: Vec<Content> = self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.original_id == Some(original_id) && c.status == ContentStatus::Archived)
            .cloned()
            .collect();
        history.reverse();
        Ok(history)
    }

    async fn insert(&self, content: &Content) -> Result<Content, AppError> {
        let mut inserted = content.clone();
        inserted.version = 1;
        self.records.lock().unwrap().push(inserted.clone());
        Ok(inserted)
    }

    async fn save(&self, content: &Content) -> Result<Content, AppError> {
        let mut records = self.records.lock().unwrap();
        let stored = records
            .iter_mut()
            .find(|c| c.id == content.id)
            .ok_or_else(|| AppError::NotFound(format!("Content {} not found", content.id)))?;

        if stored.version != content.version {
            return Err(AppError::ConcurrencyConflict {
                entity: "content",
                id: content.id,
                expected: content.version,
                actual: stored.version,
            });
        }

        let mut saved = content.clone();
        saved.version += 1;
        *stored = saved.clone();
        Ok(saved)
    }

    async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        self.records.lock().unwrap().retain(|c| c.id != id);
        Ok(())
    }
}
