//! Thread-safe contact sync service.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::config::SyncSettings;
use crate::db::{
    ConflictRepository, ContactRepository, Database, LibSqlConflictRepository,
    LibSqlContactRepository, LibSqlSyncCursorRepository, SyncCursorRepository,
};
use crate::error::{Error, Result};
use crate::models::{
    Conflict, ConflictId, Contact, ContactId, ContactPatch, InboundRecord, ProfileFields,
    ResolutionStrategy, Source, SourceRecord, SourceType, SyncCursor,
};
use crate::state::SyncState;
use crate::sync::{self, Resolution, SyncResult, SyncStatus};
use crate::util::unix_millis_now;

type StateKey = (String, Source);

/// Entry point for the boundary operations.
///
/// The database sits behind one async mutex. A batch holds it from cursor
/// check to cursor update, so mutations to any single contact are
/// serialized across concurrently syncing sources.
#[derive(Clone)]
pub struct ContactSyncService {
    db: Arc<Mutex<Database>>,
    db_path: Option<PathBuf>,
    settings: SyncSettings,
    states: Arc<Mutex<HashMap<StateKey, SyncState>>>,
}

impl ContactSyncService {
    /// Open a service backed by a database file, creating parent directories.
    pub async fn open_path(db_path: impl Into<PathBuf>, settings: SyncSettings) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::open(&db_path).await?;
        tracing::info!("Opened contact database at {}", db_path.display());
        Ok(Self::from_database(db, Some(db_path), settings))
    }

    /// Open an in-memory service (primarily for tests).
    pub async fn open_in_memory(settings: SyncSettings) -> Result<Self> {
        let db = Database::open_in_memory().await?;
        Ok(Self::from_database(db, None, settings))
    }

    fn from_database(db: Database, db_path: Option<PathBuf>, settings: SyncSettings) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
            db_path,
            settings,
            states: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    pub const fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    /// Process one inbound batch from `source` for `owner_id`.
    pub async fn sync_batch(
        &self,
        owner_id: &str,
        source: Source,
        records: Vec<InboundRecord>,
        sync_token: Option<&str>,
        is_full_sync: bool,
    ) -> Result<SyncResult> {
        let key = (owner_id.trim().to_string(), source);
        let previous = self
            .states
            .lock()
            .await
            .insert(key.clone(), SyncState::Syncing);

        let result = {
            let db = self.db.lock().await;
            sync::run_batch(
                &db,
                &self.settings,
                owner_id,
                source,
                records,
                sync_token,
                is_full_sync,
            )
            .await
        };

        // A rejected batch leaves the state where it was.
        let mut states = self.states.lock().await;
        match (&result, previous) {
            (Ok(_), _) => {
                states.insert(key, SyncState::Idle);
            }
            (Err(_), Some(state)) => {
                states.insert(key, state);
            }
            (Err(_), None) => {
                states.remove(&key);
            }
        }
        result
    }

    /// Map source-shaped records through their adapter, then sync them.
    ///
    /// Records the adapter rejects (such as an unparseable modification
    /// time) are counted as errors alongside the engine's own.
    pub async fn sync_source_batch<T: SourceRecord>(
        &self,
        owner_id: &str,
        records: &[T],
        sync_token: Option<&str>,
        is_full_sync: bool,
    ) -> Result<SyncResult> {
        let mut inbound = Vec::with_capacity(records.len());
        let mut rejected = 0;
        for record in records {
            match record.to_inbound() {
                Ok(record) => inbound.push(record),
                Err(error) => {
                    tracing::error!("Skipping {} record: {error}", T::SOURCE);
                    rejected += 1;
                }
            }
        }

        let mut result = self
            .sync_batch(owner_id, T::SOURCE, inbound, sync_token, is_full_sync)
            .await?;
        result.errors += rejected;
        Ok(result)
    }

    /// Cursor, orchestrator state and conflict counts for one source.
    pub async fn get_sync_status(&self, owner_id: &str, source: Source) -> Result<SyncStatus> {
        let state = self.state(owner_id, source).await;
        let db = self.db.lock().await;
        let cursor = LibSqlSyncCursorRepository::new(db.connection())
            .find_cursor(owner_id, source)
            .await?;
        let unresolved_conflicts = LibSqlConflictRepository::new(db.connection())
            .count_unresolved(owner_id)
            .await?;
        let breakdown: BTreeMap<SourceType, u64> = LibSqlContactRepository::new(db.connection())
            .count_by_source_type(owner_id)
            .await?
            .into_iter()
            .collect();

        Ok(match cursor {
            Some(cursor) => SyncStatus {
                source,
                state,
                enabled: cursor.enabled,
                last_sync_at: cursor.last_sync_at,
                sync_token: cursor.sync_token,
                total_synced: cursor.total_synced,
                unresolved_conflicts,
                breakdown,
            },
            None => SyncStatus {
                source,
                state,
                enabled: false,
                last_sync_at: None,
                sync_token: None,
                total_synced: 0,
                unresolved_conflicts,
                breakdown,
            },
        })
    }

    /// Unresolved conflicts for an owner, oldest first.
    pub async fn list_conflicts(&self, owner_id: &str) -> Result<Vec<Conflict>> {
        let db = self.db.lock().await;
        let repo = LibSqlConflictRepository::new(db.connection());
        repo.list_unresolved(owner_id).await
    }

    pub async fn get_conflict(&self, id: ConflictId) -> Result<Option<Conflict>> {
        let db = self.db.lock().await;
        let repo = LibSqlConflictRepository::new(db.connection());
        repo.find_conflict(id).await
    }

    /// Settle a conflict; `manual` is required for the manual strategy.
    pub async fn resolve_conflict(
        &self,
        id: ConflictId,
        strategy: ResolutionStrategy,
        manual: Option<ProfileFields>,
    ) -> Result<Resolution> {
        let db = self.db.lock().await;
        sync::resolve(&db, id, strategy, manual).await
    }

    /// Enable a source, creating its cursor on first use.
    pub async fn connect(&self, owner_id: &str, source: Source) -> Result<SyncCursor> {
        let owner_id = owner_id.trim();
        if owner_id.is_empty() {
            return Err(Error::InvalidArgument("owner id must not be empty".to_string()));
        }

        let db = self.db.lock().await;
        let repo = LibSqlSyncCursorRepository::new(db.connection());
        let cursor = match repo.find_cursor(owner_id, source).await? {
            Some(cursor) if cursor.enabled => cursor,
            Some(_) => repo.set_enabled(owner_id, source, true).await?,
            None => {
                let cursor = SyncCursor::new(owner_id, source);
                repo.create_cursor(&cursor).await?;
                cursor
            }
        };
        tracing::info!("{source} sync enabled for owner {owner_id}");
        Ok(cursor)
    }

    /// Stop accepting batches from a source; its history is kept.
    pub async fn disconnect(&self, owner_id: &str, source: Source) -> Result<SyncCursor> {
        let db = self.db.lock().await;
        let repo = LibSqlSyncCursorRepository::new(db.connection());
        let cursor = repo.set_enabled(owner_id.trim(), source, false).await?;
        tracing::info!("{source} sync disabled for owner {}", cursor.owner_id);
        Ok(cursor)
    }

    /// Create a contact by hand, with no external source.
    pub async fn create_contact(&self, owner_id: &str, profile: ProfileFields) -> Result<Contact> {
        let owner_id = owner_id.trim();
        if owner_id.is_empty() {
            return Err(Error::InvalidArgument("owner id must not be empty".to_string()));
        }

        let db = self.db.lock().await;
        let repo = LibSqlContactRepository::new(db.connection());
        repo.create_contact(&Contact::new_manual(owner_id, profile)).await
    }

    /// Replace a contact's profile as a local edit.
    ///
    /// Moves the local clock to now, so an older re-sync of the same source
    /// becomes a conflict instead of overwriting the edit.
    pub async fn edit_contact(&self, id: &ContactId, profile: ProfileFields) -> Result<Contact> {
        let db = self.db.lock().await;
        let repo = LibSqlContactRepository::new(db.connection());
        repo.update_contact(
            id,
            ContactPatch {
                profile: Some(profile),
                updated_at: Some(unix_millis_now()),
                ..ContactPatch::default()
            },
        )
        .await
    }

    pub async fn get_contact(&self, id: &ContactId) -> Result<Option<Contact>> {
        let db = self.db.lock().await;
        let repo = LibSqlContactRepository::new(db.connection());
        repo.get_contact(id).await
    }

    /// Contacts carrying exactly the given source tag.
    pub async fn list_contacts_by_source_type(
        &self,
        owner_id: &str,
        source_type: SourceType,
    ) -> Result<Vec<Contact>> {
        let db = self.db.lock().await;
        let repo = LibSqlContactRepository::new(db.connection());
        repo.list_contacts_by_source_type(owner_id, source_type).await
    }

    /// Contacts linked to Apple, Google and Outlook at once.
    pub async fn list_multi_source_contacts(&self, owner_id: &str) -> Result<Vec<Contact>> {
        self.list_contacts_by_source_type(owner_id, SourceType::AllThree).await
    }

    async fn state(&self, owner_id: &str, source: Source) -> SyncState {
        self.states
            .lock()
            .await
            .get(&(owner_id.trim().to_string(), source))
            .copied()
            .unwrap_or_default()
    }
}
