//! Per-owner, per-source sync bookkeeping

use serde::{Deserialize, Serialize};

use super::source::Source;

/// The last successful sync point for one owner and one source.
///
/// Created on first sync, updated after every batch, never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncCursor {
    pub owner_id: String,
    pub source: Source,
    /// Disconnecting a source only clears this flag
    pub enabled: bool,
    /// End of the last batch (Unix ms)
    pub last_sync_at: Option<i64>,
    /// Opaque continuation token handed back by the source
    pub sync_token: Option<String>,
    /// Contacts created by this source over all batches
    pub total_synced: i64,
    pub created_at: i64,
}

impl SyncCursor {
    /// A fresh, enabled cursor with nothing synced yet.
    #[must_use]
    pub fn new(owner_id: impl Into<String>, source: Source) -> Self {
        Self {
            owner_id: owner_id.into(),
            source,
            enabled: true,
            last_sync_at: None,
            sync_token: None,
            total_synced: 0,
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }
}
