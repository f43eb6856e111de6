//! Orchestrator-level sync state for one owner and source.

use serde::{Deserialize, Serialize};

/// NotStarted -> Syncing on the first batch, Syncing -> Idle when any batch ends.
///
/// Batches are not resumable; there is no partial-batch checkpoint state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    #[default]
    NotStarted,
    Syncing,
    Idle,
}
