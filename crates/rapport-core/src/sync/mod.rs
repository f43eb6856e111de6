//! Multi-source identity resolution.
//!
//! One batch flows through the orchestrator; per record the matcher finds a
//! candidate contact, the merge state machine decides what to do with it,
//! and the decided action is applied to the contact or conflict store.

mod matcher;
mod merge;
mod orchestrator;
mod resolver;

use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::{Source, SourceType};
use crate::state::SyncState;

pub use matcher::find_candidate;
pub use merge::{decide, MergeAction};
pub use orchestrator::run_batch;
pub use resolver::{resolve, Resolution};

/// Aggregated counters for one `sync_batch` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResult {
    pub created: u64,
    pub updated: u64,
    /// AttachSource actions, including the three-way ones
    pub merged: u64,
    /// AttachSource actions that completed an `all_three` link
    pub multi_source_merged: u64,
    pub conflicts: u64,
    pub errors: u64,
}

impl SyncResult {
    /// Records that reached a store without error.
    pub const fn processed(&self) -> u64 {
        self.created + self.updated + self.merged + self.conflicts
    }

    pub(crate) fn record(&mut self, action: MergeAction, completed_all_three: bool) {
        match action {
            MergeAction::Create => self.created += 1,
            MergeAction::Update => self.updated += 1,
            MergeAction::Conflict => self.conflicts += 1,
            MergeAction::AttachSource => {
                self.merged += 1;
                if completed_all_three {
                    self.multi_source_merged += 1;
                }
            }
        }
    }
}

/// Sync bookkeeping for one owner and source, as reported to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub source: Source,
    pub state: SyncState,
    pub enabled: bool,
    pub last_sync_at: Option<i64>,
    pub sync_token: Option<String>,
    pub total_synced: i64,
    /// Unresolved conflicts across all of the owner's sources
    pub unresolved_conflicts: u64,
    /// The owner's contacts per source tag
    pub breakdown: BTreeMap<SourceType, u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn three_way_attach_counts_as_merge() {
        let mut result = SyncResult::default();
        result.record(MergeAction::AttachSource, false);
        result.record(MergeAction::AttachSource, true);
        result.record(MergeAction::Create, false);
        result.record(MergeAction::Conflict, false);

        assert_eq!(
            result,
            SyncResult {
                created: 1,
                merged: 2,
                multi_source_merged: 1,
                conflicts: 1,
                ..SyncResult::default()
            }
        );
        assert_eq!(result.processed(), 4);
    }

    #[test]
    fn result_serializes_camel_case() {
        let json = serde_json::to_value(SyncResult::default()).unwrap();
        assert!(json.get("multiSourceMerged").is_some());
    }
}
