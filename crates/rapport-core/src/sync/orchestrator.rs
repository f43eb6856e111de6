//! Source-agnostic sync orchestrator.

use libsql::Connection;

use crate::config::SyncSettings;
use crate::db::{
    Database, LibSqlConflictRepository, LibSqlContactRepository, LibSqlSyncCursorRepository,
    SyncCursorRepository,
};
use crate::error::{Error, Result};
use crate::models::{InboundRecord, Source, SyncCursor};
use crate::util::unix_millis_now;

use super::matcher::find_candidate;
use super::merge::{apply, decide, Applied};
use super::SyncResult;

/// Process one inbound batch for `owner_id` from `source`.
///
/// Records are handled independently: a failing record bumps `errors` and
/// the batch moves on, keeping whatever earlier records already committed.
/// Only batch-level preconditions (blank owner, disabled source, cursor
/// storage) fail the call.
pub async fn run_batch(
    db: &Database,
    settings: &SyncSettings,
    owner_id: &str,
    source: Source,
    records: Vec<InboundRecord>,
    sync_token: Option<&str>,
    is_full_sync: bool,
) -> Result<SyncResult> {
    let owner_id = owner_id.trim();
    if owner_id.is_empty() {
        return Err(Error::InvalidArgument("owner id must not be empty".to_string()));
    }

    let cursors = LibSqlSyncCursorRepository::new(db.connection());
    match cursors.find_cursor(owner_id, source).await? {
        Some(cursor) if !cursor.enabled => return Err(Error::SourceDisabled(source)),
        Some(_) => {}
        None => {
            tracing::info!("First {source} sync for owner {owner_id}; creating cursor");
            cursors.create_cursor(&SyncCursor::new(owner_id, source)).await?;
        }
    }

    tracing::info!(
        "Syncing {} {source} contacts for owner {owner_id} (full sync: {is_full_sync})",
        records.len()
    );

    let mut result = SyncResult::default();
    for record in records {
        let external_id = record.external_id.clone();
        match sync_record(db.connection(), settings, owner_id, source, record).await {
            Ok(applied) => {
                tracing::debug!(
                    "{source} record {external_id}: {:?} on contact {}",
                    applied.action,
                    applied.contact_id
                );
                result.record(applied.action, applied.completed_all_three);
            }
            Err(error) => {
                tracing::error!("Failed to sync {source} contact {external_id}: {error}");
                result.errors += 1;
            }
        }
    }

    cursors
        .record_batch(
            owner_id,
            source,
            unix_millis_now(),
            sync_token,
            result.created,
        )
        .await?;

    tracing::info!(
        "{source} sync complete for owner {owner_id}: created={} updated={} merged={} \
         multi_source_merged={} conflicts={} errors={}",
        result.created,
        result.updated,
        result.merged,
        result.multi_source_merged,
        result.conflicts,
        result.errors
    );
    Ok(result)
}

/// Matcher, then state machine, then the store mutation for one record.
async fn sync_record(
    conn: &Connection,
    settings: &SyncSettings,
    owner_id: &str,
    source: Source,
    record: InboundRecord,
) -> Result<Applied> {
    let record = record.validated()?;
    let contacts = LibSqlContactRepository::new(conn);
    let conflicts = LibSqlConflictRepository::new(conn);

    let existing = find_candidate(&contacts, settings, owner_id, source, &record).await?;
    let action = decide(existing.as_ref(), &record, source, settings.conflict_policy);
    apply(&contacts, &conflicts, owner_id, source, existing, record, action).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::ContactRepository;
    use crate::models::{ProfileFields, SourceType};
    use pretty_assertions::assert_eq;

    fn record(external_id: &str, modified_at: i64, email: &str) -> InboundRecord {
        InboundRecord::new(
            external_id,
            modified_at,
            ProfileFields {
                first_name: Some("Jane".to_string()),
                email: Some(email.to_string()),
                ..ProfileFields::default()
            },
        )
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn bad_records_do_not_abort_the_batch() {
        let db = Database::open_in_memory().await.unwrap();
        let settings = SyncSettings::default();

        let result = run_batch(
            &db,
            &settings,
            "owner",
            Source::Apple,
            vec![
                record("a1", 1_000, "one@x.com"),
                record("  ", 1_000, "blank@x.com"),
                record("a2", 1_000, "two@x.com"),
            ],
            Some("token-1"),
            true,
        )
        .await
        .unwrap();

        assert_eq!(
            result,
            SyncResult {
                created: 2,
                errors: 1,
                ..SyncResult::default()
            }
        );

        let cursor = LibSqlSyncCursorRepository::new(db.connection())
            .find_cursor("owner", Source::Apple)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cursor.total_synced, 2);
        assert_eq!(cursor.sync_token.as_deref(), Some("token-1"));
        assert!(cursor.last_sync_at.is_some());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn same_batch_links_across_records() {
        let db = Database::open_in_memory().await.unwrap();
        let settings = SyncSettings::default();
        run_batch(
            &db,
            &settings,
            "owner",
            Source::Google,
            vec![record("g1", 1_000, "j@x.com")],
            None,
            false,
        )
        .await
        .unwrap();

        let result = run_batch(
            &db,
            &settings,
            "owner",
            Source::Outlook,
            vec![record("o1", 1_000, "j@x.com"), record("o1", 1_000, "j@x.com")],
            None,
            false,
        )
        .await
        .unwrap();
        assert_eq!(result.merged, 1);
        assert_eq!(result.updated, 1);

        let contacts = LibSqlContactRepository::new(db.connection())
            .list_contacts_by_source_type("owner", SourceType::GoogleOutlook)
            .await
            .unwrap();
        assert_eq!(contacts.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn disabled_source_rejects_batch() {
        let db = Database::open_in_memory().await.unwrap();
        let cursors = LibSqlSyncCursorRepository::new(db.connection());
        cursors
            .create_cursor(&SyncCursor::new("owner", Source::Apple))
            .await
            .unwrap();
        cursors
            .set_enabled("owner", Source::Apple, false)
            .await
            .unwrap();

        let result = run_batch(
            &db,
            &SyncSettings::default(),
            "owner",
            Source::Apple,
            vec![record("a1", 1_000, "j@x.com")],
            None,
            false,
        )
        .await;
        assert!(matches!(result, Err(Error::SourceDisabled(Source::Apple))));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn blank_owner_is_rejected() {
        let db = Database::open_in_memory().await.unwrap();
        let result = run_batch(
            &db,
            &SyncSettings::default(),
            " ",
            Source::Google,
            Vec::new(),
            None,
            false,
        )
        .await;
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }
}
