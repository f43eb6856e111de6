//! Sync cursor repository implementation

use libsql::{Connection, Row, Value};

use crate::error::{Error, Result};
use crate::models::{Source, SyncCursor};

use super::rows::{int, int_param, opt_int, opt_text, parse_column, text, text_param};

const CURSOR_COLUMNS: &str =
    "owner_id, source, enabled, last_sync_at, sync_token, total_synced, created_at";

/// Trait for per-owner, per-source sync bookkeeping (async)
#[allow(async_fn_in_trait)]
pub trait SyncCursorRepository {
    async fn find_cursor(&self, owner_id: &str, source: Source) -> Result<Option<SyncCursor>>;

    async fn create_cursor(&self, cursor: &SyncCursor) -> Result<()>;

    /// Record the end of a batch: stamp the sync time, replace the token,
    /// and add `created` to the cumulative total
    async fn record_batch(
        &self,
        owner_id: &str,
        source: Source,
        last_sync_at: i64,
        sync_token: Option<&str>,
        created: u64,
    ) -> Result<SyncCursor>;

    /// Enable or disable a source without touching its history
    async fn set_enabled(
        &self,
        owner_id: &str,
        source: Source,
        enabled: bool,
    ) -> Result<SyncCursor>;
}

/// libSQL implementation of `SyncCursorRepository`
pub struct LibSqlSyncCursorRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlSyncCursorRepository<'a> {
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn parse_cursor(row: &Row) -> Result<SyncCursor> {
        let source = text(row, 1)?;
        Ok(SyncCursor {
            owner_id: text(row, 0)?,
            source: parse_column(&source, "source")?,
            enabled: int(row, 2)? != 0,
            last_sync_at: opt_int(row, 3)?,
            sync_token: opt_text(row, 4)?,
            total_synced: int(row, 5)?,
            created_at: int(row, 6)?,
        })
    }

    async fn require_cursor(&self, owner_id: &str, source: Source) -> Result<SyncCursor> {
        self.find_cursor(owner_id, source).await?.ok_or_else(|| {
            Error::NotFound(format!("{source} sync cursor for owner {owner_id}"))
        })
    }
}

impl SyncCursorRepository for LibSqlSyncCursorRepository<'_> {
    async fn find_cursor(&self, owner_id: &str, source: Source) -> Result<Option<SyncCursor>> {
        let sql = format!(
            "SELECT {CURSOR_COLUMNS} FROM sync_cursors WHERE owner_id = ? AND source = ?"
        );
        let mut rows = self
            .conn
            .query(&sql, [owner_id, source.as_str()])
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_cursor(&row)?)),
            None => Ok(None),
        }
    }

    async fn create_cursor(&self, cursor: &SyncCursor) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO sync_cursors (
                    owner_id, source, enabled, last_sync_at, sync_token, total_synced, created_at
                 ) VALUES (?, ?, ?, ?, ?, ?, ?)",
                vec![
                    Value::Text(cursor.owner_id.clone()),
                    Value::Text(cursor.source.as_str().to_string()),
                    Value::Integer(i64::from(cursor.enabled)),
                    int_param(cursor.last_sync_at),
                    text_param(cursor.sync_token.as_deref()),
                    Value::Integer(cursor.total_synced),
                    Value::Integer(cursor.created_at),
                ],
            )
            .await?;
        Ok(())
    }

    async fn record_batch(
        &self,
        owner_id: &str,
        source: Source,
        last_sync_at: i64,
        sync_token: Option<&str>,
        created: u64,
    ) -> Result<SyncCursor> {
        let rows = self
            .conn
            .execute(
                "UPDATE sync_cursors
                 SET last_sync_at = ?, sync_token = ?, total_synced = total_synced + ?
                 WHERE owner_id = ? AND source = ?",
                vec![
                    Value::Integer(last_sync_at),
                    text_param(sync_token),
                    Value::Integer(i64::try_from(created).unwrap_or(i64::MAX)),
                    Value::Text(owner_id.to_string()),
                    Value::Text(source.as_str().to_string()),
                ],
            )
            .await?;

        if rows == 0 {
            return Err(Error::NotFound(format!(
                "{source} sync cursor for owner {owner_id}"
            )));
        }
        self.require_cursor(owner_id, source).await
    }

    async fn set_enabled(
        &self,
        owner_id: &str,
        source: Source,
        enabled: bool,
    ) -> Result<SyncCursor> {
        self.conn
            .execute(
                "UPDATE sync_cursors SET enabled = ? WHERE owner_id = ? AND source = ?",
                vec![
                    Value::Integer(i64::from(enabled)),
                    Value::Text(owner_id.to_string()),
                    Value::Text(source.as_str().to_string()),
                ],
            )
            .await?;
        self.require_cursor(owner_id, source).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use pretty_assertions::assert_eq;

    #[tokio::test(flavor = "multi_thread")]
    async fn test_create_and_find_cursor() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = LibSqlSyncCursorRepository::new(db.connection());

        assert!(repo
            .find_cursor("owner", Source::Apple)
            .await
            .unwrap()
            .is_none());

        let cursor = SyncCursor::new("owner", Source::Apple);
        repo.create_cursor(&cursor).await.unwrap();

        let fetched = repo
            .find_cursor("owner", Source::Apple)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched, cursor);
        assert!(repo
            .find_cursor("owner", Source::Google)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_record_batch_accumulates_total() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = LibSqlSyncCursorRepository::new(db.connection());
        repo.create_cursor(&SyncCursor::new("owner", Source::Google))
            .await
            .unwrap();

        repo.record_batch("owner", Source::Google, 1_000, Some("page-1"), 3)
            .await
            .unwrap();
        let cursor = repo
            .record_batch("owner", Source::Google, 2_000, None, 2)
            .await
            .unwrap();

        assert_eq!(cursor.total_synced, 5);
        assert_eq!(cursor.last_sync_at, Some(2_000));
        assert_eq!(cursor.sync_token, None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_record_batch_requires_cursor() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = LibSqlSyncCursorRepository::new(db.connection());

        let result = repo
            .record_batch("owner", Source::Outlook, 1_000, None, 1)
            .await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_set_enabled_keeps_history() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = LibSqlSyncCursorRepository::new(db.connection());
        repo.create_cursor(&SyncCursor::new("owner", Source::Outlook))
            .await
            .unwrap();
        repo.record_batch("owner", Source::Outlook, 1_000, Some("delta"), 4)
            .await
            .unwrap();

        let disabled = repo
            .set_enabled("owner", Source::Outlook, false)
            .await
            .unwrap();
        assert!(!disabled.enabled);
        assert_eq!(disabled.total_synced, 4);
        assert_eq!(disabled.sync_token.as_deref(), Some("delta"));

        let missing = repo.set_enabled("other", Source::Outlook, false).await;
        assert!(matches!(missing, Err(Error::NotFound(_))));
    }
}
