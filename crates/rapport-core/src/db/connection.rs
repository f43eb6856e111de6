//! Database connection management

use crate::error::{Error, Result};
use libsql::{Builder, Connection, Database as LibSqlDatabase};
use std::path::Path;

use super::migrations;

/// Database wrapper for libSQL connections
pub struct Database {
    _db: LibSqlDatabase,
    conn: Connection,
}

impl Database {
    /// Open a local database at the given path, creating it if it doesn't exist
    ///
    /// Runs migrations automatically.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();
        Self::open_local(&path_str).await
    }

    /// Open an in-memory database (useful for testing)
    pub async fn open_in_memory() -> Result<Self> {
        Self::open_local(":memory:").await
    }

    async fn open_local(path: &str) -> Result<Self> {
        let db = Builder::new_local(path).build().await?;
        let conn = db.connect()?;

        let database = Self { _db: db, conn };
        database.configure().await?;
        database.migrate().await?;
        Ok(database)
    }

    /// Configure `SQLite` for optimal performance
    async fn configure(&self) -> Result<()> {
        // WAL is unavailable for in-memory databases
        self.conn
            .execute("PRAGMA journal_mode = WAL;", ())
            .await
            .ok();
        self.conn
            .execute("PRAGMA synchronous = NORMAL;", ())
            .await
            .ok();
        self.conn.execute("PRAGMA foreign_keys = ON;", ()).await?;
        self.conn
            .execute("PRAGMA busy_timeout = 5000;", ())
            .await
            .ok();
        Ok(())
    }

    /// Run database migrations
    async fn migrate(&self) -> Result<()> {
        migrations::run(&self.conn).await
    }

    /// Get a reference to the underlying connection
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Run `BEGIN`; pair with [`Database::commit`] or [`Database::rollback`].
    pub async fn begin(&self) -> Result<()> {
        self.conn.execute("BEGIN TRANSACTION", ()).await?;
        Ok(())
    }

    pub async fn commit(&self) -> Result<()> {
        if let Err(error) = self.conn.execute("COMMIT", ()).await {
            self.rollback().await;
            return Err(Error::from(error));
        }
        Ok(())
    }

    /// Roll back the open transaction, ignoring "no transaction" errors.
    pub async fn rollback(&self) {
        if let Err(error) = self.conn.execute("ROLLBACK", ()).await {
            tracing::debug!("Rollback skipped: {error}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test(flavor = "multi_thread")]
    async fn test_open_in_memory() {
        let db = Database::open_in_memory().await.unwrap();
        let mut rows = db.connection().query("SELECT 1", ()).await.unwrap();
        let row = rows.next().await.unwrap().unwrap();
        assert_eq!(row.get::<i32>(0).unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_open_on_disk_twice() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("rapport.db");

        drop(Database::open(&path).await.unwrap());
        // Reopening re-runs migrations against an existing schema
        let db = Database::open(&path).await.unwrap();
        assert!(path.exists());

        let mut rows = db
            .connection()
            .query("SELECT COUNT(*) FROM contacts", ())
            .await
            .unwrap();
        let row = rows.next().await.unwrap().unwrap();
        assert_eq!(row.get::<i64>(0).unwrap(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_rollback_discards_writes() {
        let db = Database::open_in_memory().await.unwrap();
        db.begin().await.unwrap();
        db.connection()
            .execute(
                "INSERT INTO sync_cursors (owner_id, source, enabled, total_synced, created_at)
                 VALUES ('owner', 'apple', 1, 0, 0)",
                (),
            )
            .await
            .unwrap();
        db.rollback().await;

        let mut rows = db
            .connection()
            .query("SELECT COUNT(*) FROM sync_cursors", ())
            .await
            .unwrap();
        let row = rows.next().await.unwrap().unwrap();
        assert_eq!(row.get::<i64>(0).unwrap(), 0);
    }
}
