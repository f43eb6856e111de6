//! Database migrations

use crate::error::Result;
use libsql::Connection;

/// Current schema version
const CURRENT_VERSION: i32 = 2;

/// Run all pending migrations
pub async fn run(conn: &Connection) -> Result<()> {
    let version = get_version(conn).await?;

    if version < 1 {
        migrate_v1(conn).await?;
    }
    if version < 2 {
        migrate_v2(conn).await?;
    }

    Ok(())
}

/// Get the current schema version
async fn get_version(conn: &Connection) -> Result<i32> {
    let mut rows = conn
        .query(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
            (),
        )
        .await?;

    let exists: bool = if let Some(row) = rows.next().await? {
        row.get::<i32>(0)? != 0
    } else {
        false
    };

    if !exists {
        return Ok(0);
    }

    let mut rows = conn
        .query("SELECT COALESCE(MAX(version), 0) FROM schema_version", ())
        .await?;

    let version: i32 = if let Some(row) = rows.next().await? {
        row.get(0)?
    } else {
        0
    };

    Ok(version)
}

/// Execute statements in one transaction, rolling back on the first failure.
async fn apply(conn: &Connection, statements: &[&str]) -> Result<()> {
    conn.execute("BEGIN TRANSACTION", ()).await?;

    for stmt in statements {
        if let Err(e) = conn.execute(stmt, ()).await {
            conn.execute("ROLLBACK", ()).await.ok();
            return Err(e.into());
        }
    }

    if let Err(e) = conn.execute("COMMIT", ()).await {
        conn.execute("ROLLBACK", ()).await.ok();
        return Err(e.into());
    }

    Ok(())
}

/// Migration to version 1: contacts and per-source sync cursors
async fn migrate_v1(conn: &Connection) -> Result<()> {
    apply(
        conn,
        &[
            "CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY
            )",
            "CREATE TABLE IF NOT EXISTS contacts (
                id TEXT PRIMARY KEY,
                owner_id TEXT NOT NULL,
                apple_id TEXT,
                google_id TEXT,
                outlook_id TEXT,
                source_type TEXT NOT NULL DEFAULT 'manual',
                first_name TEXT,
                last_name TEXT,
                email TEXT COLLATE NOCASE,
                phone TEXT,
                company TEXT,
                job_title TEXT,
                notes TEXT,
                apple_modified_at INTEGER,
                google_modified_at INTEGER,
                outlook_modified_at INTEGER,
                sync_version INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )",
            // At most one contact per (owner, source, external id)
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_contacts_owner_apple
                ON contacts(owner_id, apple_id) WHERE apple_id IS NOT NULL",
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_contacts_owner_google
                ON contacts(owner_id, google_id) WHERE google_id IS NOT NULL",
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_contacts_owner_outlook
                ON contacts(owner_id, outlook_id) WHERE outlook_id IS NOT NULL",
            "CREATE INDEX IF NOT EXISTS idx_contacts_owner_email ON contacts(owner_id, email)",
            "CREATE INDEX IF NOT EXISTS idx_contacts_owner_source_type
                ON contacts(owner_id, source_type)",
            "CREATE TABLE IF NOT EXISTS sync_cursors (
                owner_id TEXT NOT NULL,
                source TEXT NOT NULL,
                enabled INTEGER NOT NULL DEFAULT 1,
                last_sync_at INTEGER,
                sync_token TEXT,
                total_synced INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL,
                PRIMARY KEY (owner_id, source)
            )",
            "INSERT INTO schema_version (version) VALUES (1)",
        ],
    )
    .await?;

    tracing::info!("Migrated database to version 1");
    Ok(())
}

/// Migration to version 2: conflict audit trail
async fn migrate_v2(conn: &Connection) -> Result<()> {
    apply(
        conn,
        &[
            "CREATE TABLE IF NOT EXISTS sync_conflicts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                contact_id TEXT NOT NULL REFERENCES contacts(id),
                owner_id TEXT NOT NULL,
                source TEXT NOT NULL,
                conflict_type TEXT NOT NULL DEFAULT 'update',
                local_data TEXT NOT NULL,
                remote_data TEXT NOT NULL,
                remote_modified_at INTEGER NOT NULL,
                resolved INTEGER NOT NULL DEFAULT 0,
                resolution_strategy TEXT,
                created_at INTEGER NOT NULL,
                resolved_at INTEGER
            )",
            "CREATE INDEX IF NOT EXISTS idx_sync_conflicts_owner_resolved
                ON sync_conflicts(owner_id, resolved)",
            "CREATE INDEX IF NOT EXISTS idx_sync_conflicts_contact
                ON sync_conflicts(contact_id, source, remote_modified_at)",
            "INSERT INTO schema_version (version) VALUES (2)",
        ],
    )
    .await?;

    tracing::info!("Migrated database to version {CURRENT_VERSION}");
    Ok(())
}
