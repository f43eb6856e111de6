//! Conflict repository implementation

use libsql::{Connection, Row, Value};

use crate::error::{Error, Result};
use crate::models::{
    Conflict, ConflictId, ConflictKind, ContactId, NewConflict, ResolutionStrategy, Source,
};
use crate::util::unix_millis_now;

use super::rows::{int, opt_int, opt_text, parse_column, text};

const CONFLICT_COLUMNS: &str = "id, contact_id, owner_id, source, conflict_type,
    local_data, remote_data, resolved, resolution_strategy, created_at, resolved_at";

/// Trait for conflict audit-trail storage (async)
#[allow(async_fn_in_trait)]
pub trait ConflictRepository {
    /// Record a new unresolved conflict
    async fn create_conflict(&self, conflict: &NewConflict) -> Result<Conflict>;

    /// Get a conflict by ID
    async fn find_conflict(&self, id: ConflictId) -> Result<Option<Conflict>>;

    /// Flip a conflict to resolved; fails if it was already resolved
    async fn mark_resolved(
        &self,
        id: ConflictId,
        strategy: ResolutionStrategy,
        resolved_at: i64,
    ) -> Result<Conflict>;

    /// Count the owner's unresolved conflicts
    async fn count_unresolved(&self, owner_id: &str) -> Result<u64>;

    /// List the owner's unresolved conflicts, oldest first
    async fn list_unresolved(&self, owner_id: &str) -> Result<Vec<Conflict>>;

    /// Find an unresolved conflict already recorded for this exact remote edit
    async fn find_unresolved_for_edit(
        &self,
        contact_id: &ContactId,
        source: Source,
        remote_modified_at: i64,
    ) -> Result<Option<Conflict>>;
}

/// libSQL implementation of `ConflictRepository`
pub struct LibSqlConflictRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlConflictRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn parse_conflict(row: &Row) -> Result<Conflict> {
        let contact_id = text(row, 1)?;
        let source = text(row, 3)?;
        let kind = text(row, 4)?;
        let strategy = opt_text(row, 8)?
            .map(|raw| parse_column::<ResolutionStrategy>(&raw, "resolution_strategy"))
            .transpose()?;

        Ok(Conflict {
            id: int(row, 0)?,
            contact_id: parse_column(&contact_id, "contact_id")?,
            owner_id: text(row, 2)?,
            source: parse_column(&source, "source")?,
            kind: match kind.as_str() {
                "update" => ConflictKind::Update,
                other => return Err(Error::Database(format!("invalid conflict_type: {other}"))),
            },
            local_snapshot: serde_json::from_str(&text(row, 5)?)?,
            remote_snapshot: serde_json::from_str(&text(row, 6)?)?,
            resolved: int(row, 7)? != 0,
            resolution_strategy: strategy,
            created_at: int(row, 9)?,
            resolved_at: opt_int(row, 10)?,
        })
    }

    async fn query_many(&self, sql: &str, params: Vec<Value>) -> Result<Vec<Conflict>> {
        let mut rows = self.conn.query(sql, params).await?;
        let mut conflicts = Vec::new();
        while let Some(row) = rows.next().await? {
            conflicts.push(Self::parse_conflict(&row)?);
        }
        Ok(conflicts)
    }
}

impl ConflictRepository for LibSqlConflictRepository<'_> {
    async fn create_conflict(&self, conflict: &NewConflict) -> Result<Conflict> {
        let local = &conflict.local_snapshot;
        let created_at = unix_millis_now();

        let mut rows = self
            .conn
            .query(
                "INSERT INTO sync_conflicts (
                    contact_id, owner_id, source, conflict_type,
                    local_data, remote_data, remote_modified_at, resolved, created_at
                 ) VALUES (?, ?, ?, ?, ?, ?, ?, 0, ?)
                 RETURNING id",
                vec![
                    Value::Text(local.id.as_str()),
                    Value::Text(local.owner_id.clone()),
                    Value::Text(conflict.source.as_str().to_string()),
                    Value::Text(conflict.kind.as_str().to_string()),
                    Value::Text(serde_json::to_string(local)?),
                    Value::Text(serde_json::to_string(&conflict.remote_snapshot)?),
                    Value::Integer(conflict.remote_snapshot.modified_at),
                    Value::Integer(created_at),
                ],
            )
            .await?;

        let id = match rows.next().await? {
            Some(row) => int(&row, 0)?,
            None => return Err(Error::Database("conflict insert returned no id".to_string())),
        };

        Ok(Conflict {
            id,
            contact_id: local.id,
            owner_id: local.owner_id.clone(),
            source: conflict.source,
            kind: conflict.kind,
            local_snapshot: local.clone(),
            remote_snapshot: conflict.remote_snapshot.clone(),
            resolved: false,
            resolution_strategy: None,
            created_at,
            resolved_at: None,
        })
    }

    async fn find_conflict(&self, id: ConflictId) -> Result<Option<Conflict>> {
        let sql = format!("SELECT {CONFLICT_COLUMNS} FROM sync_conflicts WHERE id = ?");
        Ok(self
            .query_many(&sql, vec![Value::Integer(id)])
            .await?
            .into_iter()
            .next())
    }

    async fn mark_resolved(
        &self,
        id: ConflictId,
        strategy: ResolutionStrategy,
        resolved_at: i64,
    ) -> Result<Conflict> {
        let rows = self
            .conn
            .execute(
                "UPDATE sync_conflicts
                 SET resolved = 1, resolution_strategy = ?, resolved_at = ?
                 WHERE id = ? AND resolved = 0",
                vec![
                    Value::Text(strategy.as_str().to_string()),
                    Value::Integer(resolved_at),
                    Value::Integer(id),
                ],
            )
            .await?;

        let conflict = self
            .find_conflict(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("conflict {id}")))?;
        if rows == 0 {
            return Err(Error::AlreadyResolved(id));
        }
        Ok(conflict)
    }

    async fn count_unresolved(&self, owner_id: &str) -> Result<u64> {
        let mut rows = self
            .conn
            .query(
                "SELECT COUNT(*) FROM sync_conflicts WHERE owner_id = ? AND resolved = 0",
                [owner_id],
            )
            .await?;

        let count = match rows.next().await? {
            Some(row) => int(&row, 0)?,
            None => 0,
        };
        Ok(u64::try_from(count).unwrap_or_default())
    }

    async fn list_unresolved(&self, owner_id: &str) -> Result<Vec<Conflict>> {
        let sql = format!(
            "SELECT {CONFLICT_COLUMNS} FROM sync_conflicts
             WHERE owner_id = ? AND resolved = 0
             ORDER BY created_at ASC, id ASC"
        );
        self.query_many(&sql, vec![Value::Text(owner_id.to_string())])
            .await
    }

    async fn find_unresolved_for_edit(
        &self,
        contact_id: &ContactId,
        source: Source,
        remote_modified_at: i64,
    ) -> Result<Option<Conflict>> {
        let sql = format!(
            "SELECT {CONFLICT_COLUMNS} FROM sync_conflicts
             WHERE contact_id = ? AND source = ? AND remote_modified_at = ? AND resolved = 0
             LIMIT 1"
        );
        Ok(self
            .query_many(
                &sql,
                vec![
                    Value::Text(contact_id.as_str()),
                    Value::Text(source.as_str().to_string()),
                    Value::Integer(remote_modified_at),
                ],
            )
            .await?
            .into_iter()
            .next())
    }
}
