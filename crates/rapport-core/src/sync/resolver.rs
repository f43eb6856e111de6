//! Conflict resolver.

use libsql::Connection;
use serde::Serialize;

use crate::db::{
    ConflictRepository, ContactRepository, Database, LibSqlConflictRepository,
    LibSqlContactRepository,
};
use crate::error::{Error, Result};
use crate::models::{
    Conflict, ConflictId, Contact, ContactPatch, ProfileFields, ResolutionStrategy,
};
use crate::util::unix_millis_now;

/// A settled conflict and the contact state it left behind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    pub conflict: Conflict,
    pub contact: Contact,
}

/// Settle a conflict with `strategy`.
///
/// The contact write and the resolve transition commit together. Resolution
/// writes never bump `sync_version`.
pub async fn resolve(
    db: &Database,
    conflict_id: ConflictId,
    strategy: ResolutionStrategy,
    manual: Option<ProfileFields>,
) -> Result<Resolution> {
    db.begin().await?;
    match resolve_in_transaction(db.connection(), conflict_id, strategy, manual).await {
        Ok(resolution) => {
            db.commit().await?;
            tracing::info!(
                "Resolved conflict {conflict_id} with {strategy} for contact {}",
                resolution.contact.id
            );
            Ok(resolution)
        }
        Err(error) => {
            db.rollback().await;
            Err(error)
        }
    }
}

async fn resolve_in_transaction(
    conn: &Connection,
    conflict_id: ConflictId,
    strategy: ResolutionStrategy,
    manual: Option<ProfileFields>,
) -> Result<Resolution> {
    let conflicts = LibSqlConflictRepository::new(conn);
    let contacts = LibSqlContactRepository::new(conn);

    let conflict = conflicts
        .find_conflict(conflict_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("conflict {conflict_id}")))?;
    if conflict.resolved {
        return Err(Error::AlreadyResolved(conflict_id));
    }

    let now = unix_millis_now();
    let (profile, updated_at) = match strategy {
        ResolutionStrategy::LocalWins => (
            conflict.local_snapshot.profile.clone(),
            conflict.local_snapshot.updated_at,
        ),
        ResolutionStrategy::RemoteWins => (
            conflict.remote_snapshot.profile.clone(),
            conflict.remote_snapshot.modified_at,
        ),
        ResolutionStrategy::Manual => {
            let payload = manual.ok_or_else(|| {
                Error::InvalidArgument("manual resolution requires a payload".to_string())
            })?;
            (payload, now)
        }
    };

    let contact = contacts
        .update_contact(
            &conflict.contact_id,
            ContactPatch {
                profile: Some(profile),
                updated_at: Some(updated_at),
                ..ContactPatch::default()
            },
        )
        .await?;
    let conflict = conflicts.mark_resolved(conflict_id, strategy, now).await?;

    Ok(Resolution { conflict, contact })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{InboundRecord, NewConflict, Source, SourceLink};
    use pretty_assertions::assert_eq;

    fn named(first_name: &str) -> ProfileFields {
        ProfileFields {
            first_name: Some(first_name.to_string()),
            ..ProfileFields::default()
        }
    }

    /// A contact edited locally at 5_000 and a stale Apple record from 1_500.
    async fn setup() -> (Database, Contact, ConflictId) {
        let db = Database::open_in_memory().await.unwrap();
        let mut contact = Contact::from_source(
            "owner",
            SourceLink {
                source: Source::Apple,
                external_id: "a1".to_string(),
                modified_at: 1_000,
            },
            named("Local"),
        );
        contact.updated_at = 5_000;

        let contact = LibSqlContactRepository::new(db.connection())
            .create_contact(&contact)
            .await
            .unwrap();
        let conflict = LibSqlConflictRepository::new(db.connection())
            .create_conflict(&NewConflict::update(
                Source::Apple,
                contact.clone(),
                InboundRecord::new("a1", 1_500, named("Remote")),
            ))
            .await
            .unwrap();
        (db, contact, conflict.id)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn remote_wins_takes_inbound_fields() {
        let (db, contact, id) = setup().await;

        let resolution = resolve(&db, id, ResolutionStrategy::RemoteWins, None)
            .await
            .unwrap();
        assert_eq!(resolution.contact.profile, named("Remote"));
        assert_eq!(resolution.contact.updated_at, 1_500);
        assert_eq!(resolution.contact.sync_version, contact.sync_version);
        assert!(resolution.conflict.resolved);
        assert_eq!(
            resolution.conflict.resolution_strategy,
            Some(ResolutionStrategy::RemoteWins)
        );
        assert!(resolution.conflict.resolved_at.is_some());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn local_wins_restores_snapshot() {
        let (db, contact, id) = setup().await;
        LibSqlContactRepository::new(db.connection())
            .update_contact(
                &contact.id,
                ContactPatch {
                    profile: Some(named("Drifted")),
                    updated_at: Some(7_000),
                    ..ContactPatch::default()
                },
            )
            .await
            .unwrap();

        let resolution = resolve(&db, id, ResolutionStrategy::LocalWins, None)
            .await
            .unwrap();
        assert_eq!(resolution.contact, contact);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn manual_requires_payload_and_leaves_conflict_open() {
        let (db, contact, id) = setup().await;

        let result = resolve(&db, id, ResolutionStrategy::Manual, None).await;
        assert!(matches!(result, Err(Error::InvalidArgument(_))));

        let conflict = LibSqlConflictRepository::new(db.connection())
            .find_conflict(id)
            .await
            .unwrap()
            .unwrap();
        assert!(!conflict.resolved);

        let resolution = resolve(&db, id, ResolutionStrategy::Manual, Some(named("Chosen")))
            .await
            .unwrap();
        assert_eq!(resolution.contact.profile, named("Chosen"));
        assert!(resolution.contact.updated_at > contact.updated_at);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn second_resolution_fails() {
        let (db, _, id) = setup().await;
        resolve(&db, id, ResolutionStrategy::LocalWins, None)
            .await
            .unwrap();

        let result = resolve(&db, id, ResolutionStrategy::RemoteWins, None).await;
        assert!(matches!(result, Err(Error::AlreadyResolved(conflict)) if conflict == id));

        let contact = LibSqlContactRepository::new(db.connection())
            .list_contacts_by_source_type("owner", crate::models::SourceType::Apple)
            .await
            .unwrap();
        assert_eq!(contact[0].profile, named("Local"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unknown_conflict_is_not_found() {
        let (db, _, _) = setup().await;
        let result = resolve(&db, 999, ResolutionStrategy::LocalWins, None).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }
}
