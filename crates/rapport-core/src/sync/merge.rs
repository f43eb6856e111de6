//! Merge state machine: what an inbound record does to its matched contact.

use serde::Serialize;

use crate::config::ConflictPolicy;
use crate::db::{ConflictRepository, ContactRepository};
use crate::error::Result;
use crate::models::{
    Contact, ContactId, ContactPatch, InboundRecord, NewConflict, Source, SourceType,
};

/// The four outcomes of matching one inbound record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeAction {
    /// No contact matched; a new one is created
    Create,
    /// The contact gains this source's external id; profile untouched
    AttachSource,
    /// Same-source re-sync behind the local clock; recorded for review
    Conflict,
    /// Same-source re-sync; profile overwritten
    Update,
}

/// Decide the action for `record` against the matched contact.
///
/// Attaching a source is tried before conflict detection: a source the
/// contact has never seen is new identity information, never a conflict.
///
/// A same-source record behind the local clock only conflicts when it is
/// older than what this source last delivered, or when the contact was
/// edited locally. A clock moved forward by another source's sync is not a
/// local edit, so re-sending an unchanged batch keeps updating.
pub fn decide(
    existing: Option<&Contact>,
    record: &InboundRecord,
    source: Source,
    policy: ConflictPolicy,
) -> MergeAction {
    let Some(contact) = existing else {
        return MergeAction::Create;
    };
    if !contact.has_source(source) {
        return MergeAction::AttachSource;
    }

    let behind_source = contact
        .source_modified_at(source)
        .is_some_and(|seen| record.modified_at < seen);
    let stale = contact.updated_at > record.modified_at
        && (behind_source || contact.edited_locally());
    let diverged = match policy {
        ConflictPolicy::Timestamp => stale,
        ConflictPolicy::FieldDiff => stale && contact.profile != record.profile,
    };
    if diverged {
        MergeAction::Conflict
    } else {
        MergeAction::Update
    }
}

/// What applying an action did to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Applied {
    pub action: MergeAction,
    pub contact_id: ContactId,
    /// The action left the contact linked to all three sources
    pub completed_all_three: bool,
}

/// Apply a decided action, mutating the contact or recording a conflict.
pub async fn apply<C, K>(
    contacts: &C,
    conflicts: &K,
    owner_id: &str,
    source: Source,
    existing: Option<Contact>,
    record: InboundRecord,
    action: MergeAction,
) -> Result<Applied>
where
    C: ContactRepository,
    K: ConflictRepository,
{
    match (action, existing) {
        (MergeAction::Create, _) | (_, None) => {
            let contact = Contact::from_source(owner_id, record.link(source), record.profile);
            let created = contacts.create_contact(&contact).await?;
            Ok(Applied {
                action: MergeAction::Create,
                contact_id: created.id,
                completed_all_three: false,
            })
        }
        (MergeAction::AttachSource, Some(contact)) => {
            attach_source(contacts, source, &contact, &record).await
        }
        (MergeAction::Update, Some(contact)) => {
            let updated_at = contact.updated_at.max(record.modified_at);
            let mut link = record.link(source);
            if let Some(seen) = contact.source_modified_at(source) {
                link.modified_at = link.modified_at.max(seen);
            }
            contacts
                .update_contact(
                    &contact.id,
                    ContactPatch {
                        profile: Some(record.profile),
                        link: Some(link),
                        updated_at: Some(updated_at),
                        bump_sync_version: true,
                    },
                )
                .await?;
            Ok(Applied {
                action,
                contact_id: contact.id,
                completed_all_three: false,
            })
        }
        (MergeAction::Conflict, Some(contact)) => {
            record_conflict(conflicts, source, contact, record).await
        }
    }
}

async fn attach_source<C: ContactRepository>(
    contacts: &C,
    source: Source,
    contact: &Contact,
    record: &InboundRecord,
) -> Result<Applied> {
    let updated = contacts
        .update_contact(
            &contact.id,
            ContactPatch {
                link: Some(record.link(source)),
                ..ContactPatch::default()
            },
        )
        .await?;
    tracing::info!(
        "Linked {source} id {} to contact {} ({} -> {})",
        record.external_id,
        updated.id,
        contact.source_type,
        updated.source_type
    );
    Ok(Applied {
        action: MergeAction::AttachSource,
        contact_id: updated.id,
        completed_all_three: updated.source_type == SourceType::AllThree,
    })
}

/// At most one unresolved conflict is kept per remote edit.
async fn record_conflict<K: ConflictRepository>(
    conflicts: &K,
    source: Source,
    contact: Contact,
    record: InboundRecord,
) -> Result<Applied> {
    let contact_id = contact.id;
    let pending = conflicts
        .find_unresolved_for_edit(&contact_id, source, record.modified_at)
        .await?;
    if let Some(conflict) = pending {
        tracing::debug!(
            "Conflict {} already pending for contact {contact_id}",
            conflict.id
        );
    } else {
        let conflict = conflicts
            .create_conflict(&NewConflict::update(source, contact, record))
            .await?;
        tracing::warn!(
            "Conflict {} detected for contact {contact_id} from {source}",
            conflict.id
        );
    }
    Ok(Applied {
        action: MergeAction::Conflict,
        contact_id,
        completed_all_three: false,
    })
}
