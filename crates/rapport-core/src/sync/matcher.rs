//! Identity matcher: which stored contact an inbound record belongs to.

use crate::config::SyncSettings;
use crate::db::ContactRepository;
use crate::error::Result;
use crate::models::{Contact, InboundRecord, Source};

/// Find the owner's contact for `record`, first hit wins:
///
/// 1. the contact already carrying this source's external id
/// 2. the most recently updated contact with the same email that this
///    source has not linked yet (skipped for blank emails, or when email
///    matching is turned off)
///
/// `None` means the record is a brand-new identity.
pub async fn find_candidate<R: ContactRepository>(
    contacts: &R,
    settings: &SyncSettings,
    owner_id: &str,
    source: Source,
    record: &InboundRecord,
) -> Result<Option<Contact>> {
    if let Some(contact) = contacts
        .find_contact(owner_id, source, &record.external_id)
        .await?
    {
        return Ok(Some(contact));
    }

    if !settings.email_matching {
        return Ok(None);
    }
    match record.email() {
        Some(email) => contacts.find_contact_by_email(owner_id, email, source).await,
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Database, LibSqlContactRepository};
    use crate::models::{ProfileFields, SourceLink};
    use pretty_assertions::assert_eq;

    fn profile(email: Option<&str>) -> ProfileFields {
        ProfileFields {
            email: email.map(str::to_string),
            ..ProfileFields::default()
        }
        .normalized()
    }

    async fn seed(db: &Database, source: Source, external_id: &str, email: &str) -> Contact {
        let contact = Contact::from_source(
            "owner",
            SourceLink {
                source,
                external_id: external_id.to_string(),
                modified_at: 1_000,
            },
            profile(Some(email)),
        );
        LibSqlContactRepository::new(db.connection())
            .create_contact(&contact)
            .await
            .unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn external_id_wins_over_email() {
        let db = Database::open_in_memory().await.unwrap();
        let by_id = seed(&db, Source::Apple, "a1", "first@x.com").await;
        seed(&db, Source::Google, "g1", "second@x.com").await;
        let repo = LibSqlContactRepository::new(db.connection());

        let record = InboundRecord::new("a1", 2_000, profile(Some("second@x.com")));
        let settings = SyncSettings::default();
        let found = find_candidate(&repo, &settings, "owner", Source::Apple, &record)
            .await
            .unwrap();
        assert_eq!(found.map(|contact| contact.id), Some(by_id.id));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn email_fallback_links_other_sources() {
        let db = Database::open_in_memory().await.unwrap();
        let apple = seed(&db, Source::Apple, "a1", "j@x.com").await;
        let repo = LibSqlContactRepository::new(db.connection());

        let record = InboundRecord::new("g1", 2_000, profile(Some("J@X.com")));
        let settings = SyncSettings::default();
        let found = find_candidate(&repo, &settings, "owner", Source::Google, &record)
            .await
            .unwrap();
        assert_eq!(found.map(|contact| contact.id), Some(apple.id));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn blank_email_never_matches() {
        let db = Database::open_in_memory().await.unwrap();
        seed(&db, Source::Apple, "a1", "j@x.com").await;
        let repo = LibSqlContactRepository::new(db.connection());

        let record = InboundRecord::new("g1", 2_000, profile(Some("   ")));
        let settings = SyncSettings::default();
        let found = find_candidate(&repo, &settings, "owner", Source::Google, &record)
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn email_matching_can_be_disabled() {
        let db = Database::open_in_memory().await.unwrap();
        seed(&db, Source::Apple, "a1", "j@x.com").await;
        let repo = LibSqlContactRepository::new(db.connection());
        let settings = SyncSettings {
            email_matching: false,
            ..SyncSettings::default()
        };

        let record = InboundRecord::new("g1", 2_000, profile(Some("j@x.com")));
        let found = find_candidate(&repo, &settings, "owner", Source::Google, &record)
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn same_source_other_id_is_a_new_identity() {
        let db = Database::open_in_memory().await.unwrap();
        seed(&db, Source::Apple, "a1", "j@x.com").await;
        let repo = LibSqlContactRepository::new(db.connection());

        let record = InboundRecord::new("a2", 2_000, profile(Some("j@x.com")));
        let settings = SyncSettings::default();
        let found = find_candidate(&repo, &settings, "owner", Source::Apple, &record)
            .await
            .unwrap();
        assert!(found.is_none());
    }
}
