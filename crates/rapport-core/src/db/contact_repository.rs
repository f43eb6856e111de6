//! Contact repository implementation

use libsql::{Connection, Row, Value};

use crate::error::{Error, Result};
use crate::models::{Contact, ContactId, ContactPatch, ProfileFields, Source, SourceType};

use super::rows::{int, int_param, opt_int, opt_text, parse_column, text, text_param};

const CONTACT_COLUMNS: &str = "id, owner_id, apple_id, google_id, outlook_id, source_type,
    first_name, last_name, email, phone, company, job_title, notes,
    apple_modified_at, google_modified_at, outlook_modified_at,
    sync_version, created_at, updated_at";

/// Trait for canonical contact storage operations (async)
#[allow(async_fn_in_trait)]
pub trait ContactRepository {
    /// Find the owner's contact carrying `external_id` for `source`
    async fn find_contact(
        &self,
        owner_id: &str,
        source: Source,
        external_id: &str,
    ) -> Result<Option<Contact>>;

    /// Find the owner's most recently updated contact with `email` that is
    /// not yet linked to `source`
    async fn find_contact_by_email(
        &self,
        owner_id: &str,
        email: &str,
        source: Source,
    ) -> Result<Option<Contact>>;

    /// Get a contact by ID
    async fn get_contact(&self, id: &ContactId) -> Result<Option<Contact>>;

    /// Insert a fully built contact
    async fn create_contact(&self, contact: &Contact) -> Result<Contact>;

    /// Apply a patch to a stored contact and return the new state
    async fn update_contact(&self, id: &ContactId, patch: ContactPatch) -> Result<Contact>;

    /// List the owner's contacts carrying exactly `source_type`
    async fn list_contacts_by_source_type(
        &self,
        owner_id: &str,
        source_type: SourceType,
    ) -> Result<Vec<Contact>>;

    /// Count the owner's contacts per source tag (tags with no contacts omitted)
    async fn count_by_source_type(&self, owner_id: &str) -> Result<Vec<(SourceType, u64)>>;
}

/// libSQL implementation of `ContactRepository`
pub struct LibSqlContactRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlContactRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    const fn id_column(source: Source) -> &'static str {
        match source {
            Source::Apple => "apple_id",
            Source::Google => "google_id",
            Source::Outlook => "outlook_id",
        }
    }

    /// Parse a contact from a database row
    fn parse_contact(row: &Row) -> Result<Contact> {
        let id = text(row, 0)?;
        let source_type = text(row, 5)?;
        Ok(Contact {
            id: parse_column(&id, "id")?,
            owner_id: text(row, 1)?,
            apple_id: opt_text(row, 2)?,
            google_id: opt_text(row, 3)?,
            outlook_id: opt_text(row, 4)?,
            source_type: parse_column(&source_type, "source_type")?,
            profile: ProfileFields {
                first_name: opt_text(row, 6)?,
                last_name: opt_text(row, 7)?,
                email: opt_text(row, 8)?,
                phone: opt_text(row, 9)?,
                company: opt_text(row, 10)?,
                job_title: opt_text(row, 11)?,
                notes: opt_text(row, 12)?,
            },
            apple_modified_at: opt_int(row, 13)?,
            google_modified_at: opt_int(row, 14)?,
            outlook_modified_at: opt_int(row, 15)?,
            sync_version: int(row, 16)?,
            created_at: int(row, 17)?,
            updated_at: int(row, 18)?,
        })
    }

    async fn query_one(&self, sql: &str, params: Vec<Value>) -> Result<Option<Contact>> {
        let mut rows = self.conn.query(sql, params).await?;
        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_contact(&row)?)),
            None => Ok(None),
        }
    }

    async fn query_many(&self, sql: &str, params: Vec<Value>) -> Result<Vec<Contact>> {
        let mut rows = self.conn.query(sql, params).await?;
        let mut contacts = Vec::new();
        while let Some(row) = rows.next().await? {
            contacts.push(Self::parse_contact(&row)?);
        }
        Ok(contacts)
    }

    /// Mutable columns in `UPDATE` order, followed by the id
    fn update_params(contact: &Contact) -> Vec<Value> {
        let profile = &contact.profile;
        vec![
            text_param(contact.apple_id.as_deref()),
            text_param(contact.google_id.as_deref()),
            text_param(contact.outlook_id.as_deref()),
            Value::Text(contact.source_type.as_str().to_string()),
            text_param(profile.first_name.as_deref()),
            text_param(profile.last_name.as_deref()),
            text_param(profile.email.as_deref()),
            text_param(profile.phone.as_deref()),
            text_param(profile.company.as_deref()),
            text_param(profile.job_title.as_deref()),
            text_param(profile.notes.as_deref()),
            int_param(contact.apple_modified_at),
            int_param(contact.google_modified_at),
            int_param(contact.outlook_modified_at),
            Value::Integer(contact.sync_version),
            Value::Integer(contact.updated_at),
            Value::Text(contact.id.as_str()),
        ]
    }
}

impl ContactRepository for LibSqlContactRepository<'_> {
    async fn find_contact(
        &self,
        owner_id: &str,
        source: Source,
        external_id: &str,
    ) -> Result<Option<Contact>> {
        let sql = format!(
            "SELECT {CONTACT_COLUMNS} FROM contacts WHERE owner_id = ? AND {} = ?",
            Self::id_column(source)
        );
        self.query_one(
            &sql,
            vec![
                Value::Text(owner_id.to_string()),
                Value::Text(external_id.to_string()),
            ],
        )
        .await
    }

    async fn find_contact_by_email(
        &self,
        owner_id: &str,
        email: &str,
        source: Source,
    ) -> Result<Option<Contact>> {
        let email = email.trim();
        if email.is_empty() {
            return Ok(None);
        }

        let sql = format!(
            "SELECT {CONTACT_COLUMNS} FROM contacts
             WHERE owner_id = ? AND email = ? COLLATE NOCASE AND {} IS NULL
             ORDER BY updated_at DESC, created_at DESC
             LIMIT 1",
            Self::id_column(source)
        );
        self.query_one(
            &sql,
            vec![
                Value::Text(owner_id.to_string()),
                Value::Text(email.to_string()),
            ],
        )
        .await
    }

    async fn get_contact(&self, id: &ContactId) -> Result<Option<Contact>> {
        let sql = format!("SELECT {CONTACT_COLUMNS} FROM contacts WHERE id = ?");
        self.query_one(&sql, vec![Value::Text(id.as_str())]).await
    }

    async fn create_contact(&self, contact: &Contact) -> Result<Contact> {
        let mut contact = contact.clone();
        contact.refresh_source_type();

        let mut params = vec![
            Value::Text(contact.id.as_str()),
            Value::Text(contact.owner_id.clone()),
            Value::Integer(contact.created_at),
        ];
        params.extend(Self::update_params(&contact).into_iter().take(16));

        self.conn
            .execute(
                "INSERT INTO contacts (
                    id, owner_id, created_at,
                    apple_id, google_id, outlook_id, source_type,
                    first_name, last_name, email, phone, company, job_title, notes,
                    apple_modified_at, google_modified_at, outlook_modified_at,
                    sync_version, updated_at
                 ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                params,
            )
            .await?;

        Ok(contact)
    }

    async fn update_contact(&self, id: &ContactId, patch: ContactPatch) -> Result<Contact> {
        let mut contact = self
            .get_contact(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("contact {id}")))?;
        contact.apply(patch);

        let rows = self
            .conn
            .execute(
                "UPDATE contacts SET
                    apple_id = ?, google_id = ?, outlook_id = ?, source_type = ?,
                    first_name = ?, last_name = ?, email = ?, phone = ?,
                    company = ?, job_title = ?, notes = ?,
                    apple_modified_at = ?, google_modified_at = ?, outlook_modified_at = ?,
                    sync_version = ?, updated_at = ?
                 WHERE id = ?",
                Self::update_params(&contact),
            )
            .await?;

        if rows == 0 {
            return Err(Error::NotFound(format!("contact {id}")));
        }

        Ok(contact)
    }

    async fn list_contacts_by_source_type(
        &self,
        owner_id: &str,
        source_type: SourceType,
    ) -> Result<Vec<Contact>> {
        let sql = format!(
            "SELECT {CONTACT_COLUMNS} FROM contacts
             WHERE owner_id = ? AND source_type = ?
             ORDER BY updated_at DESC"
        );
        self.query_many(
            &sql,
            vec![
                Value::Text(owner_id.to_string()),
                Value::Text(source_type.as_str().to_string()),
            ],
        )
        .await
    }

    async fn count_by_source_type(&self, owner_id: &str) -> Result<Vec<(SourceType, u64)>> {
        let mut rows = self
            .conn
            .query(
                "SELECT source_type, COUNT(*) FROM contacts
                 WHERE owner_id = ?
                 GROUP BY source_type",
                [owner_id],
            )
            .await?;

        let mut counts = Vec::new();
        while let Some(row) = rows.next().await? {
            let source_type: SourceType = parse_column(&text(&row, 0)?, "source_type")?;
            let count = u64::try_from(int(&row, 1)?).unwrap_or_default();
            counts.push((source_type, count));
        }
        counts.sort_by_key(|(source_type, _)| *source_type);
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::models::SourceLink;
    use pretty_assertions::assert_eq;

    async fn setup() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    fn profile(email: &str) -> ProfileFields {
        ProfileFields {
            first_name: Some("John".to_string()),
            last_name: Some("Doe".to_string()),
            email: Some(email.to_string()),
            ..ProfileFields::default()
        }
    }

    fn link(source: Source, id: &str, modified_at: i64) -> SourceLink {
        SourceLink {
            source,
            external_id: id.to_string(),
            modified_at,
        }
    }

    fn sourced(source: Source, id: &str, modified_at: i64, email: &str) -> Contact {
        Contact::from_source("owner", link(source, id, modified_at), profile(email))
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_create_and_get() {
        let db = setup().await;
        let repo = LibSqlContactRepository::new(db.connection());

        let contact = sourced(Source::Apple, "a1", 100, "j@x.com");
        repo.create_contact(&contact).await.unwrap();

        let fetched = repo.get_contact(&contact.id).await.unwrap().unwrap();
        assert_eq!(fetched, contact);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_find_by_external_id_is_owner_scoped() {
        let db = setup().await;
        let repo = LibSqlContactRepository::new(db.connection());

        let contact = sourced(Source::Google, "g1", 100, "j@x.com");
        repo.create_contact(&contact).await.unwrap();

        let found = repo.find_contact("owner", Source::Google, "g1").await.unwrap();
        assert_eq!(found.map(|c| c.id), Some(contact.id));
        assert!(repo
            .find_contact("someone-else", Source::Google, "g1")
            .await
            .unwrap()
            .is_none());
        assert!(repo
            .find_contact("owner", Source::Apple, "g1")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_find_by_email_prefers_most_recently_updated() {
        let db = setup().await;
        let repo = LibSqlContactRepository::new(db.connection());

        let older = sourced(Source::Apple, "a1", 100, "j@x.com");
        let newer = sourced(Source::Outlook, "o1", 200, "j@x.com");
        repo.create_contact(&older).await.unwrap();
        repo.create_contact(&newer).await.unwrap();

        let found = repo
            .find_contact_by_email("owner", "J@X.COM", Source::Google)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, newer.id);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_find_by_email_skips_contacts_linked_to_source() {
        let db = setup().await;
        let repo = LibSqlContactRepository::new(db.connection());

        let contact = sourced(Source::Apple, "a1", 100, "j@x.com");
        repo.create_contact(&contact).await.unwrap();

        assert!(repo
            .find_contact_by_email("owner", "j@x.com", Source::Apple)
            .await
            .unwrap()
            .is_none());
        assert!(repo
            .find_contact_by_email("owner", "  ", Source::Google)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_update_links_source_and_recomputes_tag() {
        let db = setup().await;
        let repo = LibSqlContactRepository::new(db.connection());

        let contact = sourced(Source::Apple, "a1", 100, "j@x.com");
        repo.create_contact(&contact).await.unwrap();

        let updated = repo
            .update_contact(
                &contact.id,
                ContactPatch {
                    link: Some(link(Source::Google, "g1", 150)),
                    ..ContactPatch::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.source_type, SourceType::AppleGoogle);
        assert_eq!(updated.updated_at, 100);

        let stored = repo.get_contact(&contact.id).await.unwrap().unwrap();
        assert_eq!(stored, updated);
        assert_eq!(stored.google_modified_at, Some(150));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_update_missing_contact_is_not_found() {
        let db = setup().await;
        let repo = LibSqlContactRepository::new(db.connection());

        let result = repo
            .update_contact(&ContactId::new(), ContactPatch::default())
            .await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_duplicate_external_id_is_rejected() {
        let db = setup().await;
        let repo = LibSqlContactRepository::new(db.connection());

        let first = sourced(Source::Apple, "a1", 100, "a@x.com");
        let second = sourced(Source::Apple, "a1", 100, "b@x.com");
        repo.create_contact(&first).await.unwrap();
        assert!(repo.create_contact(&second).await.is_err());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_count_and_list_by_source_type() {
        let db = setup().await;
        let repo = LibSqlContactRepository::new(db.connection());

        repo.create_contact(&Contact::new_manual("owner", profile("m@x.com")))
            .await
            .unwrap();
        let mut all = sourced(Source::Apple, "a1", 1, "j@x.com");
        all.google_id = Some("g1".to_string());
        all.outlook_id = Some("o1".to_string());
        repo.create_contact(&all).await.unwrap();

        let counts = repo.count_by_source_type("owner").await.unwrap();
        assert_eq!(
            counts,
            vec![(SourceType::Manual, 1), (SourceType::AllThree, 1)]
        );

        let multi = repo
            .list_contacts_by_source_type("owner", SourceType::AllThree)
            .await
            .unwrap();
        assert_eq!(multi.len(), 1);
        assert_eq!(multi[0].id, all.id);
    }
}
