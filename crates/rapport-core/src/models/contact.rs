//! Canonical contact model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::util::{normalize_email, normalize_text_option, unix_millis_now};

use super::source::{Source, SourceType};

/// A unique identifier for a contact, using UUID v7 (time-sortable)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContactId(Uuid);

impl ContactId {
    /// Create a new unique contact ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for ContactId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ContactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ContactId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Free-form profile fields, overwritten wholesale on every update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileFields {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub job_title: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl ProfileFields {
    /// Trim every field, drop blanks, and lowercase the email.
    #[must_use]
    pub fn normalized(self) -> Self {
        Self {
            first_name: normalize_text_option(self.first_name),
            last_name: normalize_text_option(self.last_name),
            email: normalize_email(self.email.as_deref()),
            phone: normalize_text_option(self.phone),
            company: normalize_text_option(self.company),
            job_title: normalize_text_option(self.job_title),
            notes: normalize_text_option(self.notes),
        }
    }

    /// "First Last", falling back to the email, for display.
    pub fn display_name(&self) -> String {
        let name = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        if name.is_empty() {
            self.email.clone().unwrap_or_default()
        } else {
            name
        }
    }
}

/// One source's external identity attached to a contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLink {
    pub source: Source,
    pub external_id: String,
    /// Source-reported modification time (Unix ms)
    pub modified_at: i64,
}

/// The single internal record representing a person for one owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    /// Unique identifier
    pub id: ContactId,
    /// Owning user/workspace; all matching is scoped within it
    pub owner_id: String,
    pub apple_id: Option<String>,
    pub google_id: Option<String>,
    pub outlook_id: Option<String>,
    /// Derived from which external ids are present
    pub source_type: SourceType,
    #[serde(flatten)]
    pub profile: ProfileFields,
    pub apple_modified_at: Option<i64>,
    pub google_modified_at: Option<i64>,
    pub outlook_modified_at: Option<i64>,
    /// Incremented on every non-conflicting sync update
    pub sync_version: i64,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Local modification clock (Unix ms), compared against inbound records
    pub updated_at: i64,
}

impl Contact {
    /// Create a contact with no external source.
    #[must_use]
    pub fn new_manual(owner_id: impl Into<String>, profile: ProfileFields) -> Self {
        let now = unix_millis_now();
        Self {
            id: ContactId::new(),
            owner_id: owner_id.into(),
            apple_id: None,
            google_id: None,
            outlook_id: None,
            source_type: SourceType::Manual,
            profile: profile.normalized(),
            apple_modified_at: None,
            google_modified_at: None,
            outlook_modified_at: None,
            sync_version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Create a contact first seen through `link`.
    ///
    /// The local clock starts at the source's modification time.
    #[must_use]
    pub fn from_source(
        owner_id: impl Into<String>,
        link: SourceLink,
        profile: ProfileFields,
    ) -> Self {
        let mut contact = Self::new_manual(owner_id, profile);
        contact.updated_at = link.modified_at;
        contact.sync_version = 1;
        contact.set_link(link);
        contact
    }

    /// External id for `source`, if linked.
    pub fn external_id(&self, source: Source) -> Option<&str> {
        match source {
            Source::Apple => self.apple_id.as_deref(),
            Source::Google => self.google_id.as_deref(),
            Source::Outlook => self.outlook_id.as_deref(),
        }
    }

    /// Whether `source` already has an external id on this contact.
    pub fn has_source(&self, source: Source) -> bool {
        self.external_id(source).is_some()
    }

    /// Last modification time accepted from `source`.
    pub fn source_modified_at(&self, source: Source) -> Option<i64> {
        match source {
            Source::Apple => self.apple_modified_at,
            Source::Google => self.google_modified_at,
            Source::Outlook => self.outlook_modified_at,
        }
    }

    /// Whether the local clock is ahead of every accepted source version.
    ///
    /// Syncs only ever move `updated_at` up to a source's modification time,
    /// so anything beyond the newest one came from a local write.
    pub fn edited_locally(&self) -> bool {
        let synced = Source::ALL
            .iter()
            .filter_map(|source| self.source_modified_at(*source))
            .max();
        match synced {
            Some(synced) => self.updated_at > synced,
            None => true,
        }
    }

    /// Number of external sources linked.
    pub fn source_count(&self) -> usize {
        Source::ALL
            .iter()
            .filter(|source| self.has_source(**source))
            .count()
    }

    /// Recompute `source_type` from the populated external ids.
    pub fn refresh_source_type(&mut self) {
        self.source_type = SourceType::from_links(
            self.apple_id.is_some(),
            self.google_id.is_some(),
            self.outlook_id.is_some(),
        );
    }

    fn set_link(&mut self, link: SourceLink) {
        let SourceLink {
            source,
            external_id,
            modified_at,
        } = link;
        match source {
            Source::Apple => {
                self.apple_id = Some(external_id);
                self.apple_modified_at = Some(modified_at);
            }
            Source::Google => {
                self.google_id = Some(external_id);
                self.google_modified_at = Some(modified_at);
            }
            Source::Outlook => {
                self.outlook_id = Some(external_id);
                self.outlook_modified_at = Some(modified_at);
            }
        }
        self.refresh_source_type();
    }

    /// Apply a patch in place, keeping `source_type` consistent.
    pub fn apply(&mut self, patch: ContactPatch) {
        if let Some(link) = patch.link {
            self.set_link(link);
        }
        if let Some(profile) = patch.profile {
            self.profile = profile.normalized();
        }
        if let Some(updated_at) = patch.updated_at {
            self.updated_at = updated_at;
        }
        if patch.bump_sync_version {
            self.sync_version += 1;
        }
    }
}

/// Partial update applied to a stored contact.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactPatch {
    /// Replace all profile fields
    pub profile: Option<ProfileFields>,
    /// Set (or refresh) one source's external id
    pub link: Option<SourceLink>,
    /// New local clock value
    pub updated_at: Option<i64>,
    pub bump_sync_version: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn link(source: Source, id: &str) -> SourceLink {
        SourceLink {
            source,
            external_id: id.to_string(),
            modified_at: 1_000,
        }
    }

    #[test]
    fn test_contact_id_unique() {
        assert_ne!(ContactId::new(), ContactId::new());
    }

    #[test]
    fn test_contact_id_parse() {
        let id = ContactId::new();
        let parsed: ContactId = id.as_str().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn profile_normalization_drops_blanks() {
        let profile = ProfileFields {
            first_name: Some("  Jane ".to_string()),
            email: Some(" Jane@Example.COM".to_string()),
            notes: Some("   ".to_string()),
            ..ProfileFields::default()
        }
        .normalized();

        assert_eq!(profile.first_name.as_deref(), Some("Jane"));
        assert_eq!(profile.email.as_deref(), Some("jane@example.com"));
        assert_eq!(profile.notes, None);
    }

    #[test]
    fn display_name_falls_back_to_email() {
        let profile = ProfileFields {
            email: Some("j@x.com".to_string()),
            ..ProfileFields::default()
        };
        assert_eq!(profile.display_name(), "j@x.com");

        let profile = ProfileFields {
            first_name: Some("Jane".to_string()),
            last_name: Some("Doe".to_string()),
            ..profile
        };
        assert_eq!(profile.display_name(), "Jane Doe");
    }

    #[test]
    fn from_source_starts_clock_at_remote_time() {
        let contact =
            Contact::from_source("owner", link(Source::Apple, "a1"), ProfileFields::default());
        assert_eq!(contact.apple_id.as_deref(), Some("a1"));
        assert_eq!(contact.apple_modified_at, Some(1_000));
        assert_eq!(contact.updated_at, 1_000);
        assert_eq!(contact.sync_version, 1);
        assert_eq!(contact.source_type, SourceType::Apple);
    }

    #[test]
    fn linking_sources_recomputes_tag() {
        let mut contact = Contact::new_manual("owner", ProfileFields::default());
        assert_eq!(contact.source_type, SourceType::Manual);

        contact.apply(ContactPatch {
            link: Some(link(Source::Outlook, "o1")),
            ..ContactPatch::default()
        });
        assert_eq!(contact.source_type, SourceType::Outlook);

        contact.apply(ContactPatch {
            link: Some(link(Source::Google, "g1")),
            ..ContactPatch::default()
        });
        assert_eq!(contact.source_type, SourceType::GoogleOutlook);

        contact.apply(ContactPatch {
            link: Some(link(Source::Apple, "a1")),
            ..ContactPatch::default()
        });
        assert_eq!(contact.source_type, SourceType::AllThree);
        assert_eq!(contact.source_count(), 3);
    }

    #[test]
    fn manual_contact_stamps_current_clock() {
        let before = unix_millis_now();
        let contact = Contact::new_manual("owner", ProfileFields::default());
        let after = unix_millis_now();

        assert!((before..=after).contains(&contact.created_at));
        assert_eq!(contact.updated_at, contact.created_at);
        assert!(contact.edited_locally());
    }

    #[test]
    fn local_edit_is_ahead_of_every_source() {
        let mut contact =
            Contact::from_source("owner", link(Source::Apple, "a1"), ProfileFields::default());
        assert!(!contact.edited_locally());

        contact.apply(ContactPatch {
            link: Some(SourceLink {
                modified_at: 4_000,
                ..link(Source::Google, "g1")
            }),
            updated_at: Some(4_000),
            ..ContactPatch::default()
        });
        assert_eq!(contact.source_modified_at(Source::Apple), Some(1_000));
        assert!(!contact.edited_locally());

        contact.apply(ContactPatch {
            updated_at: Some(4_001),
            ..ContactPatch::default()
        });
        assert!(contact.edited_locally());
    }

    #[test]
    fn apply_bumps_version_only_when_asked() {
        let mut contact =
            Contact::from_source("owner", link(Source::Google, "g1"), ProfileFields::default());
        contact.apply(ContactPatch {
            updated_at: Some(5_000),
            ..ContactPatch::default()
        });
        assert_eq!(contact.sync_version, 1);
        assert_eq!(contact.updated_at, 5_000);

        contact.apply(ContactPatch {
            bump_sync_version: true,
            ..ContactPatch::default()
        });
        assert_eq!(contact.sync_version, 2);
    }
}
