//! Inbound records from external address books and their source adapters

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::util::{normalize_text_option, parse_rfc3339_millis};

use super::contact::{ProfileFields, SourceLink};
use super::source::Source;

/// One record presented by a source during a sync batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundRecord {
    /// The source's own id for this record
    pub external_id: String,
    /// Source-reported modification time (Unix ms)
    pub modified_at: i64,
    #[serde(flatten)]
    pub profile: ProfileFields,
}

impl InboundRecord {
    pub fn new(external_id: impl Into<String>, modified_at: i64, profile: ProfileFields) -> Self {
        Self {
            external_id: external_id.into(),
            modified_at,
            profile,
        }
    }

    /// Validate and normalize the record before it reaches the matcher.
    pub fn validated(self) -> Result<Self> {
        let external_id = normalize_text_option(Some(self.external_id)).ok_or_else(|| {
            Error::InvalidArgument("inbound record is missing its external id".to_string())
        })?;
        Ok(Self {
            external_id,
            modified_at: self.modified_at,
            profile: self.profile.normalized(),
        })
    }

    /// Normalized email, if any.
    pub fn email(&self) -> Option<&str> {
        self.profile.email.as_deref()
    }

    /// The identity this record asserts for `source`.
    pub fn link(&self, source: Source) -> SourceLink {
        SourceLink {
            source,
            external_id: self.external_id.clone(),
            modified_at: self.modified_at,
        }
    }
}

/// Field mapping from a source's native record shape.
pub trait SourceRecord {
    /// Which source produces this shape.
    const SOURCE: Source;

    fn external_id(&self) -> &str;

    /// Modification time as reported by the source, if parseable.
    fn modified_at(&self) -> Option<i64>;

    fn to_profile(&self) -> ProfileFields;

    /// Convert into the engine's source-agnostic record.
    fn to_inbound(&self) -> Result<InboundRecord> {
        let modified_at = self.modified_at().ok_or_else(|| {
            Error::InvalidArgument(format!(
                "{} record {} has no valid modification time",
                Self::SOURCE,
                self.external_id()
            ))
        })?;
        InboundRecord::new(self.external_id(), modified_at, self.to_profile()).validated()
    }
}

/// A contact as exported from an iOS device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppleContact {
    pub apple_contact_id: String,
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
    /// ISO 8601 modification time
    pub modified_at: String,
}

impl SourceRecord for AppleContact {
    const SOURCE: Source = Source::Apple;

    fn external_id(&self) -> &str {
        &self.apple_contact_id
    }

    fn modified_at(&self) -> Option<i64> {
        parse_rfc3339_millis(&self.modified_at)
    }

    fn to_profile(&self) -> ProfileFields {
        ProfileFields {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            company: self.company.clone(),
            job_title: self.job_title.clone(),
            notes: self.notes.clone(),
        }
    }
}

/// A contact as exported from an Android device / Google account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleContact {
    pub google_contact_id: String,
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
    /// ISO 8601 modification time
    pub modified_at: String,
}

impl SourceRecord for GoogleContact {
    const SOURCE: Source = Source::Google;

    fn external_id(&self) -> &str {
        &self.google_contact_id
    }

    fn modified_at(&self) -> Option<i64> {
        parse_rfc3339_millis(&self.modified_at)
    }

    fn to_profile(&self) -> ProfileFields {
        ProfileFields {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            company: self.company.clone(),
            job_title: self.job_title.clone(),
            notes: self.notes.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlookEmailAddress {
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// A Microsoft Graph contact resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutlookContact {
    pub id: String,
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub surname: Option<String>,
    #[serde(default)]
    pub email_addresses: Vec<OutlookEmailAddress>,
    #[serde(default)]
    pub mobile_phone: Option<String>,
    #[serde(default)]
    pub business_phones: Vec<String>,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub job_title: Option<String>,
    #[serde(default)]
    pub personal_notes: Option<String>,
    /// ISO 8601 modification time
    #[serde(default)]
    pub last_modified_date_time: Option<String>,
}

impl SourceRecord for OutlookContact {
    const SOURCE: Source = Source::Outlook;

    fn external_id(&self) -> &str {
        &self.id
    }

    fn modified_at(&self) -> Option<i64> {
        self.last_modified_date_time
            .as_deref()
            .and_then(parse_rfc3339_millis)
    }

    fn to_profile(&self) -> ProfileFields {
        let phone = normalize_text_option(self.mobile_phone.clone())
            .or_else(|| self.business_phones.first().cloned());
        ProfileFields {
            first_name: self.given_name.clone(),
            last_name: self.surname.clone(),
            email: self
                .email_addresses
                .first()
                .and_then(|entry| entry.address.clone()),
            phone,
            company: self.company_name.clone(),
            job_title: self.job_title.clone(),
            notes: self.personal_notes.clone(),
        }
    }
}
