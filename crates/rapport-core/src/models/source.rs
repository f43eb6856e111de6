//! External address-book sources and the derived source tag

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// An external address book that can feed contacts into Rapport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Apple Contacts (iCloud / iOS device)
    Apple,
    /// Google Contacts (Android / Google account)
    Google,
    /// Outlook contacts via Microsoft Graph
    Outlook,
}

impl Source {
    /// All external sources in tag order.
    pub const ALL: [Self; 3] = [Self::Apple, Self::Google, Self::Outlook];

    /// Stable lowercase name used in storage and on the command line.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Apple => "apple",
            Self::Google => "google",
            Self::Outlook => "outlook",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "apple" => Ok(Self::Apple),
            "google" => Ok(Self::Google),
            "outlook" => Ok(Self::Outlook),
            other => Err(Error::InvalidArgument(format!("unknown source: {other}"))),
        }
    }
}

/// Summary tag of which external ids a contact carries.
///
/// Always derived from the populated ids, never set independently.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    /// No external source; created by hand
    #[default]
    Manual,
    Apple,
    Google,
    Outlook,
    AppleGoogle,
    AppleOutlook,
    GoogleOutlook,
    AllThree,
}

impl SourceType {
    /// Every tag, in the order used for status breakdowns.
    pub const ALL: [Self; 8] = [
        Self::Manual,
        Self::Apple,
        Self::Google,
        Self::Outlook,
        Self::AppleGoogle,
        Self::AppleOutlook,
        Self::GoogleOutlook,
        Self::AllThree,
    ];

    /// Derive the tag from which sources are linked.
    pub const fn from_links(apple: bool, google: bool, outlook: bool) -> Self {
        match (apple, google, outlook) {
            (false, false, false) => Self::Manual,
            (true, false, false) => Self::Apple,
            (false, true, false) => Self::Google,
            (false, false, true) => Self::Outlook,
            (true, true, false) => Self::AppleGoogle,
            (true, false, true) => Self::AppleOutlook,
            (false, true, true) => Self::GoogleOutlook,
            (true, true, true) => Self::AllThree,
        }
    }

    /// Whether the given source is part of this tag.
    pub const fn contains(self, source: Source) -> bool {
        matches!(
            (self, source),
            (
                Self::Apple | Self::AppleGoogle | Self::AppleOutlook | Self::AllThree,
                Source::Apple
            ) | (
                Self::Google | Self::AppleGoogle | Self::GoogleOutlook | Self::AllThree,
                Source::Google
            ) | (
                Self::Outlook | Self::AppleOutlook | Self::GoogleOutlook | Self::AllThree,
                Source::Outlook
            )
        )
    }

    /// Number of external sources linked.
    pub fn source_count(self) -> usize {
        Source::ALL
            .iter()
            .filter(|source| self.contains(**source))
            .count()
    }

    /// Stable snake_case name used in storage.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Apple => "apple",
            Self::Google => "google",
            Self::Outlook => "outlook",
            Self::AppleGoogle => "apple_google",
            Self::AppleOutlook => "apple_outlook",
            Self::GoogleOutlook => "google_outlook",
            Self::AllThree => "all_three",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|tag| tag.as_str() == s.trim())
            .ok_or_else(|| Error::InvalidArgument(format!("unknown source type: {s}")))
    }
}
