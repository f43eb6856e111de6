//! Sync conflict model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

use super::contact::{Contact, ContactId};
use super::inbound::InboundRecord;
use super::source::Source;

/// Conflict row identifier
pub type ConflictId = i64;

/// How a conflict gets settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStrategy {
    /// Keep the contact as it was when the conflict was detected
    LocalWins,
    /// Take the inbound record's fields
    RemoteWins,
    /// Apply a caller-supplied payload
    Manual,
}

impl ResolutionStrategy {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LocalWins => "local_wins",
            Self::RemoteWins => "remote_wins",
            Self::Manual => "manual",
        }
    }
}

impl fmt::Display for ResolutionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResolutionStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "local_wins" | "local" => Ok(Self::LocalWins),
            "remote_wins" | "remote" => Ok(Self::RemoteWins),
            "manual" => Ok(Self::Manual),
            other => Err(Error::InvalidArgument(format!(
                "unknown resolution strategy: {other}"
            ))),
        }
    }
}

/// What kind of divergence was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    /// A same-source re-sync older than the local state
    #[default]
    Update,
}

impl ConflictKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Update => "update",
        }
    }
}

/// A recorded divergence between a contact and an inbound record.
///
/// Immutable once created except for the single unresolved -> resolved
/// transition. Kept forever as an audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conflict {
    pub id: ConflictId,
    pub contact_id: ContactId,
    pub owner_id: String,
    /// Source whose re-sync triggered detection
    pub source: Source,
    pub kind: ConflictKind,
    /// Full contact state at detection time
    pub local_snapshot: Contact,
    /// The inbound record that triggered detection
    pub remote_snapshot: InboundRecord,
    pub resolved: bool,
    pub resolution_strategy: Option<ResolutionStrategy>,
    /// Detection timestamp (Unix ms)
    pub created_at: i64,
    /// Resolution timestamp (Unix ms)
    pub resolved_at: Option<i64>,
}

/// Data needed to record a new conflict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewConflict {
    pub source: Source,
    pub kind: ConflictKind,
    pub local_snapshot: Contact,
    pub remote_snapshot: InboundRecord,
}

impl NewConflict {
    /// An update conflict between `local` and the re-synced `remote`.
    pub const fn update(source: Source, local: Contact, remote: InboundRecord) -> Self {
        Self {
            source,
            kind: ConflictKind::Update,
            local_snapshot: local,
            remote_snapshot: remote,
        }
    }
}
