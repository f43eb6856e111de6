//! Data models for Rapport

mod conflict;
mod contact;
mod cursor;
mod inbound;
mod source;

pub use conflict::{Conflict, ConflictId, ConflictKind, NewConflict, ResolutionStrategy};
pub use contact::{Contact, ContactId, ContactPatch, ProfileFields, SourceLink};
pub use cursor::SyncCursor;
pub use inbound::{
    AppleContact, GoogleContact, InboundRecord, OutlookContact, OutlookEmailAddress, SourceRecord,
};
pub use source::{Source, SourceType};
