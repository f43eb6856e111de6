//! rapport-core - Core library for Rapport
//!
//! This crate contains the contact models, the libSQL storage layer, and the
//! multi-source identity resolution engine that merges Apple, Google, and
//! Outlook address books into one canonical contact per person.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod state;
pub mod sync;
pub mod util;

pub use error::{Error, Result};
pub use models::{
    Conflict, ConflictId, Contact, ContactId, InboundRecord, ProfileFields, ResolutionStrategy,
    Source, SourceType, SyncCursor,
};
pub use services::ContactSyncService;
pub use sync::{Resolution, SyncResult, SyncStatus};
