//! Database layer for Rapport

mod connection;
mod conflict_repository;
mod contact_repository;
mod cursor_repository;
mod migrations;
mod rows;

pub use connection::Database;
pub use conflict_repository::{ConflictRepository, LibSqlConflictRepository};
pub use contact_repository::{ContactRepository, LibSqlContactRepository};
pub use cursor_repository::{LibSqlSyncCursorRepository, SyncCursorRepository};
