use std::env;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use rapport_core::config::SyncSettings;
use rapport_core::{Conflict, Contact, ContactSyncService, SyncStatus};

use crate::error::CliError;

const DB_PATH_VAR: &str = "RAPPORT_DB_PATH";
const OWNER_VAR: &str = "RAPPORT_OWNER_ID";

pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> PathBuf {
    cli_db_path
        .or_else(|| env::var_os(DB_PATH_VAR).map(PathBuf::from))
        .unwrap_or_else(default_db_path)
}

pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("rapport")
        .join("rapport.db")
}

pub fn resolve_owner(cli_owner: Option<String>) -> Result<String, CliError> {
    cli_owner
        .or_else(|| env::var(OWNER_VAR).ok())
        .and_then(|owner| normalize_owner(&owner))
        .ok_or(CliError::MissingOwner)
}

pub fn normalize_owner(owner: &str) -> Option<String> {
    let owner = owner.trim();
    if owner.is_empty() {
        None
    } else {
        Some(owner.to_string())
    }
}

pub async fn open_service(path: &Path) -> Result<ContactSyncService, CliError> {
    let settings = SyncSettings::from_env()?;
    Ok(ContactSyncService::open_path(path, settings).await?)
}

/// Read a file, or stdin when the path is `-`.
pub fn read_input(path: &Path) -> Result<String, CliError> {
    if path.as_os_str() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(std::fs::read_to_string(path)?)
    }
}

pub fn format_sync_timestamp(timestamp_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp_ms).map_or_else(
        || timestamp_ms.to_string(),
        |date_time| date_time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

pub fn format_contact_lines(contacts: &[Contact]) -> Vec<String> {
    contacts
        .iter()
        .map(|contact| {
            let name = contact.profile.display_name();
            let name = if name.is_empty() { "(no name)" } else { name.as_str() };
            format!("{}  {:<14}  {name}", contact.id, contact.source_type.as_str())
        })
        .collect()
}

pub fn format_conflict_lines(conflicts: &[Conflict]) -> Vec<String> {
    conflicts
        .iter()
        .map(|conflict| {
            format!(
                "#{}  {}  {}  local {}  remote {}  ({} vs {})",
                conflict.id,
                conflict.source,
                conflict.contact_id,
                conflict.local_snapshot.profile.display_name(),
                conflict.remote_snapshot.profile.display_name(),
                format_sync_timestamp(conflict.local_snapshot.updated_at),
                format_sync_timestamp(conflict.remote_snapshot.modified_at),
            )
        })
        .collect()
}

pub fn format_status_lines(status: &SyncStatus) -> Vec<String> {
    let last_sync = status
        .last_sync_at
        .map_or_else(|| "never".to_string(), format_sync_timestamp);
    let mut lines = vec![
        format!(
            "{}: {} ({:?})",
            status.source,
            if status.enabled { "enabled" } else { "disabled" },
            status.state
        ),
        format!("  last sync:    {last_sync}"),
        format!("  total synced: {}", status.total_synced),
        format!("  conflicts:    {}", status.unresolved_conflicts),
    ];
    for (source_type, count) in &status.breakdown {
        lines.push(format!("  {:<14} {count}", source_type.as_str()));
    }
    lines
}
