use std::path::Path;

use rapport_core::{ContactSyncService, ProfileFields, ResolutionStrategy};

use crate::commands::common::{format_conflict_lines, read_input};
use crate::error::CliError;

pub async fn run_conflicts_list(
    service: &ContactSyncService,
    owner: &str,
    as_json: bool,
) -> Result<(), CliError> {
    let conflicts = service.list_conflicts(owner).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&conflicts)?);
        return Ok(());
    }

    if conflicts.is_empty() {
        println!("No unresolved conflicts.");
        return Ok(());
    }

    for line in format_conflict_lines(&conflicts) {
        println!("{line}");
    }
    Ok(())
}

pub async fn run_conflicts_resolve(
    service: &ContactSyncService,
    id: i64,
    strategy: ResolutionStrategy,
    payload_path: Option<&Path>,
    as_json: bool,
) -> Result<(), CliError> {
    let payload = payload_path.map(read_payload).transpose()?;
    if strategy == ResolutionStrategy::Manual && payload.is_none() {
        return Err(CliError::MissingPayload);
    }

    let resolution = service.resolve_conflict(id, strategy, payload).await?;
    if as_json {
        println!("{}", serde_json::to_string_pretty(&resolution)?);
    } else {
        println!(
            "Resolved conflict #{} with {strategy}; contact {} is now {}",
            resolution.conflict.id,
            resolution.contact.id,
            resolution.contact.profile.display_name()
        );
    }
    Ok(())
}

pub fn read_payload(path: &Path) -> Result<ProfileFields, CliError> {
    parse_payload(&read_input(path)?)
}

pub fn parse_payload(raw: &str) -> Result<ProfileFields, CliError> {
    serde_json::from_str(raw).map_err(|error| CliError::InvalidInput {
        kind: "payload",
        message: error.to_string(),
    })
}
