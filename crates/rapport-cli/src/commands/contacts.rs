use rapport_core::{ContactSyncService, SourceType};

use crate::commands::common::format_contact_lines;
use crate::error::CliError;

pub async fn run_contacts(
    service: &ContactSyncService,
    owner: &str,
    source_type: &str,
    as_json: bool,
) -> Result<(), CliError> {
    let source_type: SourceType = source_type.parse()?;
    let contacts = service
        .list_contacts_by_source_type(owner, source_type)
        .await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&contacts)?);
        return Ok(());
    }

    if contacts.is_empty() {
        println!("No {source_type} contacts.");
        return Ok(());
    }

    for line in format_contact_lines(&contacts) {
        println!("{line}");
    }
    Ok(())
}
