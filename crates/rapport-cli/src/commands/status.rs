use rapport_core::{ContactSyncService, Source};

use crate::commands::common::format_status_lines;
use crate::error::CliError;

pub async fn run_status(
    service: &ContactSyncService,
    owner: &str,
    source: Option<Source>,
    as_json: bool,
) -> Result<(), CliError> {
    let sources = source.map_or_else(|| Source::ALL.to_vec(), |source| vec![source]);

    let mut statuses = Vec::with_capacity(sources.len());
    for source in sources {
        statuses.push(service.get_sync_status(owner, source).await?);
    }

    if as_json {
        println!("{}", serde_json::to_string_pretty(&statuses)?);
        return Ok(());
    }

    for status in &statuses {
        for line in format_status_lines(status) {
            println!("{line}");
        }
    }
    Ok(())
}
