use std::path::Path;

use rapport_core::models::{AppleContact, GoogleContact, OutlookContact, SourceRecord};
use rapport_core::{ContactSyncService, Source, SyncResult};
use serde::de::DeserializeOwned;

use crate::commands::common::read_input;
use crate::error::CliError;

pub async fn run_sync(
    service: &ContactSyncService,
    owner: &str,
    source: Source,
    file: &Path,
    sync_token: Option<&str>,
    is_full_sync: bool,
    as_json: bool,
) -> Result<(), CliError> {
    let raw = read_input(file)?;
    let result = match source {
        Source::Apple => {
            sync_export::<AppleContact>(service, owner, &raw, sync_token, is_full_sync).await?
        }
        Source::Google => {
            sync_export::<GoogleContact>(service, owner, &raw, sync_token, is_full_sync).await?
        }
        Source::Outlook => {
            sync_export::<OutlookContact>(service, owner, &raw, sync_token, is_full_sync).await?
        }
    };

    if as_json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", format_sync_result(source, &result));
    }
    Ok(())
}

async fn sync_export<T>(
    service: &ContactSyncService,
    owner: &str,
    raw: &str,
    sync_token: Option<&str>,
    is_full_sync: bool,
) -> Result<SyncResult, CliError>
where
    T: SourceRecord + DeserializeOwned,
{
    let records = parse_export::<T>(raw)?;
    Ok(service
        .sync_source_batch(owner, &records, sync_token, is_full_sync)
        .await?)
}

pub fn parse_export<T: SourceRecord + DeserializeOwned>(raw: &str) -> Result<Vec<T>, CliError> {
    serde_json::from_str(raw).map_err(|error| CliError::InvalidInput {
        kind: T::SOURCE.as_str(),
        message: error.to_string(),
    })
}

pub fn format_sync_result(source: Source, result: &SyncResult) -> String {
    format!(
        "{source} sync: {} created, {} updated, {} merged ({} into all three), {} conflicts, {} errors",
        result.created,
        result.updated,
        result.merged,
        result.multi_source_merged,
        result.conflicts,
        result.errors
    )
}
