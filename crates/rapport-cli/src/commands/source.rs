use rapport_core::{ContactSyncService, Source};

use crate::error::CliError;

pub async fn run_connect(
    service: &ContactSyncService,
    owner: &str,
    source: Source,
) -> Result<(), CliError> {
    service.connect(owner, source).await?;
    println!("{source} sync enabled");
    Ok(())
}

pub async fn run_disconnect(
    service: &ContactSyncService,
    owner: &str,
    source: Source,
) -> Result<(), CliError> {
    service.disconnect(owner, source).await?;
    println!("{source} sync disabled");
    Ok(())
}
