//! Rapport CLI - merge address books from several sources into one
//!
//! Feeds JSON exports from Apple, Google and Outlook through the identity
//! resolution engine and manages the conflicts it records.

mod cli;
mod commands;
mod error;


use clap::Parser;

use crate::cli::{Cli, Commands, ConflictCommands};
use crate::commands::common::{open_service, resolve_db_path, resolve_owner};
use crate::commands::completions::run_completions;
use crate::commands::conflicts::{run_conflicts_list, run_conflicts_resolve};
use crate::commands::contacts::run_contacts;
use crate::commands::source::{run_connect, run_disconnect};
use crate::commands::status::run_status;
use crate::commands::sync::run_sync;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    if let Ok(directive) = "rapport=info".parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Commands::Completions { shell, output } = &cli.command {
        return run_completions(*shell, output.as_deref());
    }

    let db_path = resolve_db_path(cli.db_path);
    let owner = resolve_owner(cli.owner)?;
    let service = open_service(&db_path).await?;

    match cli.command {
        Commands::Sync {
            source,
            file,
            token,
            full,
            json,
        } => {
            run_sync(
                &service,
                &owner,
                source.into(),
                &file,
                token.as_deref(),
                full,
                json,
            )
            .await?;
        }
        Commands::Status { source, json } => {
            run_status(&service, &owner, source.map(Into::into), json).await?;
        }
        Commands::Conflicts { command } => {
            match command.unwrap_or(ConflictCommands::List { json: false }) {
                ConflictCommands::List { json } => {
                    run_conflicts_list(&service, &owner, json).await?;
                }
                ConflictCommands::Resolve {
                    id,
                    strategy,
                    payload,
                    json,
                } => {
                    run_conflicts_resolve(&service, id, strategy.into(), payload.as_deref(), json)
                        .await?;
                }
            }
        }
        Commands::Contacts { source_type, json } => {
            run_contacts(&service, &owner, &source_type, json).await?;
        }
        Commands::Connect { source } => run_connect(&service, &owner, source.into()).await?,
        Commands::Disconnect { source } => {
            run_disconnect(&service, &owner, source.into()).await?;
        }
        Commands::Completions { .. } => {}
    }

    Ok(())
}
