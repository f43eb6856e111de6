use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use rapport_core::{ResolutionStrategy, Source};

#[derive(Parser)]
#[command(name = "rapport")]
#[command(about = "Merge Apple, Google and Outlook contacts into one record per person")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Owner whose contacts are synced (falls back to RAPPORT_OWNER_ID)
    #[arg(long, global = true, value_name = "ID")]
    pub owner: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sync a JSON export of contacts from one source
    Sync {
        /// Source the export came from
        #[arg(value_enum)]
        source: SourceArg,
        /// JSON array of source records ("-" reads stdin)
        file: PathBuf,
        /// Continuation token reported by the source
        #[arg(long, value_name = "TOKEN")]
        token: Option<String>,
        /// Mark the batch as a full (not incremental) sync
        #[arg(long)]
        full: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show sync status per source
    Status {
        /// Only this source (all sources when omitted)
        #[arg(value_enum)]
        source: Option<SourceArg>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Inspect and resolve sync conflicts
    Conflicts {
        #[command(subcommand)]
        command: Option<ConflictCommands>,
    },
    /// List contacts by source tag
    Contacts {
        /// Source tag such as apple, apple_google or all_three
        #[arg(long, default_value = "all_three", value_name = "TAG")]
        source_type: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Enable syncing from a source
    Connect {
        #[arg(value_enum)]
        source: SourceArg,
    },
    /// Disable syncing from a source, keeping its history
    Disconnect {
        #[arg(value_enum)]
        source: SourceArg,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum ConflictCommands {
    /// List unresolved conflicts
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Resolve one conflict
    Resolve {
        /// Conflict id
        id: i64,
        /// Which side wins
        #[arg(value_enum)]
        strategy: StrategyArg,
        /// JSON profile fields applied by the manual strategy
        #[arg(long, value_name = "PATH")]
        payload: Option<PathBuf>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum SourceArg {
    Apple,
    Google,
    Outlook,
}

impl From<SourceArg> for Source {
    fn from(source: SourceArg) -> Self {
        match source {
            SourceArg::Apple => Self::Apple,
            SourceArg::Google => Self::Google,
            SourceArg::Outlook => Self::Outlook,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum StrategyArg {
    LocalWins,
    RemoteWins,
    Manual,
}

impl From<StrategyArg> for ResolutionStrategy {
    fn from(strategy: StrategyArg) -> Self {
        match strategy {
            StrategyArg::LocalWins => Self::LocalWins,
            StrategyArg::RemoteWins => Self::RemoteWins,
            StrategyArg::Manual => Self::Manual,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}
