use std::path::PathBuf;

use clap::{Args, Subcommand};
use concord_core::enums::TransactionState;

/// Top-level command tree.
#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    /// Create or update a process in every store.
    Sync(SyncArgs),
    /// Delete a process from every store.
    Delete(DeleteArgs),
    /// List gaps between the structured store and the derived stores.
    Detect(DetectArgs),
    /// Detect gaps and apply fixes.
    Reconcile(ReconcileArgs),
    /// Inspect transactions.
    Tx {
        #[command(subcommand)]
        action: TxCommands,
    },
    /// Check that every backend answers.
    Health,
    /// Import a legacy JSONL export.
    Migrate(MigrateArgs),
    /// Print a JSON schema by name.
    Schema(SchemaArgs),
}

#[derive(Clone, Debug, Args)]
pub struct SyncArgs {
    /// JSON file holding one process entity.
    pub file: PathBuf,

    /// JSON file holding the embedding (an array of numbers) for the vector store.
    #[arg(long, value_name = "FILE")]
    pub embedding: Option<PathBuf>,
}

#[derive(Clone, Debug, Args)]
pub struct DeleteArgs {
    /// Process id.
    pub id: String,
}

#[derive(Clone, Debug, Args)]
pub struct DetectArgs {
    /// Only scan this derived backend.
    #[arg(long, conflicts_with = "record")]
    pub backend: Option<String>,

    /// Only check this process id.
    #[arg(long)]
    pub record: Option<String>,
}

#[derive(Clone, Debug, Args)]
pub struct ReconcileArgs {
    /// Plan fixes without touching any backend.
    #[arg(long)]
    pub dry_run: bool,

    /// Confirm every fix that needs confirmation.
    #[arg(long, short = 'y')]
    pub yes: bool,
}

#[derive(Clone, Debug, Subcommand)]
pub enum TxCommands {
    /// List known transactions.
    List {
        /// Filter by state (pending, in_progress, committed, compensating,
        /// rolled_back, failed).
        #[arg(long)]
        state: Option<TransactionState>,
    },
    /// Show one transaction.
    Get {
        /// Transaction id.
        id: String,
    },
}

#[derive(Clone, Debug, Args)]
pub struct MigrateArgs {
    /// Legacy export, one record per line.
    pub file: PathBuf,
}

#[derive(Clone, Debug, Args)]
pub struct SchemaArgs {
    /// Schema name, e.g. `process_entity`.
    pub name: String,
}
