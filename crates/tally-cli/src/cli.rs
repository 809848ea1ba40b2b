use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tally_core::Collection;

#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "Offline-first inventory store with remote sync")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Optional path to the sync settings file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Replicate the local store with the remote API (full cycle by default)
    Sync {
        #[command(subcommand)]
        command: Option<SyncCommands>,
    },
    /// Inspect or prune the outbox of local changes
    Outbox {
        #[command(subcommand)]
        command: OutboxCommands,
    },
    /// Check that the remote API is reachable
    Health,
    /// Show or write sync settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Manage products in the local store
    Productos {
        #[command(subcommand)]
        command: ProductoCommands,
    },
}

#[derive(Subcommand, Clone, Debug, PartialEq, Eq)]
pub enum SyncCommands {
    /// Pull one collection from the remote
    Pull {
        /// productos, transito, ordenes_compra or detalles_orden
        collection: Collection,
        /// Output the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Push pending outbox entries
    Push {
        #[arg(long)]
        json: bool,
    },
    /// Pull every collection, then push
    Cycle {
        #[arg(long)]
        json: bool,
    },
    /// Show cursors and outbox counts
    Status {
        #[arg(long)]
        json: bool,
    },
    /// List records discarded because the local copy was newer
    Conflicts {
        /// Number of conflicts to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand, Clone, Debug, PartialEq, Eq)]
pub enum OutboxCommands {
    /// List outbox entries, pending only unless --all
    List {
        /// Include acknowledged entries
        #[arg(long)]
        all: bool,
        #[arg(short, long, default_value = "20")]
        limit: usize,
        #[arg(long)]
        json: bool,
    },
    /// Delete acknowledged entries; pending entries are never removed
    Prune {
        /// Age threshold in days (defaults to the configured retention)
        #[arg(long, value_name = "DAYS")]
        older_than_days: Option<u32>,
    },
}

#[derive(Subcommand, Clone, Debug, PartialEq, Eq)]
pub enum ConfigCommands {
    /// Print effective settings (file plus TALLY_* environment)
    Show,
    /// Create or update the settings file
    Init {
        /// Remote API base URL
        #[arg(long, value_name = "URL")]
        api_url: Option<String>,
        /// Bearer token for the remote API
        #[arg(long, value_name = "TOKEN")]
        api_token: Option<String>,
        /// Per-request timeout
        #[arg(long, value_name = "SECS")]
        http_timeout_secs: Option<u64>,
        /// Prune acknowledged outbox entries older than this after each push
        #[arg(long, value_name = "DAYS")]
        retention_days: Option<u32>,
        /// Advance cursors to the newest record seen minus this skew
        #[arg(long, value_name = "SECS")]
        cursor_skew_secs: Option<u64>,
    },
}

#[derive(Subcommand, Clone, Debug, PartialEq, Eq)]
pub enum ProductoCommands {
    /// Create a product
    Add {
        /// Business code, unique among live products
        codigo: String,
        /// Description
        descripcion: Vec<String>,
        #[arg(long, default_value = "0")]
        existencias: i64,
        #[arg(long, default_value = "0")]
        inv_minimo: i64,
        #[arg(long, default_value = "0")]
        precio_costo: i64,
        #[arg(long, default_value = "0")]
        precio_venta: i64,
    },
    /// List live products
    List {
        /// Only products below their minimum stock
        #[arg(long)]
        low_stock: bool,
        #[arg(long)]
        json: bool,
    },
    /// Set the stock level of a product
    SetStock {
        /// Product code or id
        producto: String,
        existencias: i64,
    },
    /// Delete a product (replicated as a tombstone)
    Delete {
        /// Product code or id
        producto: String,
    },
}
