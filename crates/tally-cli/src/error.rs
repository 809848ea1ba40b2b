use std::io;

use tally_core::sync::{SyncError, TransportError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] tally_core::Error),
    #[error(transparent)]
    Sync(#[from] SyncError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error(
        "Sync is not configured. Run `tally config init --api-url <URL>` or set TALLY_API_URL."
    )]
    SyncNotConfigured,
    #[error("{0}")]
    SyncFailed(String),
    #[error("Remote at {0} is not healthy")]
    Unhealthy(String),
    #[error("Product code cannot be empty")]
    EmptyCodigo,
    #[error("Product not found for code/id: {0}")]
    ProductoNotFound(String),
    #[error("A product with code {0} already exists")]
    DuplicateCodigo(String),
    #[error("No outbox retention configured; pass --older-than-days or set TALLY_OUTBOX_RETENTION_DAYS")]
    NoRetention,
}
