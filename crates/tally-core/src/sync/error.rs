use thiserror::Error;

use super::transport::TransportError;
use crate::models::Collection;

/// Errors surfaced by pull, push and full sync cycles
#[derive(Debug, Error)]
pub enum SyncError {
    /// The remote could not be read; the collection's cursor is unchanged
    #[error("Pull failed for {collection}: {source}")]
    Pull {
        collection: Collection,
        #[source]
        source: TransportError,
    },

    /// Push stopped at `collection`; earlier groups stay acknowledged
    #[error("Push failed for {collection} after {groups_sent} acknowledged batch(es): {source}")]
    Push {
        collection: Collection,
        groups_sent: usize,
        #[source]
        source: TransportError,
    },

    #[error("Local store error: {0}")]
    Storage(#[from] crate::Error),

    #[error("A sync operation is already in progress")]
    AlreadyRunning,
}

impl From<rusqlite::Error> for SyncError {
    fn from(error: rusqlite::Error) -> Self {
        Self::Storage(error.into())
    }
}

impl SyncError {
    /// Whether retrying later may succeed without any local change
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Pull { .. } | Self::Push { .. } | Self::AlreadyRunning
        )
    }
}

pub type SyncResult<T> = Result<T, SyncError>;
