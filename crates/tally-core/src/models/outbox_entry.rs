//! Outbox entry model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Collection, Operation, Snapshot};
use crate::error::Result;

/// One pending (or acknowledged) local change to replicate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboxEntry {
    /// Entry identifier, distinct from the entity's id
    pub id: String,
    /// Destination collection
    pub table: Collection,
    pub operation: Operation,
    /// JSON snapshot of the entity when the mutation committed
    pub payload: String,
    #[serde(with = "crate::util::timestamp")]
    pub created_at: DateTime<Utc>,
    pub sent: bool,
}

impl OutboxEntry {
    /// Decode the payload into the typed snapshot of its collection
    pub fn snapshot(&self) -> Result<Snapshot> {
        Snapshot::decode(self.table, &self.payload)
    }
}
