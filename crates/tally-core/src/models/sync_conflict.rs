//! Sync conflict model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Collection, RecordId};

/// Incoming record discarded by LWW because the local copy was newer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConflict {
    /// Conflict row identifier
    pub id: i64,
    pub collection: Collection,
    pub record_id: RecordId,
    /// Local row's timestamp that won
    #[serde(with = "crate::util::timestamp")]
    pub local_updated_at: DateTime<Utc>,
    /// Incoming row's timestamp that was rejected
    #[serde(with = "crate::util::timestamp")]
    pub incoming_updated_at: DateTime<Utc>,
    #[serde(with = "crate::util::timestamp")]
    pub resolved_at: DateTime<Utc>,
    /// Resolution strategy name
    pub strategy: String,
}
