//! Sync cursor model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Collection;

/// Pull watermark for one collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncCursor {
    pub table_name: Collection,
    /// Time of the last successful pull; `None` before the first one
    #[serde(with = "crate::util::timestamp::option")]
    pub last_sync: Option<DateTime<Utc>>,
    /// Reserved for version-based consistency schemes
    pub last_version: Option<i64>,
}

impl SyncCursor {
    /// Cursor for a collection that has never been pulled
    pub const fn empty(table_name: Collection) -> Self {
        Self {
            table_name,
            last_sync: None,
            last_version: None,
        }
    }
}
