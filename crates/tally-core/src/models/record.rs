//! Syncable record identity, metadata and the entity trait

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::Row;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Snapshot;
use crate::error::Error;
use crate::util::now_utc;

/// A globally unique, client-generatable record identifier.
///
/// Locally created records get a UUID v7 (time-sortable); identifiers
/// received from the remote are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Create a new unique record ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Get the string representation of this ID
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Sync bookkeeping carried by every syncable entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncMeta {
    pub id: RecordId,
    /// Sole ordering key for last-writer-wins
    #[serde(with = "crate::util::timestamp")]
    pub updated_at: DateTime<Utc>,
    /// Tombstone marker; rows are never physically removed
    #[serde(default, with = "crate::util::timestamp::option")]
    pub deleted_at: Option<DateTime<Utc>>,
    /// Informational only, not used for conflict resolution
    #[serde(default = "default_version")]
    pub version: i64,
}

const fn default_version() -> i64 {
    1
}

impl SyncMeta {
    /// Metadata for a record about to be created locally
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: RecordId::new(),
            updated_at: now_utc(),
            deleted_at: None,
            version: 1,
        }
    }

    pub const fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

impl Default for SyncMeta {
    fn default() -> Self {
        Self::new()
    }
}

/// The syncable collections known to this store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Productos,
    Transito,
    OrdenesCompra,
    DetallesOrden,
}

impl Collection {
    /// Every collection, in the order a full cycle pulls them
    pub const ALL: [Self; 4] = [
        Self::Productos,
        Self::Transito,
        Self::OrdenesCompra,
        Self::DetallesOrden,
    ];

    /// Table name locally and resource name on the remote
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Productos => "productos",
            Self::Transito => "transito",
            Self::OrdenesCompra => "ordenes_compra",
            Self::DetallesOrden => "detalles_orden",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Collection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|collection| collection.as_str() == s.trim())
            .ok_or_else(|| Error::UnknownCollection(s.to_string()))
    }
}

/// Kind of local mutation recorded in the outbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Insert,
    Update,
    Delete,
}

impl Operation {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "insert" => Ok(Self::Insert),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            other => Err(Error::InvalidInput(format!("unknown outbox operation '{other}'"))),
        }
    }
}

/// An entity stored in its own table and replicated through the outbox.
///
/// Tables share the `id, updated_at, deleted_at, version` prefix; the
/// business columns are described by [`SyncEntity::COLUMNS`] so the store can
/// build its statements generically.
pub trait SyncEntity: Serialize + DeserializeOwned + Clone + PartialEq + fmt::Debug {
    const COLLECTION: Collection;

    /// Business columns, in the order [`SyncEntity::column_values`] yields them
    const COLUMNS: &'static [&'static str];

    fn meta(&self) -> &SyncMeta;

    fn meta_mut(&mut self) -> &mut SyncMeta;

    fn column_values(&self) -> Vec<Value>;

    /// Rebuild the entity from a row selected with the shared prefix and `COLUMNS`
    fn from_row(meta: SyncMeta, row: &Row<'_>) -> rusqlite::Result<Self>;

    fn into_snapshot(self) -> Snapshot;

    fn id(&self) -> &RecordId {
        &self.meta().id
    }
}
