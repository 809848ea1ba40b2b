//! Pull reconciler
//!
//! Fetches one collection's changes since its cursor and merges them into the
//! local store with last-writer-wins on `updated_at`. Merging never touches
//! the outbox, so pulled rows are not echoed back to the remote.

use std::fmt;

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::Serialize;
use serde_json::Value;

use super::error::{SyncError, SyncResult};
use super::transport::RemoteTransport;
use crate::config::CursorPolicy;
use crate::db::{conflicts, cursor, records, Database};
use crate::error::{Error, Result};
use crate::models::{Collection, DetalleOrden, OrdenCompra, Producto, SyncEntity, Transito};
use crate::util::now_utc;

/// What a single pull did to the local store
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PullReport {
    pub collection: Collection,
    pub received: usize,
    pub inserted: usize,
    pub updated: usize,
    /// Incoming copy identical to the stored one
    pub unchanged: usize,
    /// Incoming copy older than the local one
    pub discarded: usize,
    /// Cursor after the pull
    #[serde(with = "crate::util::timestamp::option")]
    pub cursor: Option<DateTime<Utc>>,
}

impl PullReport {
    const fn new(collection: Collection, received: usize) -> Self {
        Self {
            collection,
            received,
            inserted: 0,
            updated: 0,
            unchanged: 0,
            discarded: 0,
            cursor: None,
        }
    }

    /// Rows written locally
    pub const fn applied(&self) -> usize {
        self.inserted + self.updated
    }
}

impl fmt::Display for PullReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Pulled {}: {} received, {} inserted, {} updated, {} unchanged, {} discarded",
            self.collection, self.received, self.inserted, self.updated, self.unchanged, self.discarded
        )
    }
}

/// Result of merging one incoming record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Inserted,
    Updated,
    Unchanged,
    Discarded,
}

/// Pull `collection` and reconcile it into `db`.
///
/// The transport call happens before any local write. On transport failure
/// nothing local changes; on a storage failure the merge rolls back as a
/// whole and the cursor stays where it was.
pub fn pull_collection(
    db: &mut Database,
    transport: &impl RemoteTransport,
    collection: Collection,
    policy: CursorPolicy,
) -> SyncResult<PullReport> {
    match collection {
        Collection::Productos => pull_entity::<Producto>(db, transport, policy),
        Collection::Transito => pull_entity::<Transito>(db, transport, policy),
        Collection::OrdenesCompra => pull_entity::<OrdenCompra>(db, transport, policy),
        Collection::DetallesOrden => pull_entity::<DetalleOrden>(db, transport, policy),
    }
}

fn pull_entity<E: SyncEntity>(
    db: &mut Database,
    transport: &impl RemoteTransport,
    policy: CursorPolicy,
) -> SyncResult<PullReport> {
    let collection = E::COLLECTION;
    let previous = cursor::load(db.connection(), collection)?.last_sync;
    let started_at = now_utc();

    let rows = transport
        .pull(collection, previous)
        .map_err(|source| SyncError::Pull { collection, source })?;
    let incoming = decode_rows::<E>(rows)?;

    let mut report = PullReport::new(collection, incoming.len());
    let max_seen = incoming.iter().map(|entity| entity.meta().updated_at).max();

    let tx = db.connection_mut().transaction()?;
    for entity in incoming {
        match merge(&tx, entity)? {
            MergeOutcome::Inserted => report.inserted += 1,
            MergeOutcome::Updated => report.updated += 1,
            MergeOutcome::Unchanged => report.unchanged += 1,
            MergeOutcome::Discarded => report.discarded += 1,
        }
    }

    let next = next_cursor(policy, started_at, previous, max_seen);
    if let Some(next) = next.filter(|next| Some(*next) != previous) {
        cursor::advance(&tx, collection, next)?;
    }
    tx.commit()?;

    report.cursor = next;
    tracing::info!(
        %collection,
        received = report.received,
        applied = report.applied(),
        discarded = report.discarded,
        "Pull complete"
    );
    Ok(report)
}

/// Validate the whole response before writing any of it
fn decode_rows<E: SyncEntity>(rows: Vec<Value>) -> Result<Vec<E>> {
    rows.into_iter()
        .enumerate()
        .map(|(index, row)| {
            serde_json::from_value::<E>(row).map_err(|error| {
                Error::InvalidInput(format!(
                    "{} record #{index} from remote is malformed: {error}",
                    E::COLLECTION
                ))
            })
        })
        .collect()
}

/// Apply `incoming` if it is at least as new as the local copy.
///
/// Ties go to the incoming record so every replica converges on the remote's
/// copy. A losing incoming record is logged to the conflict table.
pub fn merge<E: SyncEntity>(conn: &Connection, incoming: E) -> Result<MergeOutcome> {
    let Some(local) = records::fetch::<E>(conn, incoming.id())? else {
        records::insert(conn, &incoming)?;
        return Ok(MergeOutcome::Inserted);
    };

    if incoming.meta().updated_at < local.meta().updated_at {
        conflicts::record(conn, E::COLLECTION, local.meta(), incoming.meta())?;
        tracing::debug!(
            collection = %E::COLLECTION,
            id = %incoming.id(),
            "Discarded older incoming record"
        );
        return Ok(MergeOutcome::Discarded);
    }

    if local == incoming {
        return Ok(MergeOutcome::Unchanged);
    }

    records::upsert(conn, &incoming)?;
    Ok(MergeOutcome::Updated)
}

fn next_cursor(
    policy: CursorPolicy,
    started_at: DateTime<Utc>,
    previous: Option<DateTime<Utc>>,
    max_seen: Option<DateTime<Utc>>,
) -> Option<DateTime<Utc>> {
    match policy {
        CursorPolicy::PullStart => Some(started_at),
        CursorPolicy::MaxSeen { skew_secs } => {
            let Some(seen) = max_seen else {
                return previous;
            };
            // A skew past the date range leaves the cursor where it was
            let Some(candidate) = i64::try_from(skew_secs)
                .ok()
                .and_then(chrono::Duration::try_seconds)
                .and_then(|skew| seen.checked_sub_signed(skew))
            else {
                return previous;
            };
            let candidate = candidate.min(started_at);
            // Never move backwards
            Some(previous.map_or(candidate, |previous| previous.max(candidate)))
        }
    }
}
