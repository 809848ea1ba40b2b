//! Mutation log (outbox) storage
//!
//! Entries are appended inside the transaction of the entity change they
//! describe and are only ever flipped to `sent` or pruned afterwards.

#![allow(clippy::cast_possible_wrap)] // SQLite uses i64 for LIMIT

use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, Connection, Row, Transaction};
use uuid::Uuid;

use super::records::timestamp_column;
use crate::error::{Error, Result};
use crate::models::{Operation, OutboxEntry, Snapshot};
use crate::util::{format_timestamp, now_utc};

const SELECT_ENTRY: &str =
    "SELECT id, \"table\", operation, payload, created_at, sent FROM outbox";

/// Append an unsent entry for a mutation committed by `tx`.
///
/// Any error here must abort `tx`, so the entity change and its entry are
/// all-or-nothing.
pub fn record(tx: &Transaction<'_>, operation: Operation, snapshot: &Snapshot) -> Result<OutboxEntry> {
    let entry = OutboxEntry {
        id: Uuid::now_v7().to_string(),
        table: snapshot.collection(),
        operation,
        payload: snapshot.encode()?,
        created_at: now_utc(),
        sent: false,
    };

    tx.execute(
        "INSERT INTO outbox (id, \"table\", operation, payload, created_at, sent)
         VALUES (?1, ?2, ?3, ?4, ?5, 0)",
        params![
            entry.id,
            entry.table.as_str(),
            entry.operation.as_str(),
            entry.payload,
            format_timestamp(&entry.created_at),
        ],
    )?;

    tracing::debug!(
        entry = %entry.id,
        table = %entry.table,
        operation = %entry.operation,
        record = %snapshot.id(),
        "Recorded outbox entry"
    );
    Ok(entry)
}

/// All unsent entries in insertion order.
///
/// Ordered by `rowid` alone: `created_at` follows the wall clock and may step
/// backwards between two mutations. A new rowid is always above every row
/// still present, so pruning cannot reorder pending entries.
pub fn pending(conn: &Connection) -> Result<Vec<OutboxEntry>> {
    let sql = format!("{SELECT_ENTRY} WHERE sent = 0 ORDER BY rowid ASC");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], parse_entry)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    rows.into_iter().map(OutboxEntry::try_from).collect()
}

/// Flag entries as acknowledged by the remote
pub fn mark_sent(tx: &Transaction<'_>, ids: &[&str]) -> Result<usize> {
    if ids.is_empty() {
        return Ok(0);
    }
    let placeholders = (1..=ids.len())
        .map(|index| format!("?{index}"))
        .collect::<Vec<_>>()
        .join(", ");
    let updated = tx.execute(
        &format!("UPDATE outbox SET sent = 1 WHERE sent = 0 AND id IN ({placeholders})"),
        params_from_iter(ids.iter()),
    )?;
    Ok(updated)
}

/// Most recent entries first, for inspection
pub fn list(conn: &Connection, include_sent: bool, limit: usize) -> Result<Vec<OutboxEntry>> {
    let filter = if include_sent { "" } else { " WHERE sent = 0" };
    let sql = format!("{SELECT_ENTRY}{filter} ORDER BY rowid DESC LIMIT ?1");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![limit as i64], parse_entry)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    rows.into_iter().map(OutboxEntry::try_from).collect()
}

/// `(pending, sent)` entry totals
pub fn counts(conn: &Connection) -> Result<(usize, usize)> {
    let counts = conn.query_row(
        "SELECT COALESCE(SUM(sent = 0), 0), COALESCE(SUM(sent = 1), 0) FROM outbox",
        [],
        |row| Ok((row.get::<_, usize>(0)?, row.get::<_, usize>(1)?)),
    )?;
    Ok(counts)
}

/// Delete acknowledged entries created before `cutoff`; unsent entries stay
pub fn prune_sent(conn: &Connection, cutoff: DateTime<Utc>) -> Result<usize> {
    let removed = conn.execute(
        "DELETE FROM outbox WHERE sent = 1 AND created_at < ?1",
        params![format_timestamp(&cutoff)],
    )?;
    if removed > 0 {
        tracing::info!(removed, "Pruned acknowledged outbox entries");
    }
    Ok(removed)
}

/// Outbox row as stored, before table and operation names are validated
struct StoredEntry {
    id: String,
    table: String,
    operation: String,
    payload: String,
    created_at: DateTime<Utc>,
    sent: bool,
}

impl TryFrom<StoredEntry> for OutboxEntry {
    type Error = Error;

    fn try_from(value: StoredEntry) -> Result<Self> {
        let corrupt = |error: Error| Error::Database(format!("corrupt outbox row {}: {error}", value.id));
        Ok(Self {
            table: value.table.parse().map_err(corrupt)?,
            operation: value.operation.parse().map_err(corrupt)?,
            id: value.id,
            payload: value.payload,
            created_at: value.created_at,
            sent: value.sent,
        })
    }
}

fn parse_entry(row: &Row<'_>) -> rusqlite::Result<StoredEntry> {
    Ok(StoredEntry {
        id: row.get("id")?,
        table: row.get("table")?,
        operation: row.get("operation")?,
        payload: row.get("payload")?,
        created_at: timestamp_column(row, "created_at")?,
        sent: row.get::<_, i32>("sent")? != 0,
    })
}
