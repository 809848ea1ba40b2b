//! LWW conflict log
//!
//! Informational only: a row is written whenever an incoming record loses to
//! a strictly newer local copy.

#![allow(clippy::cast_possible_wrap)] // SQLite uses i64 for LIMIT

use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};

use super::records::timestamp_column;
use crate::error::Result;
use crate::models::{Collection, RecordId, SyncConflict, SyncMeta};
use crate::util::{format_timestamp, now_utc};

const LWW_STRATEGY: &str = "lww";

/// Log that `incoming` was discarded in favour of `local`.
///
/// The same pair of versions is logged once, so re-pulling an overlapping
/// window does not grow the log. Returns whether a row was written.
pub fn record(
    conn: &Connection,
    collection: Collection,
    local: &SyncMeta,
    incoming: &SyncMeta,
) -> Result<bool> {
    let inserted = conn.execute(
        "INSERT INTO sync_conflicts (
            collection, record_id, local_updated_at, incoming_updated_at, resolved_at, strategy
        )
        SELECT ?1, ?2, ?3, ?4, ?5, ?6
        WHERE NOT EXISTS (
            SELECT 1 FROM sync_conflicts
            WHERE collection = ?1 AND record_id = ?2
              AND local_updated_at = ?3 AND incoming_updated_at = ?4
        )",
        params![
            collection.as_str(),
            local.id.as_str(),
            format_timestamp(&local.updated_at),
            format_timestamp(&incoming.updated_at),
            format_timestamp(&now_utc()),
            LWW_STRATEGY,
        ],
    )?;
    Ok(inserted > 0)
}

/// Most recently resolved conflicts first
pub fn list(conn: &Connection, limit: usize) -> Result<Vec<SyncConflict>> {
    let mut stmt = conn.prepare(
        "SELECT id, collection, record_id, local_updated_at, incoming_updated_at, resolved_at, strategy
         FROM sync_conflicts
         ORDER BY resolved_at DESC, id DESC
         LIMIT ?1",
    )?;
    let conflicts = stmt
        .query_map(params![limit as i64], parse_conflict)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(conflicts)
}

fn parse_conflict(row: &Row<'_>) -> rusqlite::Result<SyncConflict> {
    let collection = row
        .get::<_, String>("collection")?
        .parse::<Collection>()
        .map_err(|error| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(error)))?;

    Ok(SyncConflict {
        id: row.get("id")?,
        collection,
        record_id: RecordId::from(row.get::<_, String>("record_id")?),
        local_updated_at: timestamp_column(row, "local_updated_at")?,
        incoming_updated_at: timestamp_column(row, "incoming_updated_at")?,
        resolved_at: timestamp_column(row, "resolved_at")?,
        strategy: row.get("strategy")?,
    })
}
