//! Sync cursor storage (`sync_state` table)

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::records::optional_timestamp_column;
use crate::error::Result;
use crate::models::{Collection, SyncCursor};
use crate::util::format_timestamp;

/// Cursor for `collection`; an empty cursor when it was never pulled
pub fn load(conn: &Connection, collection: Collection) -> Result<SyncCursor> {
    let cursor = conn
        .query_row(
            "SELECT table_name, last_sync, last_version FROM sync_state WHERE table_name = ?1",
            params![collection.as_str()],
            |row| parse_cursor(collection, row),
        )
        .optional()?;
    Ok(cursor.unwrap_or_else(|| SyncCursor::empty(collection)))
}

/// Move the pull watermark of `collection`, keeping `last_version`
pub fn advance(conn: &Connection, collection: Collection, last_sync: DateTime<Utc>) -> Result<()> {
    conn.execute(
        "INSERT INTO sync_state (table_name, last_sync, last_version) VALUES (?1, ?2, NULL)
         ON CONFLICT(table_name) DO UPDATE SET last_sync = excluded.last_sync",
        params![collection.as_str(), format_timestamp(&last_sync)],
    )?;
    Ok(())
}

/// Cursors of every known collection, empty ones included
pub fn list(conn: &Connection) -> Result<Vec<SyncCursor>> {
    Collection::ALL
        .into_iter()
        .map(|collection| load(conn, collection))
        .collect()
}

fn parse_cursor(collection: Collection, row: &Row<'_>) -> rusqlite::Result<SyncCursor> {
    Ok(SyncCursor {
        table_name: collection,
        last_sync: optional_timestamp_column(row, "last_sync")?,
        last_version: row.get("last_version")?,
    })
}
