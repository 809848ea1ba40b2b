//! Generic row access for syncable entity tables

use chrono::{DateTime, Utc};
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

use crate::error::Result;
use crate::models::{RecordId, SyncEntity, SyncMeta};
use crate::util::{format_timestamp, parse_timestamp};

/// Columns shared by every entity table, in statement order
const META_COLUMNS: [&str; 4] = ["id", "updated_at", "deleted_at", "version"];

fn select_sql<E: SyncEntity>() -> String {
    format!(
        "SELECT {}, {} FROM {}",
        META_COLUMNS.join(", "),
        E::COLUMNS.join(", "),
        E::COLLECTION.as_str()
    )
}

fn write_sql<E: SyncEntity>(upsert: bool) -> String {
    let columns = META_COLUMNS
        .iter()
        .chain(E::COLUMNS.iter())
        .copied()
        .collect::<Vec<_>>();
    let placeholders = (1..=columns.len())
        .map(|index| format!("?{index}"))
        .collect::<Vec<_>>()
        .join(", ");

    let mut sql = format!(
        "INSERT INTO {} ({}) VALUES ({placeholders})",
        E::COLLECTION.as_str(),
        columns.join(", ")
    );
    if upsert {
        let assignments = columns[1..]
            .iter()
            .map(|column| format!("{column} = excluded.{column}"))
            .collect::<Vec<_>>()
            .join(", ");
        sql.push_str(" ON CONFLICT(id) DO UPDATE SET ");
        sql.push_str(&assignments);
    }
    sql
}

fn row_values<E: SyncEntity>(entity: &E) -> Vec<Value> {
    let meta = entity.meta();
    let mut values: Vec<Value> = vec![
        meta.id.as_str().to_string().into(),
        format_timestamp(&meta.updated_at).into(),
        meta.deleted_at.as_ref().map(format_timestamp).into(),
        meta.version.into(),
    ];
    values.extend(entity.column_values());
    values
}

/// Read a stored timestamp column
pub(crate) fn timestamp_column(row: &Row<'_>, column: &str) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(column)?;
    parse_timestamp(&raw)
        .map_err(|error| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(error)))
}

/// Read a nullable stored timestamp column
pub(crate) fn optional_timestamp_column(
    row: &Row<'_>,
    column: &str,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(column)?;
    raw.map(|raw| {
        parse_timestamp(&raw).map_err(|error| {
            rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(error))
        })
    })
    .transpose()
}

fn parse_entity<E: SyncEntity>(row: &Row<'_>) -> rusqlite::Result<E> {
    let meta = SyncMeta {
        id: RecordId::from(row.get::<_, String>("id")?),
        updated_at: timestamp_column(row, "updated_at")?,
        deleted_at: optional_timestamp_column(row, "deleted_at")?,
        version: row.get("version")?,
    };
    E::from_row(meta, row)
}

/// Fetch a row by id, tombstoned or not
pub fn fetch<E: SyncEntity>(conn: &Connection, id: &RecordId) -> Result<Option<E>> {
    let sql = format!("{} WHERE id = ?1", select_sql::<E>());
    let entity = conn
        .query_row(&sql, params![id.as_str()], parse_entity::<E>)
        .optional()?;
    Ok(entity)
}

/// List rows, most recently updated first
pub fn list<E: SyncEntity>(conn: &Connection, include_deleted: bool) -> Result<Vec<E>> {
    let filter = if include_deleted {
        ""
    } else {
        " WHERE deleted_at IS NULL"
    };
    let sql = format!("{}{filter} ORDER BY updated_at DESC, id ASC", select_sql::<E>());

    let mut stmt = conn.prepare(&sql)?;
    let entities = stmt
        .query_map([], parse_entity::<E>)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(entities)
}

/// Insert a new row; fails if the id already exists
pub fn insert<E: SyncEntity>(conn: &Connection, entity: &E) -> Result<()> {
    conn.execute(&write_sql::<E>(false), params_from_iter(row_values(entity)))?;
    Ok(())
}

/// Insert or overwrite every column of the row with the entity's id
pub fn upsert<E: SyncEntity>(conn: &Connection, entity: &E) -> Result<()> {
    conn.execute(&write_sql::<E>(true), params_from_iter(row_values(entity)))?;
    Ok(())
}
