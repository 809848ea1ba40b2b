//! Database migrations

use rusqlite::{Connection, OptionalExtension};

use crate::error::Result;

/// Current schema version
const CURRENT_VERSION: i32 = 2;

/// Run all pending migrations
pub fn run(conn: &mut Connection) -> Result<()> {
    let version = get_version(conn)?;
    if version >= CURRENT_VERSION {
        return Ok(());
    }

    if version < 1 {
        apply(conn, 1, V1_STATEMENTS)?;
    }
    if version < 2 {
        apply(conn, 2, V2_STATEMENTS)?;
    }

    Ok(())
}

/// Get the current schema version
fn get_version(conn: &Connection) -> Result<i32> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
        [],
        |row| row.get(0),
    )?;

    if !exists {
        return Ok(0);
    }

    let version = conn
        .query_row("SELECT MAX(version) FROM schema_version", [], |row| {
            row.get::<_, Option<i32>>(0)
        })
        .optional()?
        .flatten()
        .unwrap_or(0);

    Ok(version)
}

/// Apply one migration's statements and record its version atomically
fn apply(conn: &mut Connection, version: i32, statements: &[&str]) -> Result<()> {
    let tx = conn.transaction()?;
    for stmt in statements {
        tx.execute(stmt, [])?;
    }
    tx.execute(
        "INSERT INTO schema_version (version) VALUES (?1)",
        [version],
    )?;
    tx.commit()?;

    tracing::info!("Migrated database to version {version}");
    Ok(())
}

/// Version 1: syncable entity tables, outbox and cursors
///
/// Every entity table starts with `id, updated_at, deleted_at, version`.
/// No foreign keys between entity tables: collections are pulled
/// independently and may arrive in any order.
const V1_STATEMENTS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS schema_version (
        version INTEGER PRIMARY KEY
    )",
    "CREATE TABLE IF NOT EXISTS productos (
        id TEXT PRIMARY KEY,
        updated_at TEXT NOT NULL,
        deleted_at TEXT,
        version INTEGER NOT NULL DEFAULT 1,
        codigo TEXT NOT NULL,
        descripcion TEXT NOT NULL DEFAULT '',
        existencias INTEGER NOT NULL DEFAULT 0,
        inv_minimo INTEGER NOT NULL DEFAULT 0,
        inv_maximo INTEGER NOT NULL DEFAULT 0,
        precio_costo INTEGER NOT NULL DEFAULT 0,
        precio_venta INTEGER NOT NULL DEFAULT 0,
        porcentaje_impuesto INTEGER NOT NULL DEFAULT 19,
        albergado TEXT NOT NULL DEFAULT 'Albergado y catalogado'
    )",
    "CREATE INDEX IF NOT EXISTS idx_productos_updated ON productos(updated_at)",
    "CREATE INDEX IF NOT EXISTS idx_productos_codigo ON productos(codigo)",
    "CREATE TABLE IF NOT EXISTS transito (
        id TEXT PRIMARY KEY,
        updated_at TEXT NOT NULL,
        deleted_at TEXT,
        version INTEGER NOT NULL DEFAULT 1,
        producto_codigo TEXT NOT NULL,
        mas_existencias INTEGER NOT NULL DEFAULT 0,
        new_precio_costo INTEGER NOT NULL DEFAULT 0,
        estado_transito TEXT NOT NULL DEFAULT 'desactivado'
    )",
    "CREATE INDEX IF NOT EXISTS idx_transito_producto ON transito(producto_codigo)",
    "CREATE TABLE IF NOT EXISTS ordenes_compra (
        id TEXT PRIMARY KEY,
        updated_at TEXT NOT NULL,
        deleted_at TEXT,
        version INTEGER NOT NULL DEFAULT 1,
        folio_orden TEXT NOT NULL,
        fecha_llegada_orden TEXT,
        estado_orden TEXT NOT NULL DEFAULT 'pendiente'
    )",
    "CREATE TABLE IF NOT EXISTS detalles_orden (
        id TEXT PRIMARY KEY,
        updated_at TEXT NOT NULL,
        deleted_at TEXT,
        version INTEGER NOT NULL DEFAULT 1,
        orden_id TEXT NOT NULL,
        codigo_producto TEXT NOT NULL,
        cant_enorden INTEGER NOT NULL DEFAULT 0,
        precio_unitario_orden INTEGER NOT NULL DEFAULT 0,
        descripcion_enorden TEXT
    )",
    "CREATE INDEX IF NOT EXISTS idx_detalles_orden_orden ON detalles_orden(orden_id)",
    "CREATE TABLE IF NOT EXISTS outbox (
        id TEXT PRIMARY KEY,
        \"table\" TEXT NOT NULL,
        operation TEXT NOT NULL,
        payload TEXT NOT NULL,
        created_at TEXT NOT NULL,
        sent INTEGER NOT NULL DEFAULT 0
    )",
    "CREATE INDEX IF NOT EXISTS idx_outbox_pending ON outbox(sent, created_at)",
    "CREATE TABLE IF NOT EXISTS sync_state (
        table_name TEXT PRIMARY KEY,
        last_sync TEXT,
        last_version INTEGER
    )",
];

/// Version 2: LWW conflict log
const V2_STATEMENTS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS sync_conflicts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        collection TEXT NOT NULL,
        record_id TEXT NOT NULL,
        local_updated_at TEXT NOT NULL,
        incoming_updated_at TEXT NOT NULL,
        resolved_at TEXT NOT NULL,
        strategy TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_sync_conflicts_record ON sync_conflicts(collection, record_id)",
    "CREATE INDEX IF NOT EXISTS idx_sync_conflicts_resolved_at ON sync_conflicts(resolved_at DESC)",
];
