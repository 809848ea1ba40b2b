use std::env;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tally_core::db::{RecordRepository, SqliteRecordRepository};
use tally_core::models::{OutboxEntry, Producto, SyncConflict};
use tally_core::sync::HttpTransport;
use tally_core::util::format_timestamp;
use tally_core::{Database, SyncEngine, SyncSettings};

use crate::error::CliError;

pub const ENV_DB_PATH: &str = "TALLY_DB_PATH";

#[derive(Debug, Serialize)]
pub struct SyncConflictItem {
    pub id: i64,
    pub collection: String,
    pub record_id: String,
    pub local_updated_at: String,
    pub incoming_updated_at: String,
    pub resolved_at: String,
    pub strategy: String,
}

pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> PathBuf {
    cli_db_path
        .or_else(|| env::var_os(ENV_DB_PATH).map(PathBuf::from))
        .unwrap_or_else(default_db_path)
}

pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tally")
        .join("tally.db")
}

pub fn resolve_config_path(cli_config_path: Option<PathBuf>) -> PathBuf {
    cli_config_path.unwrap_or_else(default_config_path)
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tally")
        .join("config.json")
}

pub fn open_database(path: &Path) -> Result<Database, CliError> {
    Ok(Database::open(path)?)
}

/// Settings file overlaid with `TALLY_*` variables from `lookup`
pub fn load_settings_with(
    config_path: &Path,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<SyncSettings, CliError> {
    SyncSettings::load_from_path(config_path)
        .and_then(|settings| settings.with_overrides(lookup))
        .map_err(CliError::Config)
}

pub fn load_settings(config_path: &Path) -> Result<SyncSettings, CliError> {
    load_settings_with(config_path, |key| env::var(key).ok())
}

pub fn sync_engine(settings: &SyncSettings) -> Result<SyncEngine<HttpTransport>, CliError> {
    if !settings.is_configured() {
        return Err(CliError::SyncNotConfigured);
    }
    Ok(SyncEngine::from_settings(settings)?)
}

pub fn format_display_timestamp(value: &DateTime<Utc>) -> String {
    value.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

pub fn sync_conflict_to_item(conflict: &SyncConflict) -> SyncConflictItem {
    SyncConflictItem {
        id: conflict.id,
        collection: conflict.collection.to_string(),
        record_id: conflict.record_id.to_string(),
        local_updated_at: format_timestamp(&conflict.local_updated_at),
        incoming_updated_at: format_timestamp(&conflict.incoming_updated_at),
        resolved_at: format_timestamp(&conflict.resolved_at),
        strategy: conflict.strategy.clone(),
    }
}

pub fn format_sync_conflict_lines(conflicts: &[SyncConflict]) -> Vec<String> {
    conflicts
        .iter()
        .map(|conflict| {
            format!(
                "{}  {:<4}  {}/{}  local={} incoming={}",
                format_display_timestamp(&conflict.resolved_at),
                conflict.strategy,
                conflict.collection,
                conflict.record_id,
                format_timestamp(&conflict.local_updated_at),
                format_timestamp(&conflict.incoming_updated_at)
            )
        })
        .collect()
}

pub fn format_outbox_lines(entries: &[OutboxEntry]) -> Vec<String> {
    entries
        .iter()
        .map(|entry| {
            format!(
                "{}  {:<8}  {:<14} {:<6}  {}",
                format_display_timestamp(&entry.created_at),
                if entry.sent { "sent" } else { "pending" },
                entry.table,
                entry.operation,
                entry.id
            )
        })
        .collect()
}

pub fn format_producto_lines(productos: &[Producto]) -> Vec<String> {
    productos
        .iter()
        .map(|producto| {
            let marker = if producto.is_below_minimum() { " !" } else { "" };
            format!(
                "{:<10} {:>6} {:>10}  {}{}",
                producto.codigo,
                producto.existencias,
                producto.precio_venta,
                producto.descripcion,
                marker
            )
        })
        .collect()
}

pub fn normalize_codigo(codigo: &str) -> Result<String, CliError> {
    let codigo = codigo.trim();
    if codigo.is_empty() {
        return Err(CliError::EmptyCodigo);
    }
    Ok(codigo.to_string())
}

/// Find a live product by exact id or by code
pub fn resolve_producto(query: &str, db: &Database) -> Result<Producto, CliError> {
    let query = normalize_codigo(query)?;
    let repo = SqliteRecordRepository::new(db.connection());

    if let Some(producto) = repo.get::<Producto>(&query.as_str().into())? {
        return Ok(producto);
    }

    repo.list::<Producto>()?
        .into_iter()
        .find(|producto| producto.codigo == query)
        .ok_or(CliError::ProductoNotFound(query))
}
