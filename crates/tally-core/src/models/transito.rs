//! In-transit stock snapshot, one per product

use rusqlite::types::Value;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

use super::{Collection, Snapshot, SyncEntity, SyncMeta};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transito {
    #[serde(flatten)]
    pub meta: SyncMeta,
    pub producto_codigo: String,
    #[serde(default)]
    pub mas_existencias: i64,
    #[serde(default)]
    pub new_precio_costo: i64,
    #[serde(default = "default_estado_transito")]
    pub estado_transito: String,
}

fn default_estado_transito() -> String {
    "desactivado".to_string()
}

impl Transito {
    #[must_use]
    pub fn new(producto_codigo: impl Into<String>) -> Self {
        Self {
            meta: SyncMeta::new(),
            producto_codigo: producto_codigo.into(),
            mas_existencias: 0,
            new_precio_costo: 0,
            estado_transito: default_estado_transito(),
        }
    }
}

impl SyncEntity for Transito {
    const COLLECTION: Collection = Collection::Transito;
    const COLUMNS: &'static [&'static str] = &[
        "producto_codigo",
        "mas_existencias",
        "new_precio_costo",
        "estado_transito",
    ];

    fn meta(&self) -> &SyncMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut SyncMeta {
        &mut self.meta
    }

    fn column_values(&self) -> Vec<Value> {
        vec![
            self.producto_codigo.clone().into(),
            self.mas_existencias.into(),
            self.new_precio_costo.into(),
            self.estado_transito.clone().into(),
        ]
    }

    fn from_row(meta: SyncMeta, row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            meta,
            producto_codigo: row.get("producto_codigo")?,
            mas_existencias: row.get("mas_existencias")?,
            new_precio_costo: row.get("new_precio_costo")?,
            estado_transito: row.get("estado_transito")?,
        })
    }

    fn into_snapshot(self) -> Snapshot {
        Snapshot::Transito(self)
    }
}
