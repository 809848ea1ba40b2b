//! Product model

use rusqlite::types::Value;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

use super::{Collection, Snapshot, SyncEntity, SyncMeta};

/// A catalogued product with its stock levels and prices
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Producto {
    #[serde(flatten)]
    pub meta: SyncMeta,
    /// Business code shown to users (e.g. "A-001")
    pub codigo: String,
    #[serde(default)]
    pub descripcion: String,
    #[serde(default)]
    pub existencias: i64,
    #[serde(default)]
    pub inv_minimo: i64,
    #[serde(default)]
    pub inv_maximo: i64,
    #[serde(default)]
    pub precio_costo: i64,
    #[serde(default)]
    pub precio_venta: i64,
    #[serde(default = "default_porcentaje_impuesto")]
    pub porcentaje_impuesto: i64,
    #[serde(default = "default_albergado")]
    pub albergado: String,
}

const fn default_porcentaje_impuesto() -> i64 {
    19
}

fn default_albergado() -> String {
    "Albergado y catalogado".to_string()
}

impl Producto {
    /// Create a new product with zero stock and default tax
    #[must_use]
    pub fn new(codigo: impl Into<String>, descripcion: impl Into<String>) -> Self {
        Self {
            meta: SyncMeta::new(),
            codigo: codigo.into(),
            descripcion: descripcion.into(),
            existencias: 0,
            inv_minimo: 0,
            inv_maximo: 0,
            precio_costo: 0,
            precio_venta: 0,
            porcentaje_impuesto: default_porcentaje_impuesto(),
            albergado: default_albergado(),
        }
    }

    /// Stock below the configured minimum
    pub const fn is_below_minimum(&self) -> bool {
        self.existencias < self.inv_minimo
    }
}

impl SyncEntity for Producto {
    const COLLECTION: Collection = Collection::Productos;
    const COLUMNS: &'static [&'static str] = &[
        "codigo",
        "descripcion",
        "existencias",
        "inv_minimo",
        "inv_maximo",
        "precio_costo",
        "precio_venta",
        "porcentaje_impuesto",
        "albergado",
    ];

    fn meta(&self) -> &SyncMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut SyncMeta {
        &mut self.meta
    }

    fn column_values(&self) -> Vec<Value> {
        vec![
            self.codigo.clone().into(),
            self.descripcion.clone().into(),
            self.existencias.into(),
            self.inv_minimo.into(),
            self.inv_maximo.into(),
            self.precio_costo.into(),
            self.precio_venta.into(),
            self.porcentaje_impuesto.into(),
            self.albergado.clone().into(),
        ]
    }

    fn from_row(meta: SyncMeta, row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            meta,
            codigo: row.get("codigo")?,
            descripcion: row.get("descripcion")?,
            existencias: row.get("existencias")?,
            inv_minimo: row.get("inv_minimo")?,
            inv_maximo: row.get("inv_maximo")?,
            precio_costo: row.get("precio_costo")?,
            precio_venta: row.get("precio_venta")?,
            porcentaje_impuesto: row.get("porcentaje_impuesto")?,
            albergado: row.get("albergado")?,
        })
    }

    fn into_snapshot(self) -> Snapshot {
        Snapshot::Producto(self)
    }
}
