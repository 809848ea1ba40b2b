//! Purchase order header and line models

use chrono::NaiveDate;
use rusqlite::types::Value;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

use super::{Collection, RecordId, Snapshot, SyncEntity, SyncMeta};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Purchase order header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrdenCompra {
    #[serde(flatten)]
    pub meta: SyncMeta,
    pub folio_orden: String,
    #[serde(default)]
    pub fecha_llegada_orden: Option<NaiveDate>,
    #[serde(default = "default_estado_orden")]
    pub estado_orden: String,
}

fn default_estado_orden() -> String {
    "pendiente".to_string()
}

impl OrdenCompra {
    #[must_use]
    pub fn new(folio_orden: impl Into<String>) -> Self {
        Self {
            meta: SyncMeta::new(),
            folio_orden: folio_orden.into(),
            fecha_llegada_orden: None,
            estado_orden: default_estado_orden(),
        }
    }
}

impl SyncEntity for OrdenCompra {
    const COLLECTION: Collection = Collection::OrdenesCompra;
    const COLUMNS: &'static [&'static str] = &["folio_orden", "fecha_llegada_orden", "estado_orden"];

    fn meta(&self) -> &SyncMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut SyncMeta {
        &mut self.meta
    }

    fn column_values(&self) -> Vec<Value> {
        vec![
            self.folio_orden.clone().into(),
            self.fecha_llegada_orden
                .map(|date| date.format(DATE_FORMAT).to_string())
                .into(),
            self.estado_orden.clone().into(),
        ]
    }

    fn from_row(meta: SyncMeta, row: &Row<'_>) -> rusqlite::Result<Self> {
        let fecha: Option<String> = row.get("fecha_llegada_orden")?;
        let fecha_llegada_orden = fecha
            .map(|raw| NaiveDate::parse_from_str(&raw, DATE_FORMAT))
            .transpose()
            .map_err(|error| {
                rusqlite::Error::FromSqlConversionFailure(
                    0,
                    rusqlite::types::Type::Text,
                    Box::new(error),
                )
            })?;

        Ok(Self {
            meta,
            folio_orden: row.get("folio_orden")?,
            fecha_llegada_orden,
            estado_orden: row.get("estado_orden")?,
        })
    }

    fn into_snapshot(self) -> Snapshot {
        Snapshot::OrdenCompra(self)
    }
}

/// Purchase order line linking an order to a product code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetalleOrden {
    #[serde(flatten)]
    pub meta: SyncMeta,
    pub orden_id: RecordId,
    pub codigo_producto: String,
    #[serde(default)]
    pub cant_enorden: i64,
    #[serde(default)]
    pub precio_unitario_orden: i64,
    /// Product description as it was when the order was placed
    #[serde(default)]
    pub descripcion_enorden: Option<String>,
}

impl DetalleOrden {
    #[must_use]
    pub fn new(orden_id: RecordId, codigo_producto: impl Into<String>) -> Self {
        Self {
            meta: SyncMeta::new(),
            orden_id,
            codigo_producto: codigo_producto.into(),
            cant_enorden: 0,
            precio_unitario_orden: 0,
            descripcion_enorden: None,
        }
    }
}

impl SyncEntity for DetalleOrden {
    const COLLECTION: Collection = Collection::DetallesOrden;
    const COLUMNS: &'static [&'static str] = &[
        "orden_id",
        "codigo_producto",
        "cant_enorden",
        "precio_unitario_orden",
        "descripcion_enorden",
    ];

    fn meta(&self) -> &SyncMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut SyncMeta {
        &mut self.meta
    }

    fn column_values(&self) -> Vec<Value> {
        vec![
            self.orden_id.as_str().to_string().into(),
            self.codigo_producto.clone().into(),
            self.cant_enorden.into(),
            self.precio_unitario_orden.into(),
            self.descripcion_enorden.clone().into(),
        ]
    }

    fn from_row(meta: SyncMeta, row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            meta,
            orden_id: RecordId::from(row.get::<_, String>("orden_id")?),
            codigo_producto: row.get("codigo_producto")?,
            cant_enorden: row.get("cant_enorden")?,
            precio_unitario_orden: row.get("precio_unitario_orden")?,
            descripcion_enorden: row.get("descripcion_enorden")?,
        })
    }

    fn into_snapshot(self) -> Snapshot {
        Snapshot::DetalleOrden(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orden_compra_date_wire_format() {
        let orden: OrdenCompra = serde_json::from_str(
            r#"{"id":"o1","folio_orden":"OC-1","fecha_llegada_orden":"2024-03-05","updated_at":"2024-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(
            orden.fecha_llegada_orden,
            NaiveDate::from_ymd_opt(2024, 3, 5)
        );
        assert_eq!(orden.estado_orden, "pendiente");
    }

    #[test]
    fn test_detalle_orden_optional_description() {
        let detalle = DetalleOrden::new(RecordId::from("o1"), "A-001");
        let value = serde_json::to_value(&detalle).unwrap();
        assert_eq!(value["orden_id"], "o1");
        assert!(value["descripcion_enorden"].is_null());
    }
}
