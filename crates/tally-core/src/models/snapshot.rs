//! Typed point-in-time entity snapshots carried by outbox entries

use serde::Serialize;

use super::{Collection, DetalleOrden, OrdenCompra, Producto, RecordId, SyncEntity, Transito};
use crate::error::Result;

/// One entity snapshot of any known collection.
///
/// Serializes as the bare entity object; decoding needs the collection name,
/// which outbox rows and pull requests always carry alongside the payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Snapshot {
    Producto(Producto),
    Transito(Transito),
    OrdenCompra(OrdenCompra),
    DetalleOrden(DetalleOrden),
}

impl Snapshot {
    pub const fn collection(&self) -> Collection {
        match self {
            Self::Producto(_) => Collection::Productos,
            Self::Transito(_) => Collection::Transito,
            Self::OrdenCompra(_) => Collection::OrdenesCompra,
            Self::DetalleOrden(_) => Collection::DetallesOrden,
        }
    }

    pub fn id(&self) -> &RecordId {
        match self {
            Self::Producto(entity) => entity.id(),
            Self::Transito(entity) => entity.id(),
            Self::OrdenCompra(entity) => entity.id(),
            Self::DetalleOrden(entity) => entity.id(),
        }
    }

    /// Decode a JSON payload stored for `collection`
    pub fn decode(collection: Collection, payload: &str) -> Result<Self> {
        Ok(match collection {
            Collection::Productos => Self::Producto(serde_json::from_str(payload)?),
            Collection::Transito => Self::Transito(serde_json::from_str(payload)?),
            Collection::OrdenesCompra => Self::OrdenCompra(serde_json::from_str(payload)?),
            Collection::DetallesOrden => Self::DetalleOrden(serde_json::from_str(payload)?),
        })
    }

    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
