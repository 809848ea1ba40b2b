//! Data models for Tally

mod orden_compra;
mod outbox_entry;
mod producto;
mod record;
mod snapshot;
mod sync_conflict;
mod sync_cursor;
mod transito;

pub use orden_compra::{DetalleOrden, OrdenCompra};
pub use outbox_entry::OutboxEntry;
pub use producto::Producto;
pub use record::{Collection, Operation, RecordId, SyncEntity, SyncMeta};
pub use snapshot::Snapshot;
pub use sync_conflict::SyncConflict;
pub use sync_cursor::SyncCursor;
pub use transito::Transito;
