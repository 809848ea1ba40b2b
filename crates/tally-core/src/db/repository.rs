//! Syncable record repository implementation

use super::{outbox, records};
use crate::error::{Error, Result};
use crate::models::{Operation, RecordId, SyncEntity, SyncMeta};
use crate::util::next_timestamp;
use rusqlite::Connection;

/// Trait for local mutations of syncable records
///
/// Every mutation commits the row change together with its outbox entry.
pub trait RecordRepository {
    /// Create a new record with fresh sync metadata
    fn create<E: SyncEntity>(&self, entity: E) -> Result<E>;

    /// Get a live (not tombstoned) record by ID
    fn get<E: SyncEntity>(&self, id: &RecordId) -> Result<Option<E>>;

    /// Get a record by ID even if it is tombstoned
    fn get_including_deleted<E: SyncEntity>(&self, id: &RecordId) -> Result<Option<E>>;

    /// List live records, most recently updated first
    fn list<E: SyncEntity>(&self) -> Result<Vec<E>>;

    /// Replace a live record's business fields
    fn update<E: SyncEntity>(&self, entity: E) -> Result<E>;

    /// Soft delete a live record
    fn delete<E: SyncEntity>(&self, id: &RecordId) -> Result<E>;
}

/// `SQLite` implementation of `RecordRepository`
pub struct SqliteRecordRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteRecordRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Write `entity` and its outbox entry in one transaction
    fn commit_mutation<E: SyncEntity>(&self, entity: &E, operation: Operation) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        match operation {
            Operation::Insert => records::insert(&tx, entity)?,
            Operation::Update | Operation::Delete => records::upsert(&tx, entity)?,
        }
        outbox::record(&tx, operation, &entity.clone().into_snapshot())?;
        tx.commit()?;
        Ok(())
    }

    fn live<E: SyncEntity>(&self, id: &RecordId) -> Result<E> {
        self.get::<E>(id)?.ok_or_else(|| {
            Error::NotFound(format!("{}/{id}", E::COLLECTION))
        })
    }
}

impl RecordRepository for SqliteRecordRepository<'_> {
    fn create<E: SyncEntity>(&self, mut entity: E) -> Result<E> {
        *entity.meta_mut() = SyncMeta {
            id: entity.id().clone(),
            ..SyncMeta::new()
        };

        self.commit_mutation(&entity, Operation::Insert)?;
        tracing::debug!(collection = %E::COLLECTION, id = %entity.id(), "Created record");
        Ok(entity)
    }

    fn get<E: SyncEntity>(&self, id: &RecordId) -> Result<Option<E>> {
        Ok(self
            .get_including_deleted::<E>(id)?
            .filter(|entity| !entity.meta().is_deleted()))
    }

    fn get_including_deleted<E: SyncEntity>(&self, id: &RecordId) -> Result<Option<E>> {
        records::fetch(self.conn, id)
    }

    fn list<E: SyncEntity>(&self) -> Result<Vec<E>> {
        records::list(self.conn, false)
    }

    fn update<E: SyncEntity>(&self, mut entity: E) -> Result<E> {
        let current = self.live::<E>(entity.id())?;

        let meta = entity.meta_mut();
        meta.updated_at = next_timestamp(current.meta().updated_at);
        meta.version = current.meta().version + 1;
        meta.deleted_at = None;

        self.commit_mutation(&entity, Operation::Update)?;
        tracing::debug!(collection = %E::COLLECTION, id = %entity.id(), "Updated record");
        Ok(entity)
    }

    fn delete<E: SyncEntity>(&self, id: &RecordId) -> Result<E> {
        let mut entity = self.live::<E>(id)?;

        let meta = entity.meta_mut();
        meta.updated_at = next_timestamp(meta.updated_at);
        meta.deleted_at = Some(meta.updated_at);
        meta.version += 1;

        self.commit_mutation(&entity, Operation::Delete)?;
        tracing::debug!(collection = %E::COLLECTION, id = %entity.id(), "Tombstoned record");
        Ok(entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::models::{Producto, Snapshot, Transito};
    use chrono::Duration;
    use pretty_assertions::assert_eq;

    fn setup() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn test_create_and_get() {
        let db = setup();
        let repo = SqliteRecordRepository::new(db.connection());

        let producto = repo.create(Producto::new("A-001", "Martillo")).unwrap();
        assert_eq!(producto.meta.version, 1);

        let fetched: Producto = repo.get(producto.id()).unwrap().unwrap();
        assert_eq!(fetched, producto);

        let pending = outbox::pending(db.connection()).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].operation, Operation::Insert);
        assert_eq!(pending[0].snapshot().unwrap(), Snapshot::Producto(producto));
    }

    #[test]
    fn test_update_bumps_version_and_timestamp() {
        let db = setup();
        let repo = SqliteRecordRepository::new(db.connection());

        let created = repo.create(Producto::new("A-001", "Martillo")).unwrap();
        let mut edited = created.clone();
        edited.existencias = 7;
        let updated = repo.update(edited).unwrap();

        assert_eq!(updated.meta.version, 2);
        assert!(updated.meta.updated_at > created.meta.updated_at);
        assert_eq!(repo.get::<Producto>(created.id()).unwrap().unwrap(), updated);

        let pending = outbox::pending(db.connection()).unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[1].operation, Operation::Update);
        assert!(pending[1].payload.contains("\"existencias\":7"));
    }

    #[test]
    fn test_update_orders_after_future_timestamp() {
        let db = setup();
        let repo = SqliteRecordRepository::new(db.connection());

        // A record pulled from a remote whose clock runs ahead
        let mut pulled = Transito::new("A-001");
        pulled.meta.updated_at += Duration::days(1);
        records::insert(db.connection(), &pulled).unwrap();

        let updated = repo.update(pulled.clone()).unwrap();
        assert!(updated.meta.updated_at > pulled.meta.updated_at);
    }

    #[test]
    fn test_delete_tombstones() {
        let db = setup();
        let repo = SqliteRecordRepository::new(db.connection());

        let producto = repo.create(Producto::new("A-001", "Martillo")).unwrap();
        let deleted = repo.delete::<Producto>(producto.id()).unwrap();

        assert_eq!(deleted.meta.deleted_at, Some(deleted.meta.updated_at));
        assert!(repo.get::<Producto>(producto.id()).unwrap().is_none());
        assert!(repo.list::<Producto>().unwrap().is_empty());

        // The row stays so the tombstone can replicate
        let stored = repo
            .get_including_deleted::<Producto>(producto.id())
            .unwrap()
            .unwrap();
        assert_eq!(stored, deleted);

        let pending = outbox::pending(db.connection()).unwrap();
        assert_eq!(pending.last().unwrap().operation, Operation::Delete);
    }

    #[test]
    fn test_missing_record_errors() {
        let db = setup();
        let repo = SqliteRecordRepository::new(db.connection());

        let ghost = Producto::new("A-404", "Nada");
        assert!(matches!(repo.update(ghost.clone()), Err(Error::NotFound(_))));
        assert!(matches!(
            repo.delete::<Producto>(ghost.id()),
            Err(Error::NotFound(_))
        ));
        assert!(outbox::pending(db.connection()).unwrap().is_empty());
    }

    #[test]
    fn test_failed_insert_leaves_no_outbox_entry() {
        let db = setup();
        let repo = SqliteRecordRepository::new(db.connection());

        let producto = repo.create(Producto::new("A-001", "Martillo")).unwrap();
        // Same id again violates the primary key; the whole mutation rolls back
        assert!(repo.create(producto.clone()).is_err());
        assert_eq!(outbox::pending(db.connection()).unwrap().len(), 1);
    }
}
