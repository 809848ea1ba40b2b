mod common;

use std::time::Duration;

use chrono::{TimeZone, Utc};
use common::StubServer;
use pretty_assertions::assert_eq;
use serde_json::json;
use tally_core::db::{cursor, outbox, RecordRepository, SqliteRecordRepository};
use tally_core::models::{Collection, Operation, Producto, RecordId};
use tally_core::sync::{HttpTransport, SyncEngine, SyncError};
use tally_core::util::now_utc;
use tally_core::{Database, SyncEntity};

fn engine(server: &StubServer) -> SyncEngine<HttpTransport> {
    SyncEngine::new(HttpTransport::new(&server.base_url, None, Duration::from_secs(5)).unwrap())
}

#[test]
fn pull_edit_push_round_trip() {
    let server = StubServer::start();
    server.seed(
        "productos",
        json!({
            "id": "p1",
            "codigo": "A-001",
            "existencias": 5,
            "updated_at": "2024-01-01T00:00:00"
        }),
    );
    let mut db = Database::open_in_memory().unwrap();
    let engine = engine(&server);

    // Pull into an empty store
    let before_pull = now_utc();
    let report = engine.pull(&mut db, Collection::Productos).unwrap();
    assert_eq!(report.inserted, 1);

    let id = RecordId::from("p1");
    let pulled: Producto = SqliteRecordRepository::new(db.connection())
        .get(&id)
        .unwrap()
        .unwrap();
    assert_eq!(pulled.codigo, "A-001");
    assert_eq!(pulled.existencias, 5);
    assert_eq!(
        pulled.meta.updated_at,
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    );
    assert!(outbox::pending(db.connection()).unwrap().is_empty());
    let last_sync = cursor::load(db.connection(), Collection::Productos)
        .unwrap()
        .last_sync
        .unwrap();
    assert!(last_sync >= before_pull);

    // Local edit queues exactly one unsent update
    let mut edited = pulled.clone();
    edited.existencias = 7;
    let updated = SqliteRecordRepository::new(db.connection())
        .update(edited)
        .unwrap();
    assert!(updated.meta.updated_at > pulled.meta.updated_at);

    let pending = outbox::pending(db.connection()).unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].table, Collection::Productos);
    assert_eq!(pending[0].operation, Operation::Update);
    assert!(!pending[0].sent);
    assert!(pending[0].payload.contains("\"existencias\":7"));

    // Push delivers one batch of one entry and marks it sent
    let pushed = engine.push(&mut db).unwrap();
    assert_eq!(pushed.total_entries(), 1);

    let posts = server
        .requests()
        .into_iter()
        .filter(|request| request.method == "POST")
        .collect::<Vec<_>>();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].path, "/sync/push/productos");
    let body = posts[0].body.as_ref().unwrap().as_array().unwrap().clone();
    assert_eq!(body.len(), 1);
    assert_eq!(body[0]["operation"], "update");
    assert_eq!(body[0]["data"]["existencias"], 7);
    assert_eq!(outbox::counts(db.connection()).unwrap(), (0, 1));

    // Nothing left to send
    let second = engine.push(&mut db).unwrap();
    assert!(second.is_empty());
    let post_count = server
        .requests()
        .iter()
        .filter(|request| request.method == "POST")
        .count();
    assert_eq!(post_count, 1);
}

#[test]
fn tombstone_replicates_between_devices() {
    let server = StubServer::start();

    let mut counter = Database::open_in_memory().unwrap();
    let producto = SqliteRecordRepository::new(counter.connection())
        .create(Producto::new("A-001", "Martillo"))
        .unwrap();
    let counter_engine = engine(&server);
    counter_engine.push(&mut counter).unwrap();

    let mut office = Database::open_in_memory().unwrap();
    let office_engine = engine(&server);
    office_engine.pull(&mut office, Collection::Productos).unwrap();
    assert!(SqliteRecordRepository::new(office.connection())
        .get::<Producto>(producto.id())
        .unwrap()
        .is_some());

    SqliteRecordRepository::new(counter.connection())
        .delete::<Producto>(producto.id())
        .unwrap();
    counter_engine.push(&mut counter).unwrap();
    assert!(server.records("productos")[0]["deleted_at"].is_string());

    office_engine.pull(&mut office, Collection::Productos).unwrap();
    let repo = SqliteRecordRepository::new(office.connection());
    assert!(repo.get::<Producto>(producto.id()).unwrap().is_none());
    let tombstone = repo
        .get_including_deleted::<Producto>(producto.id())
        .unwrap()
        .unwrap();
    assert!(tombstone.meta.deleted_at.is_some());
}

#[test]
fn failed_push_keeps_entries_for_next_cycle() {
    let server = StubServer::start();
    let mut db = Database::open_in_memory().unwrap();
    SqliteRecordRepository::new(db.connection())
        .create(Producto::new("A-001", "Martillo"))
        .unwrap();
    let engine = engine(&server);

    server.fail_with(502, "bad gateway");
    let error = engine.cycle(&mut db, &[Collection::Productos]).unwrap_err();
    assert!(matches!(
        error,
        SyncError::Pull {
            collection: Collection::Productos,
            ..
        }
    ));
    assert_eq!(
        cursor::load(db.connection(), Collection::Productos)
            .unwrap()
            .last_sync,
        None
    );
    assert_eq!(outbox::counts(db.connection()).unwrap(), (1, 0));
}
