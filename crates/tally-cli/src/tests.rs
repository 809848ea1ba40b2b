use std::path::PathBuf;

use chrono::{TimeZone, Utc};
use clap::Parser;
use pretty_assertions::assert_eq;
use tally_core::config::{CursorPolicy, OutboxRetention};
use tally_core::db::outbox;
use tally_core::models::{Operation, Producto, RecordId, SyncConflict};
use tally_core::{Collection, SyncSettings};

use crate::cli::{Cli, Commands, ProductoCommands, SyncCommands};
use crate::commands::common::{
    format_sync_conflict_lines, load_settings_with, normalize_codigo, open_database,
    resolve_config_path, resolve_db_path,
};
use crate::commands::config::run_config_init;
use crate::commands::outbox::run_outbox_prune;
use crate::commands::productos::{list_productos, run_add, run_delete, run_set_stock};
use crate::commands::sync::{run_sync, sync_status};
use crate::error::CliError;

fn temp_db_path(dir: &tempfile::TempDir) -> PathBuf {
    dir.path().join("tally.db")
}

fn producto(codigo: &str, existencias: i64, inv_minimo: i64) -> Producto {
    let mut producto = Producto::new(codigo, format!("Producto {codigo}"));
    producto.existencias = existencias;
    producto.inv_minimo = inv_minimo;
    producto
}

#[test]
fn parses_sync_pull_with_collection() {
    let cli = Cli::try_parse_from(["tally", "sync", "pull", "ordenes_compra", "--json"]).unwrap();
    match cli.command {
        Commands::Sync { command } => assert_eq!(
            command,
            Some(SyncCommands::Pull {
                collection: Collection::OrdenesCompra,
                json: true
            })
        ),
        _ => panic!("expected sync command"),
    }
}

#[test]
fn rejects_unknown_collection() {
    assert!(Cli::try_parse_from(["tally", "sync", "pull", "clientes"]).is_err());
}

#[test]
fn bare_sync_runs_a_cycle() {
    let cli = Cli::try_parse_from(["tally", "--db-path", "/tmp/x.db", "sync"]).unwrap();
    assert!(matches!(cli.command, Commands::Sync { command: None }));
    assert_eq!(cli.db_path, Some(PathBuf::from("/tmp/x.db")));
}

#[test]
fn parses_productos_add_with_description_words() {
    let cli = Cli::try_parse_from([
        "tally",
        "productos",
        "add",
        "A-001",
        "Martillo",
        "de",
        "acero",
        "--existencias",
        "4",
    ])
    .unwrap();
    match cli.command {
        Commands::Productos {
            command:
                ProductoCommands::Add {
                    codigo,
                    descripcion,
                    existencias,
                    ..
                },
        } => {
            assert_eq!(codigo, "A-001");
            assert_eq!(descripcion.join(" "), "Martillo de acero");
            assert_eq!(existencias, 4);
        }
        _ => panic!("expected productos add"),
    }
}

#[test]
fn explicit_paths_win() {
    assert_eq!(
        resolve_db_path(Some(PathBuf::from("/data/pos.db"))),
        PathBuf::from("/data/pos.db")
    );
    assert_eq!(
        resolve_config_path(Some(PathBuf::from("/etc/tally.json"))),
        PathBuf::from("/etc/tally.json")
    );
}

#[test]
fn normalize_codigo_rejects_empty() {
    assert_eq!(normalize_codigo("  A-001 ").unwrap(), "A-001");
    assert!(matches!(normalize_codigo("   "), Err(CliError::EmptyCodigo)));
}

#[test]
fn productos_lifecycle_records_outbox_entries() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = temp_db_path(&dir);

    let created = run_add(producto("A-001", 2, 5), &db_path).unwrap();
    run_add(producto("B-002", 9, 1), &db_path).unwrap();
    assert!(matches!(
        run_add(producto("A-001", 0, 0), &db_path),
        Err(CliError::DuplicateCodigo(_))
    ));

    let low = list_productos(true, &db_path).unwrap();
    assert_eq!(low.len(), 1);
    assert_eq!(low[0].codigo, "A-001");

    let restocked = run_set_stock("A-001", 12, &db_path).unwrap();
    assert_eq!(restocked.existencias, 12);
    assert_eq!(restocked.meta.version, 2);
    assert!(list_productos(true, &db_path).unwrap().is_empty());

    let deleted = run_delete(created.meta.id.as_str(), &db_path).unwrap();
    assert!(deleted.meta.deleted_at.is_some());
    assert!(matches!(
        run_set_stock("A-001", 1, &db_path),
        Err(CliError::ProductoNotFound(_))
    ));

    let db = open_database(&db_path).unwrap();
    let operations = outbox::pending(db.connection())
        .unwrap()
        .into_iter()
        .map(|entry| entry.operation)
        .collect::<Vec<_>>();
    assert_eq!(
        operations,
        vec![
            Operation::Insert,
            Operation::Insert,
            Operation::Update,
            Operation::Delete
        ]
    );
}

#[test]
fn sync_requires_configuration() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = temp_db_path(&dir);

    let error = run_sync(Some(SyncCommands::Push { json: false }), &SyncSettings::default(), &db_path)
        .unwrap_err();
    assert!(matches!(error, CliError::SyncNotConfigured));
}

#[test]
fn sync_status_reports_counts_and_cursors() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = temp_db_path(&dir);
    run_add(producto("A-001", 1, 0), &db_path).unwrap();

    let status = sync_status(&SyncSettings::default(), &db_path).unwrap();

    assert_eq!(status.remote, None);
    assert_eq!(status.pending, 1);
    assert_eq!(status.sent, 0);
    assert_eq!(status.cursors.len(), Collection::ALL.len());
    assert!(status.cursors.iter().all(|cursor| cursor.last_sync.is_none()));
}

#[test]
fn outbox_prune_needs_a_retention() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = temp_db_path(&dir);
    run_add(producto("A-001", 1, 0), &db_path).unwrap();

    assert!(matches!(
        run_outbox_prune(None, &SyncSettings::default(), &db_path),
        Err(CliError::NoRetention)
    ));
    // Pending entries are never pruned
    assert_eq!(
        run_outbox_prune(Some(0), &SyncSettings::default(), &db_path).unwrap(),
        0
    );
}

#[test]
fn config_init_merges_into_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("config.json");

    run_config_init(
        &config_path,
        Some("https://api.example.com/".to_string()),
        Some("secret".to_string()),
        None,
        None,
        None,
    )
    .unwrap();
    run_config_init(&config_path, None, None, Some(10), Some(14), Some(30)).unwrap();

    let settings = load_settings_with(&config_path, |_| None).unwrap();
    assert_eq!(settings.api_base_url.as_deref(), Some("https://api.example.com"));
    assert_eq!(settings.api_token.as_deref(), Some("secret"));
    assert_eq!(settings.http_timeout_secs, 10);
    assert_eq!(
        settings.outbox_retention,
        OutboxRetention::PruneSentAfter { days: 14 }
    );
    assert_eq!(settings.cursor_policy, CursorPolicy::MaxSeen { skew_secs: 30 });
}

#[test]
fn config_init_rejects_invalid_url() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("config.json");

    let error = run_config_init(
        &config_path,
        Some("api.example.com".to_string()),
        None,
        None,
        None,
        None,
    )
    .unwrap_err();
    assert!(matches!(error, CliError::Config(_)));
    assert!(!config_path.exists());
}

#[test]
fn env_overrides_file_settings() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("config.json");
    run_config_init(
        &config_path,
        Some("https://file.example.com".to_string()),
        None,
        None,
        None,
        None,
    )
    .unwrap();

    let settings = load_settings_with(&config_path, |key| {
        (key == "TALLY_API_URL").then(|| "https://env.example.com".to_string())
    })
    .unwrap();
    assert_eq!(settings.api_base_url.as_deref(), Some("https://env.example.com"));
}

#[test]
fn conflict_lines_show_collection_and_record() {
    let at = |hour| Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0).unwrap();
    let conflict = SyncConflict {
        id: 1,
        collection: Collection::Transito,
        record_id: RecordId::from("t1"),
        local_updated_at: at(10),
        incoming_updated_at: at(9),
        resolved_at: at(11),
        strategy: "lww".to_string(),
    };

    let lines = format_sync_conflict_lines(&[conflict]);
    assert_eq!(
        lines,
        vec![
            "2024-05-01 11:00:00 UTC  lww   transito/t1  local=2024-05-01T10:00:00.000000Z incoming=2024-05-01T09:00:00.000000Z"
                .to_string()
        ]
    );
}
