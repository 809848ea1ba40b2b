//! tally-core - Offline-first sync core for Tally
//!
//! This crate contains the syncable inventory models, the local `SQLite` store
//! with its outbox and sync cursors, and the engine that replicates them
//! against the remote API. It is shared by the CLI and any future front end.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod sync;
pub mod util;

pub use config::SyncSettings;
pub use db::Database;
pub use error::{Error, Result};
pub use models::{Collection, Operation, RecordId, SyncEntity};
pub use sync::{SyncEngine, SyncError, SyncOutcome};
