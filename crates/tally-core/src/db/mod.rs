//! Local store for Tally

pub mod conflicts;
mod connection;
pub mod cursor;
mod migrations;
pub mod outbox;
pub mod records;
mod repository;

pub use connection::Database;
pub use repository::{RecordRepository, SqliteRecordRepository};
