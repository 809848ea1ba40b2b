use std::fmt;
use std::path::Path;

use serde::Serialize;
use tally_core::db::{conflicts, cursor, outbox};
use tally_core::sync::SyncResult;
use tally_core::util::format_timestamp;
use tally_core::{Collection, SyncOutcome, SyncSettings};

use crate::cli::SyncCommands;
use crate::commands::common::{
    format_sync_conflict_lines, open_database, sync_conflict_to_item, sync_engine,
    SyncConflictItem,
};
use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct SyncStatusItem {
    pub remote: Option<String>,
    pub pending: usize,
    pub sent: usize,
    pub cursors: Vec<CursorItem>,
}

#[derive(Debug, Serialize)]
pub struct CursorItem {
    pub collection: String,
    pub last_sync: Option<String>,
}

pub fn run_sync(
    command: Option<SyncCommands>,
    settings: &SyncSettings,
    db_path: &Path,
) -> Result<(), CliError> {
    match command.unwrap_or(SyncCommands::Cycle { json: false }) {
        SyncCommands::Pull { collection, json } => {
            let engine = sync_engine(settings)?;
            let mut db = open_database(db_path)?;
            finish(engine.pull(&mut db, collection), json)
        }
        SyncCommands::Push { json } => {
            let engine = sync_engine(settings)?;
            let mut db = open_database(db_path)?;
            finish(engine.push(&mut db), json)
        }
        SyncCommands::Cycle { json } => {
            let engine = sync_engine(settings)?;
            let mut db = open_database(db_path)?;
            finish(engine.cycle(&mut db, &Collection::ALL), json)
        }
        SyncCommands::Status { json } => run_sync_status(settings, json, db_path),
        SyncCommands::Conflicts { limit, json } => run_sync_conflicts(limit, json, db_path),
    }
}

/// Print a sync report; failures become a non-zero exit
fn finish<T: Serialize + fmt::Display>(result: SyncResult<T>, as_json: bool) -> Result<(), CliError> {
    if as_json {
        let report = result?;
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let outcome = SyncOutcome::from(result);
    if outcome.success {
        println!("{}", outcome.message);
        Ok(())
    } else {
        Err(CliError::SyncFailed(outcome.message))
    }
}

pub fn sync_status(settings: &SyncSettings, db_path: &Path) -> Result<SyncStatusItem, CliError> {
    let db = open_database(db_path)?;
    let (pending, sent) = outbox::counts(db.connection())?;
    let cursors = cursor::list(db.connection())?
        .into_iter()
        .map(|cursor| CursorItem {
            collection: cursor.table_name.to_string(),
            last_sync: cursor.last_sync.as_ref().map(format_timestamp),
        })
        .collect();

    Ok(SyncStatusItem {
        remote: settings.api_base_url(),
        pending,
        sent,
        cursors,
    })
}

fn run_sync_status(settings: &SyncSettings, as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let status = sync_status(settings, db_path)?;
    if as_json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!(
        "Remote: {}",
        status.remote.as_deref().unwrap_or("not configured")
    );
    println!("Outbox: {} pending, {} sent", status.pending, status.sent);
    for cursor in &status.cursors {
        println!(
            "{:<14} last_sync={}",
            cursor.collection,
            cursor.last_sync.as_deref().unwrap_or("never")
        );
    }
    Ok(())
}

fn run_sync_conflicts(limit: usize, as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path)?;
    let conflicts = conflicts::list(db.connection(), limit)?;

    if as_json {
        let json_items = conflicts
            .iter()
            .map(sync_conflict_to_item)
            .collect::<Vec<SyncConflictItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
        return Ok(());
    }

    if conflicts.is_empty() {
        println!("No sync conflicts recorded.");
        return Ok(());
    }

    for line in format_sync_conflict_lines(&conflicts) {
        println!("{line}");
    }
    Ok(())
}
