use std::path::Path;

use tally_core::config::OutboxRetention;
use tally_core::db::outbox;
use tally_core::util::now_utc;
use tally_core::SyncSettings;

use crate::cli::OutboxCommands;
use crate::commands::common::{format_outbox_lines, open_database};
use crate::error::CliError;

pub fn run_outbox(
    command: OutboxCommands,
    settings: &SyncSettings,
    db_path: &Path,
) -> Result<(), CliError> {
    match command {
        OutboxCommands::List { all, limit, json } => run_outbox_list(all, limit, json, db_path),
        OutboxCommands::Prune { older_than_days } => {
            let removed = run_outbox_prune(older_than_days, settings, db_path)?;
            println!("Removed {removed} acknowledged outbox entries");
            Ok(())
        }
    }
}

fn run_outbox_list(all: bool, limit: usize, as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path)?;
    let entries = outbox::list(db.connection(), all, limit)?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("Outbox is empty.");
        return Ok(());
    }

    for line in format_outbox_lines(&entries) {
        println!("{line}");
    }
    Ok(())
}

/// Delete acknowledged entries past the given or configured age
pub fn run_outbox_prune(
    older_than_days: Option<u32>,
    settings: &SyncSettings,
    db_path: &Path,
) -> Result<usize, CliError> {
    let retention = older_than_days.map_or(settings.outbox_retention, |days| {
        OutboxRetention::PruneSentAfter { days }
    });
    let cutoff = retention.cutoff(now_utc()).ok_or(CliError::NoRetention)?;

    let db = open_database(db_path)?;
    Ok(outbox::prune_sent(db.connection(), cutoff)?)
}
