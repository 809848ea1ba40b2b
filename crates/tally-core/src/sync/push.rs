//! Push dispatcher
//!
//! Delivers pending outbox entries grouped by collection, in first-appearance
//! order, one batch per collection. An entry is marked sent only after the
//! remote acknowledged its whole batch, so delivery is at-least-once.

use std::fmt;

use serde::Serialize;

use super::error::{SyncError, SyncResult};
use super::transport::{PushItem, RemoteTransport};
use crate::db::{outbox, Database};
use crate::error::Result;
use crate::models::{Collection, OutboxEntry, Snapshot};

/// One acknowledged batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushedBatch {
    pub collection: Collection,
    pub entries: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PushReport {
    pub batches: Vec<PushedBatch>,
    /// Acknowledged entries removed by the retention policy afterwards
    pub pruned: usize,
}

impl PushReport {
    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    pub fn total_entries(&self) -> usize {
        self.batches.iter().map(|batch| batch.entries).sum()
    }
}

impl fmt::Display for PushReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("Nothing to push");
        }
        let parts = self
            .batches
            .iter()
            .map(|batch| format!("{} {}", batch.entries, batch.collection))
            .collect::<Vec<_>>();
        write!(f, "Pushed {}", parts.join(", "))?;
        if self.pruned > 0 {
            write!(f, " (pruned {} acknowledged)", self.pruned)?;
        }
        Ok(())
    }
}

/// Push every pending outbox entry.
///
/// Stops at the first failing batch; batches acknowledged before it stay
/// marked sent and the failing one stays pending in full.
pub fn push_pending(db: &mut Database, transport: &impl RemoteTransport) -> SyncResult<PushReport> {
    let pending = outbox::pending(db.connection())?;
    if pending.is_empty() {
        tracing::debug!("Outbox empty, nothing to push");
        return Ok(PushReport::default());
    }

    let mut report = PushReport::default();
    for (collection, entries) in group_by_collection(pending) {
        let snapshots = entries
            .iter()
            .map(OutboxEntry::snapshot)
            .collect::<Result<Vec<Snapshot>>>()?;
        let batch = entries
            .iter()
            .zip(&snapshots)
            .map(|(entry, data)| PushItem {
                operation: entry.operation,
                data,
            })
            .collect::<Vec<_>>();

        if let Err(source) = transport.push(collection, &batch) {
            tracing::warn!(%collection, entries = entries.len(), error = %source, "Push batch failed");
            return Err(SyncError::Push {
                collection,
                groups_sent: report.batches.len(),
                source,
            });
        }

        let ids = entries.iter().map(|entry| entry.id.as_str()).collect::<Vec<_>>();
        let tx = db.connection_mut().transaction()?;
        outbox::mark_sent(&tx, &ids)?;
        tx.commit()?;

        tracing::info!(%collection, entries = entries.len(), "Push batch acknowledged");
        report.batches.push(PushedBatch {
            collection,
            entries: entries.len(),
        });
    }

    Ok(report)
}

/// Group entries by collection, keeping first-appearance order of the
/// collections and creation order inside each group
fn group_by_collection(entries: Vec<OutboxEntry>) -> Vec<(Collection, Vec<OutboxEntry>)> {
    let mut groups: Vec<(Collection, Vec<OutboxEntry>)> = Vec::new();
    for entry in entries {
        match groups.iter_mut().find(|(collection, _)| *collection == entry.table) {
            Some((_, group)) => group.push(entry),
            None => groups.push((entry.table, vec![entry])),
        }
    }
    groups
}
