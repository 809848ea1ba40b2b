//! Sync engine: pull, push and full cycles behind a single-in-flight guard

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;

use super::error::{SyncError, SyncResult};
use super::http::HttpTransport;
use super::pull::{pull_collection, PullReport};
use super::push::{push_pending, PushReport};
use super::transport::{RemoteTransport, TransportResult};
use crate::config::{CursorPolicy, OutboxRetention, SyncSettings};
use crate::db::{outbox, Database};
use crate::models::Collection;
use crate::util::now_utc;

/// Report of a full cycle: every pull, then the push
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub pulls: Vec<PullReport>,
    pub push: PushReport,
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let applied: usize = self.pulls.iter().map(PullReport::applied).sum();
        write!(
            f,
            "Sync complete: {applied} change(s) pulled from {} collection(s); {}",
            self.pulls.len(),
            self.push
        )
    }
}

/// Success flag plus a human-readable message, for the UI boundary
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncOutcome {
    pub success: bool,
    pub message: String,
}

impl<T: fmt::Display> From<SyncResult<T>> for SyncOutcome {
    fn from(result: SyncResult<T>) -> Self {
        match result {
            Ok(report) => Self {
                success: true,
                message: report.to_string(),
            },
            Err(error) => Self {
                success: false,
                message: error.to_string(),
            },
        }
    }
}

/// Releases the in-flight flag on drop
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct SyncEngine<T> {
    transport: T,
    cursor_policy: CursorPolicy,
    outbox_retention: OutboxRetention,
    in_flight: AtomicBool,
}

impl SyncEngine<HttpTransport> {
    /// Engine over HTTP using the remote and policies from `settings`
    pub fn from_settings(settings: &SyncSettings) -> TransportResult<Self> {
        Ok(Self::new(HttpTransport::from_settings(settings)?)
            .with_cursor_policy(settings.cursor_policy)
            .with_outbox_retention(settings.outbox_retention))
    }
}

impl<T: RemoteTransport> SyncEngine<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            cursor_policy: CursorPolicy::default(),
            outbox_retention: OutboxRetention::default(),
            in_flight: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn with_cursor_policy(mut self, policy: CursorPolicy) -> Self {
        self.cursor_policy = policy;
        self
    }

    #[must_use]
    pub fn with_outbox_retention(mut self, retention: OutboxRetention) -> Self {
        self.outbox_retention = retention;
        self
    }

    pub const fn transport(&self) -> &T {
        &self.transport
    }

    pub fn is_running(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    fn acquire(&self) -> SyncResult<InFlightGuard<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| SyncError::AlreadyRunning)?;
        Ok(InFlightGuard(&self.in_flight))
    }

    pub fn pull(&self, db: &mut Database, collection: Collection) -> SyncResult<PullReport> {
        let _guard = self.acquire()?;
        pull_collection(db, &self.transport, collection, self.cursor_policy)
    }

    pub fn push(&self, db: &mut Database) -> SyncResult<PushReport> {
        let _guard = self.acquire()?;
        self.push_and_prune(db)
    }

    /// Pull each of `collections` in order, then push.
    ///
    /// Stops at the first failing pull without pushing. Local edits committed
    /// while the pulls run are picked up by the push.
    pub fn cycle(&self, db: &mut Database, collections: &[Collection]) -> SyncResult<CycleReport> {
        let _guard = self.acquire()?;
        tracing::info!(collections = collections.len(), "Starting sync cycle");

        let pulls = collections
            .iter()
            .map(|collection| pull_collection(db, &self.transport, *collection, self.cursor_policy))
            .collect::<SyncResult<Vec<_>>>()?;
        let push = self.push_and_prune(db)?;

        Ok(CycleReport { pulls, push })
    }

    /// Push, then apply outbox retention. A failed prune is logged and does
    /// not turn a delivered push into a failure.
    fn push_and_prune(&self, db: &mut Database) -> SyncResult<PushReport> {
        let mut report = push_pending(db, &self.transport)?;
        if let Some(cutoff) = self.outbox_retention.cutoff(now_utc()) {
            match outbox::prune_sent(db.connection(), cutoff) {
                Ok(pruned) => report.pruned = pruned,
                Err(error) => tracing::warn!(%error, "Failed to prune acknowledged outbox entries"),
            }
        }
        Ok(report)
    }
}
