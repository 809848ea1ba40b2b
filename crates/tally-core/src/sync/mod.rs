//! Offline-first replication against the remote API.
//!
//! A sync cycle pulls each collection (remote to local, last-writer-wins on
//! `updated_at`) and then pushes the outbox (local to remote, at-least-once).
//! Nothing here retries; callers decide when to run the next cycle.

mod engine;
mod error;
mod http;
mod pull;
mod push;
#[cfg(test)]
mod testing;
mod transport;

pub use engine::{CycleReport, SyncEngine, SyncOutcome};
pub use error::{SyncError, SyncResult};
pub use http::HttpTransport;
pub use pull::{merge, pull_collection, MergeOutcome, PullReport};
pub use push::{push_pending, PushReport, PushedBatch};
pub use transport::{PushItem, RemoteTransport, TransportError, TransportResult};
