//! Remote transport abstraction

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::models::{Collection, Operation, Snapshot};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Invalid transport configuration: {0}")]
    InvalidConfiguration(String),
    /// Network failure, timeout, or a response that could not be read
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Non-success status from the remote
    #[error("Remote API error: {message} ({status})")]
    Api { status: u16, message: String },
    #[error("Invalid response payload: {0}")]
    InvalidPayload(String),
}

impl TransportError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Http(error) if error.is_timeout())
    }
}

pub type TransportResult<T> = Result<T, TransportError>;

/// One element of a push batch: `{"operation": ..., "data": {...}}`
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PushItem<'a> {
    pub operation: Operation,
    pub data: &'a Snapshot,
}

/// Request/response boundary to the remote.
///
/// Implementations apply a bounded timeout and never retry; retry policy
/// belongs to whoever schedules sync.
pub trait RemoteTransport {
    /// Records of `collection` with `updated_at >= since` (all when `None`)
    fn pull(&self, collection: Collection, since: Option<DateTime<Utc>>) -> TransportResult<Vec<Value>>;

    /// Deliver one batch; success means the remote durably accepted all of it
    fn push(&self, collection: Collection, batch: &[PushItem<'_>]) -> TransportResult<Value>;
}

impl<T: RemoteTransport + ?Sized> RemoteTransport for &T {
    fn pull(&self, collection: Collection, since: Option<DateTime<Utc>>) -> TransportResult<Vec<Value>> {
        (**self).pull(collection, since)
    }

    fn push(&self, collection: Collection, batch: &[PushItem<'_>]) -> TransportResult<Value> {
        (**self).push(collection, batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Producto, SyncEntity};

    #[test]
    fn push_item_wire_shape() {
        let snapshot = Producto::new("A-001", "Martillo").into_snapshot();
        let item = PushItem {
            operation: Operation::Update,
            data: &snapshot,
        };
        let value = serde_json::to_value(item).unwrap();
        assert_eq!(value["operation"], "update");
        assert_eq!(value["data"]["codigo"], "A-001");
    }

    #[test]
    fn api_error_display_includes_status() {
        let error = TransportError::Api {
            status: 503,
            message: "maintenance".to_string(),
        };
        assert_eq!(error.to_string(), "Remote API error: maintenance (503)");
        assert!(!error.is_timeout());
    }
}
