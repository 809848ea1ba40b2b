//! In-memory remote used by the sync unit tests

use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::transport::{PushItem, RemoteTransport, TransportError, TransportResult};
use crate::models::{Collection, SyncEntity};
use crate::util::parse_timestamp;

type PullHook = Box<dyn FnMut(Collection) + Send>;

#[derive(Default)]
struct State {
    records: BTreeMap<Collection, Vec<Value>>,
    pull_calls: Vec<(Collection, Option<DateTime<Utc>>)>,
    pushed: Vec<(Collection, Vec<Value>)>,
    fail_pulls: bool,
    fail_pushes: HashSet<Collection>,
    lose_acks: bool,
    on_pull: Option<PullHook>,
}

/// Remote that stores records by id and applies pushes as upserts
#[derive(Default)]
pub struct FakeRemote {
    state: Mutex<State>,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed<E: SyncEntity>(&self, entity: E) {
        self.seed_raw(E::COLLECTION, serde_json::to_value(entity).unwrap());
    }

    pub fn seed_raw(&self, collection: Collection, value: Value) {
        let mut state = self.state.lock().unwrap();
        upsert(state.records.entry(collection).or_default(), value);
    }

    pub fn records(&self, collection: Collection) -> Vec<Value> {
        let state = self.state.lock().unwrap();
        state.records.get(&collection).cloned().unwrap_or_default()
    }

    pub fn pull_calls(&self) -> Vec<(Collection, Option<DateTime<Utc>>)> {
        self.state.lock().unwrap().pull_calls.clone()
    }

    /// Every batch received, acknowledged or not
    pub fn pushed(&self) -> Vec<(Collection, Vec<Value>)> {
        self.state.lock().unwrap().pushed.clone()
    }

    pub fn fail_pulls(&self, fail: bool) {
        self.state.lock().unwrap().fail_pulls = fail;
    }

    pub fn fail_pushes_for(&self, collection: Collection) {
        self.state.lock().unwrap().fail_pushes.insert(collection);
    }

    pub fn heal(&self) {
        let mut state = self.state.lock().unwrap();
        state.fail_pulls = false;
        state.fail_pushes.clear();
        state.lose_acks = false;
    }

    /// Apply pushes but report failure, as if the response never arrived
    pub fn lose_acks(&self, lose: bool) {
        self.state.lock().unwrap().lose_acks = lose;
    }

    /// Run `hook` at the start of every pull
    pub fn on_pull(&self, hook: impl FnMut(Collection) + Send + 'static) {
        self.state.lock().unwrap().on_pull = Some(Box::new(hook));
    }
}

fn unavailable() -> TransportError {
    TransportError::Api {
        status: 503,
        message: "remote unavailable".to_string(),
    }
}

fn upsert(records: &mut Vec<Value>, value: Value) {
    match records.iter_mut().find(|existing| existing["id"] == value["id"]) {
        Some(existing) => *existing = value,
        None => records.push(value),
    }
}

fn updated_at(value: &Value) -> Option<DateTime<Utc>> {
    value["updated_at"]
        .as_str()
        .and_then(|raw| parse_timestamp(raw).ok())
}

impl RemoteTransport for FakeRemote {
    fn pull(&self, collection: Collection, since: Option<DateTime<Utc>>) -> TransportResult<Vec<Value>> {
        let mut state = self.state.lock().unwrap();
        state.pull_calls.push((collection, since));
        if let Some(hook) = state.on_pull.as_mut() {
            hook(collection);
        }
        if state.fail_pulls {
            return Err(unavailable());
        }

        let records = state.records.get(&collection).cloned().unwrap_or_default();
        Ok(records
            .into_iter()
            .filter(|value| match (since, updated_at(value)) {
                (None, _) | (Some(_), None) => true,
                (Some(since), Some(updated_at)) => updated_at >= since,
            })
            .collect())
    }

    fn push(&self, collection: Collection, batch: &[PushItem<'_>]) -> TransportResult<Value> {
        let mut state = self.state.lock().unwrap();
        let items = batch
            .iter()
            .map(|item| serde_json::to_value(item).unwrap())
            .collect::<Vec<_>>();
        state.pushed.push((collection, items));

        if state.fail_pushes.contains(&collection) {
            return Err(unavailable());
        }

        let stored = state.records.entry(collection).or_default();
        for item in batch {
            upsert(stored, serde_json::to_value(item.data).unwrap());
        }

        if state.lose_acks {
            return Err(unavailable());
        }
        Ok(serde_json::json!({ "accepted": batch.len() }))
    }
}
