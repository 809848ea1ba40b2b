//! Local HTTP stand-in for the remote sync API.
//!
//! Runs an axum router on its own thread and tokio runtime so the blocking
//! client under test never executes inside an async context.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: &'static str,
    pub path: String,
    pub since: Option<String>,
    pub authorization: Option<String>,
    pub body: Option<Value>,
}

#[derive(Default)]
pub struct StubState {
    records: HashMap<String, Vec<Value>>,
    requests: Vec<RecordedRequest>,
    failure: Option<(u16, String)>,
    delay: Option<Duration>,
    raw_response: Option<String>,
}

type Shared = Arc<Mutex<StubState>>;

pub struct StubServer {
    pub base_url: String,
    state: Shared,
}

impl StubServer {
    pub fn start() -> Self {
        let state = Shared::default();
        let router = Router::new()
            .route("/health", get(health))
            .route("/sync/pull/{collection}", get(pull))
            .route("/sync/push/{collection}", post(push))
            .with_state(Arc::clone(&state));

        let (addr_tx, addr_rx) = std::sync::mpsc::channel();
        std::thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .worker_threads(1)
                .enable_all()
                .build()
                .unwrap();
            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
                addr_tx.send(listener.local_addr().unwrap()).unwrap();
                axum::serve(listener, router).await.unwrap();
            });
        });

        let addr = addr_rx.recv().unwrap();
        Self {
            base_url: format!("http://{addr}"),
            state,
        }
    }

    pub fn seed(&self, collection: &str, record: Value) {
        let mut state = self.state.lock().unwrap();
        upsert(state.records.entry(collection.to_string()).or_default(), record);
    }

    pub fn records(&self, collection: &str) -> Vec<Value> {
        let state = self.state.lock().unwrap();
        state.records.get(collection).cloned().unwrap_or_default()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    /// Answer every request with `status` and `body`
    pub fn fail_with(&self, status: u16, body: &str) {
        self.state.lock().unwrap().failure = Some((status, body.to_string()));
    }

    pub fn delay(&self, delay: Duration) {
        self.state.lock().unwrap().delay = Some(delay);
    }

    /// Answer pulls and pushes with this raw body instead of JSON
    pub fn respond_raw(&self, body: &str) {
        self.state.lock().unwrap().raw_response = Some(body.to_string());
    }
}

fn upsert(records: &mut Vec<Value>, value: Value) {
    match records.iter_mut().find(|existing| existing["id"] == value["id"]) {
        Some(existing) => *existing = value,
        None => records.push(value),
    }
}

fn authorization(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

/// Record the request and return the configured delay
fn record(state: &Shared, request: RecordedRequest) -> Option<Duration> {
    let mut state = state.lock().unwrap();
    state.requests.push(request);
    state.delay
}

fn canned(state: &StubState) -> Option<Response> {
    if let Some((status, body)) = &state.failure {
        let status = StatusCode::from_u16(*status).unwrap();
        return Some((status, body.clone()).into_response());
    }
    state
        .raw_response
        .as_ref()
        .map(|body| (StatusCode::OK, body.clone()).into_response())
}

async fn health(State(state): State<Shared>) -> StatusCode {
    if state.lock().unwrap().failure.is_some() {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    }
}

async fn pull(
    State(state): State<Shared>,
    Path(collection): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let since = query.get("since").cloned();
    let delay = record(
        &state,
        RecordedRequest {
            method: "GET",
            path: format!("/sync/pull/{collection}"),
            since: since.clone(),
            authorization: authorization(&headers),
            body: None,
        },
    );
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    let state = state.lock().unwrap();
    if let Some(response) = canned(&state) {
        return response;
    }
    let records = state
        .records
        .get(&collection)
        .cloned()
        .unwrap_or_default()
        .into_iter()
        .filter(|record| {
            since.as_deref().map_or(true, |since| {
                record["updated_at"].as_str().unwrap_or_default() >= since
            })
        })
        .collect::<Vec<_>>();
    Json(records).into_response()
}

async fn push(
    State(state): State<Shared>,
    Path(collection): Path<String>,
    headers: HeaderMap,
    Json(batch): Json<Vec<Value>>,
) -> Response {
    let delay = record(
        &state,
        RecordedRequest {
            method: "POST",
            path: format!("/sync/push/{collection}"),
            since: None,
            authorization: authorization(&headers),
            body: Some(Value::Array(batch.clone())),
        },
    );
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    let mut state = state.lock().unwrap();
    if let Some(response) = canned(&state) {
        return response;
    }
    let stored = state.records.entry(collection).or_default();
    for item in &batch {
        upsert(stored, item["data"].clone());
    }
    Json(json!({ "accepted": batch.len() })).into_response()
}
