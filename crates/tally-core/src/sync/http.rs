//! Blocking HTTP transport
//!
//! `GET {base}/sync/pull/{collection}?since=...` and
//! `POST {base}/sync/push/{collection}` with JSON bodies.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;

use super::transport::{PushItem, RemoteTransport, TransportError, TransportResult};
use crate::config::SyncSettings;
use crate::models::Collection;
use crate::util::{compact_text, format_timestamp, is_http_url, normalize_text_option};

#[derive(Clone)]
pub struct HttpTransport {
    base_url: String,
    token: Option<String>,
    client: Client,
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("HttpTransport")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish_non_exhaustive()
    }
}

impl HttpTransport {
    pub fn new(
        base_url: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> TransportResult<Self> {
        let base_url = normalize_base_url(base_url.into())?;
        Ok(Self {
            base_url,
            token: normalize_text_option(token),
            client: Client::builder().timeout(timeout).build()?,
        })
    }

    /// Build from settings; fails when no remote is configured
    pub fn from_settings(settings: &SyncSettings) -> TransportResult<Self> {
        let base_url = settings.api_base_url().ok_or_else(|| {
            TransportError::InvalidConfiguration("api_base_url is not set".to_string())
        })?;
        Self::new(base_url, settings.api_token(), settings.http_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET {base}/health`; any failure counts as unhealthy
    pub fn health(&self) -> bool {
        let url = format!("{}/health", self.base_url);
        match self.send(self.client.get(&url)) {
            Ok(_) => true,
            Err(error) => {
                tracing::debug!(%error, "Health check failed");
                false
            }
        }
    }

    fn send(&self, builder: RequestBuilder) -> TransportResult<Response> {
        let builder = builder.header(reqwest::header::ACCEPT, "application/json");
        let builder = match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        };

        let response = builder.send()?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(TransportError::Api {
                status: status.as_u16(),
                message: parse_api_error(status, &body),
            });
        }
        Ok(response)
    }
}

impl RemoteTransport for HttpTransport {
    fn pull(&self, collection: Collection, since: Option<DateTime<Utc>>) -> TransportResult<Vec<Value>> {
        let url = format!("{}/sync/pull/{collection}", self.base_url);
        let mut builder = self.client.get(&url);
        if let Some(since) = since {
            builder = builder.query(&[("since", format_timestamp(&since))]);
        }

        let body = self.send(builder)?.text()?;
        match serde_json::from_str::<Value>(&body) {
            Ok(Value::Array(records)) => Ok(records),
            Ok(_) => Err(TransportError::InvalidPayload(
                "pull response must be a JSON array".to_string(),
            )),
            Err(error) => Err(TransportError::InvalidPayload(format!(
                "{error}: {}",
                compact_text(&body)
            ))),
        }
    }

    fn push(&self, collection: Collection, batch: &[PushItem<'_>]) -> TransportResult<Value> {
        let url = format!("{}/sync/push/{collection}", self.base_url);
        let body = self.send(self.client.post(&url).json(batch))?.text()?;
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|error| {
            TransportError::InvalidPayload(format!("{error}: {}", compact_text(&body)))
        })
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            return message.trim().to_string();
        }
    }

    let trimmed = compact_text(body);
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        trimmed
    }
}

fn normalize_base_url(raw: String) -> TransportResult<String> {
    let url = normalize_text_option(Some(raw)).ok_or_else(|| {
        TransportError::InvalidConfiguration("base URL must not be empty".to_string())
    })?;
    if is_http_url(&url) {
        Ok(url.trim_end_matches('/').to_string())
    } else {
        Err(TransportError::InvalidConfiguration(
            "base URL must include http:// or https://".to_string(),
        ))
    }
}
