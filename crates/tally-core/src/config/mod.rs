//! Sync configuration.
//!
//! `SyncSettings` is read from a JSON file and then overlaid with `TALLY_*`
//! environment variables. The remote is optional: without an API URL the app
//! keeps working offline and only the sync commands refuse to run.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::util::{is_http_url, normalize_text_option};

pub const ENV_API_URL: &str = "TALLY_API_URL";
pub const ENV_API_TOKEN: &str = "TALLY_API_TOKEN";
pub const ENV_HTTP_TIMEOUT_SECS: &str = "TALLY_HTTP_TIMEOUT_SECS";
pub const ENV_OUTBOX_RETENTION_DAYS: &str = "TALLY_OUTBOX_RETENTION_DAYS";

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 5;
const MAX_HTTP_TIMEOUT_SECS: u64 = 3_600;
const MAX_RETENTION_DAYS: u32 = 36_500;
const MAX_CURSOR_SKEW_SECS: u64 = 30 * 24 * 3_600;

/// What happens to outbox entries once the remote acknowledged them
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum OutboxRetention {
    /// Keep acknowledged entries forever as an audit trail
    #[default]
    KeepAll,
    /// Delete acknowledged entries older than `days` after each push
    PruneSentAfter { days: u32 },
}

impl OutboxRetention {
    /// Creation-time cutoff below which acknowledged entries may be deleted.
    /// `None` when the age reaches past the representable date range.
    pub fn cutoff(self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Self::KeepAll => None,
            Self::PruneSentAfter { days } => chrono::Duration::try_days(i64::from(days))
                .and_then(|age| now.checked_sub_signed(age)),
        }
    }
}

/// Where a successful pull leaves the collection's cursor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CursorPolicy {
    /// The local time the pull started
    #[default]
    PullStart,
    /// Newest `updated_at` received minus `skew_secs`, never past the pull
    /// start; unchanged when nothing was received
    MaxSeen { skew_secs: u64 },
}

/// Remote endpoint and sync policy settings
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SyncSettings {
    #[serde(default)]
    pub api_base_url: Option<String>,
    #[serde(default)]
    pub api_token: Option<String>,
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
    #[serde(default)]
    pub outbox_retention: OutboxRetention,
    #[serde(default)]
    pub cursor_policy: CursorPolicy,
}

const fn default_http_timeout_secs() -> u64 {
    DEFAULT_HTTP_TIMEOUT_SECS
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            api_base_url: None,
            api_token: None,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            outbox_retention: OutboxRetention::default(),
            cursor_policy: CursorPolicy::default(),
        }
    }
}

impl std::fmt::Debug for SyncSettings {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("SyncSettings")
            .field("api_base_url", &self.api_base_url)
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("outbox_retention", &self.outbox_retention)
            .field("cursor_policy", &self.cursor_policy)
            .finish()
    }
}

impl SyncSettings {
    /// Load settings from a JSON file; a missing file yields defaults
    pub fn load_from_path(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|error| format!("Failed to read config at {}: {}", path.display(), error))?;
        let mut settings = serde_json::from_str::<Self>(&raw)
            .map_err(|error| format!("Failed to parse config at {}: {}", path.display(), error))?;
        settings.normalize();
        settings.validate()?;
        Ok(settings)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|error| {
                format!(
                    "Failed to create config directory {}: {}",
                    parent.display(),
                    error
                )
            })?;
        }

        let mut normalized = self.clone();
        normalized.normalize();
        normalized.validate()?;
        let serialized = serde_json::to_string_pretty(&normalized)
            .map_err(|error| format!("Failed to serialize config: {error}"))?;
        std::fs::write(path, serialized)
            .map_err(|error| format!("Failed to write config at {}: {}", path.display(), error))
    }

    /// Overlay values from the process environment
    pub fn with_env_overrides(self) -> Result<Self, String> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Overlay values from `lookup`, which maps `TALLY_*` names to values
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        if let Some(url) = normalize_text_option(lookup(ENV_API_URL)) {
            self.api_base_url = Some(url);
        }
        if let Some(token) = normalize_text_option(lookup(ENV_API_TOKEN)) {
            self.api_token = Some(token);
        }
        if let Some(raw) = normalize_text_option(lookup(ENV_HTTP_TIMEOUT_SECS)) {
            self.http_timeout_secs = raw
                .parse()
                .map_err(|_| format!("{ENV_HTTP_TIMEOUT_SECS} must be a whole number of seconds"))?;
        }
        if let Some(raw) = normalize_text_option(lookup(ENV_OUTBOX_RETENTION_DAYS)) {
            let days = raw
                .parse()
                .map_err(|_| format!("{ENV_OUTBOX_RETENTION_DAYS} must be a whole number of days"))?;
            self.outbox_retention = OutboxRetention::PruneSentAfter { days };
        }

        self.normalize();
        self.validate()?;
        Ok(self)
    }

    /// Normalized remote base URL, if sync is configured
    pub fn api_base_url(&self) -> Option<String> {
        normalize_text_option(self.api_base_url.clone())
            .map(|url| url.trim_end_matches('/').to_string())
    }

    pub fn api_token(&self) -> Option<String> {
        normalize_text_option(self.api_token.clone())
    }

    pub const fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Check if a remote is configured
    pub fn is_configured(&self) -> bool {
        self.api_base_url().is_some()
    }

    fn normalize(&mut self) {
        self.api_base_url = self.api_base_url();
        self.api_token = self.api_token();
    }

    fn validate(&self) -> Result<(), String> {
        if let Some(url) = &self.api_base_url {
            if !is_http_url(url) {
                return Err("api_base_url must include http:// or https://".to_string());
            }
        }
        if self.http_timeout_secs == 0 || self.http_timeout_secs > MAX_HTTP_TIMEOUT_SECS {
            return Err(format!(
                "http_timeout_secs must be between 1 and {MAX_HTTP_TIMEOUT_SECS}"
            ));
        }
        if let OutboxRetention::PruneSentAfter { days } = self.outbox_retention {
            if days > MAX_RETENTION_DAYS {
                return Err(format!("outbox retention must be at most {MAX_RETENTION_DAYS} days"));
            }
        }
        if let CursorPolicy::MaxSeen { skew_secs } = self.cursor_policy {
            if skew_secs > MAX_CURSOR_SKEW_SECS {
                return Err(format!("cursor skew must be at most {MAX_CURSOR_SKEW_SECS} seconds"));
            }
        }
        Ok(())
    }
}
