use std::path::Path;

use tally_core::config::{CursorPolicy, OutboxRetention};
use tally_core::util::normalize_text_option;
use tally_core::SyncSettings;

use crate::cli::ConfigCommands;
use crate::commands::common::load_settings;
use crate::error::CliError;

pub fn run_config(command: ConfigCommands, config_path: &Path) -> Result<(), CliError> {
    match command {
        ConfigCommands::Show => {
            let settings = load_settings(config_path)?;
            println!("# {}", config_path.display());
            println!("{}", serde_json::to_string_pretty(&redacted(settings))?);
            Ok(())
        }
        ConfigCommands::Init {
            api_url,
            api_token,
            http_timeout_secs,
            retention_days,
            cursor_skew_secs,
        } => {
            let settings = run_config_init(
                config_path,
                api_url,
                api_token,
                http_timeout_secs,
                retention_days,
                cursor_skew_secs,
            )?;
            println!("Saved settings to {}", config_path.display());
            if !settings.is_configured() {
                println!("No API URL set; sync stays disabled until one is configured.");
            }
            Ok(())
        }
    }
}

/// Merge explicit values into the settings file, leaving the rest as stored
#[allow(clippy::needless_pass_by_value)]
pub fn run_config_init(
    config_path: &Path,
    api_url: Option<String>,
    api_token: Option<String>,
    http_timeout_secs: Option<u64>,
    retention_days: Option<u32>,
    cursor_skew_secs: Option<u64>,
) -> Result<SyncSettings, CliError> {
    let mut settings = SyncSettings::load_from_path(config_path).map_err(CliError::Config)?;

    if let Some(url) = normalize_text_option(api_url) {
        settings.api_base_url = Some(url);
    }
    if let Some(token) = normalize_text_option(api_token) {
        settings.api_token = Some(token);
    }
    if let Some(secs) = http_timeout_secs {
        settings.http_timeout_secs = secs;
    }
    if let Some(days) = retention_days {
        settings.outbox_retention = OutboxRetention::PruneSentAfter { days };
    }
    if let Some(skew_secs) = cursor_skew_secs {
        settings.cursor_policy = CursorPolicy::MaxSeen { skew_secs };
    }

    settings.save_to_path(config_path).map_err(CliError::Config)?;
    Ok(settings)
}

fn redacted(mut settings: SyncSettings) -> SyncSettings {
    if settings.api_token.is_some() {
        settings.api_token = Some("[REDACTED]".to_string());
    }
    settings
}
