use tally_core::sync::HttpTransport;
use tally_core::SyncSettings;

use crate::error::CliError;

pub fn run_health(settings: &SyncSettings) -> Result<(), CliError> {
    if !settings.is_configured() {
        return Err(CliError::SyncNotConfigured);
    }

    let transport = HttpTransport::from_settings(settings)?;
    if transport.health() {
        println!("Remote at {} is healthy", transport.base_url());
        Ok(())
    } else {
        Err(CliError::Unhealthy(transport.base_url().to_string()))
    }
}
