use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::Error;
use crate::config::{ConfigEntry, Settings};

/// Reasons a host is not accepted. `key` is the identifier a setup form renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupError {
    CannotConnect,
    Unknown,
    AlreadyConfigured,
}

impl SetupError {
    pub fn key(&self) -> &'static str {
        match self {
            SetupError::CannotConnect => "cannot_connect",
            SetupError::Unknown => "unknown",
            SetupError::AlreadyConfigured => "already_configured",
        }
    }
}

impl fmt::Display for SetupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SetupError::CannotConnect => write!(f, "cannot connect to hub"),
            SetupError::Unknown => write!(f, "unexpected error"),
            SetupError::AlreadyConfigured => write!(f, "hub already configured"),
        }
    }
}

impl std::error::Error for SetupError {}

/// Checks that `host` answers `GET /api/thermostats` with 200, on a throwaway client.
pub async fn validate(host: &str, settings: &Settings) -> Result<(), SetupError> {
    let client = match settings.probe_builder(host).build() {
        Ok(client) => client,
        Err(e) => {
            error!(host, "unexpected error preparing validation: {e}");
            return Err(SetupError::Unknown);
        }
    };

    match client.probe().await {
        Ok(()) => Ok(()),
        Err(Error::BadStatus(status)) => {
            debug!(host, status, "hub rejected validation request");
            Err(SetupError::CannotConnect)
        }
        Err(e) if e.is_transport() => {
            debug!(host, "hub unreachable: {e}");
            Err(SetupError::CannotConnect)
        }
        Err(Error::Http(e)) => {
            debug!(host, "invalid hub address: {e}");
            Err(SetupError::CannotConnect)
        }
        Err(e) => {
            error!(host, "unexpected error validating hub: {e}");
            Err(SetupError::Unknown)
        }
    }
}

/// Configured hubs, keyed by host.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntryRegistry {
    entries: Vec<ConfigEntry>,
}

impl EntryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[ConfigEntry] {
        &self.entries
    }

    pub fn is_configured(&self, host: &str) -> bool {
        self.entries.iter().any(|e| e.host() == host)
    }

    /// Validates the host, then records it unless it is already registered.
    pub async fn create_entry(
        &mut self,
        host: &str,
        settings: &Settings,
    ) -> Result<ConfigEntry, SetupError> {
        let host = host.trim();
        validate(host, settings).await?;

        if self.is_configured(host) {
            debug!(host, "hub already configured");
            return Err(SetupError::AlreadyConfigured);
        }

        let entry = ConfigEntry::new(host);
        info!(host, entry_id = %entry.entry_id, "hub configured");
        self.entries.push(entry.clone());
        Ok(entry)
    }

    pub fn remove_entry(&mut self, entry_id: &str) -> Option<ConfigEntry> {
        let idx = self.entries.iter().position(|e| e.entry_id == entry_id)?;
        Some(self.entries.remove(idx))
    }
}
