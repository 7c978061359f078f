use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::client::{DEFAULT_PROTOCOL, DEFAULT_REQUEST_TIMEOUT, SmatrixClient, SmatrixClientBuilder};
use crate::coordinator::DEFAULT_SCAN_INTERVAL;
use crate::logger::MessageLogMode;

/// The only state persisted for a configured hub.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryData {
    pub host: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigEntry {
    pub entry_id: String,
    pub title: String,
    pub data: EntryData,
}

impl ConfigEntry {
    pub fn new(host: impl Into<String>) -> Self {
        let host = host.into();
        Self {
            entry_id: Uuid::new_v4().simple().to_string(),
            title: format!("Uponor ({host})"),
            data: EntryData { host },
        }
    }

    pub fn host(&self) -> &str {
        &self.data.host
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MessageLogSettings {
    pub path: String,
    #[serde(default)]
    pub mode: MessageLogMode,
}

/// Tunables for a running integration. Every field has a default.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub scan_interval_secs: u64,
    pub request_timeout_secs: u64,
    pub protocol: String,
    pub message_log: Option<MessageLogSettings>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            scan_interval_secs: DEFAULT_SCAN_INTERVAL.as_secs(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT.as_secs(),
            protocol: DEFAULT_PROTOCOL.to_string(),
            message_log: None,
        }
    }
}

impl Settings {
    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Client for a running integration, message log included.
    pub fn client_builder(&self, host: &str) -> SmatrixClientBuilder {
        let builder = self.probe_builder(host);
        match &self.message_log {
            Some(log) => builder.message_log(log.mode, log.path.clone()),
            None => builder,
        }
    }

    /// Client for one-off checks; never writes the message log.
    pub fn probe_builder(&self, host: &str) -> SmatrixClientBuilder {
        SmatrixClient::builder(host)
            .protocol(&self.protocol)
            .timeout(self.request_timeout())
    }
}
