use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, trace};

use crate::logger::{MessageLogMode, MessageLogger};
use crate::protocol::{
    SYSTEM_AWAY_PATH, SYSTEM_MODE_PATH, SYSTEM_PATH, THERMOSTATS_PATH, parse_thermostats,
    set_away_data, set_system_mode_data, set_temperature_data, thermostat_temperature_path,
};
use crate::types::*;
use crate::{Error, Result};

pub const DEFAULT_PROTOCOL: &str = "http";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct SmatrixClientBuilder {
    host: String,
    protocol: String,
    timeout: Duration,
    log_mode: Option<MessageLogMode>,
    log_path: Option<String>,
}

impl SmatrixClientBuilder {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into().trim().to_string(),
            protocol: DEFAULT_PROTOCOL.to_string(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
            log_mode: None,
            log_path: None,
        }
    }

    pub fn protocol(mut self, proto: &str) -> Self {
        self.protocol = proto.to_string();
        self
    }

    /// Upper bound for every request made through the client.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn message_log(mut self, mode: MessageLogMode, path: impl Into<String>) -> Self {
        self.log_mode = Some(mode);
        self.log_path = Some(path.into());
        self
    }

    pub fn build(self) -> Result<SmatrixClient> {
        let http = reqwest::Client::builder().timeout(self.timeout).build()?;

        let logger = match (self.log_mode, self.log_path) {
            (Some(mode), Some(path)) => Some(Mutex::new(MessageLogger::new(mode, &path)?)),
            _ => None,
        };

        Ok(SmatrixClient {
            http,
            base_url: format!("{}://{}", self.protocol, self.host),
            host: self.host,
            logger,
            closed: AtomicBool::new(false),
        })
    }
}

/// Connection to one hub. Shared by the poller and every entity of an integration.
pub struct SmatrixClient {
    http: reqwest::Client,
    host: String,
    base_url: String,
    logger: Option<Mutex<MessageLogger>>,
    closed: AtomicBool,
}

impl SmatrixClient {
    pub fn builder(host: impl Into<String>) -> SmatrixClientBuilder {
        SmatrixClientBuilder::new(host)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Closes the connection. Returns `false` if it was already closed.
    pub fn close(&self) -> bool {
        let first = !self.closed.swap(true, Ordering::SeqCst);
        if first {
            debug!(host = %self.host, "closing hub connection");
        }
        first
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// `GET /api/thermostats`, checking only that the hub answers 200.
    pub async fn probe(&self) -> Result<()> {
        self.ensure_open()?;
        let url = format!("{}{}", self.base_url, THERMOSTATS_PATH);
        debug!(url = %url, "probing hub");
        let resp = self.http.get(&url).send().await?;
        match resp.status() {
            StatusCode::OK => Ok(()),
            status => Err(Error::BadStatus(status.as_u16())),
        }
    }

    pub async fn fetch_thermostats(&self) -> Result<Vec<ThermostatRecord>> {
        self.ensure_open()?;
        let url = format!("{}{}", self.base_url, THERMOSTATS_PATH);
        let resp = self.http.get(&url).send().await?;
        let status = resp.status();

        if status != StatusCode::OK {
            self.with_logger(|logger| logger.log_poll(status.as_u16(), None));
            return Err(Error::BadStatus(status.as_u16()));
        }

        let body = resp.text().await?;
        let json: Value = serde_json::from_str(&body)
            .map_err(|e| Error::Protocol(format!("invalid thermostat payload: {e}")))?;
        self.with_logger(|logger| logger.log_poll(status.as_u16(), Some(&json)));

        let thermostats = parse_thermostats(json)?;
        trace!(count = thermostats.len(), "fetched thermostats");
        Ok(thermostats)
    }

    pub async fn set_temperature(&self, code: &str, temperature: f64) -> Result<()> {
        let path = thermostat_temperature_path(code);
        let data = set_temperature_data(temperature);
        self.post_command("set_temperature", Some(code), &path, data)
            .await
    }

    /// Switches every thermostat on the hub between heating and cooling.
    pub async fn set_system_mode(&self, mode: SystemMode) -> Result<()> {
        let data = set_system_mode_data(mode);
        self.post_command("set_system_mode", None, SYSTEM_MODE_PATH, data)
            .await
    }

    pub async fn system_status(&self) -> Result<SystemStatus> {
        self.ensure_open()?;
        let url = format!("{}{}", self.base_url, SYSTEM_PATH);
        self.with_logger(|logger| logger.log_request("GET", SYSTEM_PATH, None));

        let resp = self.http.get(&url).send().await?;
        if resp.status() != StatusCode::OK {
            return Err(Error::BadStatus(resp.status().as_u16()));
        }
        let body = resp.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| Error::Protocol(format!("invalid system status: {e}")))
    }

    pub async fn set_away(&self, enabled: bool) -> Result<()> {
        let data = set_away_data(enabled);
        self.post_command("set_away", None, SYSTEM_AWAY_PATH, data)
            .await
    }

    async fn post_command(
        &self,
        action: &str,
        code: Option<&str>,
        path: &str,
        data: Value,
    ) -> Result<()> {
        self.ensure_open()?;
        let url = format!("{}{}", self.base_url, path);
        debug!(action, url = %url, body = %data, "sending command");
        self.with_logger(|logger| logger.log_command(action, code, &data));

        let resp = self.http.post(&url).json(&data).send().await?;
        match resp.status() {
            StatusCode::OK => Ok(()),
            status => Err(Error::BadStatus(status.as_u16())),
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(Error::Closed);
        }
        Ok(())
    }

    fn with_logger(&self, f: impl FnOnce(&mut MessageLogger)) {
        if let Some(logger) = &self.logger
            && let Ok(mut guard) = logger.lock()
        {
            f(&mut guard);
        }
    }
}
