mod client;
mod climate;
mod config;
mod coordinator;
mod diff;
mod error;
mod integration;
mod logger;
mod protocol;
mod setup;
mod types;

pub use client::{DEFAULT_PROTOCOL, DEFAULT_REQUEST_TIMEOUT, SmatrixClient, SmatrixClientBuilder};
pub use climate::{DOMAIN, DeviceInfo, MANUFACTURER, MODEL, ThermostatEntity};
pub use config::{ConfigEntry, EntryData, MessageLogSettings, Settings};
pub use coordinator::{
    Coordinator, CoordinatorBuilder, DEFAULT_SCAN_INTERVAL, PollerHandle, SnapshotSource,
};
pub use error::{Error, Result};
pub use integration::Integration;
pub use logger::MessageLogMode;
pub use setup::{EntryRegistry, SetupError, validate};
pub use types::*;
