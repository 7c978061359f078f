use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::client::SmatrixClient;
use crate::coordinator::SnapshotSource;
use crate::types::*;
use crate::{Error, Result};

pub const DOMAIN: &str = "uponor";
pub const MANUFACTURER: &str = "Uponor";
pub const MODEL: &str = "Smatrix Pulse";

/// Registry information for the device backing one entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub identifiers: (String, String),
    pub name: String,
    pub manufacturer: String,
    pub model: String,
}

/// Climate control for one thermostat code.
///
/// Reads come from the latest published snapshot; a code missing from it reads as absent.
/// Writes go straight to the hub and, on success, ask the source for a refresh.
pub struct ThermostatEntity {
    code: String,
    name: String,
    unique_id: String,
    client: Arc<SmatrixClient>,
    source: Arc<dyn SnapshotSource>,
}

impl ThermostatEntity {
    pub fn new(
        entry_id: &str,
        record: &ThermostatRecord,
        client: Arc<SmatrixClient>,
        source: Arc<dyn SnapshotSource>,
    ) -> Self {
        Self {
            code: record.code.clone(),
            name: record.name.clone(),
            unique_id: format!("{entry_id}_{}", record.code),
            client,
            source,
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    pub fn device_info(&self) -> DeviceInfo {
        DeviceInfo {
            identifiers: (DOMAIN.to_string(), self.code.clone()),
            name: self.name.clone(),
            manufacturer: MANUFACTURER.to_string(),
            model: MODEL.to_string(),
        }
    }

    pub fn temperature_unit(&self) -> TemperatureUnit {
        TemperatureUnit::Celsius
    }

    pub fn supported_features(&self) -> &'static [ClimateFeature] {
        &[ClimateFeature::TargetTemperature]
    }

    pub fn hvac_modes(&self) -> &'static [HvacMode] {
        &HvacMode::ALL
    }

    /// False while the last fetch failed or once the thermostat vanished from the hub.
    pub fn available(&self) -> bool {
        self.source.last_update_success() && self.record().is_some()
    }

    pub fn record(&self) -> Option<ThermostatRecord> {
        let snapshot = self.source.snapshot()?;
        snapshot.get(&self.code).cloned()
    }

    pub fn current_temperature(&self) -> Option<f64> {
        self.record()?.current_temperature
    }

    pub fn target_temperature(&self) -> Option<f64> {
        self.record()?.target_temperature
    }

    pub fn hvac_mode(&self) -> Option<HvacMode> {
        self.record().map(|r| r.hvac_mode())
    }

    /// `None` is accepted and ignored, matching a service call without a temperature.
    pub async fn set_temperature(&self, temperature: Option<f64>) -> Result<()> {
        let Some(temperature) = temperature else {
            debug!(code = %self.code, "set_temperature without a value, ignoring");
            return Ok(());
        };

        match self.client.set_temperature(&self.code, temperature).await {
            Ok(()) => {
                self.source.request_refresh();
                Ok(())
            }
            Err(e) => {
                error!(code = %self.code, "failed to set temperature: {e}");
                Err(e)
            }
        }
    }

    /// The hub has a single heating/cooling switch, so this changes the mode of every
    /// thermostat on it, not only this one. Turning a single thermostat off is not possible.
    pub async fn set_hvac_mode(&self, mode: HvacMode) -> Result<()> {
        let Some(system_mode) = mode.system_mode() else {
            warn!(code = %self.code, "turning off individual thermostats is not supported");
            return Err(Error::Unsupported(format!(
                "cannot turn off thermostat {}",
                self.code
            )));
        };

        match self.client.set_system_mode(system_mode).await {
            Ok(()) => {
                self.source.request_refresh();
                Ok(())
            }
            Err(e) => {
                error!(code = %self.code, mode = %mode, "failed to set HVAC mode: {e}");
                Err(e)
            }
        }
    }
}
