use serde_json::{Value, json};

use crate::types::{SystemMode, ThermostatRecord};
use crate::{Error, Result};

pub const THERMOSTATS_PATH: &str = "/api/thermostats";
pub const SYSTEM_PATH: &str = "/api/system";
pub const SYSTEM_MODE_PATH: &str = "/api/system/mode";
pub const SYSTEM_AWAY_PATH: &str = "/api/system/away";

pub fn thermostat_temperature_path(code: &str) -> String {
    format!("/api/thermostat/{code}/temperature")
}

pub fn set_temperature_data(temperature: f64) -> Value {
    json!({ "temperature": temperature })
}

pub fn set_system_mode_data(mode: SystemMode) -> Value {
    json!({ "mode": mode.as_device_str() })
}

pub fn set_away_data(enabled: bool) -> Value {
    json!({ "enabled": enabled })
}

/// Accepts the bare array the hub returns, or the `{count, thermostats}` envelope
/// served by the REST bridge.
pub fn parse_thermostats(body: Value) -> Result<Vec<ThermostatRecord>> {
    let list = match body {
        Value::Object(mut map) => map.remove("thermostats").unwrap_or(Value::Null),
        other => other,
    };
    if !list.is_array() {
        return Err(Error::Protocol("expected a thermostat array".into()));
    }
    serde_json::from_value(list).map_err(|e| Error::Protocol(format!("invalid thermostat: {e}")))
}
