use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Mode as shown on a climate entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HvacMode {
    Off,
    Heat,
    Cool,
}

impl HvacMode {
    /// Modes every thermostat entity advertises.
    pub const ALL: [HvacMode; 3] = [HvacMode::Heat, HvacMode::Cool, HvacMode::Off];

    /// Device-side system mode for this entity mode. `Off` has none.
    pub fn system_mode(&self) -> Option<SystemMode> {
        match self {
            HvacMode::Heat => Some(SystemMode::Heating),
            HvacMode::Cool => Some(SystemMode::Cooling),
            HvacMode::Off => None,
        }
    }
}

impl fmt::Display for HvacMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HvacMode::Off => "off",
            HvacMode::Heat => "heat",
            HvacMode::Cool => "cool",
        };
        f.write_str(s)
    }
}

/// Hub-wide heating/cooling switch, as spelled on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemMode {
    Heating,
    Cooling,
}

impl SystemMode {
    pub fn as_device_str(&self) -> &'static str {
        match self {
            SystemMode::Heating => "heating",
            SystemMode::Cooling => "cooling",
        }
    }

    pub fn from_device_str(s: &str) -> Option<Self> {
        match s {
            "heating" => Some(SystemMode::Heating),
            "cooling" => Some(SystemMode::Cooling),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemperatureUnit {
    Celsius,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClimateFeature {
    TargetTemperature,
}

/// One thermostat as reported by `GET /api/thermostats`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThermostatRecord {
    pub code: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_temperature")]
    pub current_temperature: Option<f64>,
    #[serde(default, deserialize_with = "lenient_temperature")]
    pub target_temperature: Option<f64>,
    /// Outer `None` when the key is absent, inner `None` for an explicit `null`.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub active: Option<Option<bool>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub mode: Option<Option<String>>,
}

impl ThermostatRecord {
    /// An absent flag means active; an explicit `null` does not.
    pub fn is_active(&self) -> bool {
        self.active.unwrap_or(Some(true)) == Some(true)
    }

    /// Inactive thermostats read as off; a `null` or unrecognised mode string does too.
    pub fn hvac_mode(&self) -> HvacMode {
        if !self.is_active() {
            return HvacMode::Off;
        }
        let mode = match &self.mode {
            None => Some("heating"),
            Some(mode) => mode.as_deref(),
        };
        match mode.and_then(SystemMode::from_device_str) {
            Some(SystemMode::Heating) => HvacMode::Heat,
            Some(SystemMode::Cooling) => HvacMode::Cool,
            None => HvacMode::Off,
        }
    }
}

/// Only called when the key is present, so `null` lands as `Some(None)`.
fn present<'de, D, T>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Accepts a JSON number or a numeric string; anything else reads as absent.
fn lenient_temperature<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Complete result of one successful poll. Never edited after publication.
#[derive(Debug, Clone)]
pub struct Snapshot {
    thermostats: Vec<ThermostatRecord>,
    fetched_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn new(thermostats: Vec<ThermostatRecord>) -> Self {
        Self {
            thermostats,
            fetched_at: Utc::now(),
        }
    }

    pub fn thermostats(&self) -> &[ThermostatRecord] {
        &self.thermostats
    }

    pub fn get(&self, code: &str) -> Option<&ThermostatRecord> {
        self.thermostats.iter().find(|t| t.code == code)
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    pub fn len(&self) -> usize {
        self.thermostats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.thermostats.is_empty()
    }
}

/// Response of `GET /api/system`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStatus {
    pub mode: String,
    #[serde(default)]
    pub is_cooling: bool,
    #[serde(default)]
    pub is_away: bool,
}

impl SystemStatus {
    pub fn system_mode(&self) -> Option<SystemMode> {
        SystemMode::from_device_str(&self.mode)
    }
}

/// Events emitted when a newly published snapshot differs from the previous one.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    ThermostatAdded { code: String, name: String },
    ThermostatRemoved { code: String, name: String },
    CurrentTemperatureChanged { code: String, name: String, temperature: Option<f64> },
    TargetTemperatureChanged { code: String, name: String, temperature: Option<f64> },
    HvacModeChanged { code: String, name: String, mode: HvacMode },
}
