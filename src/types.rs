use std::fmt;

use serde::{Deserialize, Serialize};

/// Temperature stored as Celsius internally.
/// Z-Way setpoints move in 0.5 increments.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Temperature(f64);

impl Temperature {
    pub fn from_celsius(c: f64) -> Self {
        Self(c)
    }

    pub fn from_fahrenheit(f: f64) -> Self {
        Self((f - 32.0) * (5.0 / 9.0))
    }

    pub fn in_unit(value: f64, unit: TemperatureUnit) -> Self {
        match unit {
            TemperatureUnit::Celsius => Self::from_celsius(value),
            TemperatureUnit::Fahrenheit => Self::from_fahrenheit(value),
        }
    }

    pub fn celsius(&self) -> f64 {
        self.0
    }

    pub fn fahrenheit(&self) -> f64 {
        self.0 * (9.0 / 5.0) + 32.0
    }

    pub fn value_in(&self, unit: TemperatureUnit) -> f64 {
        match unit {
            TemperatureUnit::Celsius => self.celsius(),
            TemperatureUnit::Fahrenheit => self.fahrenheit(),
        }
    }

    /// Round to Z-Way setpoint precision (0.5 increments).
    pub fn to_zway_celsius(&self) -> f64 {
        (self.0 * 2.0).round() / 2.0
    }
}

impl fmt::Display for Temperature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}\u{00b0}C", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    #[default]
    Celsius,
    Fahrenheit,
}

impl TemperatureUnit {
    /// Parse the unit-of-measurement attribute a host sensor reports.
    pub fn from_unit_str(s: &str) -> Option<Self> {
        match s.trim() {
            "\u{00b0}C" | "C" | "celsius" => Some(TemperatureUnit::Celsius),
            "\u{00b0}F" | "F" | "fahrenheit" => Some(TemperatureUnit::Fahrenheit),
            _ => None,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            TemperatureUnit::Celsius => "\u{00b0}C",
            TemperatureUnit::Fahrenheit => "\u{00b0}F",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationMode {
    #[default]
    Auto,
    Heat,
    Off,
}

impl OperationMode {
    pub const ALL: [OperationMode; 3] = [OperationMode::Auto, OperationMode::Heat, OperationMode::Off];

    pub fn as_host_str(&self) -> &'static str {
        match self {
            OperationMode::Auto => "auto",
            OperationMode::Heat => "heat",
            OperationMode::Off => "off",
        }
    }

    pub fn from_host_str(s: &str) -> Option<Self> {
        match s {
            "auto" => Some(OperationMode::Auto),
            "heat" => Some(OperationMode::Heat),
            "off" => Some(OperationMode::Off),
            _ => None,
        }
    }

    /// Z-Wave thermostat mode command class value.
    pub fn zwave_value(&self) -> u8 {
        match self {
            OperationMode::Off => 0,
            OperationMode::Heat => 1,
            OperationMode::Auto => 3,
        }
    }
}

impl fmt::Display for OperationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_host_str())
    }
}

/// State of the host's external temperature sensor entity.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SensorState {
    pub state: String,
    pub unit: Option<String>,
}

impl SensorState {
    pub fn new(state: impl Into<String>, unit: Option<&str>) -> Self {
        Self {
            state: state.into(),
            unit: unit.map(str::to_string),
        }
    }
}

/// Snapshot handed to the host for display and persistence.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ThermostatState {
    pub name: String,
    pub current_temperature: Option<Temperature>,
    pub target_temperature: Option<Temperature>,
    pub operation_mode: OperationMode,
    pub battery_level: Option<u8>,
    pub device_mode: Option<String>,
    pub away: bool,
    pub min_temp: Temperature,
    pub max_temp: Temperature,
}

/// Previously persisted state read back by the host on start-up.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RestoredState {
    #[serde(default)]
    pub operation_mode: Option<OperationMode>,
    #[serde(default)]
    pub target_temperature: Option<Temperature>,
}

/// Events emitted when cached thermostat state changes.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    TargetTemperatureChanged { temp: Temperature },
    CurrentTemperatureChanged { temp: Temperature },
    OperationModeChanged { mode: OperationMode },
    BatteryChanged { level: u8 },
    DeviceModeChanged { name: String },
    AwayModeChanged { away: bool },
}

/// Which gateway surface the client talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayApi {
    /// ZAutomation virtual devices (`/ZAutomation/api/v1/devices/..`).
    #[default]
    Automation,
    /// Raw command class data (`/ZWaveAPI/Run/devices[..]..`).
    Raw,
}
