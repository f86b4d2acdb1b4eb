use std::time::Duration;

use serde::Deserialize;

use crate::client::ZwayClientBuilder;
use crate::protocol::DEFAULT_HOST;
use crate::types::{GatewayApi, OperationMode, TemperatureUnit};
use crate::{Error, Result};

pub const DEFAULT_NAME: &str = "Zway Thermostat";
pub const DEFAULT_MIN_TEMP: f64 = 4.0;
pub const DEFAULT_MAX_TEMP: f64 = 40.0;
pub const DEFAULT_TARGET_TEMP: f64 = 21.0;
pub const DEFAULT_AWAY_TEMP: f64 = 15.0;
pub const DEFAULT_SCAN_INTERVAL_SECS: u64 = 10;
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

fn default_name() -> String {
    DEFAULT_NAME.to_string()
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_scan_interval() -> u64 {
    DEFAULT_SCAN_INTERVAL_SECS
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// Platform configuration for one thermostat, as the host hands it over.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ThermostatConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_host")]
    pub host: String,
    pub node: u32,
    #[serde(default)]
    pub login: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Entity id of the external temperature sensor.
    #[serde(default, alias = "target_sensor")]
    pub temp_sensor: Option<String>,
    #[serde(default)]
    pub min_temp: Option<f64>,
    #[serde(default)]
    pub max_temp: Option<f64>,
    #[serde(default)]
    pub target_temp: Option<f64>,
    /// Host unit. Unset means 15 °C.
    #[serde(default)]
    pub away_temp: Option<f64>,
    #[serde(default)]
    pub initial_operation_mode: Option<OperationMode>,
    /// Seconds between polls.
    #[serde(default = "default_scan_interval")]
    pub scan_interval: u64,
    /// Seconds per HTTP request.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    /// Forward operation mode changes to the thermostat mode command class.
    #[serde(default)]
    pub mode_command: bool,
    #[serde(default)]
    pub api: GatewayApi,
    /// Unit the host displays temperatures in.
    #[serde(default)]
    pub unit: TemperatureUnit,
}

impl ThermostatConfig {
    pub fn new(node: u32) -> Self {
        Self {
            name: default_name(),
            host: default_host(),
            node,
            login: None,
            password: None,
            temp_sensor: None,
            min_temp: None,
            max_temp: None,
            target_temp: None,
            away_temp: None,
            initial_operation_mode: None,
            scan_interval: DEFAULT_SCAN_INTERVAL_SECS,
            timeout: DEFAULT_TIMEOUT_SECS,
            mode_command: false,
            api: GatewayApi::default(),
            unit: TemperatureUnit::default(),
        }
    }

    pub fn from_json(s: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.node == 0 {
            return Err(Error::InvalidConfig("node must be a positive integer".to_string()));
        }
        if let (Some(min), Some(max)) = (self.min_temp, self.max_temp)
            && min > max
        {
            return Err(Error::InvalidConfig(format!(
                "min_temp {min} is above max_temp {max}"
            )));
        }
        if self.initial_operation_mode == Some(OperationMode::Heat) {
            return Err(Error::InvalidConfig(
                "initial_operation_mode must be auto or off".to_string(),
            ));
        }
        if self.login.is_some() != self.password.is_some() {
            return Err(Error::InvalidConfig(
                "login and password must be given together".to_string(),
            ));
        }
        if self.scan_interval == 0 {
            return Err(Error::InvalidConfig("scan_interval must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval)
    }

    pub fn client_builder(&self) -> ZwayClientBuilder {
        let builder = ZwayClientBuilder::new(self.node)
            .host(&self.host)
            .timeout(Duration::from_secs(self.timeout))
            .api(self.api);
        match (&self.login, &self.password) {
            (Some(login), Some(password)) => builder.credentials(login, password),
            _ => builder,
        }
    }
}
