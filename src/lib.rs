mod client;
mod config;
mod diff;
mod error;
mod logger;
mod poller;
mod protocol;
mod thermostat;
mod types;

pub use client::{ZwayClient, ZwayClientBuilder, DEFAULT_TIMEOUT};
pub use config::ThermostatConfig;
pub use error::{Error, Result};
pub use logger::MessageLogMode;
pub use poller::{Poller, SensorSender};
pub use thermostat::{Thermostat, TARGET_TEMPERATURE_STEP};
pub use types::*;
