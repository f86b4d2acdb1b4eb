use tracing::{debug, error, warn};

use crate::client::ZwayClient;
use crate::config::{
    ThermostatConfig, DEFAULT_AWAY_TEMP, DEFAULT_MAX_TEMP, DEFAULT_MIN_TEMP, DEFAULT_TARGET_TEMP,
};
use crate::types::*;
use crate::{Error, Result};

pub const TARGET_TEMPERATURE_STEP: f64 = 0.5;

type EventCallback = Box<dyn Fn(&Event) + Send + Sync>;
type StateCallback = Box<dyn Fn(&ThermostatState) + Send + Sync>;

/// Climate entity backed by one Z-Way thermostat node.
///
/// Target temperature, battery and mode name come from the gateway. The
/// current temperature mirrors an external sensor the host reports through
/// [`Thermostat::sensor_changed`].
pub struct Thermostat {
    client: ZwayClient,
    name: String,
    unit: TemperatureUnit,
    min_temp: Option<f64>,
    max_temp: Option<f64>,
    configured_target: Option<f64>,
    away_temp: Option<f64>,
    initial_operation_mode: Option<OperationMode>,
    mode_command: bool,
    temp_sensor: Option<String>,

    current_temp: Option<Temperature>,
    target_temp: Option<Temperature>,
    operation: OperationMode,
    battery: Option<u8>,
    device_mode: Option<String>,
    away: bool,
    saved_target: Option<Temperature>,

    event_callbacks: Vec<EventCallback>,
    state_callbacks: Vec<StateCallback>,
}

impl Thermostat {
    pub fn new(config: &ThermostatConfig, client: ZwayClient) -> Self {
        Self {
            client,
            name: config.name.clone(),
            unit: config.unit,
            min_temp: config.min_temp,
            max_temp: config.max_temp,
            configured_target: config.target_temp,
            away_temp: config.away_temp,
            initial_operation_mode: config.initial_operation_mode,
            mode_command: config.mode_command,
            temp_sensor: config.temp_sensor.clone(),
            current_temp: None,
            target_temp: None,
            operation: config.initial_operation_mode.unwrap_or_default(),
            battery: None,
            device_mode: None,
            away: false,
            saved_target: None,
            event_callbacks: Vec::new(),
            state_callbacks: Vec::new(),
        }
    }

    /// Validate the config and build the gateway client it describes.
    pub fn from_config(config: &ThermostatConfig) -> Result<Self> {
        config.validate()?;
        let client = config.client_builder().build()?;
        Ok(Self::new(config, client))
    }

    pub fn on_event(mut self, f: impl Fn(&Event) + Send + Sync + 'static) -> Self {
        self.event_callbacks.push(Box::new(f));
        self
    }

    /// Called with a fresh snapshot whenever the entity should be written back to the host.
    pub fn on_state(mut self, f: impl Fn(&ThermostatState) + Send + Sync + 'static) -> Self {
        self.state_callbacks.push(Box::new(f));
        self
    }

    // -- Getters --

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn temp_sensor(&self) -> Option<&str> {
        self.temp_sensor.as_deref()
    }

    pub fn temperature_unit(&self) -> TemperatureUnit {
        self.unit
    }

    pub fn current_temperature(&self) -> Option<Temperature> {
        self.current_temp
    }

    pub fn target_temperature(&self) -> Option<Temperature> {
        self.target_temp
    }

    pub fn target_temperature_step(&self) -> f64 {
        TARGET_TEMPERATURE_STEP
    }

    pub fn operation_mode(&self) -> OperationMode {
        self.operation
    }

    /// Entity state as the host shows it.
    pub fn state(&self) -> OperationMode {
        self.operation
    }

    pub fn operation_list(&self) -> &'static [OperationMode] {
        &OperationMode::ALL
    }

    pub fn battery_level(&self) -> Option<u8> {
        self.battery
    }

    pub fn device_mode(&self) -> Option<&str> {
        self.device_mode.as_deref()
    }

    pub fn is_away(&self) -> bool {
        self.away
    }

    pub fn min_temp(&self) -> Temperature {
        match self.min_temp {
            Some(t) => Temperature::in_unit(t, self.unit),
            None => Temperature::from_celsius(DEFAULT_MIN_TEMP),
        }
    }

    /// Configured away temperature is in the host unit; the default is Celsius.
    pub fn away_temp(&self) -> Temperature {
        match self.away_temp {
            Some(t) => Temperature::in_unit(t, self.unit),
            None => Temperature::from_celsius(DEFAULT_AWAY_TEMP),
        }
    }

    pub fn max_temp(&self) -> Temperature {
        match self.max_temp {
            Some(t) => Temperature::in_unit(t, self.unit),
            None => Temperature::from_celsius(DEFAULT_MAX_TEMP),
        }
    }

    pub fn client(&self) -> &ZwayClient {
        &self.client
    }

    pub fn snapshot(&self) -> ThermostatState {
        ThermostatState {
            name: self.name.clone(),
            current_temperature: self.current_temp,
            target_temperature: self.target_temp,
            operation_mode: self.operation,
            battery_level: self.battery,
            device_mode: self.device_mode.clone(),
            away: self.away,
            min_temp: self.min_temp(),
            max_temp: self.max_temp(),
        }
    }

    // -- Lifecycle --

    /// Run once when the host adds the entity: open a session, read the
    /// device setpoint and restore the previous operation mode.
    pub async fn async_added(&mut self, restored: Option<RestoredState>) -> Result<()> {
        if let Err(e) = self.client.login().await {
            error!(name = %self.name, "unable to open gateway session: {e}");
        }

        let restored = restored.unwrap_or_default();
        let mut events = Vec::new();

        let target = match self.client.fetch_setpoint().await {
            Ok(t) => t,
            Err(e) => {
                error!(name = %self.name, "unable to read initial setpoint: {e}");
                restored
                    .target_temperature
                    .or_else(|| self.configured_target.map(|t| Temperature::in_unit(t, self.unit)))
                    .unwrap_or(Temperature::from_celsius(DEFAULT_TARGET_TEMP))
            }
        };
        if self.target_temp != Some(target) {
            self.target_temp = Some(target);
            events.push(Event::TargetTemperatureChanged { temp: target });
        }

        let mode = match (self.initial_operation_mode, restored.operation_mode) {
            (Some(initial), _) => initial,
            (None, Some(previous)) => previous,
            (None, None) => self.operation,
        };
        if mode != self.operation {
            self.operation = mode;
            events.push(Event::OperationModeChanged { mode });
        }

        self.notify(&events);
        Ok(())
    }

    /// Poll the gateway. The setpoint is required; battery and mode name are best effort.
    pub async fn update(&mut self) -> Result<()> {
        let mut events = Vec::new();

        let target = self.client.fetch_setpoint().await?;
        if self.target_temp != Some(target) {
            self.target_temp = Some(target);
            events.push(Event::TargetTemperatureChanged { temp: target });
        }

        match self.client.fetch_battery().await {
            Ok(level) if self.battery != Some(level) => {
                self.battery = Some(level);
                events.push(Event::BatteryChanged { level });
            }
            Ok(_) => {}
            Err(e) => warn!(name = %self.name, "battery read failed: {e}"),
        }

        match self.client.fetch_mode_name().await {
            Ok(mode_name) if self.device_mode.as_deref() != Some(mode_name.as_str()) => {
                self.device_mode = Some(mode_name.clone());
                events.push(Event::DeviceModeChanged { name: mode_name });
            }
            Ok(_) => {}
            Err(e) => warn!(name = %self.name, "mode name read failed: {e}"),
        }

        if !events.is_empty() {
            debug!(name = %self.name, count = events.len(), "state changed on poll");
        }
        self.notify(&events);
        Ok(())
    }

    // -- Commands --

    /// Set a new target temperature, given in the host's unit. `None` is ignored.
    pub async fn set_temperature(&mut self, temperature: Option<f64>) -> Result<()> {
        let Some(value) = temperature else {
            return Ok(());
        };
        let requested = self.checked_setpoint(value)?;
        let sent = self.client.set_setpoint(requested).await?;
        debug!(name = %self.name, temp = %sent, "target temperature set");

        let mut events = Vec::new();
        if self.target_temp != Some(sent) {
            self.target_temp = Some(sent);
            events.push(Event::TargetTemperatureChanged { temp: sent });
        }
        self.notify(&events);
        Ok(())
    }

    pub async fn set_operation_mode(&mut self, operation_mode: &str) -> Result<()> {
        let Some(mode) = OperationMode::from_host_str(operation_mode) else {
            error!(name = %self.name, "unrecognized operation mode: {operation_mode}");
            return Err(Error::InvalidMode(operation_mode.to_string()));
        };

        if self.mode_command {
            self.client.set_operation_mode(mode).await?;
        }

        let mut events = Vec::new();
        if self.operation != mode {
            self.operation = mode;
            events.push(Event::OperationModeChanged { mode });
        }
        self.notify(&events);
        Ok(())
    }

    /// Away drops the setpoint to the configured away temperature and
    /// restores the previous target when turned off again.
    pub async fn set_away(&mut self, away: bool) -> Result<()> {
        if away == self.away {
            return Ok(());
        }

        let mut events = Vec::new();
        let next = if away {
            let away_temp = self.away_temp();
            let checked = self.checked_setpoint(away_temp.value_in(self.unit))?;
            self.saved_target = self.target_temp;
            Some(checked)
        } else {
            self.saved_target.take()
        };

        if let Some(temp) = next {
            let sent = self.client.set_setpoint(temp).await?;
            if self.target_temp != Some(sent) {
                self.target_temp = Some(sent);
                events.push(Event::TargetTemperatureChanged { temp: sent });
            }
        }

        self.away = away;
        events.push(Event::AwayModeChanged { away });
        self.notify(&events);
        Ok(())
    }

    /// Convert a host-unit value to a setpoint, rounded to gateway precision
    /// and inside `min_temp..=max_temp`.
    fn checked_setpoint(&self, value: f64) -> Result<Temperature> {
        let (min, max) = (self.min_temp(), self.max_temp());
        let invalid = || Error::InvalidTemperature {
            value,
            min: min.value_in(self.unit),
            max: max.value_in(self.unit),
        };
        if !value.is_finite() {
            return Err(invalid());
        }
        let rounded = Temperature::from_celsius(Temperature::in_unit(value, self.unit).to_zway_celsius());
        if rounded.celsius() < min.celsius() - 1e-9 || rounded.celsius() > max.celsius() + 1e-9 {
            return Err(invalid());
        }
        Ok(rounded)
    }

    // -- Sensor --

    /// Handle a state change of the external sensor. `None` means the sensor
    /// entity went away and is ignored.
    pub fn sensor_changed(&mut self, new_state: Option<SensorState>) {
        let Some(state) = new_state else {
            return;
        };

        let mut events = Vec::new();
        if let Some(temp) = self.reconcile_sensor(&state)
            && self.current_temp != Some(temp)
        {
            self.current_temp = Some(temp);
            events.push(Event::CurrentTemperatureChanged { temp });
        }
        self.notify(&events);
    }

    fn reconcile_sensor(&self, state: &SensorState) -> Option<Temperature> {
        let value: f64 = match state.state.trim().parse() {
            Ok(v) => v,
            Err(e) => {
                error!(name = %self.name, state = %state.state, "unable to update from sensor: {e}");
                return None;
            }
        };
        if !value.is_finite() {
            error!(name = %self.name, value, "unable to update from sensor: non-finite value");
            return None;
        }

        let unit = match state.unit.as_deref() {
            None => self.unit,
            Some(u) => match TemperatureUnit::from_unit_str(u) {
                Some(unit) => unit,
                None => {
                    error!(name = %self.name, unit = %u, "unable to update from sensor: unknown unit");
                    return None;
                }
            },
        };
        Some(Temperature::in_unit(value, unit))
    }

    fn notify(&self, events: &[Event]) {
        for event in events {
            for cb in &self.event_callbacks {
                cb(event);
            }
        }
        if self.state_callbacks.is_empty() {
            return;
        }
        let snapshot = self.snapshot();
        for cb in &self.state_callbacks {
            cb(&snapshot);
        }
    }
}
