use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, trace};

use crate::thermostat::Thermostat;
use crate::types::SensorState;

const SENSOR_CHANNEL_CAPACITY: usize = 16;

/// Host side of the sensor notification channel. `None` reports a removed sensor.
pub type SensorSender = mpsc::Sender<Option<SensorState>>;

/// Drives a shared [`Thermostat`]: polls the gateway on a fixed interval and
/// applies sensor notifications as they arrive.
pub struct Poller {
    thermostat: Arc<Mutex<Thermostat>>,
    interval: Duration,
    sensor_rx: mpsc::Receiver<Option<SensorState>>,
}

impl Poller {
    pub fn new(thermostat: Arc<Mutex<Thermostat>>, interval: Duration) -> (Self, SensorSender) {
        let (tx, rx) = mpsc::channel(SENSOR_CHANNEL_CAPACITY);
        let poller = Self {
            thermostat,
            interval,
            sensor_rx: rx,
        };
        (poller, tx)
    }

    /// Runs until every [`SensorSender`] is dropped. Poll errors are logged
    /// and the next tick tries again.
    pub async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let mut thermostat = self.thermostat.lock().await;
                    trace!(name = %thermostat.name(), "poll");
                    if let Err(e) = thermostat.update().await {
                        error!(name = %thermostat.name(), "update failed: {e}");
                    }
                }
                msg = self.sensor_rx.recv() => match msg {
                    Some(state) => {
                        self.thermostat.lock().await.sensor_changed(state);
                    }
                    None => {
                        debug!("sensor channel closed, stopping poller");
                        break;
                    }
                },
            }
        }
    }
}
