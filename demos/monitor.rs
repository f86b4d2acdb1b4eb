use std::env;
use std::sync::Arc;

use tokio::sync::Mutex;
use zway_thermostat::{Poller, SensorState, Thermostat, ThermostatConfig};

#[tokio::main]
async fn main() -> zway_thermostat::Result<()> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().collect();
    let host = args.get(1).expect("usage: monitor <host:port> <node> [sensor-celsius]");
    let node: u32 = args
        .get(2)
        .and_then(|n| n.parse().ok())
        .expect("usage: monitor <host:port> <node> [sensor-celsius]");
    let sensor = args.get(3).cloned();

    let mut config = ThermostatConfig::new(node);
    config.host = host.clone();
    config.login = env::var("ZWAY_LOGIN").ok();
    config.password = env::var("ZWAY_PASSWORD").ok();

    let mut thermostat = Thermostat::from_config(&config)?
        .on_event(|event| {
            println!("{event:?}");
        })
        .on_state(|state| {
            println!(
                "[{}] {} | current: {} | target: {} | battery: {}",
                state.name,
                state.operation_mode,
                state
                    .current_temperature
                    .map(|t| t.to_string())
                    .unwrap_or_else(|| "-".to_string()),
                state
                    .target_temperature
                    .map(|t| t.to_string())
                    .unwrap_or_else(|| "-".to_string()),
                state
                    .battery_level
                    .map(|b| format!("{b}%"))
                    .unwrap_or_else(|| "-".to_string()),
            );
        });

    println!("Connecting to {host} node {node}...");
    thermostat.async_added(None).await?;

    let thermostat = Arc::new(Mutex::new(thermostat));
    let (poller, sensor_tx) = Poller::new(thermostat, config.scan_interval());

    if let Some(value) = sensor {
        let _ = sensor_tx.send(Some(SensorState::new(value, Some("\u{00b0}C")))).await;
    }

    println!("Polling every {}s...", config.scan_interval);
    tokio::select! {
        _ = poller.run() => {}
        _ = tokio::signal::ctrl_c() => println!("Stopping."),
    }
    drop(sensor_tx);
    Ok(())
}
