use std::sync::{Arc, Mutex};

use serde_json::{json, Value};
use wiremock::matchers::{header, method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};
use zway_thermostat::{
    Event, OperationMode, RestoredState, SensorState, Temperature, Thermostat, ThermostatConfig,
    ThermostatState, TemperatureUnit,
};

const SETPOINT_PATH: &str = "/ZAutomation/api/v1/devices/ZWayVDev_zway_4-0-67-1";
const BATTERY_PATH: &str = "/ZAutomation/api/v1/devices/ZWayVDev_zway_4-0-128";
const COMMAND_PATH: &str = "/ZAutomation/api/v1/devices/ZWayVDev_zway_4-0-67-1/command/exact";

fn level_body(level: Value) -> Value {
    json!({ "data": { "metrics": { "level": level } }, "code": 200 })
}

async fn mount_setpoint(server: &MockServer, level: f64) {
    Mock::given(method("GET"))
        .and(path(SETPOINT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(level_body(json!(level))))
        .mount(server)
        .await;
}

async fn mount_commands(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(COMMAND_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": null})))
        .mount(server)
        .await;
}

fn config_for(server: &MockServer) -> ThermostatConfig {
    let mut config = ThermostatConfig::new(4);
    config.name = "bedroom".to_string();
    config.host = server.uri();
    config
}

fn thermostat_for(server: &MockServer) -> Thermostat {
    Thermostat::from_config(&config_for(server)).unwrap()
}

#[tokio::test]
async fn added_reads_setpoint_from_gateway() {
    let server = MockServer::start().await;
    mount_setpoint(&server, 19.0).await;

    let mut t = thermostat_for(&server);
    t.async_added(None).await.unwrap();
    assert_eq!(t.target_temperature(), Some(Temperature::from_celsius(19.0)));
    assert_eq!(t.state(), OperationMode::Auto);
}

#[tokio::test]
async fn added_restores_previous_mode() {
    let server = MockServer::start().await;
    mount_setpoint(&server, 19.0).await;

    let mut t = thermostat_for(&server);
    let restored = RestoredState {
        operation_mode: Some(OperationMode::Heat),
        target_temperature: None,
    };
    t.async_added(Some(restored)).await.unwrap();
    assert_eq!(t.state(), OperationMode::Heat);
}

#[tokio::test]
async fn initial_mode_beats_restored_mode() {
    let server = MockServer::start().await;
    mount_setpoint(&server, 19.0).await;

    let mut config = config_for(&server);
    config.initial_operation_mode = Some(OperationMode::Off);
    let mut t = Thermostat::from_config(&config).unwrap();
    let restored = RestoredState {
        operation_mode: Some(OperationMode::Heat),
        target_temperature: None,
    };
    t.async_added(Some(restored)).await.unwrap();
    assert_eq!(t.state(), OperationMode::Off);
}

#[tokio::test]
async fn added_falls_back_when_gateway_unreachable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SETPOINT_PATH))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let mut config = config_for(&server);
    config.target_temp = Some(22.0);
    let mut t = Thermostat::from_config(&config).unwrap();
    t.async_added(None).await.unwrap();
    assert_eq!(t.target_temperature(), Some(Temperature::from_celsius(22.0)));

    let mut t = thermostat_for(&server);
    t.async_added(Some(RestoredState {
        operation_mode: None,
        target_temperature: Some(Temperature::from_celsius(17.5)),
    }))
    .await
    .unwrap();
    assert_eq!(t.target_temperature(), Some(Temperature::from_celsius(17.5)));

    let mut t = thermostat_for(&server);
    t.async_added(None).await.unwrap();
    assert_eq!(t.target_temperature(), Some(Temperature::from_celsius(21.0)));
}

#[tokio::test]
async fn added_falls_back_when_login_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ZAutomation/api/v1/login"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(SETPOINT_PATH))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let mut config = config_for(&server);
    config.login = Some("admin".to_string());
    config.password = Some("admin".to_string());
    config.target_temp = Some(22.0);
    let mut t = Thermostat::from_config(&config).unwrap();
    t.async_added(Some(RestoredState {
        operation_mode: Some(OperationMode::Heat),
        target_temperature: None,
    }))
    .await
    .unwrap();

    assert!(!t.client().has_session());
    assert_eq!(t.target_temperature(), Some(Temperature::from_celsius(22.0)));
    assert_eq!(t.state(), OperationMode::Heat);
}

#[tokio::test]
async fn added_logs_in_and_polls_with_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ZAutomation/api/v1/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "sid": "sid-42" }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(SETPOINT_PATH))
        .and(header("ZWAYSession", "sid-42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(level_body(json!(20))))
        .expect(2)
        .mount(&server)
        .await;

    let mut config = config_for(&server);
    config.login = Some("admin".to_string());
    config.password = Some("secret".to_string());
    let mut t = Thermostat::from_config(&config).unwrap();
    t.async_added(None).await.unwrap();
    assert!(t.client().has_session());
    assert_eq!(t.target_temperature(), Some(Temperature::from_celsius(20.0)));

    t.update().await.unwrap();
}

#[tokio::test]
async fn update_mirrors_setpoint_battery_and_mode_name() {
    let server = MockServer::start().await;
    mount_setpoint(&server, 20.5).await;
    Mock::given(method("GET"))
        .and(path(BATTERY_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(level_body(json!(90))))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"modeName$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": "Heating 1"})))
        .mount(&server)
        .await;

    let events: Arc<Mutex<Vec<Event>>> = Arc::new(Mutex::new(vec![]));
    let events_clone = events.clone();
    let mut t = thermostat_for(&server).on_event(move |e| events_clone.lock().unwrap().push(e.clone()));

    t.update().await.unwrap();
    assert_eq!(t.target_temperature(), Some(Temperature::from_celsius(20.5)));
    assert_eq!(t.battery_level(), Some(90));
    assert_eq!(t.device_mode(), Some("Heating 1"));
    assert_eq!(events.lock().unwrap().len(), 3);

    t.update().await.unwrap();
    assert_eq!(events.lock().unwrap().len(), 3, "unchanged poll should emit nothing");
}

#[tokio::test]
async fn update_tolerates_missing_battery_and_mode() {
    let server = MockServer::start().await;
    mount_setpoint(&server, 21.0).await;

    let mut t = thermostat_for(&server);
    t.update().await.unwrap();
    assert_eq!(t.target_temperature(), Some(Temperature::from_celsius(21.0)));
    assert_eq!(t.battery_level(), None);
    assert_eq!(t.device_mode(), None);
}

#[tokio::test]
async fn update_fails_when_setpoint_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SETPOINT_PATH))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let mut t = thermostat_for(&server);
    assert!(t.update().await.is_err());
    assert_eq!(t.target_temperature(), None);
}

#[tokio::test]
async fn set_temperature_sends_new_value() {
    let server = MockServer::start().await;
    mount_setpoint(&server, 21.0).await;
    Mock::given(method("GET"))
        .and(path(COMMAND_PATH))
        .and(query_param("level", "18.5"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let states: Arc<Mutex<Vec<ThermostatState>>> = Arc::new(Mutex::new(vec![]));
    let states_clone = states.clone();
    let mut t = thermostat_for(&server).on_state(move |s| states_clone.lock().unwrap().push(s.clone()));
    t.async_added(None).await.unwrap();

    t.set_temperature(Some(18.5)).await.unwrap();
    assert_eq!(t.target_temperature(), Some(Temperature::from_celsius(18.5)));

    let states = states.lock().unwrap();
    let last = states.last().unwrap();
    assert_eq!(last.target_temperature, Some(Temperature::from_celsius(18.5)));
    assert_eq!(last.name, "bedroom");
}

#[tokio::test]
async fn set_temperature_out_of_range_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(COMMAND_PATH))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut config = config_for(&server);
    config.max_temp = Some(26.0);
    let mut t = Thermostat::from_config(&config).unwrap();
    let err = t.set_temperature(Some(26.5)).await.unwrap_err();
    assert!(matches!(
        err,
        zway_thermostat::Error::InvalidTemperature { max, .. } if max == 26.0
    ));
}

#[tokio::test]
async fn set_temperature_gateway_error_keeps_target() {
    let server = MockServer::start().await;
    mount_setpoint(&server, 21.0).await;
    Mock::given(method("GET"))
        .and(path(COMMAND_PATH))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let mut t = thermostat_for(&server);
    t.async_added(None).await.unwrap();
    assert!(t.set_temperature(Some(16.0)).await.is_err());
    assert_eq!(t.target_temperature(), Some(Temperature::from_celsius(21.0)));
}

#[tokio::test]
async fn mode_command_forwarded_when_enabled() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ZAutomation/api/v1/devices/ZWayVDev_zway_4-0-64/command/exact"))
        .and(query_param("level", "0"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = config_for(&server);
    config.mode_command = true;
    let mut t = Thermostat::from_config(&config).unwrap();
    t.set_operation_mode("off").await.unwrap();
    assert_eq!(t.state(), OperationMode::Off);
}

#[tokio::test]
async fn away_drops_to_away_temp_and_restores() {
    let server = MockServer::start().await;
    mount_setpoint(&server, 21.0).await;
    Mock::given(method("GET"))
        .and(path(COMMAND_PATH))
        .and(query_param("level", "15"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(COMMAND_PATH))
        .and(query_param("level", "21"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let mut t = thermostat_for(&server);
    t.async_added(None).await.unwrap();

    t.set_away(true).await.unwrap();
    assert!(t.is_away());
    assert_eq!(t.target_temperature(), Some(Temperature::from_celsius(15.0)));

    t.set_away(true).await.unwrap();

    t.set_away(false).await.unwrap();
    assert!(!t.is_away());
    assert_eq!(t.target_temperature(), Some(Temperature::from_celsius(21.0)));
}

#[tokio::test]
async fn nan_temperature_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(COMMAND_PATH))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut t = thermostat_for(&server);
    let err = t.set_temperature(Some(f64::NAN)).await.unwrap_err();
    assert!(matches!(err, zway_thermostat::Error::InvalidTemperature { .. }));
    assert_eq!(t.target_temperature(), None);
}

#[tokio::test]
async fn away_on_fahrenheit_host_uses_celsius_default() {
    let server = MockServer::start().await;
    mount_setpoint(&server, 21.0).await;
    Mock::given(method("GET"))
        .and(path(COMMAND_PATH))
        .and(query_param("level", "15"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = config_for(&server);
    config.unit = TemperatureUnit::Fahrenheit;
    let mut t = Thermostat::from_config(&config).unwrap();
    t.async_added(None).await.unwrap();

    t.set_away(true).await.unwrap();
    assert_eq!(t.target_temperature(), Some(Temperature::from_celsius(15.0)));
}

#[tokio::test]
async fn away_outside_range_rejected() {
    let server = MockServer::start().await;
    mount_setpoint(&server, 21.0).await;
    Mock::given(method("GET"))
        .and(path(COMMAND_PATH))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut config = config_for(&server);
    config.min_temp = Some(16.0);
    let mut t = Thermostat::from_config(&config).unwrap();
    t.async_added(None).await.unwrap();

    let err = t.set_away(true).await.unwrap_err();
    assert!(matches!(err, zway_thermostat::Error::InvalidTemperature { .. }));
    assert!(!t.is_away());
    assert_eq!(t.target_temperature(), Some(Temperature::from_celsius(21.0)));
}

#[tokio::test]
async fn sensor_and_gateway_state_reconciled() {
    let server = MockServer::start().await;
    mount_setpoint(&server, 21.0).await;
    mount_commands(&server).await;

    let mut t = thermostat_for(&server);
    t.async_added(None).await.unwrap();
    t.sensor_changed(Some(SensorState::new("19.8", Some("\u{00b0}C"))));
    t.update().await.unwrap();

    let snapshot = t.snapshot();
    assert_eq!(snapshot.current_temperature, Some(Temperature::from_celsius(19.8)));
    assert_eq!(snapshot.target_temperature, Some(Temperature::from_celsius(21.0)));
}
