use serde_json::{json, Value};

use crate::{Error, Result};

pub const DEFAULT_HOST: &str = "http://127.0.0.1:8083";

pub const LOGIN_PATH: &str = "/ZAutomation/api/v1/login";
pub const SESSION_HEADER: &str = "ZWAYSession";

const DEVICES_PATH: &str = "/ZAutomation/api/v1/devices";

const CC_THERMOSTAT_MODE: u8 = 64;
const CC_THERMOSTAT_SETPOINT: u8 = 67;
const CC_BATTERY: u8 = 128;

/// Setpoint type 1 is "heating".
const SETPOINT_HEATING: u8 = 1;

pub fn setpoint_device_id(node: u32) -> String {
    format!("ZWayVDev_zway_{node}-0-{CC_THERMOSTAT_SETPOINT}-{SETPOINT_HEATING}")
}

pub fn battery_device_id(node: u32) -> String {
    format!("ZWayVDev_zway_{node}-0-{CC_BATTERY}")
}

pub fn mode_device_id(node: u32) -> String {
    format!("ZWayVDev_zway_{node}-0-{CC_THERMOSTAT_MODE}")
}

pub fn device_path(device_id: &str) -> String {
    format!("{DEVICES_PATH}/{device_id}")
}

pub fn exact_command_path(device_id: &str, level: f64) -> String {
    format!(
        "{DEVICES_PATH}/{device_id}/command/exact?level={}",
        format_level(level)
    )
}

fn instance_path(node: u32, cc: u8) -> String {
    format!("/ZWaveAPI/Run/devices[{node}].instances[0].commandClasses[{cc}]")
}

pub fn raw_mode_name_path(node: u32) -> String {
    format!(
        "{}.data[{SETPOINT_HEATING}].modeName",
        instance_path(node, CC_THERMOSTAT_SETPOINT)
    )
}

pub fn raw_setpoint_path(node: u32) -> String {
    format!(
        "{}.data[{SETPOINT_HEATING}].val.value",
        instance_path(node, CC_THERMOSTAT_SETPOINT)
    )
}

pub fn raw_set_setpoint_path(node: u32, level: f64) -> String {
    format!(
        "{}.data[{SETPOINT_HEATING}].setVal={}",
        instance_path(node, CC_THERMOSTAT_SETPOINT),
        format_level(level)
    )
}

pub fn raw_battery_path(node: u32) -> String {
    format!("{}.data.last.value", instance_path(node, CC_BATTERY))
}

pub fn raw_set_mode_path(node: u32, mode: u8) -> String {
    format!("{}.Set({mode})", instance_path(node, CC_THERMOSTAT_MODE))
}

/// Whole values go out without a fractional part: `17`, `17.5`.
pub fn format_level(level: f64) -> String {
    if level.fract() == 0.0 {
        format!("{level:.0}")
    } else {
        format!("{level}")
    }
}

pub fn login_payload(login: &str, password: &str) -> Value {
    json!({
        "form": true,
        "login": login,
        "password": password,
        "keepme": false,
        "default_ui": 1
    })
}

fn as_number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Pull the numeric level out of a virtual device response.
pub fn parse_level(body: &Value) -> Result<f64> {
    let metrics = body
        .pointer("/data/metrics")
        .ok_or_else(|| Error::Protocol("response has no data.metrics".to_string()))?;
    metrics
        .get("level")
        .and_then(as_number)
        .or_else(|| metrics.get("value").and_then(as_number))
        .ok_or_else(|| Error::Protocol(format!("no numeric level in metrics: {metrics}")))
}

pub fn parse_session(body: &Value) -> Result<String> {
    body.pointer("/data/sid")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| Error::Protocol("login response has no data.sid".to_string()))
}

/// Raw ZWaveAPI returns either a data holder (`{"value": ..}`) or a bare scalar.
pub fn parse_data_holder(body: &Value) -> Option<&Value> {
    match body {
        Value::Object(map) => map.get("value").filter(|v| !v.is_null()),
        Value::Null => None,
        other => Some(other),
    }
}

/// Numeric value of a raw ZWaveAPI response.
pub fn parse_raw_number(body: &Value) -> Result<f64> {
    parse_data_holder(body)
        .and_then(as_number)
        .ok_or_else(|| Error::Protocol(format!("no numeric value in response: {body}")))
}
