use std::time::Duration;

use serde_json::Value;
use tracing::{debug, trace};

use crate::logger::{MessageLogMode, MessageLogger};
use crate::protocol::{
    battery_device_id, device_path, exact_command_path, login_payload, mode_device_id,
    parse_data_holder, parse_level, parse_raw_number, parse_session, raw_battery_path,
    raw_mode_name_path, raw_set_mode_path, raw_set_setpoint_path, raw_setpoint_path,
    setpoint_device_id, DEFAULT_HOST, LOGIN_PATH, SESSION_HEADER,
};
use crate::types::*;
use crate::{Error, Result};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

pub struct ZwayClientBuilder {
    host: String,
    node: u32,
    credentials: Option<(String, String)>,
    timeout: Duration,
    api: GatewayApi,
    log_mode: Option<MessageLogMode>,
    log_path: Option<String>,
}

impl ZwayClientBuilder {
    pub fn new(node: u32) -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            node,
            credentials: None,
            timeout: DEFAULT_TIMEOUT,
            api: GatewayApi::default(),
            log_mode: None,
            log_path: None,
        }
    }

    /// Gateway base URL. A bare `host:port` is treated as plain HTTP.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn credentials(mut self, login: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some((login.into(), password.into()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn api(mut self, api: GatewayApi) -> Self {
        self.api = api;
        self
    }

    pub fn message_log(mut self, mode: MessageLogMode, path: impl Into<String>) -> Self {
        self.log_mode = Some(mode);
        self.log_path = Some(path.into());
        self
    }

    pub fn build(self) -> Result<ZwayClient> {
        let http = reqwest::Client::builder().timeout(self.timeout).build()?;

        let logger = match (self.log_mode, self.log_path) {
            (Some(mode), Some(path)) => Some(MessageLogger::new(mode, &path)?),
            _ => None,
        };

        let host = self.host.trim_end_matches('/');
        let base_url = if host.contains("://") {
            host.to_string()
        } else {
            format!("http://{host}")
        };

        Ok(ZwayClient {
            http,
            base_url,
            node: self.node,
            credentials: self.credentials,
            session: None,
            api: self.api,
            logger,
        })
    }
}

/// HTTP client for one Z-Wave node behind a Z-Way gateway.
pub struct ZwayClient {
    http: reqwest::Client,
    base_url: String,
    node: u32,
    credentials: Option<(String, String)>,
    session: Option<String>,
    api: GatewayApi,
    logger: Option<MessageLogger>,
}

impl ZwayClient {
    pub fn builder(node: u32) -> ZwayClientBuilder {
        ZwayClientBuilder::new(node)
    }

    pub fn node(&self) -> u32 {
        self.node
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn api(&self) -> GatewayApi {
        self.api
    }

    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    /// Open a ZAutomation session. No-op without credentials.
    pub async fn login(&mut self) -> Result<()> {
        let Some((login, password)) = self.credentials.as_ref() else {
            return Ok(());
        };

        let url = format!("{}{LOGIN_PATH}", self.base_url);
        let payload = login_payload(login, password);
        debug!(url = %url, login = %login, "logging in to Z-Way");

        if let Some(ref mut logger) = self.logger {
            logger.log_request("POST", LOGIN_PATH, None);
        }

        let resp = self
            .http
            .post(&url)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;
        let body: Value = resp.json().await?;
        self.session = Some(parse_session(&body)?);
        Ok(())
    }

    /// Current heating setpoint as reported by the device.
    pub async fn fetch_setpoint(&mut self) -> Result<Temperature> {
        let level = match self.api {
            GatewayApi::Automation => {
                let body = self.get_json(&device_path(&setpoint_device_id(self.node))).await?;
                parse_level(&body)?
            }
            GatewayApi::Raw => {
                let body = self.get_json(&raw_setpoint_path(self.node)).await?;
                parse_raw_number(&body)?
            }
        };
        Ok(Temperature::from_celsius(level))
    }

    pub async fn fetch_battery(&mut self) -> Result<u8> {
        let level = match self.api {
            GatewayApi::Automation => {
                let body = self.get_json(&device_path(&battery_device_id(self.node))).await?;
                parse_level(&body)?
            }
            GatewayApi::Raw => {
                let body = self.get_json(&raw_battery_path(self.node)).await?;
                parse_raw_number(&body)?
            }
        };
        Ok(level.clamp(0.0, 100.0).round() as u8)
    }

    /// Setpoint mode name, e.g. `Heating 1`. Only exposed by the raw API.
    pub async fn fetch_mode_name(&mut self) -> Result<String> {
        let body = self.get_json(&raw_mode_name_path(self.node)).await?;
        match parse_data_holder(&body) {
            Some(Value::String(s)) => Ok(s.clone()),
            Some(other) => Ok(other.to_string()),
            None => Err(Error::Protocol(format!("no modeName in response: {body}"))),
        }
    }

    /// Send a new setpoint. Returns the value actually sent after rounding.
    pub async fn set_setpoint(&mut self, temp: Temperature) -> Result<Temperature> {
        let level = temp.to_zway_celsius();
        let path = match self.api {
            GatewayApi::Automation => exact_command_path(&setpoint_device_id(self.node), level),
            GatewayApi::Raw => raw_set_setpoint_path(self.node, level),
        };
        self.send_command("set_setpoint", &path, Value::from(level)).await?;
        Ok(Temperature::from_celsius(level))
    }

    pub async fn set_operation_mode(&mut self, mode: OperationMode) -> Result<()> {
        let value = mode.zwave_value();
        let path = match self.api {
            GatewayApi::Automation => exact_command_path(&mode_device_id(self.node), value as f64),
            GatewayApi::Raw => raw_set_mode_path(self.node, value),
        };
        self.send_command("set_operation_mode", &path, Value::from(mode.as_host_str()))
            .await
    }

    // -- Helpers --

    fn request(&self, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{path}", self.base_url);
        let req = self.http.get(url);
        match self.session {
            Some(ref sid) => req.header(SESSION_HEADER, sid),
            None => req,
        }
    }

    async fn get_json(&mut self, path: &str) -> Result<Value> {
        trace!(path = %path, "GET");
        if let Some(ref mut logger) = self.logger {
            logger.log_request("GET", path, None);
        }

        let resp = self.request(path).send().await?.error_for_status()?;
        let status = resp.status().as_u16();
        let text = resp.text().await?;
        let body: Value = serde_json::from_str(&text)
            .map_err(|e| Error::Protocol(format!("invalid JSON from {path}: {e}")))?;

        if let Some(ref mut logger) = self.logger {
            logger.log_response(path, status, &body);
        }
        Ok(body)
    }

    async fn send_command(&mut self, action: &str, path: &str, value: Value) -> Result<()> {
        debug!(node = self.node, action, path = %path, "sending command");
        if let Some(ref mut logger) = self.logger {
            logger.log_command(action, self.node, &value);
        }

        self.request(path).send().await?.error_for_status()?;
        Ok(())
    }
}
