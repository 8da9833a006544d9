//! Device status API: trait, state mapping and the Solarman OpenAPI client.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use crate::config::SolarmanConfig;

/// Message Solarman returns when the bearer token has expired.
const INVALID_TOKEN_MSG: &str = "auth invalid token";

#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("authorization rejected")]
    Unauthorized,

    #[error("API error: {0}")]
    Api(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, DeviceError>;

/// Health of the monitored device as last reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    Online,
    Alerting,
    Offline,
    Unknown,
}

impl DeviceState {
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => DeviceState::Online,
            2 => DeviceState::Alerting,
            3 => DeviceState::Offline,
            _ => DeviceState::Unknown,
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            DeviceState::Online => "Inverter is online.",
            // No AC on the grid side.
            DeviceState::Alerting => "Inverter is alerting.",
            // No sun.
            DeviceState::Offline => "Inverter is offline.",
            DeviceState::Unknown => "Unknown inverter state.",
        }
    }
}

/// Remote API reporting a device's state.
#[async_trait]
pub trait DeviceApi: Send + Sync {
    /// Obtain a fresh access token.
    async fn authenticate(&self) -> Result<String>;

    /// Raw numeric state of the device. Fails with `Unauthorized` on an expired token.
    async fn query_state(&self, token: &str) -> Result<i64>;
}

#[derive(Deserialize)]
struct AuthResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    success: bool,
}

#[derive(Deserialize)]
struct DeviceDataResponse {
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    success: bool,
    #[serde(rename = "deviceState", default)]
    device_state: Option<i64>,
}

/// Solarman OpenAPI client for one inverter.
pub struct SolarmanClient {
    http: reqwest::Client,
    config: SolarmanConfig,
}

impl SolarmanClient {
    pub fn new(config: SolarmanConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }
}

fn auth_token(response: AuthResponse) -> Result<String> {
    if !response.success {
        return Err(DeviceError::Api(format!(
            "failed to get auth token: {}",
            response.msg.unwrap_or_default()
        )));
    }
    response
        .access_token
        .ok_or_else(|| DeviceError::Api("auth response carried no token".to_string()))
}

fn device_state(response: DeviceDataResponse) -> Result<i64> {
    if !response.success {
        let msg = response.msg.unwrap_or_default();
        if msg == INVALID_TOKEN_MSG {
            return Err(DeviceError::Unauthorized);
        }
        return Err(DeviceError::Api(format!("failed to get device data: {}", msg)));
    }
    response
        .device_state
        .ok_or_else(|| DeviceError::Api("device data carried no state".to_string()))
}

#[async_trait]
impl DeviceApi for SolarmanClient {
    async fn authenticate(&self) -> Result<String> {
        let response: AuthResponse = self
            .http
            .post(&self.config.auth_url)
            .query(&[("appId", self.config.app_id.as_str())])
            .json(&json!({
                "appSecret": self.config.app_secret,
                "email": self.config.email,
                "password": self.config.password,
            }))
            .send()
            .await?
            .json()
            .await?;
        auth_token(response)
    }

    async fn query_state(&self, token: &str) -> Result<i64> {
        let response = self
            .http
            .post(&self.config.api_url)
            .bearer_auth(token)
            .json(&json!({ "deviceSn": self.config.device_sn }))
            .send()
            .await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(DeviceError::Unauthorized);
        }
        device_state(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse<T: serde::de::DeserializeOwned>(body: &str) -> T {
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn test_state_mapping() {
        assert_eq!(DeviceState::from_code(1), DeviceState::Online);
        assert_eq!(DeviceState::from_code(2), DeviceState::Alerting);
        assert_eq!(DeviceState::from_code(3), DeviceState::Offline);
        assert_eq!(DeviceState::from_code(0), DeviceState::Unknown);
        assert_eq!(DeviceState::Alerting.describe(), "Inverter is alerting.");
    }

    #[test]
    fn test_auth_response() {
        let ok = parse(r#"{"access_token":"tok","token_type":"bearer","success":true,"msg":null}"#);
        assert_eq!(auth_token(ok).unwrap(), "tok");

        let denied = parse(r#"{"success":false,"msg":"wrong password"}"#);
        match auth_token(denied) {
            Err(DeviceError::Api(msg)) => assert!(msg.contains("wrong password")),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_device_response() {
        let ok = parse(r#"{"code":null,"success":true,"deviceSn":"SN1","deviceState":2,"dataList":[]}"#);
        assert_eq!(device_state(ok).unwrap(), 2);

        let expired = parse(r#"{"success":false,"msg":"auth invalid token"}"#);
        assert!(matches!(device_state(expired), Err(DeviceError::Unauthorized)));

        let other = parse(r#"{"success":false,"msg":"device not found"}"#);
        assert!(matches!(device_state(other), Err(DeviceError::Api(_))));
    }
}
