//! Error types for transbot.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Telegram error: {0}")]
    Telegram(String),

    #[error("Transmission error: {0}")]
    Job(String),

    #[error("Device error: {0}")]
    Device(String),

    #[error("Container error: {0}")]
    Container(String),

    #[error("Scanner error: {0}")]
    Scanner(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<teloxide::RequestError> for Error {
    fn from(e: teloxide::RequestError) -> Self {
        Error::Telegram(e.to_string())
    }
}
