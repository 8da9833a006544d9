//! Configuration loading for transbot.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::retry::RetryPolicy;

/// Get the transbot home directory (~/.transbot).
pub fn get_home_dir() -> Result<PathBuf> {
    let home = directories::UserDirs::new()
        .ok_or_else(|| Error::Config("Could not determine home directory".to_string()))?;

    Ok(home.home_dir().join(".transbot"))
}

/// Get the default settings file path.
pub fn get_settings_path() -> Result<PathBuf> {
    Ok(get_home_dir()?.join("settings.json"))
}

/// Load settings from `path`, or from ~/.transbot/settings.json when `None`.
pub fn load_settings(path: Option<&Path>) -> Result<Settings> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => get_settings_path()?,
    };

    if !path.exists() {
        return Err(Error::Config(format!(
            "Settings file not found at {}. Run 'transbot setup' first.",
            path.display()
        )));
    }

    let content = std::fs::read_to_string(&path)?;
    let settings: Settings = serde_json::from_str(&content)?;
    validate_settings(&settings)?;

    tracing::debug!("Loaded settings from {}", path.display());
    Ok(settings)
}

/// Write a template settings file. Refuses to overwrite an existing one.
pub fn write_template(path: &Path) -> Result<()> {
    if path.exists() {
        return Err(Error::Config(format!(
            "Settings file already exists at {}",
            path.display()
        )));
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut settings = Settings::default();
    settings.telegram.bot_token = Some("<bot token from @BotFather>".to_string());
    settings.transmission.url = Some("http://localhost:9091/transmission/rpc".to_string());
    std::fs::write(path, serde_json::to_string_pretty(&settings)?)?;
    Ok(())
}

fn validate_settings(settings: &Settings) -> Result<()> {
    if settings.transmission.poll_interval_secs == 0 {
        return Err(Error::Config(
            "transmission.poll_interval_secs must be positive".to_string(),
        ));
    }
    if let Some(solarman) = &settings.solarman {
        if settings.telegram.alert_chat_id.is_none() {
            return Err(Error::Config(
                "telegram.alert_chat_id is required when solarman is configured".to_string(),
            ));
        }
        if solarman.poll_interval_secs == 0 {
            return Err(Error::Config(
                "solarman.poll_interval_secs must be positive".to_string(),
            ));
        }
    }
    Ok(())
}

/// Telegram configuration.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct TelegramConfig {
    pub bot_token: Option<String>,
    /// Chat that receives device alerts.
    pub alert_chat_id: Option<i64>,
}

/// Transmission daemon configuration.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct TransmissionConfig {
    /// Full RPC endpoint, e.g. http://localhost:9091/transmission/rpc
    pub url: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    /// Where uploaded .torrent files are stored before submission.
    pub torrent_dir: Option<PathBuf>,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    #[serde(default)]
    pub give_up_after: Option<u32>,
}

impl Default for TransmissionConfig {
    fn default() -> Self {
        Self {
            url: None,
            user: None,
            password: None,
            torrent_dir: None,
            poll_interval_secs: default_poll_interval(),
            give_up_after: None,
        }
    }
}

impl TransmissionConfig {
    pub fn watch_policy(&self) -> RetryPolicy {
        RetryPolicy::new(Duration::from_secs(self.poll_interval_secs))
            .with_give_up_after(self.give_up_after)
    }

    pub fn torrent_dir(&self) -> Result<PathBuf> {
        match &self.torrent_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(get_home_dir()?.join("torrents")),
        }
    }
}

/// Solarman OpenAPI configuration. Absent means no device polling.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SolarmanConfig {
    pub app_id: String,
    pub app_secret: String,
    pub email: String,
    pub password: String,
    #[serde(default = "default_solarman_auth_url")]
    pub auth_url: String,
    #[serde(default = "default_solarman_api_url")]
    pub api_url: String,
    pub device_sn: String,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    #[serde(default)]
    pub give_up_after: Option<u32>,
}

impl SolarmanConfig {
    pub fn poll_policy(&self) -> RetryPolicy {
        RetryPolicy::new(Duration::from_secs(self.poll_interval_secs))
            .with_give_up_after(self.give_up_after)
    }
}

fn default_solarman_auth_url() -> String {
    "https://globalapi.solarmanpv.com/account/v1.0/token".to_string()
}

fn default_solarman_api_url() -> String {
    "https://globalapi.solarmanpv.com/device/v1.0/currentData".to_string()
}

fn default_poll_interval() -> u64 {
    60
}

/// transmission-rss feed list configuration.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct FeedsConfig {
    #[serde(default = "default_feeds_path")]
    pub path: PathBuf,
    /// Container restarted after the feed list changes.
    #[serde(default = "default_feeds_container")]
    pub container: String,
}

impl Default for FeedsConfig {
    fn default() -> Self {
        Self {
            path: default_feeds_path(),
            container: default_feeds_container(),
        }
    }
}

fn default_feeds_path() -> PathBuf {
    PathBuf::from("rss/rss.conf")
}

fn default_feeds_container() -> String {
    "transmission-rss".to_string()
}

/// Screentime ledger configuration.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ScreentimeConfig {
    pub data_dir: Option<PathBuf>,
}

impl ScreentimeConfig {
    pub fn data_dir(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(get_home_dir()?.join("screentime")),
        }
    }
}

/// Scanner configuration.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ScannerConfig {
    #[serde(default = "default_scanner_command")]
    pub command: String,
    #[serde(default = "default_scanner_resolution")]
    pub resolution: u32,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            command: default_scanner_command(),
            resolution: default_scanner_resolution(),
        }
    }
}

fn default_scanner_command() -> String {
    "scanimage".to_string()
}

fn default_scanner_resolution() -> u32 {
    300
}

impl Settings {
    /// Check the fields only the running bot needs. Local subcommands skip this.
    pub fn require_bot(&self) -> Result<()> {
        if self.telegram.bot_token.as_deref().map_or(true, str::is_empty) {
            return Err(Error::Config("telegram.bot_token is required".to_string()));
        }
        if self.transmission.url.as_deref().map_or(true, str::is_empty) {
            return Err(Error::Config("transmission.url is required".to_string()));
        }
        Ok(())
    }
}

/// transbot settings.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Settings {
    #[serde(default)]
    pub telegram: TelegramConfig,

    #[serde(default)]
    pub transmission: TransmissionConfig,

    #[serde(default)]
    pub solarman: Option<SolarmanConfig>,

    #[serde(default)]
    pub feeds: FeedsConfig,

    #[serde(default)]
    pub screentime: ScreentimeConfig,

    #[serde(default)]
    pub scanner: ScannerConfig,
}
