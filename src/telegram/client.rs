//! Telegram bot client - long polling, one dispatcher shared by all chats.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{BotCommand, InputFile};

use crate::config::Settings;
use crate::core::{ChatEvent, ChatTransport, DispatchOptions, Dispatcher, Services};
use crate::downloads::TransmissionClient;
use crate::error::{Error, Result};
use crate::monitor::{DevicePoller, SolarmanClient};
use crate::services::{DockerCli, ScanImage};
use crate::store::{FeedStore, ScreentimeStore};

const API_BASE: &str = "https://api.telegram.org";

/// Telegram side of [`ChatTransport`].
pub struct TelegramTransport {
    bot: Bot,
    token: String,
    http: reqwest::Client,
    torrent_dir: PathBuf,
}

impl TelegramTransport {
    pub fn new(bot: Bot, token: String, torrent_dir: PathBuf) -> Self {
        Self {
            bot,
            token,
            http: reqwest::Client::new(),
            torrent_dir,
        }
    }

    async fn file_path(&self, file_id: &str) -> Result<String> {
        let url = format!("{}/bot{}/getFile", API_BASE, self.token);
        let value: serde_json::Value = self
            .http
            .get(url)
            .query(&[("file_id", file_id)])
            .send()
            .await?
            .json()
            .await?;

        value
            .get("result")
            .and_then(|r| r.get("file_path"))
            .and_then(|p| p.as_str())
            .map(str::to_string)
            .ok_or_else(|| Error::Telegram("getFile returned no file_path".to_string()))
    }
}

#[async_trait]
impl ChatTransport for TelegramTransport {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<()> {
        self.bot.send_message(ChatId(chat_id), text).await?;
        Ok(())
    }

    async fn send_photo(&self, chat_id: i64, image: Vec<u8>) -> Result<()> {
        self.bot
            .send_photo(ChatId(chat_id), InputFile::memory(image).file_name("scan.jpg"))
            .await?;
        Ok(())
    }

    async fn download_file(&self, file_id: &str, file_name: Option<&str>) -> Result<String> {
        let remote_path = self.file_path(file_id).await?;
        let url = format!("{}/file/bot{}/{}", API_BASE, self.token, remote_path);
        let bytes = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        tokio::fs::create_dir_all(&self.torrent_dir).await?;
        let path = self.torrent_dir.join(local_file_name(file_id));
        tokio::fs::write(&path, &bytes).await?;

        tracing::info!(
            "Saved {} ({} bytes) to {}",
            file_name.unwrap_or("attachment"),
            bytes.len(),
            path.display()
        );
        Ok(path.display().to_string())
    }
}

/// Local name for a downloaded torrent, unique per Telegram file.
fn local_file_name(file_id: &str) -> String {
    let stem: String = file_id
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-') {
                ch
            } else {
                '_'
            }
        })
        .collect();
    if stem.is_empty() {
        "upload.torrent".to_string()
    } else {
        format!("{}.torrent", stem)
    }
}

/// Reduce a Telegram message to the event the dispatcher understands.
///
/// Documents win over captions; anything else (stickers, photos, joins) is dropped.
fn to_event(msg: &Message) -> Option<ChatEvent> {
    let chat_id = msg.chat.id.0;
    if let Some(doc) = msg.document() {
        let file_id: &str = &doc.file.id;
        return Some(ChatEvent::file(chat_id, file_id, doc.file_name.as_deref()));
    }
    msg.text().map(|text| ChatEvent::text(chat_id, text))
}

fn bot_commands() -> Vec<BotCommand> {
    vec![
        BotCommand::new("torrent", "Upload a torrent file"),
        BotCommand::new("magnet", "Input a magnet link"),
        BotCommand::new("rss", "Input a rss feed into transmission-rss"),
        BotCommand::new("screen", "Screentime management for kids"),
        BotCommand::new("scan", "Scan a page and send it here"),
        BotCommand::new("cancel", "Abandon the current question"),
        BotCommand::new("help", "Show available commands"),
    ]
}

/// Run the bot until the process is interrupted.
///
/// Starts the device poller first when one is configured; if its first
/// authentication fails the bot does not start.
pub async fn run_telegram_daemon(settings: Settings) -> Result<()> {
    tracing::info!("Starting Telegram bot...");

    let token = settings
        .telegram
        .bot_token
        .clone()
        .ok_or_else(|| Error::Telegram("No bot token configured".to_string()))?;
    let bot = Bot::new(token.clone());

    if let Err(e) = bot.set_my_commands(bot_commands()).await {
        tracing::warn!("Failed to set commands: {}", e);
    }

    let transport = Arc::new(TelegramTransport::new(
        bot.clone(),
        token,
        settings.transmission.torrent_dir()?,
    ));

    if let Some(solarman) = &settings.solarman {
        let alert_chat = settings.telegram.alert_chat_id.ok_or_else(|| {
            Error::Config("telegram.alert_chat_id is required for device alerts".to_string())
        })?;
        let api = Arc::new(SolarmanClient::new(solarman.clone()));
        DevicePoller::connect(api, transport.clone(), alert_chat, solarman.poll_policy())
            .await?
            .spawn();
        tracing::info!("Device poller started for {}", solarman.device_sn);
    }

    let services = Services {
        transport: transport.clone(),
        jobs: Arc::new(TransmissionClient::new(&settings.transmission)?),
        feeds: Arc::new(FeedStore::new(settings.feeds.path.clone())),
        screentime: Arc::new(ScreentimeStore::new(settings.screentime.data_dir()?)),
        containers: Arc::new(DockerCli::new()),
        scanner: Arc::new(ScanImage::new(&settings.scanner)),
    };
    let options = DispatchOptions {
        watch_policy: settings.transmission.watch_policy(),
        feed_container: settings.feeds.container.clone(),
    };
    let dispatcher = Arc::new(Dispatcher::new(services, options));

    tracing::info!("Telegram bot ready");

    teloxide::repl(bot, move |msg: Message| {
        let dispatcher = dispatcher.clone();
        async move {
            if let Some(event) = to_event(&msg) {
                let handled = dispatcher.handle_event(event).await;
                tracing::debug!("Chat {} -> {:?}", msg.chat.id, handled);
            }
            respond(())
        }
    })
    .await;

    tracing::info!("Telegram bot stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_file_name_is_path_safe() {
        assert_eq!(local_file_name("BQACAgIAAxkB"), "BQACAgIAAxkB.torrent");
        assert_eq!(local_file_name("../../etc/passwd"), "______etc_passwd.torrent");
        assert_eq!(local_file_name(""), "upload.torrent");
    }

    #[test]
    fn test_menu_lists_every_chat_command() {
        let names: Vec<String> = bot_commands().into_iter().map(|c| c.command).collect();
        assert_eq!(
            names,
            vec!["torrent", "magnet", "rss", "screen", "scan", "cancel", "help"]
        );
    }
}
