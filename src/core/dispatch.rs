//! Routes inbound chat events to pending conversations or command handlers.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::commands::{
    parse_screen, Command, ScreenCommand, ScreenParseError, HELP_TEXT, SCREEN_USAGE, UNKNOWN_TEXT,
};
use super::conversation::{
    Advance, ChatSession, CompletedRequest, DownloadRequest, FeedRequest, Flow, SourceRef,
};
use super::event::{ChatEvent, ChatId, EventContent};
use super::transport::{notify, ChatTransport};
use crate::downloads::{DownloadWatcher, JobClient, JobHandle, JobSource};
use crate::retry::RetryPolicy;
use crate::services::{ContainerRestart, Scanner};
use crate::store::{FeedStore, ScreentimeStore};

/// Everything the dispatcher talks to.
pub struct Services {
    pub transport: Arc<dyn ChatTransport>,
    pub jobs: Arc<dyn JobClient>,
    pub feeds: Arc<FeedStore>,
    pub screentime: Arc<ScreentimeStore>,
    pub containers: Arc<dyn ContainerRestart>,
    pub scanner: Arc<dyn Scanner>,
}

#[derive(Debug, Clone)]
pub struct DispatchOptions {
    /// Polling policy for each download watcher.
    pub watch_policy: RetryPolicy,
    /// Container restarted after a feed is added.
    pub feed_container: String,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            watch_policy: RetryPolicy::default(),
            feed_container: "transmission-rss".to_string(),
        }
    }
}

/// What handling one event amounted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Handled {
    /// A prompt was sent and a session is waiting for the reply.
    Prompted,
    Cancelled,
    Submitted(JobHandle),
    FeedAdded,
    /// A stateless command answered.
    Replied,
    Unrecognized,
    Failed,
}

/// Single entry point for inbound events.
///
/// Sessions are keyed by chat and advanced one event at a time, so a chat in
/// the middle of a conversation never holds up any other chat.
pub struct Dispatcher {
    services: Services,
    options: DispatchOptions,
    sessions: Mutex<HashMap<ChatId, ChatSession>>,
}

impl Dispatcher {
    pub fn new(services: Services, options: DispatchOptions) -> Self {
        Self {
            services,
            options,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub async fn has_pending(&self, chat_id: ChatId) -> bool {
        self.sessions.lock().await.contains_key(&chat_id)
    }

    pub async fn handle_event(&self, event: ChatEvent) -> Handled {
        let chat_id = event.chat_id;

        if let Some(advance) = self.continue_session(&event).await {
            return self.apply(chat_id, advance).await;
        }

        let command = Command::from_token(event.command_token());
        match event.content {
            EventContent::File { file_id, file_name } => {
                tracing::info!("Received a torrent file in chat {}", chat_id);
                let (session, prompt) = ChatSession::from_upload(file_id, file_name);
                self.begin(chat_id, session, prompt).await
            }
            EventContent::Text(text) => {
                tracing::info!("Received the following command: {}", text);
                match command {
                    Command::Torrent => self.start(chat_id, Flow::Torrent).await,
                    Command::Magnet => self.start(chat_id, Flow::Magnet).await,
                    Command::Rss => self.start(chat_id, Flow::Feed).await,
                    Command::Screen => self.handle_screen(chat_id, &text).await,
                    Command::Scan => self.handle_scan(chat_id).await,
                    Command::Help => self.reply(chat_id, HELP_TEXT).await,
                    Command::Cancel => self.reply(chat_id, "Nothing to cancel.").await,
                    Command::Unknown => {
                        tracing::info!("Unknown command {:?}", text);
                        notify(self.services.transport.as_ref(), chat_id, UNKNOWN_TEXT).await;
                        Handled::Unrecognized
                    }
                }
            }
        }
    }

    /// Feed the event to the chat's pending session, if there is one.
    ///
    /// The session lock is released before any I/O happens.
    async fn continue_session(&self, event: &ChatEvent) -> Option<Option<Advance>> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions.get_mut(&event.chat_id)?;

        if is_cancel(event) {
            session.abort();
            sessions.remove(&event.chat_id);
            return Some(None);
        }

        let advance = session.advance(event.content.clone());
        if session.is_finished() {
            sessions.remove(&event.chat_id);
        }
        Some(Some(advance))
    }

    async fn apply(&self, chat_id: ChatId, advance: Option<Advance>) -> Handled {
        match advance {
            None => {
                tracing::info!("Conversation cancelled in chat {}", chat_id);
                notify(self.services.transport.as_ref(), chat_id, "Cancelled.").await;
                Handled::Cancelled
            }
            Some(Advance::Prompt(prompt)) => {
                notify(self.services.transport.as_ref(), chat_id, prompt).await;
                Handled::Prompted
            }
            Some(Advance::Complete(CompletedRequest::Download(request))) => {
                self.submit_download(chat_id, request).await
            }
            Some(Advance::Complete(CompletedRequest::Feed(request))) => {
                self.add_feed(chat_id, request).await
            }
            Some(Advance::Aborted) => Handled::Cancelled,
        }
    }

    async fn start(&self, chat_id: ChatId, flow: Flow) -> Handled {
        let (session, prompt) = ChatSession::start(flow);
        self.begin(chat_id, session, prompt).await
    }

    async fn begin(&self, chat_id: ChatId, session: ChatSession, prompt: &str) -> Handled {
        self.sessions.lock().await.insert(chat_id, session);
        notify(self.services.transport.as_ref(), chat_id, prompt).await;
        Handled::Prompted
    }

    async fn reply(&self, chat_id: ChatId, text: &str) -> Handled {
        notify(self.services.transport.as_ref(), chat_id, text).await;
        Handled::Replied
    }

    async fn submit_download(&self, chat_id: ChatId, request: DownloadRequest) -> Handled {
        let transport = self.services.transport.as_ref();

        let source = match request.source {
            SourceRef::Link(link) => JobSource::Link(link),
            SourceRef::TorrentFile { file_id, file_name } => {
                match transport.download_file(&file_id, file_name.as_deref()).await {
                    Ok(path) => JobSource::LocalTorrent(PathBuf::from(path)),
                    Err(e) => {
                        tracing::error!("Error getting torrent, aborting: {}", e);
                        return Handled::Failed;
                    }
                }
            }
        };

        match self.services.jobs.submit(&source, &request.download_dir).await {
            Ok(job) => {
                tracing::info!("Download started: {} into {}", job, request.download_dir);
                notify(transport, chat_id, "Download started!").await;
                DownloadWatcher::new(
                    self.services.jobs.clone(),
                    self.services.transport.clone(),
                    job,
                    chat_id,
                    self.options.watch_policy,
                )
                .spawn();
                Handled::Submitted(job)
            }
            Err(e) => {
                tracing::error!("Error starting download: {}", e);
                notify(transport, chat_id, "Failed to start download.").await;
                Handled::Failed
            }
        }
    }

    async fn add_feed(&self, chat_id: ChatId, request: FeedRequest) -> Handled {
        let transport = self.services.transport.as_ref();

        if let Err(e) = self
            .services
            .feeds
            .append_feed(&request.url, &request.download_dir)
            .await
        {
            tracing::error!("Error adding feed to yaml: {}", e);
            notify(transport, chat_id, "Failed to add feed.").await;
            return Handled::Failed;
        }

        let container = &self.options.feed_container;
        if let Err(e) = self.services.containers.restart(container).await {
            tracing::error!("Error restarting {}: {}", container, e);
            notify(
                transport,
                chat_id,
                &format!("Feed saved, but restarting {} failed.", container),
            )
            .await;
            return Handled::Failed;
        }

        notify(transport, chat_id, "Feed created!").await;
        Handled::FeedAdded
    }

    async fn handle_screen(&self, chat_id: ChatId, text: &str) -> Handled {
        let args: Vec<&str> = text.split_whitespace().skip(1).collect();
        let command = match parse_screen(&args) {
            Ok(command) => command,
            Err(ScreenParseError::Usage) => return self.reply(chat_id, SCREEN_USAGE).await,
            Err(ScreenParseError::InvalidMinutes(raw)) => {
                tracing::warn!("Converting minutes to int failed for {:?}, aborting", raw);
                return Handled::Failed;
            }
        };

        let store = &self.services.screentime;
        let result = match &command {
            ScreenCommand::Start { kid } => store
                .initialize(kid)
                .await
                .map(|_| format!("{} Initialized", kid)),
            ScreenCommand::Log { kid } => store.get(kid).await.map(|record| record.render()),
            ScreenCommand::Add {
                kid,
                minutes,
                description,
            } => store
                .add_minutes(kid, description, *minutes)
                .await
                .map(|_| "Added".to_string()),
            ScreenCommand::Take {
                kid,
                minutes,
                description,
            } => store
                .subtract_minutes(kid, description, *minutes)
                .await
                .map(|_| "Taken".to_string()),
        };

        match result {
            Ok(text) => self.reply(chat_id, &text).await,
            Err(e) => {
                tracing::error!("Screentime {:?} failed: {}", command, e);
                notify(
                    self.services.transport.as_ref(),
                    chat_id,
                    "Failed to update screentime.",
                )
                .await;
                Handled::Failed
            }
        }
    }

    async fn handle_scan(&self, chat_id: ChatId) -> Handled {
        let transport = self.services.transport.as_ref();

        let image = match self.services.scanner.scan().await {
            Ok(image) => image,
            Err(e) => {
                tracing::error!("Failed to scan image: {}", e);
                notify(transport, chat_id, "Failed to scan image. Check the logs").await;
                return Handled::Failed;
            }
        };

        if let Err(e) = transport.send_photo(chat_id, image).await {
            tracing::warn!("Failed to send scanned image: {}", e);
            return Handled::Failed;
        }
        tracing::info!("Image scanned and sent");
        Handled::Replied
    }
}

fn is_cancel(event: &ChatEvent) -> bool {
    matches!(&event.content, EventContent::Text(text) if text.trim() == "/cancel")
}
