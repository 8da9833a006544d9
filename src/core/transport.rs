//! Outbound side of the chat channel.

use async_trait::async_trait;

use super::event::ChatId;
use crate::error::Result;

/// Sends messages to chats and fetches files users attached.
///
/// Delivery is best effort: callers log failures and move on.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Send a text message to a chat.
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<()>;

    /// Send a JPEG image to a chat.
    async fn send_photo(&self, chat_id: ChatId, image: Vec<u8>) -> Result<()>;

    /// Download an attached file and return its local path.
    async fn download_file(&self, file_id: &str, file_name: Option<&str>) -> Result<String>;
}

/// Send a message, logging instead of propagating a transport failure.
pub async fn notify(transport: &dyn ChatTransport, chat_id: ChatId, text: &str) {
    if let Err(e) = transport.send_text(chat_id, text).await {
        tracing::warn!("Failed to send message to chat {}: {}", chat_id, e);
    }
}
