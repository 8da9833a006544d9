//! Inbound chat events, independent of the messaging transport.

/// Stable key naming a conversation endpoint.
pub type ChatId = i64;

/// One inbound message carrying user content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEvent {
    pub chat_id: ChatId,
    pub content: EventContent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventContent {
    Text(String),
    File {
        file_id: String,
        file_name: Option<String>,
    },
}

impl ChatEvent {
    pub fn text(chat_id: ChatId, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            content: EventContent::Text(text.into()),
        }
    }

    pub fn file(chat_id: ChatId, file_id: impl Into<String>, file_name: Option<&str>) -> Self {
        Self {
            chat_id,
            content: EventContent::File {
                file_id: file_id.into(),
                file_name: file_name.map(str::to_string),
            },
        }
    }

    /// First whitespace-delimited token of a text event.
    pub fn command_token(&self) -> Option<&str> {
        match &self.content {
            EventContent::Text(text) => text.split_whitespace().next(),
            EventContent::File { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_token() {
        assert_eq!(
            ChatEvent::text(1, "  /screen bob add 5 x").command_token(),
            Some("/screen")
        );
        assert_eq!(ChatEvent::text(1, "   ").command_token(), None);
        assert_eq!(ChatEvent::file(1, "f", None).command_token(), None);
    }
}
