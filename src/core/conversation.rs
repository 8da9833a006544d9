//! Multi-step conversations that collect the fields of one command.
//!
//! A [`ChatSession`] is a plain state object. The dispatcher feeds it one
//! event at a time and performs whatever the returned [`Advance`] asks for,
//! so no session ever blocks waiting on the message stream.

use super::event::EventContent;

pub const TORRENT_PROMPT: &str = "Please send the torrent file:";
pub const MAGNET_PROMPT: &str = "Please enter the magnet link:";
pub const FEED_PROMPT: &str = "Enter the RSS url:";
pub const PATH_PROMPT: &str = "Enter the download path:";

/// Which command the session is collecting fields for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Torrent,
    Magnet,
    Feed,
}

impl Flow {
    fn primary_prompt(self) -> &'static str {
        match self {
            Flow::Torrent => TORRENT_PROMPT,
            Flow::Magnet => MAGNET_PROMPT,
            Flow::Feed => FEED_PROMPT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    AwaitingPrimaryInput,
    AwaitingPath,
    Complete,
    Aborted,
}

/// Where a download comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceRef {
    /// A .torrent attachment still held by the chat service.
    TorrentFile {
        file_id: String,
        file_name: Option<String>,
    },
    /// A magnet link or URL the daemon can fetch itself.
    Link(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub source: SourceRef,
    pub download_dir: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedRequest {
    pub url: String,
    pub download_dir: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletedRequest {
    Download(DownloadRequest),
    Feed(FeedRequest),
}

/// What the dispatcher must do after feeding an event to a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    /// Send this prompt and keep the session.
    Prompt(&'static str),
    /// All fields collected; drop the session and act on the request.
    Complete(CompletedRequest),
    /// The session is over without a request.
    Aborted,
}

/// In-progress collection of one command's fields for one chat.
#[derive(Debug, Clone)]
pub struct ChatSession {
    flow: Flow,
    step: Step,
    primary: Option<SourceRef>,
}

impl ChatSession {
    /// Begin a session and return the first prompt to send.
    pub fn start(flow: Flow) -> (Self, &'static str) {
        let session = Self {
            flow,
            step: Step::AwaitingPrimaryInput,
            primary: None,
        };
        (session, flow.primary_prompt())
    }

    /// Begin a torrent session from a file the user uploaded without a command.
    pub fn from_upload(file_id: String, file_name: Option<String>) -> (Self, &'static str) {
        let session = Self {
            flow: Flow::Torrent,
            step: Step::AwaitingPath,
            primary: Some(SourceRef::TorrentFile { file_id, file_name }),
        };
        (session, PATH_PROMPT)
    }

    pub fn flow(&self) -> Flow {
        self.flow
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.step, Step::Complete | Step::Aborted)
    }

    /// Cancel the session, discarding everything collected.
    pub fn abort(&mut self) {
        self.primary = None;
        self.step = Step::Aborted;
    }

    /// Feed the next event from this session's chat.
    pub fn advance(&mut self, content: EventContent) -> Advance {
        match self.step {
            Step::AwaitingPrimaryInput => self.capture_primary(content),
            Step::AwaitingPath => match content {
                EventContent::Text(path) => self.complete(path),
                EventContent::File { .. } => Advance::Prompt(PATH_PROMPT),
            },
            Step::Complete | Step::Aborted => {
                tracing::warn!("Event delivered to finished {:?} session", self.flow);
                Advance::Aborted
            }
        }
    }

    fn capture_primary(&mut self, content: EventContent) -> Advance {
        let source = match (self.flow, content) {
            (Flow::Torrent, EventContent::File { file_id, file_name }) => {
                SourceRef::TorrentFile { file_id, file_name }
            }
            (Flow::Magnet | Flow::Feed, EventContent::Text(text)) => SourceRef::Link(text),
            _ => return Advance::Prompt(self.flow.primary_prompt()),
        };
        self.primary = Some(source);
        self.step = Step::AwaitingPath;
        Advance::Prompt(PATH_PROMPT)
    }

    fn complete(&mut self, download_dir: String) -> Advance {
        let Some(source) = self.primary.take() else {
            self.abort();
            return Advance::Aborted;
        };
        self.step = Step::Complete;

        let request = match (self.flow, source) {
            (Flow::Feed, SourceRef::Link(url)) => {
                CompletedRequest::Feed(FeedRequest { url, download_dir })
            }
            (_, source) => CompletedRequest::Download(DownloadRequest {
                source,
                download_dir,
            }),
        };
        Advance::Complete(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> EventContent {
        EventContent::Text(s.to_string())
    }

    fn file(id: &str) -> EventContent {
        EventContent::File {
            file_id: id.to_string(),
            file_name: Some("ubuntu.torrent".to_string()),
        }
    }

    #[test]
    fn test_magnet_flow_captures_raw_values_in_order() {
        let (mut session, prompt) = ChatSession::start(Flow::Magnet);
        assert_eq!(prompt, MAGNET_PROMPT);
        assert_eq!(session.step(), Step::AwaitingPrimaryInput);

        assert_eq!(
            session.advance(text("magnet:?xt=urn:btih:abc")),
            Advance::Prompt(PATH_PROMPT)
        );
        assert_eq!(session.step(), Step::AwaitingPath);

        let outcome = session.advance(text("/downloads/linux"));
        assert_eq!(
            outcome,
            Advance::Complete(CompletedRequest::Download(DownloadRequest {
                source: SourceRef::Link("magnet:?xt=urn:btih:abc".to_string()),
                download_dir: "/downloads/linux".to_string(),
            }))
        );
        assert!(session.is_finished());
    }

    #[test]
    fn test_feed_flow_yields_feed_request() {
        let (mut session, prompt) = ChatSession::start(Flow::Feed);
        assert_eq!(prompt, FEED_PROMPT);

        session.advance(text("https://example.org/rss"));
        let outcome = session.advance(text("/downloads/shows"));
        assert_eq!(
            outcome,
            Advance::Complete(CompletedRequest::Feed(FeedRequest {
                url: "https://example.org/rss".to_string(),
                download_dir: "/downloads/shows".to_string(),
            }))
        );
    }

    #[test]
    fn test_torrent_prompt_reprompts_on_text_instead_of_empty_source() {
        let (mut session, _) = ChatSession::start(Flow::Torrent);

        assert_eq!(session.advance(text("oops")), Advance::Prompt(TORRENT_PROMPT));
        assert_eq!(session.step(), Step::AwaitingPrimaryInput);

        assert_eq!(session.advance(file("F1")), Advance::Prompt(PATH_PROMPT));
        match session.advance(text("/dl")) {
            Advance::Complete(CompletedRequest::Download(req)) => {
                assert_eq!(
                    req.source,
                    SourceRef::TorrentFile {
                        file_id: "F1".to_string(),
                        file_name: Some("ubuntu.torrent".to_string()),
                    }
                );
                assert_eq!(req.download_dir, "/dl");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_file_where_text_expected_reprompts() {
        let (mut session, _) = ChatSession::start(Flow::Magnet);
        assert_eq!(session.advance(file("F1")), Advance::Prompt(MAGNET_PROMPT));

        session.advance(text("magnet:?xt=1"));
        assert_eq!(session.advance(file("F2")), Advance::Prompt(PATH_PROMPT));
        assert_eq!(session.step(), Step::AwaitingPath);
    }

    #[test]
    fn test_upload_starts_at_path_step() {
        let (mut session, prompt) = ChatSession::from_upload("F9".to_string(), None);
        assert_eq!(prompt, PATH_PROMPT);
        assert_eq!(session.flow(), Flow::Torrent);
        assert!(matches!(
            session.advance(text("/dl")),
            Advance::Complete(CompletedRequest::Download(_))
        ));
    }

    #[test]
    fn test_abort_discards_state() {
        let (mut session, _) = ChatSession::start(Flow::Magnet);
        session.advance(text("magnet:?xt=1"));
        session.abort();

        assert_eq!(session.step(), Step::Aborted);
        assert_eq!(session.advance(text("/dl")), Advance::Aborted);
    }
}
