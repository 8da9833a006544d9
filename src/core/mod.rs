//! Core module - chat events, conversations, and dispatch.
//!
//! Everything here is transport-agnostic:
//! - Inbound events and the outbound transport trait
//! - Per-chat conversation sessions
//! - The dispatcher that routes events to sessions or commands

pub mod commands;
pub mod conversation;
pub mod dispatch;
pub mod event;
pub mod transport;

pub use conversation::{ChatSession, Flow, Step};
pub use dispatch::{DispatchOptions, Dispatcher, Handled, Services};
pub use event::{ChatEvent, ChatId, EventContent};
pub use transport::{notify, ChatTransport};
