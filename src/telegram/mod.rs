//! Telegram bot integration.

pub mod client;

pub use client::{run_telegram_daemon, TelegramTransport};
