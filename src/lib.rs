//! transbot library root.

pub mod cli;
pub mod config;
pub mod core;
pub mod downloads;
pub mod error;
pub mod logging;
pub mod monitor;
pub mod retry;
pub mod services;
pub mod store;
pub mod telegram;

pub use cli::Commands;
pub use config::{load_settings, Settings};
pub use core::{ChatEvent, Dispatcher, Handled};
pub use error::{Error, Result};
pub use telegram::run_telegram_daemon;
