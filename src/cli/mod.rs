//! CLI commands for transbot using clap.

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

use crate::config::{get_settings_path, load_settings, write_template};
use crate::store::{FeedStore, ScreentimeStore};

/// transbot - run downloads, feeds and household chores from a Telegram chat.
#[derive(Parser)]
#[command(name = "transbot")]
#[command(version)]
#[command(about = "Telegram remote control for Transmission and friends", long_about = None)]
pub struct Commands {
    /// Settings file (defaults to ~/.transbot/settings.json)
    #[arg(long, global = true, env = "TRANSBOT_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the bot, download watchers and device poller
    Start,

    /// Write a template settings file
    Setup,

    /// Inspect or reset a kid's screentime ledger
    Screen {
        /// Kid name
        kid: String,
        #[arg(value_enum)]
        action: ScreenAction,
    },

    /// List the transmission-rss feeds
    Feeds,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ScreenAction {
    /// Print the ledger
    Log,
    /// Reset the ledger to zero
    Start,
}

impl Commands {
    /// Run the command.
    pub async fn run(&self) -> Result<()> {
        let config = self.config.as_deref();
        match &self.command {
            Command::Start => cmd_start(config).await,
            Command::Setup => cmd_setup(config),
            Command::Screen { kid, action } => cmd_screen(config, kid, *action).await,
            Command::Feeds => cmd_feeds(config).await,
        }
    }
}

async fn cmd_start(config: Option<&Path>) -> Result<()> {
    let settings = load_settings(config)?;
    settings.require_bot()?;
    tracing::info!("Starting transbot...");
    crate::telegram::run_telegram_daemon(settings).await?;
    Ok(())
}

fn cmd_setup(config: Option<&Path>) -> Result<()> {
    let path = match config {
        Some(p) => p.to_path_buf(),
        None => get_settings_path()?,
    };
    write_template(&path)?;
    println!("Wrote template settings to {}", path.display());
    println!("Fill in telegram.bot_token and transmission.url, then run 'transbot start'.");
    Ok(())
}

async fn cmd_screen(config: Option<&Path>, kid: &str, action: ScreenAction) -> Result<()> {
    let settings = load_settings(config)?;
    let store = ScreentimeStore::new(settings.screentime.data_dir()?);
    let kid = kid.to_lowercase();

    match action {
        ScreenAction::Log => print!("{}", store.get(&kid).await?.render()),
        ScreenAction::Start => {
            store.initialize(&kid).await?;
            println!("{} Initialized", kid);
        }
    }
    Ok(())
}

async fn cmd_feeds(config: Option<&Path>) -> Result<()> {
    let settings = load_settings(config)?;
    let store = FeedStore::new(settings.feeds.path.clone());
    let feeds = store.list().await?;

    if feeds.is_empty() {
        println!("No feeds in {}", store.path().display());
        return Ok(());
    }
    for feed in feeds {
        println!("{} -> {}", feed.url, feed.download_path);
    }
    Ok(())
}
