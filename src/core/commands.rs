//! Top-level chat commands and their argument parsing.

pub const HELP_TEXT: &str = "Available commands:
/torrent - Upload a torrent file
/magnet - Input a magnet link
/rss - Input a rss feed into transmission-rss
/screen - Screentime management for kids
/scan - Scan a page and send it here
/cancel - Abandon the current question
/help - Show available commands";

pub const UNKNOWN_TEXT: &str =
    "Sorry, I don't recognize that command. Please use /help to see available commands.";

pub const SCREEN_USAGE: &str = "Usage:
/screen <kid> start
/screen <kid> log
/screen <kid> add <minutes> <description>
/screen <kid> take <minutes> <description>";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Torrent,
    Magnet,
    Rss,
    Screen,
    Scan,
    Help,
    Cancel,
    Unknown,
}

impl Command {
    /// Classify the first token of a message. `/cmd@botname` is accepted in groups.
    pub fn from_token(token: Option<&str>) -> Self {
        let Some(token) = token else {
            return Command::Unknown;
        };
        let name = token.split('@').next().unwrap_or(token);
        match name {
            "/torrent" => Command::Torrent,
            "/magnet" => Command::Magnet,
            "/rss" => Command::Rss,
            "/screen" => Command::Screen,
            "/scan" => Command::Scan,
            "/help" | "/start" => Command::Help,
            "/cancel" => Command::Cancel,
            _ => Command::Unknown,
        }
    }
}

/// A parsed `/screen` invocation. Kid names are case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScreenCommand {
    Start { kid: String },
    Log { kid: String },
    Add { kid: String, minutes: i64, description: String },
    Take { kid: String, minutes: i64, description: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScreenParseError {
    /// Missing arguments or an unknown subcommand.
    Usage,
    /// The minute count is not a number.
    InvalidMinutes(String),
}

/// Parse the words after `/screen`.
pub fn parse_screen(args: &[&str]) -> Result<ScreenCommand, ScreenParseError> {
    let (kid, sub) = match args {
        [kid, sub, ..] => (kid.to_lowercase(), *sub),
        _ => return Err(ScreenParseError::Usage),
    };

    match sub {
        "start" => Ok(ScreenCommand::Start { kid }),
        "log" => Ok(ScreenCommand::Log { kid }),
        "add" | "take" => {
            let raw = args.get(2).ok_or(ScreenParseError::Usage)?;
            let minutes = raw
                .parse::<i64>()
                .map_err(|_| ScreenParseError::InvalidMinutes(raw.to_string()))?;
            let description = args[3..].join(" ");
            if sub == "add" {
                Ok(ScreenCommand::Add { kid, minutes, description })
            } else {
                Ok(ScreenCommand::Take { kid, minutes, description })
            }
        }
        _ => Err(ScreenParseError::Usage),
    }
}
