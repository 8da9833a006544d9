//! transbot - Telegram remote control for a home server.

use clap::Parser;
use std::process::ExitCode;

use transbot::{logging, Commands};

#[tokio::main]
async fn main() -> ExitCode {
    // The guard flushes the log file on drop.
    let _guard = match logging::init() {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // Parse command line arguments
    let args = Commands::parse();

    // Run the command
    match args.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
