//! Download submission and tracking against the Transmission daemon.

pub mod client;
pub mod transmission;
pub mod watcher;

pub use client::{JobClient, JobHandle, JobSource};
pub use transmission::TransmissionClient;
pub use watcher::{DownloadWatcher, WatchOutcome};
