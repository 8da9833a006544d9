//! Download daemon client trait.

use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;

use crate::error::Result;

/// Identifier of a submitted download, as assigned by the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobHandle(pub i64);

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "torrent #{}", self.0)
    }
}

/// What to download. Only an uploaded file is ever read from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobSource {
    /// A .torrent file the bot saved locally.
    LocalTorrent(PathBuf),
    /// A magnet link or URL, passed through as typed.
    Link(String),
}

impl fmt::Display for JobSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobSource::LocalTorrent(path) => write!(f, "{}", path.display()),
            JobSource::Link(link) => f.write_str(link),
        }
    }
}

/// A download daemon that accepts jobs and reports on them.
#[async_trait]
pub trait JobClient: Send + Sync {
    async fn submit(&self, source: &JobSource, download_dir: &str) -> Result<JobHandle>;

    /// Whether the job has finished downloading.
    async fn is_complete(&self, job: JobHandle) -> Result<bool>;

    /// Human-readable name of the job.
    async fn name(&self, job: JobHandle) -> Result<String>;
}
