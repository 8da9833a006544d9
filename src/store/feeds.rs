//! transmission-rss feed list, stored as YAML.

use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use crate::error::{Error, Result};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Feed {
    pub url: String,
    pub download_path: String,
    /// Per-feed options such as `regexp`, kept as written.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// The whole transmission-rss config file.
///
/// Only `feeds` is interpreted; `server`, `login` and anything else are
/// written back unchanged.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct FeedFile {
    #[serde(default)]
    pub feeds: Vec<Feed>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Serialized access to the feed file.
pub struct FeedStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FeedStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a feed and rewrite the file.
    pub async fn append_feed(&self, url: &str, download_path: &str) -> Result<()> {
        let _guard = self.lock.lock().await;

        let mut file = read_feed_file(&self.path)?;
        file.feeds.push(Feed {
            url: url.to_string(),
            download_path: download_path.to_string(),
            extra: BTreeMap::new(),
        });

        write_feed_file(&self.path, &file)?;
        tracing::info!("Added feed {} -> {} to {}", url, download_path, self.path.display());
        Ok(())
    }

    pub async fn list(&self) -> Result<Vec<Feed>> {
        let _guard = self.lock.lock().await;
        Ok(read_feed_file(&self.path)?.feeds)
    }
}

fn read_feed_file(path: &Path) -> Result<FeedFile> {
    if !path.exists() {
        return Err(Error::NotFound(format!("feed file {}", path.display())));
    }
    let content = std::fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(FeedFile::default());
    }
    Ok(serde_yaml::from_str(&content)?)
}

/// Write beside the original, then rename over it.
fn write_feed_file(path: &Path, file: &FeedFile) -> Result<()> {
    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);

    std::fs::write(&tmp, serde_yaml::to_string(file)?)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}
