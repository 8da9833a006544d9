//! Screentime ledger: a running total of minutes per kid plus recent operations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use super::lock::KeyedLocks;
use crate::error::{Error, Result};

/// Operations kept per kid; the oldest is dropped first.
pub const MAX_OPERATIONS: usize = 10;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Operation {
    pub description: String,
    pub minutes: i64,
    pub at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Accountability {
    pub total_minutes: i64,
    pub operations: VecDeque<Operation>,
}

impl Accountability {
    fn record(&mut self, description: &str, minutes: i64) -> Result<()> {
        self.total_minutes = self.total_minutes.checked_add(minutes).ok_or_else(|| {
            Error::Store(format!(
                "total of {} minutes cannot take {:+} more",
                self.total_minutes, minutes
            ))
        })?;
        if self.operations.len() >= MAX_OPERATIONS {
            self.operations.pop_front();
        }
        self.operations.push_back(Operation {
            description: description.to_string(),
            minutes,
            at: Utc::now(),
        });
        Ok(())
    }

    /// Chat-friendly summary.
    pub fn render(&self) -> String {
        let mut out = format!("Total Minutes: {}\nOperations:\n", self.total_minutes);
        for op in &self.operations {
            let _ = writeln!(out, "- {} ({:+} minutes)", op.description, op.minutes);
        }
        out
    }
}

/// One JSON file per kid under a data directory.
pub struct ScreentimeStore {
    dir: PathBuf,
    locks: KeyedLocks,
}

impl ScreentimeStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            locks: KeyedLocks::new(),
        }
    }

    /// Reset a kid's ledger to zero.
    pub async fn initialize(&self, kid: &str) -> Result<()> {
        let kid = normalize_kid(kid)?;
        let path = self.record_path(&kid);
        self.locks
            .with_lock(&kid, || write_record(&path, &Accountability::default()))
            .await
    }

    pub async fn add_minutes(
        &self,
        kid: &str,
        description: &str,
        minutes: i64,
    ) -> Result<Accountability> {
        self.update(kid, description, minutes).await
    }

    pub async fn subtract_minutes(
        &self,
        kid: &str,
        description: &str,
        minutes: i64,
    ) -> Result<Accountability> {
        let minutes = minutes
            .checked_neg()
            .ok_or_else(|| Error::Store(format!("cannot take {} minutes", minutes)))?;
        self.update(kid, description, minutes).await
    }

    /// Current ledger. A kid that was never started reads as empty.
    pub async fn get(&self, kid: &str) -> Result<Accountability> {
        let kid = normalize_kid(kid)?;
        let path = self.record_path(&kid);
        self.locks.with_lock(&kid, || read_record(&path)).await
    }

    async fn update(&self, kid: &str, description: &str, minutes: i64) -> Result<Accountability> {
        let kid = normalize_kid(kid)?;
        let path = self.record_path(&kid);
        self.locks
            .with_lock(&kid, || {
                let mut record = read_record(&path)?;
                record.record(description, minutes)?;
                write_record(&path, &record)?;
                Ok(record)
            })
            .await
    }

    fn record_path(&self, kid: &str) -> PathBuf {
        self.dir.join(format!("accountability_{}.json", kid))
    }
}

/// Lower-case the name and make sure it is safe as a file name component.
fn normalize_kid(kid: &str) -> Result<String> {
    let kid = kid.trim().to_lowercase();
    if kid.is_empty() || !kid.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-') {
        return Err(Error::Store(format!("invalid kid name: {:?}", kid)));
    }
    Ok(kid)
}

fn read_record(path: &Path) -> Result<Accountability> {
    if !path.exists() {
        return Ok(Accountability::default());
    }
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

fn write_record(path: &Path, record: &Accountability) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, serde_json::to_string_pretty(record)?)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_add_then_subtract() {
        let temp_dir = TempDir::new().unwrap();
        let store = ScreentimeStore::new(temp_dir.path());

        store.add_minutes("Kid", "dessert", 30).await.unwrap();
        let record = store.subtract_minutes("Kid", "chores", 10).await.unwrap();

        assert_eq!(record.total_minutes, 20);
        let log: Vec<(&str, i64)> = record
            .operations
            .iter()
            .map(|op| (op.description.as_str(), op.minutes))
            .collect();
        assert_eq!(log, vec![("dessert", 30), ("chores", -10)]);

        // Persisted under the lower-cased name.
        assert!(temp_dir.path().join("accountability_kid.json").exists());
        assert_eq!(store.get("kid").await.unwrap(), record);
    }

    #[tokio::test]
    async fn test_log_keeps_last_ten() {
        let temp_dir = TempDir::new().unwrap();
        let store = ScreentimeStore::new(temp_dir.path());

        for i in 0..10 {
            store.add_minutes("ana", &format!("op{}", i), 1).await.unwrap();
        }
        let record = store.add_minutes("ana", "op10", 1).await.unwrap();

        assert_eq!(record.operations.len(), MAX_OPERATIONS);
        assert_eq!(record.operations.front().unwrap().description, "op1");
        assert_eq!(record.operations.back().unwrap().description, "op10");
        assert_eq!(record.total_minutes, 11);
    }

    #[tokio::test]
    async fn test_initialize_resets() {
        let temp_dir = TempDir::new().unwrap();
        let store = ScreentimeStore::new(temp_dir.path());

        store.add_minutes("ana", "movie", 45).await.unwrap();
        store.initialize("ANA").await.unwrap();

        assert_eq!(store.get("ana").await.unwrap(), Accountability::default());
    }

    #[tokio::test]
    async fn test_rejects_path_like_names() {
        let temp_dir = TempDir::new().unwrap();
        let store = ScreentimeStore::new(temp_dir.path());

        assert!(store.add_minutes("../etc", "x", 1).await.is_err());
        assert!(store.get("").await.is_err());
    }

    #[tokio::test]
    async fn test_out_of_range_minutes_leave_ledger_untouched() {
        let temp_dir = TempDir::new().unwrap();
        let store = ScreentimeStore::new(temp_dir.path());

        assert!(matches!(
            store.subtract_minutes("ana", "x", i64::MIN).await,
            Err(Error::Store(_))
        ));

        store.add_minutes("ana", "x", i64::MAX).await.unwrap();
        assert!(matches!(
            store.add_minutes("ana", "y", 1).await,
            Err(Error::Store(_))
        ));

        let record = store.get("ana").await.unwrap();
        assert_eq!(record.total_minutes, i64::MAX);
        assert_eq!(record.operations.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_updates_are_not_lost() {
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(ScreentimeStore::new(temp_dir.path()));

        let tasks: Vec<_> = (0..20)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    store.add_minutes("leo", &format!("chunk {}", i), 1).await.unwrap();
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(store.get("leo").await.unwrap().total_minutes, 20);
    }

    #[test]
    fn test_render() {
        let mut record = Accountability::default();
        record.record("dessert", 30).unwrap();
        record.record("chores", -10).unwrap();

        assert_eq!(
            record.render(),
            "Total Minutes: 20\nOperations:\n- dessert (+30 minutes)\n- chores (-10 minutes)\n"
        );
    }
}
