//! Per-key serialization for file-backed records.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::error::Result;

/// One async mutex per key, created on first use.
///
/// Holding a key's guard makes read-modify-write of that key's record
/// exclusive within this process. Different keys never contend.
#[derive(Default)]
pub struct KeyedLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for `key`. Released when the guard drops.
    pub async fn acquire(&self, key: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            locks.entry(key.to_string()).or_default().clone()
        };
        lock.lock_owned().await
    }

    /// Acquire the lock for `key`, run `f`, release.
    pub async fn with_lock<T, F>(&self, key: &str, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        let _guard = self.acquire(key).await;
        tracing::trace!("Acquired record lock: {}", key);
        f()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_key_is_exclusive() {
        let locks = KeyedLocks::new();

        let guard = locks.acquire("alice").await;
        let blocked = tokio::time::timeout(Duration::from_millis(50), locks.acquire("alice")).await;
        assert!(blocked.is_err());

        drop(guard);
        let reacquired =
            tokio::time::timeout(Duration::from_millis(50), locks.acquire("alice")).await;
        assert!(reacquired.is_ok());
    }

    #[tokio::test]
    async fn test_different_keys_do_not_contend() {
        let locks = KeyedLocks::new();

        let _alice = locks.acquire("alice").await;
        let bob = tokio::time::timeout(Duration::from_millis(50), locks.acquire("bob")).await;
        assert!(bob.is_ok());
    }
}
