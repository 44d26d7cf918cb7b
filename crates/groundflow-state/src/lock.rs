//! Lock manager
//!
//! Grants exclusive mutual-exclusion over a named state artifact for
//! the duration of a plan/apply cycle. At most one holder exists at any
//! time; a stale lock (ttl expired) may be force-acquired by a new
//! holder, logged as a takeover. All state writes must happen while the
//! corresponding lock is held by the writer.

use crate::error::{Result, StateError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tokio::fs;

/// A held lock on a state artifact
#[derive(Debug, Clone)]
pub struct Lock {
    pub artifact: String,
    pub holder: String,
    pub acquired_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,

    /// Distinguishes this acquisition from a later takeover by the
    /// same holder name.
    lock_id: i64,
}

/// Persisted lock metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
struct LockInfo {
    lock_id: i64,
    holder: String,
    acquired_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl LockInfo {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    fn to_lock(&self, artifact: &str) -> Lock {
        Lock {
            artifact: artifact.to_string(),
            holder: self.holder.clone(),
            acquired_at: self.acquired_at,
            expires_at: self.expires_at,
            lock_id: self.lock_id,
        }
    }
}

fn new_lock_info(holder: &str, ttl: Duration) -> LockInfo {
    let now = Utc::now();
    let lock_id = now.timestamp_nanos_opt().unwrap_or(0) ^ (std::process::id() as i64);
    LockInfo {
        lock_id,
        holder: holder.to_string(),
        acquired_at: now,
        expires_at: now + chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::zero()),
    }
}

/// Mutual exclusion over state artifacts
#[async_trait]
pub trait LockManager: Send + Sync {
    /// Acquire the lock, all-or-nothing. A live lock held by someone
    /// else fails with `AlreadyLocked`; an expired one is taken over.
    async fn acquire(&self, artifact: &str, holder: &str, ttl: Duration) -> Result<Lock>;

    /// Extend the lock's ttl. Fails with `LockLost` if the lock is no
    /// longer held by this acquisition.
    async fn renew(&self, lock: &mut Lock, ttl: Duration) -> Result<()>;

    /// Release the lock. Releasing a lock already taken over is a no-op.
    async fn release(&self, lock: Lock) -> Result<()>;
}

const STATE_DIR: &str = ".groundflow/state";

/// File-backed lock manager under `.groundflow/state/<artifact>.lock`
pub struct FileLockManager {
    state_dir: PathBuf,
}

impl FileLockManager {
    pub fn new(project_root: impl AsRef<Path>) -> Self {
        Self {
            state_dir: project_root.as_ref().join(STATE_DIR),
        }
    }

    fn lock_path(&self, artifact: &str) -> PathBuf {
        self.state_dir.join(format!("{artifact}.lock"))
    }

    async fn read_info(&self, artifact: &str) -> Result<Option<LockInfo>> {
        let path = self.lock_path(artifact);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path).await?;
        let info: LockInfo = serde_json::from_str(&content)
            .map_err(|e| StateError::Corrupt(format!("lock file unreadable: {e}")))?;
        Ok(Some(info))
    }

    async fn write_info(&self, artifact: &str, info: &LockInfo) -> Result<()> {
        let content = serde_json::to_string_pretty(info)?;
        fs::write(self.lock_path(artifact), content).await?;
        Ok(())
    }
}

#[async_trait]
impl LockManager for FileLockManager {
    async fn acquire(&self, artifact: &str, holder: &str, ttl: Duration) -> Result<Lock> {
        if !self.state_dir.exists() {
            fs::create_dir_all(&self.state_dir).await?;
        }

        if let Some(existing) = self.read_info(artifact).await? {
            if !existing.is_expired(Utc::now()) {
                return Err(StateError::AlreadyLocked {
                    holder: existing.holder,
                    acquired_at: existing.acquired_at,
                });
            }
            tracing::warn!(
                artifact,
                previous_holder = %existing.holder,
                "Taking over stale lock"
            );
            fs::remove_file(self.lock_path(artifact)).await?;
        }

        let info = new_lock_info(holder, ttl);
        self.write_info(artifact, &info).await?;
        tracing::debug!(artifact, holder, "Acquired state lock");
        Ok(info.to_lock(artifact))
    }

    async fn renew(&self, lock: &mut Lock, ttl: Duration) -> Result<()> {
        let current = self
            .read_info(&lock.artifact)
            .await?
            .ok_or_else(|| StateError::LockLost(lock.artifact.clone()))?;

        if current.lock_id != lock.lock_id {
            return Err(StateError::LockLost(lock.artifact.clone()));
        }

        let mut renewed = current;
        renewed.expires_at =
            Utc::now() + chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::zero());
        self.write_info(&lock.artifact, &renewed).await?;
        lock.expires_at = renewed.expires_at;
        tracing::debug!(artifact = %lock.artifact, "Renewed state lock");
        Ok(())
    }

    async fn release(&self, lock: Lock) -> Result<()> {
        match self.read_info(&lock.artifact).await? {
            Some(current) if current.lock_id == lock.lock_id => {
                fs::remove_file(self.lock_path(&lock.artifact)).await?;
                tracing::debug!(artifact = %lock.artifact, "Released state lock");
            }
            _ => {
                // 既にテイクオーバーされている場合は触らない
                tracing::debug!(artifact = %lock.artifact, "Lock already replaced, not releasing");
            }
        }
        Ok(())
    }
}

/// In-memory lock manager, used by the engine tests
#[derive(Default)]
pub struct MemoryLockManager {
    locks: Mutex<HashMap<String, LockInfo>>,
}

impl MemoryLockManager {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LockManager for MemoryLockManager {
    async fn acquire(&self, artifact: &str, holder: &str, ttl: Duration) -> Result<Lock> {
        let mut locks = self.locks.lock().unwrap();

        if let Some(existing) = locks.get(artifact) {
            if !existing.is_expired(Utc::now()) {
                return Err(StateError::AlreadyLocked {
                    holder: existing.holder.clone(),
                    acquired_at: existing.acquired_at,
                });
            }
            tracing::warn!(
                artifact,
                previous_holder = %existing.holder,
                "Taking over stale lock"
            );
        }

        let info = new_lock_info(holder, ttl);
        let lock = info.to_lock(artifact);
        locks.insert(artifact.to_string(), info);
        Ok(lock)
    }

    async fn renew(&self, lock: &mut Lock, ttl: Duration) -> Result<()> {
        let mut locks = self.locks.lock().unwrap();
        match locks.get_mut(&lock.artifact) {
            Some(current) if current.lock_id == lock.lock_id => {
                current.expires_at = Utc::now()
                    + chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::zero());
                lock.expires_at = current.expires_at;
                Ok(())
            }
            _ => Err(StateError::LockLost(lock.artifact.clone())),
        }
    }

    async fn release(&self, lock: Lock) -> Result<()> {
        let mut locks = self.locks.lock().unwrap();
        let held_by_us = locks
            .get(&lock.artifact)
            .is_some_and(|current| current.lock_id == lock.lock_id);
        if held_by_us {
            locks.remove(&lock.artifact);
        }
        Ok(())
    }
}
