//! State store access contract and backends
//!
//! The store persists the last-known-applied state per artifact and
//! enforces optimistic concurrency: every write carries the serial the
//! writer believes is current, and a mismatch fails with
//! `VersionConflict`, forcing the caller to re-read and re-plan.

use crate::document::{STATE_VERSION, StateDocument};
use crate::error::{Result, StateError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::fs;

/// Versioned state storage
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Load the document for an artifact; absent artifacts yield an
    /// empty document with serial 0.
    async fn read(&self, artifact: &str) -> Result<StateDocument>;

    /// Persist the document if `expected_serial` matches the stored
    /// serial. The stored serial becomes `expected_serial + 1` and is
    /// returned; the serial field of `document` itself is ignored.
    async fn write(
        &self,
        artifact: &str,
        document: &StateDocument,
        expected_serial: u64,
    ) -> Result<u64>;
}

const STATE_DIR: &str = ".groundflow/state";

/// File-backed store under `.groundflow/state/<artifact>.json`
///
/// The previous version of each artifact is kept as a `.backup`
/// alongside it, rotated on every write.
pub struct LocalStateStore {
    state_dir: PathBuf,
}

impl LocalStateStore {
    pub fn new(project_root: impl AsRef<Path>) -> Self {
        Self {
            state_dir: project_root.as_ref().join(STATE_DIR),
        }
    }

    fn state_path(&self, artifact: &str) -> PathBuf {
        self.state_dir.join(format!("{artifact}.json"))
    }

    fn backup_path(&self, artifact: &str) -> PathBuf {
        self.state_dir.join(format!("{artifact}.json.backup"))
    }

    async fn ensure_state_dir(&self) -> Result<()> {
        if !self.state_dir.exists() {
            fs::create_dir_all(&self.state_dir).await?;
            tracing::debug!("Created state directory: {}", self.state_dir.display());
        }
        Ok(())
    }

    async fn load(&self, artifact: &str) -> Result<StateDocument> {
        let path = self.state_path(artifact);
        if !path.exists() {
            tracing::debug!(artifact, "State file not found, returning empty state");
            return Ok(StateDocument::new());
        }

        let content = fs::read_to_string(&path).await?;
        let document: StateDocument = serde_json::from_str(&content)?;

        // Version check
        if document.version > STATE_VERSION {
            return Err(StateError::Corrupt(format!(
                "State file version {} is newer than supported version {}",
                document.version, STATE_VERSION
            )));
        }

        Ok(document)
    }
}

#[async_trait]
impl StateStore for LocalStateStore {
    async fn read(&self, artifact: &str) -> Result<StateDocument> {
        let document = self.load(artifact).await?;
        tracing::debug!(
            artifact,
            serial = document.serial,
            resources = document.len(),
            "Loaded state"
        );
        Ok(document)
    }

    async fn write(
        &self,
        artifact: &str,
        document: &StateDocument,
        expected_serial: u64,
    ) -> Result<u64> {
        self.ensure_state_dir().await?;

        let current = self.load(artifact).await?;
        if current.serial != expected_serial {
            return Err(StateError::VersionConflict {
                artifact: artifact.to_string(),
                expected: expected_serial,
                actual: current.serial,
            });
        }

        let path = self.state_path(artifact);
        let backup = self.backup_path(artifact);

        // Create backup if state file exists
        if path.exists() {
            if backup.exists() {
                fs::remove_file(&backup).await?;
            }
            fs::rename(&path, &backup).await?;
            tracing::debug!(artifact, "Created state backup");
        }

        let mut next = document.clone();
        next.version = STATE_VERSION;
        next.serial = expected_serial + 1;
        next.updated_at = chrono::Utc::now();

        let content = serde_json::to_string_pretty(&next)?;
        fs::write(&path, content).await?;

        tracing::debug!(
            artifact,
            serial = next.serial,
            resources = next.len(),
            "Saved state"
        );
        Ok(next.serial)
    }
}

/// In-memory store, used by the engine tests
#[derive(Default)]
pub struct MemoryStateStore {
    documents: Mutex<HashMap<String, StateDocument>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn read(&self, artifact: &str) -> Result<StateDocument> {
        let documents = self.documents.lock().unwrap();
        Ok(documents.get(artifact).cloned().unwrap_or_default())
    }

    async fn write(
        &self,
        artifact: &str,
        document: &StateDocument,
        expected_serial: u64,
    ) -> Result<u64> {
        let mut documents = self.documents.lock().unwrap();
        let current_serial = documents.get(artifact).map(|d| d.serial).unwrap_or(0);
        if current_serial != expected_serial {
            return Err(StateError::VersionConflict {
                artifact: artifact.to_string(),
                expected: expected_serial,
                actual: current_serial,
            });
        }

        let mut next = document.clone();
        next.serial = expected_serial + 1;
        next.updated_at = chrono::Utc::now();
        let serial = next.serial;
        documents.insert(artifact.to_string(), next);
        Ok(serial)
    }
}
