//! State document model
//!
//! The state document is the persisted record of what has actually been
//! provisioned: one `StateRecord` per resource, keyed by its address,
//! plus a monotonically increasing serial used for optimistic
//! concurrency control.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// State document format version
pub const STATE_VERSION: u32 = 1;

/// Versioned state artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateDocument {
    /// State file format version
    pub version: u32,

    /// Write serial; every successful write increments it by one
    pub serial: u64,

    /// Last modified timestamp
    pub updated_at: DateTime<Utc>,

    /// Records indexed by resource address (`type:name`)
    pub resources: BTreeMap<String, StateRecord>,
}

impl Default for StateDocument {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            serial: 0,
            updated_at: Utc::now(),
            resources: BTreeMap::new(),
        }
    }
}

impl StateDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or update a record
    pub fn set_record(&mut self, address: impl Into<String>, record: StateRecord) {
        self.resources.insert(address.into(), record);
        self.updated_at = Utc::now();
    }

    /// Remove a record
    pub fn remove_record(&mut self, address: &str) -> Option<StateRecord> {
        let result = self.resources.remove(address);
        if result.is_some() {
            self.updated_at = Utc::now();
        }
        result
    }

    /// Get a record by address
    pub fn get_record(&self, address: &str) -> Option<&StateRecord> {
        self.resources.get(address)
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }
}

/// Persisted state of a single resource
///
/// Lifecycle: absent before first apply, created on first successful
/// apply, updated on each subsequent apply, removed on successful
/// destroy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateRecord {
    /// Resource address (`type:name`)
    pub address: String,

    /// Name of the provider that owns the resource. Needed to destroy
    /// resources whose declaration is gone.
    #[serde(default)]
    pub provider: String,

    /// Provider-assigned identifier, set once the resource exists
    pub provider_id: Option<String>,

    /// Last-applied attribute snapshot, including provider outputs
    #[serde(default)]
    pub attributes: BTreeMap<String, serde_json::Value>,

    /// Addresses this resource depended on at apply time.
    /// Needed to destroy-order resources whose declaration is gone.
    #[serde(default)]
    pub dependencies: Vec<String>,

    /// When the resource was first created
    pub created_at: DateTime<Utc>,

    /// Last apply timestamp
    pub updated_at: DateTime<Utc>,
}

impl StateRecord {
    pub fn new(address: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            address: address.into(),
            provider: String::new(),
            provider_id: None,
            attributes: BTreeMap::new(),
            dependencies: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = provider.into();
        self
    }

    pub fn with_provider_id(mut self, id: impl Into<String>) -> Self {
        self.provider_id = Some(id.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    pub fn with_dependencies(mut self, dependencies: Vec<String>) -> Self {
        self.dependencies = dependencies;
        self
    }

    pub fn set_attribute(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.attributes.insert(key.into(), value);
        self.updated_at = Utc::now();
    }

    pub fn get_attribute(&self, key: &str) -> Option<&serde_json::Value> {
        self.attributes.get(key)
    }
}
