//! Provider capability trait and registry
//!
//! Provider-specific resource behavior is modelled as a pluggable
//! capability per resource type: create/update/destroy plus the
//! mutable-attribute schema the planner consults to decide between
//! update-in-place and replacement.

use crate::error::{EngineError, Result};
use async_trait::async_trait;
use groundflow_core::{Address, ResourceTypeSchema};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Result of a successful create operation
#[derive(Debug, Clone)]
pub struct CreatedResource {
    /// Provider-assigned identifier
    pub provider_id: String,

    /// Full attribute set, inputs plus provider outputs
    pub attributes: BTreeMap<String, serde_json::Value>,
}

/// Provider capability for resource operations
///
/// Implementations receive the resource address alongside the resolved
/// attributes so they can tag and log created resources; the address
/// carries no provider semantics.
#[async_trait]
pub trait ResourceProvider: Send + Sync {
    /// Returns the provider name (matches the manifest's provider name)
    fn name(&self) -> &str;

    /// Attribute schema for a resource type. Attributes not listed as
    /// mutable force replacement on change. Unknown types default to
    /// all-immutable.
    fn schema(&self, resource_type: &str) -> ResourceTypeSchema;

    /// Create the resource, returning its provider id and attributes
    async fn create(
        &self,
        address: &Address,
        attrs: &BTreeMap<String, serde_json::Value>,
    ) -> Result<CreatedResource>;

    /// Update the resource in place, returning the new attributes
    async fn update(
        &self,
        address: &Address,
        provider_id: &str,
        attrs: &BTreeMap<String, serde_json::Value>,
    ) -> Result<BTreeMap<String, serde_json::Value>>;

    /// Destroy the resource
    async fn destroy(&self, address: &Address, provider_id: &str) -> Result<()>;
}

/// Registry of providers indexed by name
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn ResourceProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, provider: Arc<dyn ResourceProvider>) {
        self.providers.insert(provider.name().to_string(), provider);
    }

    pub fn get(&self, name: &str) -> Result<&Arc<dyn ResourceProvider>> {
        self.providers
            .get(name)
            .ok_or_else(|| EngineError::ProviderNotFound(name.to_string()))
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
