//! Test doubles shared by the planner and executor tests

use crate::error::{EngineError, Result};
use crate::provider::{CreatedResource, ProviderRegistry, ResourceProvider};
use async_trait::async_trait;
use groundflow_core::{
    Address, AttrValue, DependencyGraph, Manifest, ResourceTypeSchema, parse_manifest_string,
};
use groundflow_state::{StateDocument, StateRecord};
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Scripted in-process provider
pub(crate) struct MockProvider {
    name: String,
    schemas: BTreeMap<String, ResourceTypeSchema>,
    fail_on: Mutex<HashSet<String>>,
    /// Operation log, e.g. "create vpc:main"
    calls: Mutex<Vec<String>>,
    counter: AtomicU64,
}

impl MockProvider {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            schemas: BTreeMap::new(),
            fail_on: Mutex::new(HashSet::new()),
            calls: Mutex::new(Vec::new()),
            counter: AtomicU64::new(0),
        }
    }

    pub fn with_schemas(mut self, schemas: BTreeMap<String, ResourceTypeSchema>) -> Self {
        self.schemas = schemas;
        self
    }

    /// Make every operation on `address` fail
    pub fn fail_on(&self, address: &str) {
        self.fail_on.lock().unwrap().insert(address.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn check_failure(&self, op: &str, address: &Address) -> Result<()> {
        if self.fail_on.lock().unwrap().contains(&address.to_string()) {
            return Err(EngineError::Provider(format!(
                "simulated {op} failure on {address}"
            )));
        }
        Ok(())
    }

    fn log(&self, op: &str, address: &Address) {
        self.calls.lock().unwrap().push(format!("{op} {address}"));
    }
}

#[async_trait]
impl ResourceProvider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn schema(&self, resource_type: &str) -> ResourceTypeSchema {
        self.schemas.get(resource_type).cloned().unwrap_or_default()
    }

    async fn create(
        &self,
        address: &Address,
        attrs: &BTreeMap<String, serde_json::Value>,
    ) -> Result<CreatedResource> {
        self.check_failure("create", address)?;
        self.log("create", address);

        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        let provider_id = format!("{}-{:04}", address.resource_type, n);
        let mut attributes = attrs.clone();
        attributes.insert("id".to_string(), serde_json::json!(provider_id));
        Ok(CreatedResource {
            provider_id,
            attributes,
        })
    }

    async fn update(
        &self,
        address: &Address,
        provider_id: &str,
        attrs: &BTreeMap<String, serde_json::Value>,
    ) -> Result<BTreeMap<String, serde_json::Value>> {
        self.check_failure("update", address)?;
        self.log("update", address);

        let mut attributes = attrs.clone();
        attributes.insert("id".to_string(), serde_json::json!(provider_id));
        Ok(attributes)
    }

    async fn destroy(&self, address: &Address, _provider_id: &str) -> Result<()> {
        self.check_failure("destroy", address)?;
        self.log("destroy", address);
        Ok(())
    }
}

/// Parse a manifest and build its graph
pub(crate) fn manifest_and_graph(kdl: &str) -> (Manifest, DependencyGraph) {
    let manifest = parse_manifest_string(kdl, "test".to_string()).unwrap();
    let graph = DependencyGraph::build(&manifest.resources).unwrap();
    (manifest, graph)
}

/// Mock provider carrying the schemas declared in the manifest
pub(crate) fn mock_provider(manifest: &Manifest, name: &str) -> Arc<MockProvider> {
    let schemas = manifest
        .providers
        .get(name)
        .map(|p| p.schemas.clone())
        .unwrap_or_default();
    Arc::new(MockProvider::new(name).with_schemas(schemas))
}

/// Registry with one mock per provider declared in the manifest
pub(crate) fn registry_with(manifest: &Manifest) -> ProviderRegistry {
    let mut registry = ProviderRegistry::new();
    for config in manifest.providers.values() {
        registry.register(mock_provider(manifest, &config.name));
    }
    registry
}

/// The state document a clean apply of the manifest would leave behind
pub(crate) fn state_after_apply(manifest: &Manifest, graph: &DependencyGraph) -> StateDocument {
    let mut doc = StateDocument::new();
    let mut counter = 0u64;

    for node in graph.topological() {
        let decl = &node.declaration;
        let address = node.address();
        let provider = manifest.provider_for(decl).unwrap();

        counter += 1;
        let provider_id = format!("{}-{:04}", decl.resource_type, counter);

        let mut attributes = BTreeMap::new();
        for (name, value) in &decl.attributes {
            let resolved = match value {
                AttrValue::Literal(v) => v.clone(),
                AttrValue::Reference { target, attr } => doc
                    .get_record(&target.to_string())
                    .and_then(|r| r.get_attribute(attr))
                    .cloned()
                    .unwrap(),
            };
            attributes.insert(name.clone(), resolved);
        }
        attributes.insert("id".to_string(), serde_json::json!(provider_id));

        let mut record = StateRecord::new(address.to_string())
            .with_provider(&provider.name)
            .with_provider_id(&provider_id)
            .with_dependencies(node.depends_on.iter().map(|a| a.to_string()).collect());
        record.attributes = attributes;
        doc.set_record(address.to_string(), record);
        doc.serial += 1;
    }

    doc
}
