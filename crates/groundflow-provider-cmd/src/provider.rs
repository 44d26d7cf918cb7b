//! Command provider implementation
//!
//! Wire format, one process invocation per operation:
//!
//! ```text
//! argv[1]  operation: create | update | destroy
//! stdin    {"operation", "resource_type", "name", "attributes",
//!           "provider_id", "config"}
//! stdout   create  → {"id": "...", "attributes": {...}}
//!          update  → {"attributes": {...}}
//!          destroy → ignored
//! ```
//!
//! Response attributes are merged over the request attributes, so a
//! shim only needs to echo the outputs it computes.

use crate::error::CmdError;
use crate::runner::CommandRunner;
use async_trait::async_trait;
use groundflow_core::{Address, ProviderConfig, ResourceTypeSchema};
use groundflow_engine::{CreatedResource, ResourceProvider, Result};
use std::collections::BTreeMap;

/// Provider driving an external executable
pub struct CmdProvider {
    config: ProviderConfig,
    runner: CommandRunner,
}

impl CmdProvider {
    /// Build from a manifest provider block. Fails when the block has
    /// no `command`.
    pub fn from_config(config: ProviderConfig) -> std::result::Result<Self, CmdError> {
        let command = config
            .command
            .clone()
            .ok_or(CmdError::CommandNotConfigured)?;
        Ok(Self {
            config,
            runner: CommandRunner::new(command),
        })
    }

    fn request(
        &self,
        operation: &str,
        address: &Address,
        attrs: Option<&BTreeMap<String, serde_json::Value>>,
        provider_id: Option<&str>,
    ) -> serde_json::Value {
        serde_json::json!({
            "operation": operation,
            "resource_type": address.resource_type,
            "name": address.name,
            "attributes": attrs,
            "provider_id": provider_id,
            "config": self.config.config,
        })
    }
}

/// Merge response attributes over the request attributes
fn merge_attributes(
    request: &BTreeMap<String, serde_json::Value>,
    response: Option<&serde_json::Value>,
) -> BTreeMap<String, serde_json::Value> {
    let mut merged = request.clone();
    if let Some(serde_json::Value::Object(map)) = response {
        for (key, value) in map {
            merged.insert(key.clone(), value.clone());
        }
    }
    merged
}

#[async_trait]
impl ResourceProvider for CmdProvider {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn schema(&self, resource_type: &str) -> ResourceTypeSchema {
        self.config
            .schemas
            .get(resource_type)
            .cloned()
            .unwrap_or_default()
    }

    async fn create(
        &self,
        address: &Address,
        attrs: &BTreeMap<String, serde_json::Value>,
    ) -> Result<CreatedResource> {
        let request = self.request("create", address, Some(attrs), None);
        let response = self.runner.invoke("create", &request).await?;

        let provider_id = response
            .get("id")
            .and_then(|v| v.as_str())
            .ok_or(CmdError::MissingField("id"))?
            .to_string();

        let mut attributes = merge_attributes(attrs, response.get("attributes"));
        attributes.insert("id".to_string(), serde_json::json!(provider_id));

        tracing::info!(address = %address, provider_id, "Resource created");
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
        let request = self.request("update", address, Some(attrs), Some(provider_id));
        let response = self.runner.invoke("update", &request).await?;

        let mut attributes = merge_attributes(attrs, response.get("attributes"));
        attributes.insert("id".to_string(), serde_json::json!(provider_id));

        tracing::info!(address = %address, provider_id, "Resource updated");
        Ok(attributes)
    }

    async fn destroy(&self, address: &Address, provider_id: &str) -> Result<()> {
        let request = self.request("destroy", address, None, Some(provider_id));
        self.runner.invoke("destroy", &request).await?;

        tracing::info!(address = %address, provider_id, "Resource destroyed");
        Ok(())
    }
}
