//! プロバイダーノードのパース

use crate::error::{ManifestError, Result};
use crate::model::{ProviderConfig, ResourceTypeSchema};
use kdl::KdlNode;

/// provider ノードをパース
///
/// ```kdl
/// provider "cmd" name="aws" {
///     command "./providers/aws-shim"
///     resource "vpc" {
///         mutable "tags" "enable_dns_support"
///     }
/// }
/// ```
pub fn parse_provider(node: &KdlNode) -> Result<(String, ProviderConfig)> {
    let kind = node
        .entries()
        .first()
        .and_then(|e| e.value().as_string())
        .ok_or_else(|| ManifestError::InvalidConfig("provider requires a kind".to_string()))?
        .to_string();

    let name = node
        .get("name")
        .and_then(|v| v.as_string())
        .unwrap_or(&kind)
        .to_string();

    let mut provider = ProviderConfig {
        kind,
        name: name.clone(),
        ..Default::default()
    };

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "command" => {
                    provider.command = child
                        .entries()
                        .first()
                        .and_then(|e| e.value().as_string())
                        .map(|s| s.to_string());
                }
                "resource" => {
                    let (resource_type, schema) = parse_resource_schema(child)?;
                    provider.schemas.insert(resource_type, schema);
                }
                // 追加設定はconfigに保存
                other => {
                    if let Some(value) = child.entries().first().and_then(|e| e.value().as_string())
                    {
                        provider.config.insert(other.to_string(), value.to_string());
                    }
                }
            }
        }
    }

    Ok((name, provider))
}

/// provider 配下の resource スキーマノードをパース
fn parse_resource_schema(node: &KdlNode) -> Result<(String, ResourceTypeSchema)> {
    let resource_type = node
        .entries()
        .first()
        .and_then(|e| e.value().as_string())
        .ok_or_else(|| {
            ManifestError::InvalidConfig("provider の resource にはタイプ名が必要です".to_string())
        })?
        .to_string();

    let mut schema = ResourceTypeSchema::default();

    if let Some(children) = node.children() {
        for child in children.nodes() {
            if child.name().value() == "mutable" {
                for entry in child.entries() {
                    if let Some(attr) = entry.value().as_string() {
                        schema.mutable.insert(attr.to_string());
                    }
                }
            }
        }
    }

    Ok((resource_type, schema))
}
