//! リソースノードのパース

use crate::error::{ManifestError, Result};
use crate::model::{AttrValue, ResourceDeclaration};
use kdl::{KdlNode, KdlValue};
use std::collections::BTreeMap;

/// resource ノードをパース
///
/// サポートされる形式:
///
/// ```kdl
/// resource "subnet" "public-a" provider="aws" {
///     depends_on "vpc:main"
///     vpc_id ref="vpc:main" attr="id"
///     cidr_block "10.0.1.0/24"
///     tags "web" "public"
/// }
/// ```
pub fn parse_resource(node: &KdlNode) -> Result<ResourceDeclaration> {
    let resource_type = node
        .entries()
        .first()
        .and_then(|e| e.value().as_string())
        .ok_or_else(|| ManifestError::InvalidConfig("resource requires a type".to_string()))?
        .to_string();

    let name = node
        .entries()
        .get(1)
        .and_then(|e| e.value().as_string())
        .ok_or_else(|| ManifestError::InvalidConfig("resource requires a name".to_string()))?
        .to_string();

    let provider = node
        .get("provider")
        .and_then(|v| v.as_string())
        .map(|s| s.to_string());

    let mut attributes = BTreeMap::new();
    let mut depends_on = Vec::new();

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "depends_on" => {
                    for entry in child.entries() {
                        let target = entry.value().as_string().ok_or_else(|| {
                            ManifestError::InvalidConfig(format!(
                                "{resource_type}:{name} の depends_on は文字列で指定してください"
                            ))
                        })?;
                        depends_on.push(target.parse()?);
                    }
                }
                attr_name => {
                    let value = parse_attribute(child, &resource_type, &name)?;
                    attributes.insert(attr_name.to_string(), value);
                }
            }
        }
    }

    Ok(ResourceDeclaration {
        resource_type,
        name,
        provider,
        attributes,
        depends_on,
    })
}

/// 属性ノードをパース
///
/// `ref=` プロパティを持つノードは参照、それ以外はリテラル。
/// リテラルは位置引数が1つならスカラー、複数なら配列になります。
fn parse_attribute(node: &KdlNode, resource_type: &str, name: &str) -> Result<AttrValue> {
    if let Some(target) = node.get("ref").and_then(|v| v.as_string()) {
        let attr = node
            .get("attr")
            .and_then(|v| v.as_string())
            .unwrap_or("id")
            .to_string();
        return Ok(AttrValue::Reference {
            target: target.parse()?,
            attr,
        });
    }

    // 位置引数のみをリテラル値として扱う（名前付きエントリは無視）
    let values: Vec<serde_json::Value> = node
        .entries()
        .iter()
        .filter(|e| e.name().is_none())
        .map(|e| kdl_to_json(e.value()))
        .collect();

    match values.len() {
        0 => Err(ManifestError::InvalidConfig(format!(
            "{resource_type}:{name} の属性 {} に値がありません",
            node.name().value()
        ))),
        1 => Ok(AttrValue::Literal(values.into_iter().next().unwrap())),
        _ => Ok(AttrValue::Literal(serde_json::Value::Array(values))),
    }
}

/// KDL値をJSON値へ変換
fn kdl_to_json(value: &KdlValue) -> serde_json::Value {
    if let Some(s) = value.as_string() {
        serde_json::Value::String(s.to_string())
    } else if let Some(i) = value.as_integer() {
        serde_json::Value::from(i as i64)
    } else if let Some(f) = value.as_float() {
        serde_json::json!(f)
    } else if let Some(b) = value.as_bool() {
        serde_json::Value::Bool(b)
    } else {
        serde_json::Value::Null
    }
}
