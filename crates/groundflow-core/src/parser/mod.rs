//! KDLパーサー
//!
//! groundflowのKDLマニフェストをパースします。
//! 各ノードタイプのパース処理はモジュールに分離されています。

mod provider;
mod resource;

use provider::parse_provider;
use resource::parse_resource;

use crate::error::Result;
use crate::model::Manifest;
use kdl::KdlDocument;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

/// KDLファイルをパースしてManifestを生成
pub fn parse_manifest_file<P: AsRef<Path>>(path: P) -> Result<Manifest> {
    let content = fs::read_to_string(path.as_ref())?;
    let name = path
        .as_ref()
        .parent()
        .and_then(|p| p.file_name())
        .and_then(|n| n.to_str())
        .unwrap_or("unnamed")
        .to_string();
    parse_manifest_string(&content, name)
}

/// KDL文字列をパース
pub fn parse_manifest_string(content: &str, default_name: String) -> Result<Manifest> {
    let doc: KdlDocument = content.parse()?;

    let mut name = default_name;
    let mut variables: BTreeMap<String, String> = BTreeMap::new();
    let mut providers = HashMap::new();
    let mut resources = Vec::new();

    for node in doc.nodes() {
        match node.name().value() {
            "project" => {
                // projectノードから名前を取得
                if let Some(project_name) =
                    node.entries().first().and_then(|e| e.value().as_string())
                {
                    name = project_name.to_string();
                }
            }
            "variables" => {
                // 変数のデフォルト値（展開はローダーが行う）
                if let Some(children) = node.children() {
                    for var in children.nodes() {
                        let key = var.name().value().to_string();
                        let value = var
                            .entries()
                            .first()
                            .and_then(|e| e.value().as_string())
                            .unwrap_or("")
                            .to_string();
                        variables.insert(key, value);
                    }
                }
            }
            "provider" => {
                let (provider_name, provider) = parse_provider(node)?;
                providers.insert(provider_name, provider);
            }
            "resource" => {
                resources.push(parse_resource(node)?);
            }
            _ => {
                // 不明なノードはスキップ
            }
        }
    }

    Ok(Manifest {
        name,
        variables,
        providers,
        resources,
    })
}
