//! 統合ローダー
//!
//! ファイル発見、変数展開、パースを統合

use crate::discovery::{DiscoveredFiles, discover_files, find_project_root};
use crate::error::{ManifestError, Result};
use crate::model::Manifest;
use crate::parser::parse_manifest_string;
use crate::variables::{expand_variables, extract_variables};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, instrument};

/// プロジェクト全体をロードしてManifestを生成
///
/// 以下の処理を実行:
/// 1. プロジェクトルートの検出
/// 2. ファイルの発見（ground.kdl + ground.local.kdl）
/// 3. 変数の収集とオーバーライドの適用
/// 4. プレースホルダ展開
/// 5. KDLパース
#[instrument]
pub fn load_project() -> Result<Manifest> {
    info!("Starting project load");
    let project_root = find_project_root()?;
    load_project_from_root(&project_root)
}

/// 指定されたルートディレクトリからプロジェクトをロード
#[instrument(skip(project_root), fields(project_root = %project_root.display()))]
pub fn load_project_from_root(project_root: &Path) -> Result<Manifest> {
    load_project_with_overrides(project_root, &BTreeMap::new())
}

/// 変数オーバーライド付きでプロジェクトをロード
///
/// `overrides` は `variables` ブロックのデフォルト値を上書きします。
/// 宣言されていない変数のオーバーライドはエラーです。
#[instrument(skip(project_root, overrides), fields(project_root = %project_root.display()))]
pub fn load_project_with_overrides(
    project_root: &Path,
    overrides: &BTreeMap<String, String>,
) -> Result<Manifest> {
    // 1. ファイル発見
    debug!("Step 1: Discovering files");
    let discovered = discover_files(project_root)?;
    let content = read_all(&discovered)?;

    // 2. 変数収集 + オーバーライド適用
    debug!("Step 2: Collecting variables");
    let mut variables = extract_variables(&content)?;
    for (key, value) in overrides {
        if !variables.contains_key(key) {
            return Err(ManifestError::UnknownVariable(key.clone()));
        }
        variables.insert(key.clone(), value.clone());
    }

    // 3. プレースホルダ展開
    debug!("Step 3: Expanding variables");
    let expanded = expand_variables(&content, &variables)?;

    // 4. KDLパース
    debug!("Step 4: Parsing KDL");
    let default_name = project_root
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unnamed")
        .to_string();
    let mut manifest = parse_manifest_string(&expanded, default_name)?;

    // マニフェストには適用後の変数値を保持する
    manifest.variables = variables;

    info!(
        resources = manifest.resources.len(),
        providers = manifest.providers.len(),
        "Project loaded successfully"
    );

    Ok(manifest)
}

/// 発見されたファイルを読み込み順に連結
fn read_all(discovered: &DiscoveredFiles) -> Result<String> {
    let mut content = String::new();
    for path in discovered.in_load_order() {
        let file_content = std::fs::read_to_string(path).map_err(|e| ManifestError::IoError {
            path: (*path).clone(),
            message: e.to_string(),
        })?;
        content.push_str(&file_content);
        content.push('\n');
    }
    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_load_project_with_variables() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(
            temp_dir.path().join("ground.kdl"),
            r#"
project "net-baseline"

variables {
    region "ap-northeast-1"
}

resource "vpc" "main" {
    cidr_block "10.0.0.0/16"
    region "{{ region }}"
}
"#,
        )
        .unwrap();

        let manifest = load_project_from_root(temp_dir.path()).unwrap();
        assert_eq!(manifest.name, "net-baseline");
        assert_eq!(
            manifest.resources[0].attributes["region"],
            crate::model::AttrValue::Literal(serde_json::json!("ap-northeast-1"))
        );
    }

    #[test]
    fn test_load_project_with_override() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(
            temp_dir.path().join("ground.kdl"),
            r#"
variables {
    region "ap-northeast-1"
}

resource "vpc" "main" {
    region "{{ region }}"
}
"#,
        )
        .unwrap();

        let mut overrides = BTreeMap::new();
        overrides.insert("region".to_string(), "us-west-2".to_string());

        let manifest = load_project_with_overrides(temp_dir.path(), &overrides).unwrap();
        assert_eq!(
            manifest.resources[0].attributes["region"],
            crate::model::AttrValue::Literal(serde_json::json!("us-west-2"))
        );
    }

    #[test]
    fn test_load_project_override_unknown_variable() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join("ground.kdl"), "project \"x\"").unwrap();

        let mut overrides = BTreeMap::new();
        overrides.insert("nope".to_string(), "value".to_string());

        let result = load_project_with_overrides(temp_dir.path(), &overrides);
        assert!(matches!(result, Err(ManifestError::UnknownVariable(_))));
    }

    #[test]
    fn test_local_file_overrides_root() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(
            temp_dir.path().join("ground.kdl"),
            r#"
variables {
    region "ap-northeast-1"
}
"#,
        )
        .unwrap();
        // 後から読まれるファイルの variables が優先される
        fs::write(
            temp_dir.path().join("ground.local.kdl"),
            r#"
variables {
    region "is1b"
}
"#,
        )
        .unwrap();

        let manifest = load_project_from_root(temp_dir.path()).unwrap();
        assert_eq!(manifest.variables["region"], "is1b");
    }
}
