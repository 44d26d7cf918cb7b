//! プロジェクトのロードとエンジン部品の組み立て

use groundflow_core::{DependencyGraph, Manifest};
use groundflow_engine::ProviderRegistry;
use groundflow_provider_cmd::CmdProvider;
use groundflow_state::{FileLockManager, LocalStateStore};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// ロード済みプロジェクト一式
pub struct Project {
    pub root: PathBuf,
    pub manifest: Manifest,
    pub graph: DependencyGraph,
    pub registry: ProviderRegistry,
    pub store: Arc<LocalStateStore>,
    pub locks: Arc<FileLockManager>,
}

impl Project {
    /// プロジェクトルートを検出してマニフェスト・グラフ・プロバイダーを準備
    pub fn load(vars: &[String]) -> anyhow::Result<Self> {
        let root = groundflow_core::find_project_root()?;
        let overrides = parse_overrides(vars)?;
        let manifest = groundflow_core::load_project_with_overrides(&root, &overrides)?;
        let graph = DependencyGraph::build(&manifest.resources)?;
        let registry = build_registry(&manifest, &root)?;

        Ok(Self {
            store: Arc::new(LocalStateStore::new(&root)),
            locks: Arc::new(FileLockManager::new(&root)),
            root,
            manifest,
            graph,
            registry,
        })
    }

    /// 状態アーティファクト名（プロジェクト名を使用）
    pub fn artifact(&self) -> &str {
        &self.manifest.name
    }
}

/// `KEY=VALUE` 形式の --var 引数をパース
fn parse_overrides(vars: &[String]) -> anyhow::Result<BTreeMap<String, String>> {
    let mut overrides = BTreeMap::new();
    for var in vars {
        let Some((key, value)) = var.split_once('=') else {
            anyhow::bail!("--var は KEY=VALUE 形式で指定してください: {var}");
        };
        overrides.insert(key.trim().to_string(), value.trim().to_string());
    }
    Ok(overrides)
}

/// マニフェストのプロバイダー宣言からレジストリを構築
fn build_registry(manifest: &Manifest, root: &Path) -> anyhow::Result<ProviderRegistry> {
    let mut registry = ProviderRegistry::new();

    for config in manifest.providers.values() {
        match config.kind.as_str() {
            "cmd" => {
                let mut config = config.clone();
                // 相対パスのコマンドはプロジェクトルート基準で解決
                if let Some(command) = &config.command {
                    let path = Path::new(command);
                    if path.is_relative() {
                        config.command = Some(root.join(path).to_string_lossy().to_string());
                    }
                }
                registry.register(Arc::new(CmdProvider::from_config(config)?));
            }
            other => {
                anyhow::bail!(
                    "未対応のプロバイダー種別です: {other}（プロバイダー {}）",
                    config.name
                );
            }
        }
    }

    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_overrides() {
        let overrides =
            parse_overrides(&["region=us-west-2".to_string(), "size = 3".to_string()]).unwrap();
        assert_eq!(overrides["region"], "us-west-2");
        assert_eq!(overrides["size"], "3");
    }

    #[test]
    fn test_parse_overrides_rejects_bare_key() {
        assert!(parse_overrides(&["region".to_string()]).is_err());
    }
}
