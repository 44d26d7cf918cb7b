//! プロジェクトファイルの発見
//!
//! カレントディレクトリから上に向かって ground.kdl を探し、
//! プロジェクトルートとマニフェストファイル群を特定します。

use crate::error::{ManifestError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// ルートマニフェストのファイル名
pub const ROOT_FILE: &str = "ground.kdl";

/// ローカルオーバーライドのファイル名（gitignore想定）
pub const LOCAL_FILE: &str = "ground.local.kdl";

/// 発見されたマニフェストファイル群
#[derive(Debug, Clone)]
pub struct DiscoveredFiles {
    /// ground.kdl
    pub root: PathBuf,

    /// ground.local.kdl（存在する場合のみ）
    pub local: Option<PathBuf>,
}

impl DiscoveredFiles {
    /// 読み込み順のファイル一覧（後のファイルが前を上書き）
    pub fn in_load_order(&self) -> Vec<&PathBuf> {
        let mut files = vec![&self.root];
        if let Some(local) = &self.local {
            files.push(local);
        }
        files
    }
}

/// プロジェクトルートを探す
pub fn find_project_root() -> Result<PathBuf> {
    // 1. 環境変数
    if let Ok(root) = std::env::var("GROUNDFLOW_PROJECT_ROOT") {
        let path = PathBuf::from(&root);
        debug!(env_root = %root, "Checking GROUNDFLOW_PROJECT_ROOT");
        if path.join(ROOT_FILE).exists() {
            info!(project_root = %path.display(), "Found project root from environment variable");
            return Ok(path);
        }
    }

    // 2. カレントディレクトリから上に向かって探す
    let start_dir = std::env::current_dir()?;
    find_project_root_from(&start_dir)
}

/// 指定ディレクトリから上に向かってプロジェクトルートを探す
pub fn find_project_root_from(start_dir: &Path) -> Result<PathBuf> {
    let mut current = start_dir.to_path_buf();
    debug!(start_dir = %start_dir.display(), "Searching for project root");

    loop {
        let root_file = current.join(ROOT_FILE);
        debug!(checking = %current.display(), "Looking for ground.kdl");
        if root_file.exists() {
            info!(project_root = %current.display(), "Found project root");
            return Ok(current);
        }

        // 親ディレクトリへ
        if !current.pop() {
            break;
        }
    }

    warn!(start_dir = %start_dir.display(), "Project root not found");
    Err(ManifestError::ProjectRootNotFound(start_dir.to_path_buf()))
}

/// プロジェクトルート配下のマニフェストファイルを発見
pub fn discover_files(project_root: &Path) -> Result<DiscoveredFiles> {
    let root = project_root.join(ROOT_FILE);
    if !root.exists() {
        return Err(ManifestError::ProjectRootNotFound(
            project_root.to_path_buf(),
        ));
    }

    let local_path = project_root.join(LOCAL_FILE);
    let local = local_path.exists().then_some(local_path);

    Ok(DiscoveredFiles { root, local })
}
