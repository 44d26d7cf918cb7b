//! プロバイダー設定モデル
//!
//! マニフェストで宣言されるプロバイダー（cmd など）の定義

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// プロバイダー設定
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// プロバイダー種別（cmd など）
    pub kind: String,

    /// プロバイダー名（リソースの provider= で参照される）
    pub name: String,

    /// 実行コマンド（cmd プロバイダー用）
    pub command: Option<String>,

    /// リソースタイプごとの属性スキーマ
    #[serde(default)]
    pub schemas: BTreeMap<String, ResourceTypeSchema>,

    /// 追加設定（プロバイダー固有）
    #[serde(default)]
    pub config: HashMap<String, String>,
}

/// リソースタイプのスキーマ
///
/// `mutable` に含まれない属性の変更は再作成（Replace）を要求します。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceTypeSchema {
    /// インプレース更新可能な属性名
    #[serde(default)]
    pub mutable: BTreeSet<String>,
}

impl ProviderConfig {
    /// 指定タイプの属性がインプレース更新可能か
    pub fn is_mutable(&self, resource_type: &str, attr: &str) -> bool {
        self.schemas
            .get(resource_type)
            .map(|s| s.mutable.contains(attr))
            .unwrap_or(false)
    }
}
