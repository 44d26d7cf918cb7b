//! リソース宣言モデル
//!
//! 1つのリソースは (タイプ, 論理名) の組で識別され、
//! 属性のマッピングを保持します。属性値はリテラルまたは
//! 他リソースの属性への参照です。パース後は不変です。

use crate::error::ManifestError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// リソースアドレス（`type:name` 形式）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address {
    /// リソースタイプ（vpc, subnet, server など）
    pub resource_type: String,

    /// 論理名
    pub name: String,
}

impl Address {
    pub fn new(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.resource_type, self.name)
    }
}

impl FromStr for Address {
    type Err = ManifestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((t, n)) if !t.is_empty() && !n.is_empty() => Ok(Self::new(t, n)),
            _ => Err(ManifestError::InvalidConfig(format!(
                "リソースアドレスは type:name 形式で指定してください: {s}"
            ))),
        }
    }
}

/// 属性値 — リテラルまたは他リソースの属性への参照
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttrValue {
    /// そのまま使用されるリテラル値
    Literal(serde_json::Value),

    /// 他リソースの出力属性への参照
    Reference {
        /// 参照先リソース
        target: Address,
        /// 参照先の属性名
        attr: String,
    },
}

impl AttrValue {
    pub fn literal(value: impl Into<serde_json::Value>) -> Self {
        Self::Literal(value.into())
    }

    pub fn reference(target: Address, attr: impl Into<String>) -> Self {
        Self::Reference {
            target,
            attr: attr.into(),
        }
    }

    pub fn as_reference(&self) -> Option<(&Address, &str)> {
        match self {
            Self::Reference { target, attr } => Some((target, attr)),
            Self::Literal(_) => None,
        }
    }
}

/// リソース宣言
///
/// KDLの `resource` ノード1つに対応します。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceDeclaration {
    /// リソースタイプ
    pub resource_type: String,

    /// 論理名
    pub name: String,

    /// 使用するプロバイダー名（省略時はマニフェストの既定値）
    #[serde(default)]
    pub provider: Option<String>,

    /// 属性名 → 値のマッピング
    #[serde(default)]
    pub attributes: BTreeMap<String, AttrValue>,

    /// 明示的な順序ヒント
    #[serde(default)]
    pub depends_on: Vec<Address>,
}

impl ResourceDeclaration {
    pub fn address(&self) -> Address {
        Address::new(&self.resource_type, &self.name)
    }

    /// 参照・depends_on から導かれる依存先アドレスの一覧（重複除去、宣言順）
    pub fn dependency_addresses(&self) -> Vec<Address> {
        let mut seen = Vec::new();
        for addr in self.depends_on.iter().cloned().chain(
            self.attributes
                .values()
                .filter_map(|v| v.as_reference().map(|(t, _)| t.clone())),
        ) {
            if !seen.contains(&addr) {
                seen.push(addr);
            }
        }
        seen
    }
}
