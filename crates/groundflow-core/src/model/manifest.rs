//! マニフェスト定義

use super::provider::ProviderConfig;
use super::resource::{Address, ResourceDeclaration};
use crate::error::{ManifestError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// マニフェスト - プロジェクトの設計図
///
/// マニフェストはプロバイダーとリソース宣言の集合を定義し、
/// それらがどのように作成・更新・破棄されるかを記述します。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    /// プロジェクト名（状態アーティファクト名の既定値）
    pub name: String,

    /// プロジェクト共通の変数（デフォルト値つき）
    #[serde(default)]
    pub variables: BTreeMap<String, String>,

    /// プロバイダー設定
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    /// リソース宣言（宣言順を保持）
    #[serde(default)]
    pub resources: Vec<ResourceDeclaration>,
}

impl Manifest {
    /// アドレスでリソース宣言を検索
    pub fn get_resource(&self, address: &Address) -> Option<&ResourceDeclaration> {
        self.resources.iter().find(|r| &r.address() == address)
    }

    /// リソースが使用するプロバイダー名を決定
    ///
    /// provider= が明示されていればそれを、なければプロバイダーが
    /// 1つだけ定義されている場合にそのプロバイダーを返します。
    pub fn provider_for(&self, declaration: &ResourceDeclaration) -> Result<&ProviderConfig> {
        let name = match &declaration.provider {
            Some(name) => name.clone(),
            None if self.providers.len() == 1 => {
                self.providers.keys().next().unwrap().clone()
            }
            None => {
                return Err(ManifestError::InvalidConfig(format!(
                    "リソース {} に provider を指定してください。定義済みプロバイダー: {}",
                    declaration.address(),
                    self.providers
                        .keys()
                        .map(|s| s.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                )));
            }
        };

        self.providers
            .get(&name)
            .ok_or(ManifestError::UnknownProvider(name))
    }
}
