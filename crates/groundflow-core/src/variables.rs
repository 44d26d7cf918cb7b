//! 変数展開
//!
//! KDLテキスト中の `{{ name }}` / `{{ env.NAME }}` プレースホルダを
//! パース前に展開します。変数のデフォルト値は `variables` ブロックで
//! 宣言され、呼び出し側（CLIの --var など）が上書きできます。

use crate::error::{ManifestError, Result};
use kdl::KdlDocument;
use regex::Regex;
use std::collections::BTreeMap;

/// KDLテキストから `variables` ブロックを収集
///
/// 展開前の生テキストに対して呼ばれるため、プレースホルダを含む
/// 文字列値もそのまま保持されます。
pub fn extract_variables(content: &str) -> Result<BTreeMap<String, String>> {
    let doc: KdlDocument = content.parse()?;
    let mut variables = BTreeMap::new();

    for node in doc.nodes() {
        if node.name().value() == "variables"
            && let Some(children) = node.children()
        {
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

    Ok(variables)
}

/// プレースホルダを展開する（`{{ name }}` / `{{ env.NAME }}` 形式）
///
/// 未定義の変数・環境変数は `UnknownVariable` で失敗します。
pub fn expand_variables(content: &str, variables: &BTreeMap<String, String>) -> Result<String> {
    let pattern = Regex::new(r"\{\{\s*([A-Za-z0-9_][A-Za-z0-9_.\-]*)\s*\}\}").unwrap();

    let mut result = String::with_capacity(content.len());
    let mut last_end = 0;

    for caps in pattern.captures_iter(content) {
        let whole = caps.get(0).unwrap();
        let name = &caps[1];

        let value = if let Some(env_name) = name.strip_prefix("env.") {
            std::env::var(env_name)
                .map_err(|_| ManifestError::UnknownVariable(name.to_string()))?
        } else {
            variables
                .get(name)
                .cloned()
                .ok_or_else(|| ManifestError::UnknownVariable(name.to_string()))?
        };

        result.push_str(&content[last_end..whole.start()]);
        result.push_str(&value);
        last_end = whole.end();
    }
    result.push_str(&content[last_end..]);

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_variables() {
        let content = r#"
variables {
    region "ap-northeast-1"
    vpc-cidr "10.0.0.0/16"
}
"#;
        let vars = extract_variables(content).unwrap();
        assert_eq!(vars.get("region").unwrap(), "ap-northeast-1");
        assert_eq!(vars.get("vpc-cidr").unwrap(), "10.0.0.0/16");
    }

    #[test]
    fn test_expand_variables() {
        let mut vars = BTreeMap::new();
        vars.insert("region".to_string(), "ap-northeast-1".to_string());

        let expanded = expand_variables(r#"zone "{{ region }}a""#, &vars).unwrap();
        assert_eq!(expanded, r#"zone "ap-northeast-1a""#);
    }

    #[test]
    fn test_expand_unknown_variable() {
        let vars = BTreeMap::new();
        let err = expand_variables("value \"{{ missing }}\"", &vars).unwrap_err();
        assert!(matches!(err, ManifestError::UnknownVariable(name) if name == "missing"));
    }

    #[test]
    fn test_expand_env_variable() {
        // 他のテストと衝突しないキー名を使う
        unsafe { std::env::set_var("GROUNDFLOW_TEST_REGION", "tk1a") };
        let vars = BTreeMap::new();
        let expanded =
            expand_variables("zone \"{{ env.GROUNDFLOW_TEST_REGION }}\"", &vars).unwrap();
        assert_eq!(expanded, "zone \"tk1a\"");
    }

    #[test]
    fn test_expand_leaves_plain_text() {
        let vars = BTreeMap::new();
        let content = r#"cidr_block "10.0.0.0/16""#;
        assert_eq!(expand_variables(content, &vars).unwrap(), content);
    }
}
