use std::{collections::BTreeSet, path::Path};

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::error::SplError;

/// 默认的警告数量上限。
pub const DEFAULT_MAX_WARNINGS: usize = 1000;

/// SPL 解析选项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Builder)]
#[builder(setter(into), default)]
#[serde(default)]
pub struct ParseOptions {
    /// 警告数量超过该值时解析失败。
    pub max_warnings: usize,
    /// 为 `true` 时，行内时间戳倒退是致命错误而不是警告。
    pub strict_monotonicity: bool,
    /// 哪些标签键用来声明翻译行的语言代码，不区分大小写。
    ///
    /// 例如 `[tr:zh]` 声明之后，`[zh]你好` 会被当作翻译行。
    pub translation_tag_keys: BTreeSet<String>,
    /// 输入的最大字节数，`None` 表示不限制。
    pub max_input_bytes: Option<usize>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_warnings: DEFAULT_MAX_WARNINGS,
            strict_monotonicity: false,
            translation_tag_keys: ["tr", "translation"]
                .into_iter()
                .map(str::to_string)
                .collect(),
            max_input_bytes: None,
        }
    }
}

impl ParseOptions {
    /// 从 TOML 文本读取选项，缺省的字段取默认值。
    ///
    /// # Errors
    ///
    /// TOML 语法错误或字段类型不匹配时返回 [`SplError::Config`]。
    pub fn from_toml_str(text: &str) -> Result<Self, SplError> {
        Ok(toml::from_str(text)?)
    }

    /// 从 TOML 文件读取选项。
    ///
    /// # Errors
    ///
    /// 文件读取失败时返回 [`SplError::Io`]，内容无效时返回 [`SplError::Config`]。
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, SplError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// 该键是否被配置为翻译语言声明键。
    #[must_use]
    pub fn is_translation_key(&self, key: &str) -> bool {
        self.translation_tag_keys
            .iter()
            .any(|k| k.eq_ignore_ascii_case(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_overrides_defaults() {
        let options = ParseOptionsBuilder::default()
            .max_warnings(10usize)
            .strict_monotonicity(true)
            .build()
            .unwrap();
        assert_eq!(options.max_warnings, 10);
        assert!(options.strict_monotonicity);
        assert!(options.is_translation_key("TR"));
        assert_eq!(options.max_input_bytes, None);
    }

    #[test]
    fn test_from_toml_fills_missing_fields() {
        let options = ParseOptions::from_toml_str(
            r#"
            max_warnings = 5
            translation_tag_keys = ["lang"]
            "#,
        )
        .unwrap();
        assert_eq!(options.max_warnings, 5);
        assert!(options.is_translation_key("Lang"));
        assert!(!options.is_translation_key("tr"));
        assert!(!options.strict_monotonicity);
    }

    #[test]
    fn test_from_toml_rejects_wrong_types() {
        assert!(matches!(
            ParseOptions::from_toml_str("max_warnings = \"many\""),
            Err(SplError::Config(_))
        ));
    }
}
