//! 元数据标签及其查询。

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::types::{DialectFlags, Timeline};

static METADATA_TAG_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[(?P<key>[A-Za-z][A-Za-z0-9_-]*):(?P<value>.*)]$")
        .expect("编译 METADATA_TAG_REGEX 失败")
});

/// 声明计时粒度的标签键，例如 `[timing:syllable]`。
pub const TIMING_TAG_KEY: &str = "timing";

/// `[key:value]` 形式的元数据标签。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataTag {
    /// 键，按原样保存，比较时不区分大小写
    pub key: String,
    /// 值，按原样保存（包括首尾空白）
    pub value: String,
    /// 该标签出现在行序列中第几项之前
    #[serde(default)]
    pub position: usize,
}

impl MetadataTag {
    /// 创建一个位于文件头部的标签。
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            position: 0,
        }
    }

    /// 键是否与给定名称相同（不区分大小写）。
    #[must_use]
    pub fn has_key(&self, key: &str) -> bool {
        self.key.eq_ignore_ascii_case(key)
    }
}

/// `[timing:...]` 标签声明的计时粒度。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum TimingDeclaration {
    /// 逐行
    Line,
    /// 逐字
    Word,
    /// 逐音节
    Syllable,
}

impl TimingDeclaration {
    /// 该声明对应的格式特征。
    #[must_use]
    pub const fn dialect(self) -> DialectFlags {
        match self {
            Self::Line => DialectFlags::empty(),
            Self::Word => DialectFlags::WORD_TIMING,
            Self::Syllable => DialectFlags::WORD_TIMING.union(DialectFlags::SYLLABLE_TIMING),
        }
    }
}

/// 把一整段 `[key:value]` 拆成键和值，不是标签形状时返回 `None`。
pub(crate) fn split_tag(raw: &str) -> Option<(&str, &str)> {
    let caps = METADATA_TAG_REGEX.captures(raw)?;
    Some((caps.name("key")?.as_str(), caps.name("value")?.as_str()))
}

impl Timeline {
    /// 查找某个键的最后一个值（去掉首尾空白），不区分大小写。
    #[must_use]
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags
            .iter()
            .rev()
            .find(|tag| tag.has_key(key))
            .map(|tag| tag.value.trim())
    }

    /// 按出现顺序返回某个键的全部值。
    #[must_use]
    pub fn tag_values(&self, key: &str) -> Vec<&str> {
        self.tags
            .iter()
            .filter(|tag| tag.has_key(key))
            .map(|tag| tag.value.trim())
            .collect()
    }

    /// 设置某个键的值。
    ///
    /// 已有同名标签时，保留第一个的位置并删除其余的；否则在文件头部追加。
    pub fn set_tag(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.tags.iter().position(|tag| tag.has_key(key)) {
            Some(first) => {
                self.tags[first].value = value;
                let mut index = 0;
                self.tags.retain(|tag| {
                    let keep = index <= first || !tag.has_key(key);
                    index += 1;
                    keep
                });
            }
            None => self.tags.push(MetadataTag::new(key, value)),
        }
    }

    /// 删除某个键的全部标签，返回删除的数量。
    pub fn remove_tag(&mut self, key: &str) -> usize {
        let before = self.tags.len();
        self.tags.retain(|tag| !tag.has_key(key));
        before - self.tags.len()
    }
}
