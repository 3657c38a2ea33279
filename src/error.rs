use std::{fmt, io};

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};
use thiserror::Error;

/// 解析与生成 SPL 歌词时可能发生的致命错误。
///
/// 非致命问题不会走到这里，而是作为 [`Warning`] 随解析结果一起返回。
#[derive(Error, Debug)]
pub enum SplError {
    /// 时间戳字面量不符合 `[分:]秒[.小数]` 语法。
    #[error("无效的时间戳字面量: {0:?}")]
    InvalidTimestampLiteral(String),
    /// 警告数量超过了 `ParseOptions::max_warnings`。
    #[error("第 {line_number} 行处警告数量超过上限 {limit}")]
    TooManyWarnings {
        /// 配置的上限
        limit: usize,
        /// 触发上限时正在处理的行号（从 1 开始）
        line_number: usize,
    },
    /// 严格模式下，行内时间戳出现倒退。
    #[error("第 {line_number} 行时间戳倒退: {found}ms 早于前一个时间戳 {previous}ms")]
    NonMonotonicTimestamp {
        /// 出错的行号（从 1 开始）
        line_number: usize,
        /// 前一个时间戳（毫秒）
        previous: u64,
        /// 倒退的时间戳（毫秒）
        found: u64,
    },
    /// 输入超过了 `ParseOptions::max_input_bytes`。
    #[error("输入大小 {size} 字节超过上限 {limit} 字节")]
    InputTooLarge {
        /// 输入字节数
        size: usize,
        /// 配置的上限
        limit: usize,
    },
    /// 偏移后会产生负的时间戳。
    #[error("偏移 {delta}ms 会使时间戳 {timestamp}ms 变为负数")]
    WouldProduceNegativeTimestamp {
        /// 请求的偏移量（毫秒）
        delta: i64,
        /// 第一个越界的原始时间戳（毫秒）
        timestamp: u64,
    },
    /// 输入不是合法的 UTF-8 文本。
    #[error("UTF-8 转换错误: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),
    /// 字符串格式化错误。
    #[error("格式错误: {0}")]
    Format(#[from] fmt::Error),
    /// 文件读写等IO错误。
    #[error("IO 错误: {0}")]
    Io(#[from] io::Error),
    /// 配置文件解析失败。
    #[error("解析配置失败: {0}")]
    Config(#[from] toml::de::Error),
}

impl From<SplError> for std::io::Error {
    fn from(err: SplError) -> Self {
        Self::other(err)
    }
}

/// 非致命问题的类别。
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[strum(ascii_case_insensitive)]
pub enum WarningKind {
    /// 形似时间戳但无法解析的标记，例如 `<00:7x.00>`。
    InvalidTimestampLiteral,
    /// 行内时间戳早于前一个时间戳，已被钳制。
    NonMonotonicTimestamp,
    /// 单词文本无法还原出行文本，或音节无法还原出单词文本。
    TextReconstructionMismatch,
    /// 无法识别的行，已原样保留。
    UnrecognizedLineKind,
    /// 翻译行之前没有可以挂靠的歌词行。
    OrphanTranslationLine,
    /// 缺少闭合括号的标记，已作为普通文本保留。
    MalformedMarkerBracket,
    /// 源文本的排版在重新生成时会被规范化。
    NormalizedLayout,
    /// 歌词行的开始时间早于前一行。
    UnsortedLine,
}

/// 解析过程中产生的一条警告。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    /// 警告类别
    pub kind: WarningKind,
    /// 源文件中的行号（从 1 开始），0 表示与具体行无关
    pub line_number: usize,
    /// 人类可读的描述
    pub message: String,
}

impl Warning {
    pub(crate) fn new(kind: WarningKind, line_number: usize, message: impl Into<String>) -> Self {
        Self {
            kind,
            line_number,
            message: message.into(),
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.line_number == 0 {
            write!(f, "[{}] {}", self.kind, self.message)
        } else {
            write!(f, "第 {} 行 [{}] {}", self.line_number, self.kind, self.message)
        }
    }
}
