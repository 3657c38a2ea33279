//! # 核心数据模型
//!
//! 一次解析构建出一棵所有权树：[`Timeline`] 拥有标签和行序列，
//! 行拥有单词，单词拥有音节。树中没有共享节点，也没有环。

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::metadata::MetadataTag;
use crate::timestamp::Timestamp;

bitflags! {
    /// 解析时观察到的格式特征，生成时据此还原原文件的写法。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct DialectFlags: u16 {
        /// 出现了逐字的 `<时间戳>` 标记
        const WORD_TIMING           = 1 << 0;
        /// 出现了单词内部的音节标记
        const SYLLABLE_TIMING       = 1 << 1;
        /// 出现了翻译行
        const TRANSLATION_LINES     = 1 << 2;
        /// 时间戳使用三位小数
        const MILLISECOND_PRECISION = 1 << 3;
        /// 出现了行尾的 `[时间戳]`
        const EXPLICIT_LINE_ENDS    = 1 << 4;
        /// 出现了 `[t1][t2]` 形式的重复行
        const REPEATED_LINE_STARTS  = 1 << 5;
        /// 使用 CRLF 换行
        const CRLF_LINE_ENDINGS     = 1 << 6;
        /// 文件以换行符结尾
        const FINAL_NEWLINE         = 1 << 7;
        /// 文件以 UTF-8 BOM 开头
        const BYTE_ORDER_MARK       = 1 << 8;
    }
}

impl DialectFlags {
    /// 是否需要在行内输出时间标记。
    #[must_use]
    pub const fn has_inline_timing(self) -> bool {
        self.intersects(Self::WORD_TIMING.union(Self::SYLLABLE_TIMING))
    }
}

/// 一段歌词内容的起止时间。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Span {
    /// 开始时间
    pub start: Timestamp,
    /// 结束时间，`None` 表示开放（文件的最后一个元素）
    pub end: Option<Timestamp>,
    /// 结束时间是否由源文本中的标记给出，而不是推断得到
    #[serde(default)]
    pub explicit_end: bool,
}

impl Span {
    /// 只有开始时间的开放区间。
    #[must_use]
    pub const fn open(start: Timestamp) -> Self {
        Self {
            start,
            end: None,
            explicit_end: false,
        }
    }

    /// 推断得到的闭区间。
    #[must_use]
    pub const fn closed(start: Timestamp, end: Timestamp) -> Self {
        Self {
            start,
            end: Some(end),
            explicit_end: false,
        }
    }

    /// 左闭右开地判断时间点是否落在区间内，开放的结束时间视为无穷。
    #[must_use]
    pub fn contains(&self, t: Timestamp) -> bool {
        t >= self.start && self.end.is_none_or(|end| t < end)
    }

    /// 时长，开放区间返回 `None`。
    #[must_use]
    pub fn duration_ms(&self) -> Option<u64> {
        self.end.map(|end| end.0.saturating_sub(self.start.0))
    }
}

/// 单词内部的一个音节。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Syllable {
    /// 音节文本
    pub text: String,
    /// 音节时间
    pub span: Span,
}

/// 以空白分隔的一个单词。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Word {
    /// 单词文本，不含空白
    pub text: String,
    /// 单词时间
    pub span: Span,
    /// 音节列表，为空表示整个单词只有一个隐式音节
    #[serde(default)]
    pub syllables: Vec<Syllable>,
    /// 开始时间是否由紧邻的行内标记给出
    #[serde(default)]
    pub timed: bool,
}

impl Word {
    /// 创建一个没有音节、开始时间继承而来的单词。
    #[must_use]
    pub fn new(text: impl Into<String>, span: Span) -> Self {
        Self {
            text: text.into(),
            span,
            syllables: Vec::new(),
            timed: false,
        }
    }
}

/// 翻译行的书写方式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TranslationStyle {
    /// 紧跟在歌词行之后的无时间戳行
    Implicit,
    /// 重复了歌词行开始时间的 `[t]文本` 行
    SameTimestamp,
    /// 由翻译标签声明过语言的 `[lang]文本` 行
    LanguageTagged,
}

/// 挂靠在某个歌词行下的翻译。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Translation {
    /// 翻译文本，原样保留
    pub text: String,
    /// 语言代码
    pub language: Option<String>,
    /// 书写方式
    pub style: TranslationStyle,
}

/// 一行带时间的歌词。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Line {
    /// 行的时间
    pub span: Span,
    /// 单词列表
    pub words: Vec<Word>,
    /// 翻译列表
    #[serde(default)]
    pub translations: Vec<Translation>,
    /// 去掉所有合法时间标记后的原始文本
    pub raw_text: String,
    /// `[t1][t2]文本` 中第一个之后的额外开始时间
    #[serde(default)]
    pub repeat_starts: Vec<Timestamp>,
}

impl Line {
    /// 创建一行没有单词的空歌词。
    #[must_use]
    pub const fn new(start: Timestamp) -> Self {
        Self {
            span: Span::open(start),
            words: Vec::new(),
            translations: Vec::new(),
            raw_text: String::new(),
            repeat_starts: Vec::new(),
        }
    }

    /// 以单个空格连接单词文本。
    #[must_use]
    pub fn text(&self) -> String {
        let mut text = String::with_capacity(self.raw_text.len());
        for (i, word) in self.words.iter().enumerate() {
            if i > 0 {
                text.push(' ');
            }
            text.push_str(&word.text);
        }
        text
    }

    /// 替换单词列表，并据此重写 `raw_text`。
    pub fn set_words(&mut self, words: Vec<Word>) {
        self.words = words;
        self.raw_text = self.text();
    }

    /// 该行所有的开始时间，依次为首个开始时间和各个重复开始时间。
    pub fn starts(&self) -> impl Iterator<Item = Timestamp> + '_ {
        std::iter::once(self.span.start).chain(self.repeat_starts.iter().copied())
    }

    /// 行内是否存在逐字时间信息。
    #[must_use]
    pub fn has_word_timing(&self) -> bool {
        self.words
            .iter()
            .any(|w| w.timed || !w.syllables.is_empty() || w.span.explicit_end)
    }
}

/// 原样保留的行的类别。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PassthroughKind {
    /// 空行或只含空白的行
    Blank,
    /// 无法识别的行
    Unrecognized,
}

/// 为无损往返而原样保留的一行。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Passthrough {
    /// 类别
    pub kind: PassthroughKind,
    /// 原始文本
    pub text: String,
    /// 源文件行号（从 1 开始）
    pub line_number: usize,
}

/// 行序列中的一项。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineEntry {
    /// 歌词行
    Lyric(Line),
    /// 原样保留的行
    Passthrough(Passthrough),
}

impl LineEntry {
    /// 如果是歌词行则返回它。
    #[must_use]
    pub const fn as_lyric(&self) -> Option<&Line> {
        match self {
            Self::Lyric(line) => Some(line),
            Self::Passthrough(_) => None,
        }
    }

    /// 如果是歌词行则返回它的可变引用。
    pub const fn as_lyric_mut(&mut self) -> Option<&mut Line> {
        match self {
            Self::Lyric(line) => Some(line),
            Self::Passthrough(_) => None,
        }
    }
}

/// 文档的根。
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Timeline {
    /// 元数据标签，按出现顺序
    pub tags: Vec<MetadataTag>,
    /// 行序列，按源文件顺序
    pub lines: Vec<LineEntry>,
    /// 观察到的格式特征
    #[serde(default)]
    pub dialect: DialectFlags,
}

impl Timeline {
    /// 按顺序遍历所有歌词行。
    pub fn lyric_lines(&self) -> impl Iterator<Item = &Line> {
        self.lines.iter().filter_map(LineEntry::as_lyric)
    }

    /// 按顺序可变地遍历所有歌词行。
    pub fn lyric_lines_mut(&mut self) -> impl Iterator<Item = &mut Line> {
        self.lines.iter_mut().filter_map(LineEntry::as_lyric_mut)
    }

    /// 歌词行是否按开始时间非递减排列。
    #[must_use]
    pub fn is_time_sorted(&self) -> bool {
        let mut previous = Timestamp::ZERO;
        self.lyric_lines().all(|line| {
            let ok = line.span.start >= previous;
            previous = line.span.start;
            ok
        })
    }

    /// 去掉所有逐字时间，只保留行级时间，作为对齐器的输入。
    #[must_use]
    pub fn line_level_only(&self) -> Self {
        let mut timeline = self.clone();
        for line in timeline.lyric_lines_mut() {
            let start = line.span.start;
            let end = line.span.end;
            for word in &mut line.words {
                word.span = Span {
                    start,
                    end,
                    explicit_end: false,
                };
                word.syllables.clear();
                word.timed = false;
            }
        }
        timeline
            .dialect
            .remove(DialectFlags::WORD_TIMING | DialectFlags::SYLLABLE_TIMING);
        timeline
    }
}
