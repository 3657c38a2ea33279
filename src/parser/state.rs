//! # 文档构建器的状态

use tracing::warn;

use super::grammar::GrammarContext;
use crate::{
    config::ParseOptions,
    error::{SplError, Warning, WarningKind},
    timestamp::{Precision, Timestamp},
    types::{Line, LineEntry, Timeline},
};

/// 行尾使用的换行符。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum LineEnding {
    Lf,
    CrLf,
    /// 文件的最后一行，没有换行符
    None,
}

/// 逐行构建 [`Timeline`] 的状态机。
#[derive(Debug)]
pub(super) struct DocumentBuilder<'o> {
    pub(super) options: &'o ParseOptions,
    /// 正在构建的文档
    pub(super) timeline: Timeline,
    pub(super) warnings: Vec<Warning>,
    /// 分类器可见的上下文
    pub(super) grammar: GrammarContext,
    /// 由第一个两位或三位小数的时间戳确定的文件精度
    pub(super) precision: Option<Precision>,
    /// 由第一个换行符确定的换行风格
    pub(super) line_ending: Option<LineEnding>,
    /// 可以接收翻译行的歌词行在 `timeline.lines` 中的下标
    pub(super) current_line: Option<usize>,
    /// 上一个歌词行的开始时间
    pub(super) last_start: Option<Timestamp>,
    /// 当前处理的行号（从 1 开始）
    pub(super) line_number: usize,
}

impl<'o> DocumentBuilder<'o> {
    pub(super) fn new(options: &'o ParseOptions) -> Self {
        Self {
            options,
            timeline: Timeline::default(),
            warnings: Vec::new(),
            grammar: GrammarContext::default(),
            precision: None,
            line_ending: None,
            current_line: None,
            last_start: None,
            line_number: 0,
        }
    }

    /// 记录一条当前行的警告，超过上限时返回致命错误。
    pub(super) fn warn(
        &mut self,
        kind: WarningKind,
        message: impl Into<String>,
    ) -> Result<(), SplError> {
        let warning = Warning::new(kind, self.line_number, message);
        warn!("{warning}");
        self.push_warning(warning)
    }

    pub(super) fn push_warning(&mut self, warning: Warning) -> Result<(), SplError> {
        self.warnings.push(warning);
        if self.warnings.len() > self.options.max_warnings {
            return Err(SplError::TooManyWarnings {
                limit: self.options.max_warnings,
                line_number: self.line_number,
            });
        }
        Ok(())
    }

    /// 文件精度，尚未确定时按厘秒处理。
    pub(super) fn precision(&self) -> Precision {
        self.precision.unwrap_or_default()
    }

    /// 当前可以接收翻译的歌词行。
    pub(super) fn current_line_mut(&mut self) -> Option<&mut Line> {
        let index = self.current_line?;
        self.timeline.lines.get_mut(index)?.as_lyric_mut()
    }

    pub(super) fn current_line_start(&self) -> Option<Timestamp> {
        let index = self.current_line?;
        self.timeline
            .lines
            .get(index)?
            .as_lyric()
            .map(|line| line.span.start)
    }

    /// 追加一个行序列项，并返回它的下标。
    pub(super) fn push_entry(&mut self, entry: LineEntry) -> usize {
        self.timeline.lines.push(entry);
        self.timeline.lines.len() - 1
    }
}
