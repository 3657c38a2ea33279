//! # SPL (Salt Player Lyrics) 解析器
//!
//! 解析分为三层：逐行的词法分析、结构分类，以及按源文件顺序构建文档的状态机。
//! 任何单行的问题都只会产生警告，不会中断整个解析；
//! 只有输入过大、警告过多或严格模式下的时间戳倒退才是致命错误。

mod body;
pub(crate) mod finalize;
mod grammar;
mod handlers;
mod state;
pub(crate) mod tokenizer;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use self::{
    grammar::{LineClass, classify},
    state::{DocumentBuilder, LineEnding},
    tokenizer::tokenize,
};
use crate::{
    config::ParseOptions,
    error::{SplError, Warning, WarningKind},
    types::{DialectFlags, Timeline},
};

/// 解析结果：文档与非致命警告。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedSpl {
    /// 构建出的文档
    pub timeline: Timeline,
    /// 按产生顺序排列的警告
    pub warnings: Vec<Warning>,
}

/// 解析 SPL 格式的歌词文本。
///
/// # 参数
///
/// * `content` - SPL 歌词文本。
/// * `options` - 解析选项。
///
/// # 返回
///
/// * `Ok(ParsedSpl)` - 解析得到的文档，以及所有非致命问题的警告列表。
///
/// # Errors
///
/// * `SplError::InputTooLarge` - 输入超过 `options.max_input_bytes`
/// * `SplError::TooManyWarnings` - 警告数量超过 `options.max_warnings`
/// * `SplError::NonMonotonicTimestamp` - 严格模式下行内时间戳倒退
pub fn parse_spl(content: &str, options: &ParseOptions) -> Result<ParsedSpl, SplError> {
    if let Some(limit) = options.max_input_bytes
        && content.len() > limit
    {
        return Err(SplError::InputTooLarge {
            size: content.len(),
            limit,
        });
    }

    let mut state = DocumentBuilder::new(options);
    let content = match content.strip_prefix('\u{feff}') {
        Some(rest) => {
            state.timeline.dialect |= DialectFlags::BYTE_ORDER_MARK;
            rest
        }
        None => content,
    };
    if content.ends_with('\n') {
        state.timeline.dialect |= DialectFlags::FINAL_NEWLINE;
    }

    for (index, (line, ending)) in split_lines(content).enumerate() {
        state.line_number = index + 1;
        observe_line_ending(&mut state, ending)?;
        process_line(&mut state, line)?;
    }

    finish(state)
}

/// 解析 UTF-8 字节形式的 SPL 歌词。
///
/// # Errors
///
/// 字节不是合法的 UTF-8 时返回 [`SplError::InvalidUtf8`]，其余同 [`parse_spl`]。
pub fn parse_spl_bytes(content: &[u8], options: &ParseOptions) -> Result<ParsedSpl, SplError> {
    if let Some(limit) = options.max_input_bytes
        && content.len() > limit
    {
        return Err(SplError::InputTooLarge {
            size: content.len(),
            limit,
        });
    }
    parse_spl(std::str::from_utf8(content)?, options)
}

fn process_line(state: &mut DocumentBuilder<'_>, line: &str) -> Result<(), SplError> {
    let tokens = tokenize(line);
    trace!(line_number = state.line_number, ?tokens, "词法分析");

    let class = classify(line, &tokens, &state.grammar);
    debug!(line_number = state.line_number, ?class, "行分类");

    match class {
        LineClass::Blank => handlers::handle_blank(state, line),
        LineClass::Tag { key, value, indent } => handlers::handle_tag(state, key, value, indent),
        LineClass::TimedLyric {
            indent,
            starts,
            body,
        } => handlers::handle_timed_lyric(state, line, indent, &starts, body),
        LineClass::Translation {
            language,
            text,
            indent,
        } => handlers::handle_translation(state, line, language, text, indent),
        LineClass::Unrecognized(reason) => handlers::handle_unrecognized(state, line, reason),
    }
}

fn observe_line_ending(state: &mut DocumentBuilder<'_>, ending: LineEnding) -> Result<(), SplError> {
    if ending == LineEnding::None {
        return Ok(());
    }
    match state.line_ending {
        None => {
            state.line_ending = Some(ending);
            if ending == LineEnding::CrLf {
                state.timeline.dialect |= DialectFlags::CRLF_LINE_ENDINGS;
            }
            Ok(())
        }
        Some(first) if first != ending => state.warn(
            WarningKind::NormalizedLayout,
            "换行符与文件其余部分不一致，输出时会被统一",
        ),
        Some(_) => Ok(()),
    }
}

fn finish(mut state: DocumentBuilder<'_>) -> Result<ParsedSpl, SplError> {
    finalize::resolve_open_ends(&mut state.timeline);
    for warning in finalize::validate(&state.timeline) {
        state.push_warning(warning)?;
    }
    debug!(
        lines = state.timeline.lines.len(),
        tags = state.timeline.tags.len(),
        warnings = state.warnings.len(),
        dialect = ?state.timeline.dialect,
        "SPL 解析完成"
    );
    Ok(ParsedSpl {
        timeline: state.timeline,
        warnings: state.warnings,
    })
}

/// 按 `\n` 切分文本并去掉行尾的 `\r`。以换行符结尾的文本不会产生额外的空行。
fn split_lines(content: &str) -> impl Iterator<Item = (&str, LineEnding)> {
    let mut rest = content;
    std::iter::from_fn(move || {
        if rest.is_empty() {
            return None;
        }
        match rest.find('\n') {
            Some(newline) => {
                let line = &rest[..newline];
                rest = &rest[newline + 1..];
                Some(match line.strip_suffix('\r') {
                    Some(line) => (line, LineEnding::CrLf),
                    None => (line, LineEnding::Lf),
                })
            }
            None => {
                let line = rest;
                rest = "";
                Some((line, LineEnding::None))
            }
        }
    })
}
