//! 按结构对单行进行分类，不涉及任何跨行的上下文判断。

use std::collections::HashSet;

use super::tokenizer::{Bracket, Token};
use crate::metadata::split_tag;
use crate::timestamp::Timestamp;

/// 分类时可见的上下文：之前的标签声明过的翻译语言代码（小写）。
#[derive(Debug, Default)]
pub(crate) struct GrammarContext {
    pub(crate) declared_languages: HashSet<String>,
}

impl GrammarContext {
    fn is_declared(&self, code: &str) -> bool {
        !code.is_empty() && self.declared_languages.contains(&code.to_ascii_lowercase())
    }
}

/// 无法识别的原因。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UnrecognizedReason {
    /// 行首是形似时间戳却无法解析的括号
    BrokenTimestamp,
    /// 行首是未声明的括号前缀
    UndeclaredPrefix,
    /// 标签之后还有其他内容
    TagWithTrailingText,
    /// 没有行级时间戳，却含有时间标记
    UntimedMarkers,
}

/// 单行的结构分类结果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LineClass<'a> {
    Blank,
    Tag {
        key: &'a str,
        value: &'a str,
        indent: &'a str,
    },
    TimedLyric {
        indent: &'a str,
        /// 行首连续的 `[时间戳]`，至少一个
        starts: Vec<(Timestamp, Token<'a>)>,
        body: &'a [Token<'a>],
    },
    Translation {
        /// `None` 表示隐式翻译候选
        language: Option<&'a str>,
        text: &'a str,
        indent: &'a str,
    },
    Unrecognized(UnrecognizedReason),
}

pub(crate) fn classify<'a>(
    line: &'a str,
    tokens: &'a [Token<'a>],
    context: &GrammarContext,
) -> LineClass<'a> {
    if line.trim().is_empty() {
        return LineClass::Blank;
    }

    let (indent, rest) = match tokens.split_first() {
        Some((Token::Literal(text), rest))
            if text.trim().is_empty() && rest.first().is_some_and(|t| !matches!(t, Token::Literal(_))) =>
        {
            (*text, rest)
        }
        _ => ("", tokens),
    };

    match rest.first() {
        Some(Token::Marker {
            bracket: Bracket::Square,
            ..
        }) => classify_timed(indent, rest),
        Some(
            first @ Token::MalformedMarker {
                bracket: Bracket::Square,
                terminated: true,
                ..
            },
        ) => classify_bracket_prefix(line, indent, first, &rest[1..], context),
        Some(Token::MalformedMarker {
            bracket: Bracket::Square,
            raw,
            ..
        }) if raw[1..].starts_with(|c: char| c.is_ascii_digit()) => {
            LineClass::Unrecognized(UnrecognizedReason::BrokenTimestamp)
        }
        _ if tokens.iter().any(Token::is_marker) => {
            LineClass::Unrecognized(UnrecognizedReason::UntimedMarkers)
        }
        _ => LineClass::Translation {
            language: None,
            text: line,
            indent: "",
        },
    }
}

fn classify_timed<'a>(indent: &'a str, tokens: &'a [Token<'a>]) -> LineClass<'a> {
    let mut starts = Vec::new();
    let mut consumed = 0;
    for token in tokens {
        match token {
            Token::Marker {
                bracket: Bracket::Square,
                timestamp,
                ..
            } => {
                starts.push((*timestamp, token.clone()));
                consumed += 1;
            }
            _ => break,
        }
    }
    LineClass::TimedLyric {
        indent,
        starts,
        body: &tokens[consumed..],
    }
}

fn classify_bracket_prefix<'a>(
    line: &'a str,
    indent: &'a str,
    first: &Token<'a>,
    rest: &'a [Token<'a>],
    context: &GrammarContext,
) -> LineClass<'a> {
    if let Some((key, value)) = split_tag(first.raw()) {
        return if rest.is_empty() {
            LineClass::Tag { key, value, indent }
        } else {
            LineClass::Unrecognized(UnrecognizedReason::TagWithTrailingText)
        };
    }

    let content = first.content();
    if context.is_declared(content) {
        let prefix_len = indent.len() + first.raw().len();
        return LineClass::Translation {
            language: Some(content),
            text: &line[prefix_len..],
            indent,
        };
    }

    if content.trim_start().starts_with(|c: char| c.is_ascii_digit()) {
        LineClass::Unrecognized(UnrecognizedReason::BrokenTimestamp)
    } else {
        LineClass::Unrecognized(UnrecognizedReason::UndeclaredPrefix)
    }
}
