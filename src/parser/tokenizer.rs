//! # 行内词法分析
//!
//! 把一行原始文本切分为文本片段与时间标记。词法分析从不失败：
//! 无法解析的括号会变成 [`Token::MalformedMarker`]，由后续阶段决定如何处理。

use crate::timestamp::Timestamp;

/// 标记使用的括号种类。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Bracket {
    /// `[...]`，行级标记
    Square,
    /// `<...>`，行内标记
    Angle,
}

impl Bracket {
    const fn from_open(c: char) -> Option<Self> {
        match c {
            '[' => Some(Self::Square),
            '<' => Some(Self::Angle),
            _ => None,
        }
    }

    pub(crate) const fn open(self) -> char {
        match self {
            Self::Square => '[',
            Self::Angle => '<',
        }
    }

    pub(crate) const fn close(self) -> char {
        match self {
            Self::Square => ']',
            Self::Angle => '>',
        }
    }
}

/// 一个词法单元，均借用自原始行。
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Token<'a> {
    /// 普通文本
    Literal(&'a str),
    /// 合法的时间标记
    Marker {
        bracket: Bracket,
        timestamp: Timestamp,
        /// 含括号的原始文本
        raw: &'a str,
    },
    /// 无法解析为时间戳的括号
    MalformedMarker {
        bracket: Bracket,
        /// 含括号的原始文本，未闭合时一直延伸到行尾
        raw: &'a str,
        terminated: bool,
    },
}

impl<'a> Token<'a> {
    /// 原始文本。
    pub(crate) const fn raw(&self) -> &'a str {
        match self {
            Self::Literal(text) => text,
            Self::Marker { raw, .. } | Self::MalformedMarker { raw, .. } => raw,
        }
    }

    pub(crate) const fn is_marker(&self) -> bool {
        matches!(self, Self::Marker { .. })
    }

    /// 括号内部的文本。
    pub(crate) fn content(&self) -> &'a str {
        match self {
            Self::Literal(text) => text,
            Self::Marker { raw, .. }
            | Self::MalformedMarker {
                raw,
                terminated: true,
                ..
            } => &raw[1..raw.len() - 1],
            Self::MalformedMarker { raw, .. } => &raw[1..],
        }
    }
}

/// 字面量的小数位数，没有小数点时为 `None`。
pub(crate) fn fraction_digits(content: &str) -> Option<usize> {
    content.split_once('.').map(|(_, fraction)| fraction.len())
}

/// 切分一行文本。把所有单元的原始文本按顺序拼接即可还原输入。
pub(crate) fn tokenize(line: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut literal_start = 0;
    let mut cursor = 0;

    while cursor < line.len() {
        let Some(c) = line[cursor..].chars().next() else {
            break;
        };
        let Some(bracket) = Bracket::from_open(c) else {
            cursor += c.len_utf8();
            continue;
        };

        if literal_start < cursor {
            tokens.push(Token::Literal(&line[literal_start..cursor]));
        }

        let (token, next) = scan_marker(line, cursor, bracket);
        tokens.push(token);
        cursor = next;
        literal_start = next;
    }

    if literal_start < line.len() {
        tokens.push(Token::Literal(&line[literal_start..]));
    }
    tokens
}

/// 从 `open_at` 处的开括号开始扫描到匹配的闭括号。
///
/// 同种括号只允许嵌套一层，内层的括号对属于外层标记内容的一部分。
fn scan_marker(line: &str, open_at: usize, bracket: Bracket) -> (Token<'_>, usize) {
    let mut depth = 0usize;
    for (offset, c) in line[open_at..].char_indices() {
        if c == bracket.open() {
            depth += 1;
        } else if c == bracket.close() {
            depth -= 1;
            if depth == 0 {
                let end = open_at + offset + c.len_utf8();
                let raw = &line[open_at..end];
                let content = &raw[1..raw.len() - 1];
                let token = match Timestamp::parse_literal(content) {
                    Ok(timestamp) => Token::Marker {
                        bracket,
                        timestamp,
                        raw,
                    },
                    Err(_) => Token::MalformedMarker {
                        bracket,
                        raw,
                        terminated: true,
                    },
                };
                return (token, end);
            }
        }
    }

    (
        Token::MalformedMarker {
            bracket,
            raw: &line[open_at..],
            terminated: false,
        },
        line.len(),
    )
}
