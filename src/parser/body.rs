//! # 带时间歌词行的正文
//!
//! 先去掉所有合法标记得到原始文本，再按空白切分单词，最后根据每个标记在
//! 原始文本中的位置决定它的归属：
//!
//! - 位于单词之前（包括单词前的空白中）：单词的开始时间；
//! - 位于单词内部：音节边界；
//! - 位于最后一个单词之后：`<t>` 结束最后一个单词，`[t]` 结束整行。

use super::state::DocumentBuilder;
use super::tokenizer::{Bracket, Token};
use crate::{
    error::{SplError, WarningKind},
    timestamp::Timestamp,
    types::{DialectFlags, Line, Span, Syllable, Word},
};

/// 去掉标记后，标记在原始文本中的位置。
#[derive(Debug, Clone, Copy)]
struct Mark {
    offset: usize,
    time: Timestamp,
    bracket: Bracket,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Start(usize),
    Inside(usize),
    Trailing,
}

/// 由行首时间与正文构建一行歌词，并把观察到的格式特征记入文档。
pub(super) fn build_line(
    state: &mut DocumentBuilder<'_>,
    start: Timestamp,
    body: &[Token<'_>],
) -> Result<Line, SplError> {
    let mut raw_text = String::new();
    let mut marks = Vec::new();
    let mut cursor = start;

    for token in body {
        match token {
            Token::Literal(text) => raw_text.push_str(text),
            Token::Marker {
                bracket, timestamp, ..
            } => {
                let time = check_monotonic(state, cursor, *timestamp)?;
                cursor = time;
                marks.push(Mark {
                    offset: raw_text.len(),
                    time,
                    bracket: *bracket,
                });
            }
            Token::MalformedMarker { raw, .. } => {
                report_malformed(state, token)?;
                raw_text.push_str(raw);
            }
        }
    }

    let ranges = word_ranges(&raw_text);
    let mut dialect = DialectFlags::empty();
    let mut start_marks: Vec<Vec<Timestamp>> = vec![Vec::new(); ranges.len()];
    let mut inside_marks: Vec<Vec<(usize, Timestamp)>> = vec![Vec::new(); ranges.len()];
    let mut trailing_word_end = None;
    let mut line_end = None;

    for mark in &marks {
        match target(mark.offset, &ranges) {
            Target::Start(i) => {
                start_marks[i].push(mark.time);
                dialect |= DialectFlags::WORD_TIMING;
            }
            Target::Inside(i) => {
                let relative = mark.offset - ranges[i].0;
                match inside_marks[i].last_mut() {
                    Some(last) if last.0 == relative => last.1 = mark.time,
                    _ => inside_marks[i].push((relative, mark.time)),
                }
                dialect |= DialectFlags::WORD_TIMING | DialectFlags::SYLLABLE_TIMING;
            }
            Target::Trailing => match mark.bracket {
                Bracket::Square => {
                    line_end = Some(mark.time);
                    dialect |= DialectFlags::EXPLICIT_LINE_ENDS;
                }
                Bracket::Angle if !ranges.is_empty() => {
                    trailing_word_end = Some(mark.time);
                    dialect |= DialectFlags::WORD_TIMING;
                }
                Bracket::Angle => {}
            },
        }
    }

    let mut words: Vec<Word> = ranges
        .iter()
        .enumerate()
        .map(|(i, &(from, to))| {
            let inherited = marks.partition_point(|m| m.offset <= from);
            let word_start = inherited.checked_sub(1).map_or(start, |j| marks[j].time);
            Word {
                text: raw_text[from..to].to_string(),
                span: Span::open(word_start),
                syllables: Vec::new(),
                timed: !start_marks[i].is_empty(),
            }
        })
        .collect();

    for i in 1..words.len() {
        // `word<t1> <t2>next`：倒数第二个标记结束前一个单词
        if let [.., previous_end, _] = start_marks[i].as_slice() {
            words[i - 1].span.end = Some(*previous_end);
            words[i - 1].span.explicit_end = true;
        }
    }
    for i in 0..words.len().saturating_sub(1) {
        if words[i].span.end.is_none() {
            words[i].span.end = Some(words[i + 1].span.start);
        }
    }
    if let (Some(last), Some(end)) = (words.last_mut(), trailing_word_end) {
        last.span.end = Some(end);
        last.span.explicit_end = true;
    }

    for (word, marks) in words.iter_mut().zip(&inside_marks) {
        if !marks.is_empty() {
            word.syllables = split_syllables(word, marks);
        }
    }

    if let (Some(end), Some(word_end)) = (line_end, words.last().and_then(|w| w.span.end))
        && word_end > end
    {
        line_end = Some(word_end);
    }

    state.timeline.dialect |= dialect;
    Ok(Line {
        span: Span {
            start,
            end: line_end,
            explicit_end: line_end.is_some(),
        },
        words,
        translations: Vec::new(),
        raw_text,
        repeat_starts: Vec::new(),
    })
}

/// 单调性检查：倒退的时间戳被钳制为前一个值，严格模式下直接失败。
fn check_monotonic(
    state: &mut DocumentBuilder<'_>,
    previous: Timestamp,
    found: Timestamp,
) -> Result<Timestamp, SplError> {
    if found >= previous {
        return Ok(found);
    }
    if state.options.strict_monotonicity {
        return Err(SplError::NonMonotonicTimestamp {
            line_number: state.line_number,
            previous: previous.as_millis(),
            found: found.as_millis(),
        });
    }
    state.warn(
        WarningKind::NonMonotonicTimestamp,
        format!("时间戳 {found} 早于前一个时间戳 {previous}，已钳制"),
    )?;
    Ok(previous)
}

pub(super) fn report_malformed(state: &mut DocumentBuilder<'_>, token: &Token<'_>) -> Result<(), SplError> {
    match token {
        Token::MalformedMarker {
            raw,
            terminated: false,
            ..
        } => state.warn(
            WarningKind::MalformedMarkerBracket,
            format!("未闭合的标记 {raw:?} 已作为文本保留"),
        ),
        Token::MalformedMarker { raw, .. }
            if token
                .content()
                .trim_start()
                .starts_with(|c: char| c.is_ascii_digit()) =>
        {
            state.warn(
                WarningKind::InvalidTimestampLiteral,
                format!("无法解析的时间戳 {raw:?} 已作为文本保留"),
            )
        }
        _ => Ok(()),
    }
}

/// 以空白切分出的单词在文本中的字节范围。
fn word_ranges(text: &str) -> Vec<(usize, usize)> {
    let mut ranges = Vec::new();
    let mut word_start = None;
    for (i, c) in text.char_indices() {
        if c.is_whitespace() {
            if let Some(from) = word_start.take() {
                ranges.push((from, i));
            }
        } else if word_start.is_none() {
            word_start = Some(i);
        }
    }
    if let Some(from) = word_start {
        ranges.push((from, text.len()));
    }
    ranges
}

fn target(offset: usize, ranges: &[(usize, usize)]) -> Target {
    let i = ranges.partition_point(|&(_, to)| to <= offset);
    match ranges.get(i) {
        None => Target::Trailing,
        Some(&(from, _)) if from < offset => Target::Inside(i),
        Some(_) => Target::Start(i),
    }
}

fn split_syllables(word: &Word, marks: &[(usize, Timestamp)]) -> Vec<Syllable> {
    let mut syllables = Vec::with_capacity(marks.len() + 1);
    let mut from = 0;
    let mut from_time = word.span.start;
    for &(offset, time) in marks {
        syllables.push(Syllable {
            text: word.text[from..offset].to_string(),
            span: Span::closed(from_time, time),
        });
        from = offset;
        from_time = time;
    }
    syllables.push(Syllable {
        text: word.text[from..].to_string(),
        span: Span {
            start: from_time,
            end: word.span.end,
            explicit_end: false,
        },
    });
    syllables
}
