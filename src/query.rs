//! # 查询与变换
//!
//! 这些函数只读取 [`Timeline`]，或者返回一个新的 `Timeline`，不会修改输入。

use std::convert::Infallible;

use crate::{
    error::SplError,
    timestamp::Timestamp,
    types::{Line, Span, Timeline, Word},
};

/// 对歌词行建立的查询索引，适合播放时反复查询。
#[derive(Debug, Clone)]
pub struct LyricIndex<'a> {
    lines: Vec<&'a Line>,
    sorted: bool,
    /// `reach[i]` 为前 `i + 1` 行中最晚的结束时间，`None` 表示其中有开放区间
    reach: Vec<Option<Timestamp>>,
}

impl<'a> LyricIndex<'a> {
    /// 为 `timeline` 中的歌词行建立索引。
    #[must_use]
    pub fn new(timeline: &'a Timeline) -> Self {
        let lines: Vec<&'a Line> = timeline.lyric_lines().collect();
        let mut reach = Vec::with_capacity(lines.len());
        let mut latest = Some(Timestamp::ZERO);
        for line in &lines {
            latest = latest.zip(line.span.end).map(|(a, b)| a.max(b));
            reach.push(latest);
        }
        Self {
            lines,
            sorted: timeline.is_time_sorted(),
            reach,
        }
    }

    /// 查找时间点 `t` 正在演唱的单词。
    ///
    /// 行按开始时间排好序时用二分查找确定候选范围，否则逐行扫描；两种方式
    /// 返回的都是源文件顺序中第一个命中的行。区间均为左闭右开，开放的结束时间视为无穷。
    #[must_use]
    pub fn active_word_at(&self, t: Timestamp) -> Option<(&'a Line, &'a Word)> {
        if !self.sorted {
            return self.lines.iter().find_map(|line| active_in_line(*line, t));
        }

        // 开始时间晚于 t 的行不可能命中
        let upper = self.lines.partition_point(|line| line.span.start <= t);
        // 前缀中最晚的结束时间不超过 t 的行也不可能命中
        let lower = self.reach[..upper].partition_point(|&end| end.is_some_and(|end| end <= t));
        self.lines[lower..upper]
            .iter()
            .find_map(|line| active_in_line(*line, t))
    }
}

fn active_in_line(line: &Line, t: Timestamp) -> Option<(&Line, &Word)> {
    if !line.span.contains(t) {
        return None;
    }
    line.words
        .iter()
        .find(|word| word.span.contains(t))
        .map(|word| (line, word))
}

/// 查找时间点 `t` 正在演唱的单词及其所在的行。
///
/// 需要反复查询时，请使用 [`LyricIndex`] 以避免重复建立索引。
#[must_use]
pub fn active_word_at(timeline: &Timeline, t: Timestamp) -> Option<(&Line, &Word)> {
    LyricIndex::new(timeline).active_word_at(t)
}

/// 把所有时间整体偏移 `delta_ms` 毫秒，返回新的文档。
///
/// 标签（包括 `[offset:...]`）保持不变。
///
/// # Errors
///
/// 任何时间点偏移后小于零时返回 [`SplError::WouldProduceNegativeTimestamp`]，
/// 此时不会产生部分偏移的结果。
pub fn shift_all(timeline: &Timeline, delta_ms: i64) -> Result<Timeline, SplError> {
    let mut shifted = timeline.clone();
    for line in shifted.lyric_lines_mut() {
        shift_line(line, delta_ms)?;
    }
    Ok(shifted)
}

fn shift_line(line: &mut Line, delta_ms: i64) -> Result<(), SplError> {
    map_times(line, |timestamp| {
        timestamp
            .checked_add_signed(delta_ms)
            .ok_or(SplError::WouldProduceNegativeTimestamp {
                delta: delta_ms,
                timestamp: timestamp.as_millis(),
            })
    })
}

/// 对行内的每个时间点（行、单词、音节的区间以及重复开始时间）应用 `f`。
fn map_times<E>(
    line: &mut Line,
    mut f: impl FnMut(Timestamp) -> Result<Timestamp, E>,
) -> Result<(), E> {
    let word_spans = line.words.iter_mut().flat_map(|word| {
        let Word {
            span, syllables, ..
        } = word;
        std::iter::once(span).chain(syllables.iter_mut().map(|s| &mut s.span))
    });
    for span in std::iter::once(&mut line.span).chain(word_spans) {
        map_span(span, &mut f)?;
    }
    for start in &mut line.repeat_starts {
        *start = f(*start)?;
    }
    Ok(())
}

fn map_span<E>(
    span: &mut Span,
    f: &mut impl FnMut(Timestamp) -> Result<Timestamp, E>,
) -> Result<(), E> {
    span.start = f(span.start)?;
    if let Some(end) = span.end {
        span.end = Some(f(end)?);
    }
    Ok(())
}

/// 把以 `from` 为起点的时间点平移到以 `to` 为起点，结果在零处截断。
fn rebase(timestamp: Timestamp, from: Timestamp, to: Timestamp) -> Timestamp {
    if timestamp >= from {
        Timestamp(to.0.saturating_add(timestamp.0 - from.0))
    } else {
        Timestamp(to.0.saturating_sub(from.0 - timestamp.0))
    }
}

/// 每个歌词行的纯文本：去掉合法的时间标记，保留无法解析的片段。
#[must_use]
pub fn plain_lyrics(timeline: &Timeline) -> Vec<String> {
    timeline
        .lyric_lines()
        .map(|line| line.raw_text.trim().to_string())
        .collect()
}

/// 把 `[t1][t2]文本` 形式的重复行展开为每次出现各一行，并按开始时间排序。
///
/// 每次出现的单词与音节时间按与首次出现的差值平移。
#[must_use]
pub fn expand_repeats(timeline: &Timeline) -> Vec<Line> {
    let mut expanded = Vec::new();
    for line in timeline.lyric_lines() {
        let mut first = line.clone();
        first.repeat_starts.clear();
        for &start in &line.repeat_starts {
            let mut occurrence = first.clone();
            let Ok(()) = map_times(&mut occurrence, |t| {
                Ok::<_, Infallible>(rebase(t, line.span.start, start))
            });
            expanded.push(occurrence);
        }
        expanded.push(first);
    }
    expanded.sort_by_key(|line| line.span.start);
    expanded
}
