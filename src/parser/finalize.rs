//! # 收尾：补全开放区间并校验不变量

use crate::{
    error::{Warning, WarningKind},
    timestamp::Timestamp,
    types::{Line, Timeline},
};

/// 把开放的结束时间补全为下一个兄弟元素的开始时间。
///
/// 行的结束时间取下一个歌词行的开始时间，但不会早于本行已有的任何时间；
/// 文件的最后一行保持开放。
pub(crate) fn resolve_open_ends(timeline: &mut Timeline) {
    let starts: Vec<Timestamp> = timeline.lyric_lines().map(|l| l.span.start).collect();

    for (i, line) in timeline.lyric_lines_mut().enumerate() {
        if line.span.end.is_none()
            && let Some(&next) = starts.get(i + 1)
            && next >= latest_time(line)
        {
            line.span.end = Some(next);
        }
        resolve_words(line);
    }
}

/// 行内已知的最晚时间，包括单词与音节的开始和结束时间。
fn latest_time(line: &Line) -> Timestamp {
    line.words
        .iter()
        .flat_map(|word| {
            std::iter::once(word.span.start)
                .chain(word.span.end)
                .chain(word.syllables.iter().map(|s| s.span.start))
        })
        .fold(line.span.start, Timestamp::max)
}

fn resolve_words(line: &mut Line) {
    let line_end = line.span.end;
    let count = line.words.len();
    for i in 0..count {
        if line.words[i].span.end.is_none() {
            line.words[i].span.end = if i + 1 < count {
                Some(line.words[i + 1].span.start)
            } else {
                line_end
            };
        }

        let word_end = line.words[i].span.end;
        let syllables = &mut line.words[i].syllables;
        let syllable_count = syllables.len();
        for j in 0..syllable_count {
            if j + 1 < syllable_count {
                syllables[j].span.end = Some(syllables[j + 1].span.start);
            } else {
                syllables[j].span.end = word_end;
            }
        }
    }
}

/// 校验文本还原与时间区间的不变量。
///
/// 返回的警告不带源文件行号，消息中给出歌词行的序号（从 1 开始）。
pub(crate) fn validate(timeline: &Timeline) -> Vec<Warning> {
    let mut warnings = Vec::new();
    for (index, line) in timeline.lyric_lines().enumerate() {
        let ordinal = index + 1;
        let mismatch = |message: String| Warning::new(WarningKind::TextReconstructionMismatch, 0, message);

        if !line
            .raw_text
            .split_whitespace()
            .eq(line.words.iter().map(|w| w.text.as_str()))
        {
            warnings.push(mismatch(format!(
                "第 {ordinal} 个歌词行的单词无法还原出原始文本 {:?}",
                line.raw_text
            )));
        }

        for word in &line.words {
            if !word.syllables.is_empty()
                && word.syllables.iter().map(|s| s.text.as_str()).collect::<String>() != word.text
            {
                warnings.push(mismatch(format!(
                    "第 {ordinal} 个歌词行中单词 {:?} 的音节无法还原出单词文本",
                    word.text
                )));
            }
        }

        if let Some(message) = span_violation(line) {
            warnings.push(Warning::new(
                WarningKind::NonMonotonicTimestamp,
                0,
                format!("第 {ordinal} 个歌词行{message}"),
            ));
        }
    }
    warnings
}

fn span_violation(line: &Line) -> Option<&'static str> {
    let spans = std::iter::once(&line.span)
        .chain(line.words.iter().map(|w| &w.span))
        .chain(line.words.iter().flat_map(|w| w.syllables.iter().map(|s| &s.span)));
    for span in spans {
        if span.end.is_some_and(|end| end < span.start) {
            return Some("存在结束时间早于开始时间的区间");
        }
    }

    if let Some(first) = line.words.first()
        && first.span.start < line.span.start
    {
        return Some("的第一个单词早于行的开始时间");
    }
    if let (Some(line_end), Some(word_end)) =
        (line.span.end, line.words.last().and_then(|w| w.span.end))
        && word_end > line_end
    {
        return Some("的最后一个单词晚于行的结束时间");
    }
    None
}

impl Timeline {
    /// 重新校验文本还原与时间区间的不变量，适用于被修改过的文档。
    #[must_use]
    pub fn validate(&self) -> Vec<Warning> {
        validate(self)
    }
}
