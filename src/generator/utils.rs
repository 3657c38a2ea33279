use crate::{
    timestamp::{Precision, Timestamp},
    types::{DialectFlags, Timeline},
};

/// 把时间戳格式化为带括号的标记，例如 `[01:23.45]` 或 `<01:23.456>`。
pub(crate) fn format_marker(timestamp: Timestamp, precision: Precision, inline: bool) -> String {
    let (open, close) = if inline { ('<', '>') } else { ('[', ']') };
    format!("{open}{}{close}", timestamp.format(precision))
}

/// 决定整份文件的输出精度。
///
/// 原文件使用三位小数，或存在厘秒精度无法表示的时间点时使用毫秒精度。
pub(crate) fn output_precision(timeline: &Timeline) -> Precision {
    if timeline.dialect.contains(DialectFlags::MILLISECOND_PRECISION) {
        return Precision::Millisecond;
    }
    let all_aligned = timeline.lyric_lines().all(|line| {
        line.starts().all(Timestamp::is_centisecond_aligned)
            && line.span.end.is_none_or(Timestamp::is_centisecond_aligned)
            && line.words.iter().all(|word| {
                word.span.start.is_centisecond_aligned()
                    && word.span.end.is_none_or(Timestamp::is_centisecond_aligned)
                    && word
                        .syllables
                        .iter()
                        .all(|s| s.span.start.is_centisecond_aligned())
            })
    });
    if all_aligned {
        Precision::Centisecond
    } else {
        Precision::Millisecond
    }
}
