//! 单行的输出：歌词行、翻译行与标签。

use std::fmt::{self, Write};

use super::utils::format_marker;
use crate::{
    metadata::MetadataTag,
    timestamp::Precision,
    types::{Line, Translation, TranslationStyle, Word},
};

/// 写出一行歌词，不含翻译与换行符。
///
/// `inline` 为 `false` 时只输出行级标记和纯文本。
pub(crate) fn write_lyric_line<W: Write>(
    out: &mut W,
    line: &Line,
    precision: Precision,
    inline: bool,
) -> fmt::Result {
    for start in line.starts() {
        out.write_str(&format_marker(start, precision, false))?;
    }

    if inline && line.has_word_timing() {
        write_timed_body(out, line, precision)?;
    } else if words_match_raw_text(line) {
        out.write_str(&line.raw_text)?;
    } else {
        out.write_str(&line.text())?;
    }

    if line.span.explicit_end
        && let Some(end) = line.span.end
    {
        out.write_str(&format_marker(end, precision, false))?;
    }
    Ok(())
}

/// 单词是否仍与 `raw_text` 按空白切分的结果一致。
fn words_match_raw_text(line: &Line) -> bool {
    line.raw_text
        .split_whitespace()
        .eq(line.words.iter().map(|w| w.text.as_str()))
}

fn write_timed_body<W: Write>(out: &mut W, line: &Line, precision: Precision) -> fmt::Result {
    let raw = line.raw_text.as_str();
    let aligned = words_match_raw_text(line);
    let mut cursor = 0;

    for (i, word) in line.words.iter().enumerate() {
        if aligned {
            let word_at = raw[cursor..]
                .find(|c: char| !c.is_whitespace())
                .map_or(raw.len(), |offset| cursor + offset);
            out.write_str(&raw[cursor..word_at])?;
            cursor = word_at + word.text.len();
        } else if i > 0 {
            out.write_char(' ')?;
        }

        if word.timed {
            out.write_str(&format_marker(word.span.start, precision, true))?;
        }
        write_word_text(out, word, precision)?;
        if word.span.explicit_end
            && let Some(end) = word.span.end
        {
            out.write_str(&format_marker(end, precision, true))?;
        }
    }

    if aligned {
        out.write_str(&raw[cursor.min(raw.len())..])?;
    }
    Ok(())
}

fn write_word_text<W: Write>(out: &mut W, word: &Word, precision: Precision) -> fmt::Result {
    if word.syllables.is_empty() {
        return out.write_str(&word.text);
    }
    for (i, syllable) in word.syllables.iter().enumerate() {
        if i > 0 {
            out.write_str(&format_marker(syllable.span.start, precision, true))?;
        }
        out.write_str(&syllable.text)?;
    }
    Ok(())
}

/// 写出挂靠在 `line` 下的一条翻译。
pub(crate) fn write_translation<W: Write>(
    out: &mut W,
    line: &Line,
    translation: &Translation,
    precision: Precision,
) -> fmt::Result {
    match (translation.style, translation.language.as_deref()) {
        (TranslationStyle::SameTimestamp, _) => {
            out.write_str(&format_marker(line.span.start, precision, false))?;
        }
        (TranslationStyle::LanguageTagged, Some(language)) => write!(out, "[{language}]")?,
        _ => {}
    }
    out.write_str(&translation.text)
}

pub(crate) fn write_tag<W: Write>(out: &mut W, tag: &MetadataTag) -> fmt::Result {
    write!(out, "[{}:{}]", tag.key, tag.value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timestamp::Timestamp;
    use crate::types::{Span, Syllable};

    fn render(line: &Line, inline: bool) -> String {
        let mut out = String::new();
        write_lyric_line(&mut out, line, Precision::Centisecond, inline).unwrap();
        out
    }

    #[test]
    fn test_plain_line_keeps_raw_spacing() {
        let mut line = Line::new(Timestamp(1000));
        line.raw_text = "Hello  world ".to_string();
        line.words = vec![
            Word::new("Hello", Span::closed(Timestamp(1000), Timestamp(1000))),
            Word::new("world", Span::open(Timestamp(1000))),
        ];
        assert_eq!(render(&line, false), "[00:01.00]Hello  world ");
        assert_eq!(render(&line, true), "[00:01.00]Hello  world ");
    }

    #[test]
    fn test_timed_line_with_syllables_and_ends() {
        let mut line = Line::new(Timestamp(1000));
        line.raw_text = "要吃 鱼".to_string();
        line.span.end = Some(Timestamp(4000));
        line.span.explicit_end = true;
        let mut first = Word::new("要吃", Span::closed(Timestamp(1000), Timestamp(2000)));
        first.syllables = vec![
            Syllable {
                text: "要".into(),
                span: Span::closed(Timestamp(1000), Timestamp(1500)),
            },
            Syllable {
                text: "吃".into(),
                span: Span::closed(Timestamp(1500), Timestamp(2000)),
            },
        ];
        let mut second = Word::new("鱼", Span::closed(Timestamp(2000), Timestamp(3000)));
        second.timed = true;
        second.span.explicit_end = true;
        line.words = vec![first, second];

        assert_eq!(
            render(&line, true),
            "[00:01.00]要<00:01.50>吃 <00:02.00>鱼<00:03.00>[00:04.00]"
        );
        assert_eq!(render(&line, false), "[00:01.00]要吃 鱼[00:04.00]");
    }

    #[test]
    fn test_mutated_words_fall_back_to_single_spaces() {
        let mut line = Line::new(Timestamp(0));
        line.raw_text = "old text".to_string();
        let mut word = Word::new("new", Span::open(Timestamp(0)));
        word.timed = true;
        line.words = vec![word, Word::new("words", Span::open(Timestamp(0)))];
        assert_eq!(render(&line, true), "[00:00.00]<00:00.00>new words");
        assert_eq!(render(&line, false), "[00:00.00]new words");
    }

    #[test]
    fn test_translation_styles() {
        let line = Line::new(Timestamp(2500));
        let mut out = String::new();
        for (style, language) in [
            (TranslationStyle::Implicit, None),
            (TranslationStyle::SameTimestamp, None),
            (TranslationStyle::LanguageTagged, Some("zh".to_string())),
        ] {
            let translation = Translation {
                text: "你好".into(),
                language,
                style,
            };
            write_translation(&mut out, &line, &translation, Precision::Centisecond).unwrap();
            out.push('|');
        }
        assert_eq!(out, "你好|[00:02.50]你好|[zh]你好|");
    }
}
