//! 各类行的处理函数。

use tracing::debug;

use super::{
    body,
    grammar::UnrecognizedReason,
    state::DocumentBuilder,
    tokenizer::{Token, fraction_digits},
};
use crate::{
    error::{SplError, WarningKind},
    generator::{write_lyric_line, write_translation},
    metadata::{MetadataTag, TIMING_TAG_KEY, TimingDeclaration},
    timestamp::{Precision, Timestamp},
    types::{
        DialectFlags, LineEntry, Passthrough, PassthroughKind, Translation, TranslationStyle,
    },
};

pub(super) fn handle_tag(
    state: &mut DocumentBuilder<'_>,
    key: &str,
    value: &str,
    indent: &str,
) -> Result<(), SplError> {
    if !indent.is_empty() {
        state.warn(WarningKind::NormalizedLayout, "标签前的缩进在输出时会被去掉")?;
    }

    if key.eq_ignore_ascii_case(TIMING_TAG_KEY) {
        match value.trim().parse::<TimingDeclaration>() {
            Ok(declaration) => state.timeline.dialect |= declaration.dialect(),
            Err(_) => debug!("忽略未知的计时声明 {value:?}"),
        }
    }

    if state.options.is_translation_key(key) {
        let code = value.trim().to_ascii_lowercase();
        if !code.is_empty() {
            debug!("声明翻译语言 {code}");
            state.grammar.declared_languages.insert(code);
        }
    }

    state.timeline.tags.push(MetadataTag {
        key: key.to_string(),
        value: value.to_string(),
        position: state.timeline.lines.len(),
    });
    state.current_line = None;
    Ok(())
}

pub(super) fn handle_timed_lyric(
    state: &mut DocumentBuilder<'_>,
    source: &str,
    indent: &str,
    starts: &[(Timestamp, Token<'_>)],
    body: &[Token<'_>],
) -> Result<(), SplError> {
    observe_precision(state, starts.iter().map(|(_, token)| token).chain(body));
    let Some(&(start, _)) = starts.first() else {
        return Ok(());
    };

    if starts.len() == 1
        && !body.iter().any(Token::is_marker)
        && state.current_line_start() == Some(start)
    {
        let text: String = body.iter().map(Token::raw).collect();
        if !text.trim().is_empty() {
            for token in body {
                body::report_malformed(state, token)?;
            }
            return attach_same_timestamp_translation(state, source, indent, text);
        }
    }

    let warnings_before = state.warnings.len();
    let mut line = body::build_line(state, start, body)?;
    if starts.len() > 1 {
        line.repeat_starts = starts[1..].iter().map(|(t, _)| *t).collect();
        state.timeline.dialect |= DialectFlags::REPEATED_LINE_STARTS;
    }

    if state.warnings.len() == warnings_before {
        let mut rendered = String::with_capacity(source.len());
        write_lyric_line(&mut rendered, &line, state.precision(), true)?;
        if !indent.is_empty() || rendered != source {
            state.warn(
                WarningKind::NormalizedLayout,
                format!("该行在输出时会被规范化为 {rendered:?}"),
            )?;
        }
    }

    if let Some(previous) = state.last_start
        && start < previous
    {
        state.warn(
            WarningKind::UnsortedLine,
            format!("开始时间 {start} 早于前一行的 {previous}"),
        )?;
    }
    state.last_start = Some(start);

    let index = state.push_entry(LineEntry::Lyric(line));
    state.current_line = Some(index);
    Ok(())
}

fn attach_same_timestamp_translation(
    state: &mut DocumentBuilder<'_>,
    source: &str,
    indent: &str,
    text: String,
) -> Result<(), SplError> {
    let precision = state.precision();
    let translation = Translation {
        text,
        language: None,
        style: TranslationStyle::SameTimestamp,
    };

    let mut rendered = String::with_capacity(source.len());
    if let Some(line) = state.current_line_mut() {
        write_translation(&mut rendered, line, &translation, precision)?;
        line.translations.push(translation);
    }
    state.timeline.dialect |= DialectFlags::TRANSLATION_LINES;

    if !indent.is_empty() || rendered != source {
        state.warn(
            WarningKind::NormalizedLayout,
            format!("该翻译行在输出时会被规范化为 {rendered:?}"),
        )?;
    }
    Ok(())
}

pub(super) fn handle_translation(
    state: &mut DocumentBuilder<'_>,
    source: &str,
    language: Option<&str>,
    text: &str,
    indent: &str,
) -> Result<(), SplError> {
    let translation = Translation {
        text: text.to_string(),
        language: language.map(str::to_string),
        style: if language.is_some() {
            TranslationStyle::LanguageTagged
        } else {
            TranslationStyle::Implicit
        },
    };

    let Some(line) = state.current_line_mut() else {
        state.warn(
            WarningKind::OrphanTranslationLine,
            "翻译行之前没有可以挂靠的歌词行，已原样保留",
        )?;
        return push_passthrough(state, source, PassthroughKind::Unrecognized);
    };
    line.translations.push(translation);
    state.timeline.dialect |= DialectFlags::TRANSLATION_LINES;

    if !indent.is_empty() {
        state.warn(WarningKind::NormalizedLayout, "翻译行前的缩进在输出时会被去掉")?;
    }
    Ok(())
}

pub(super) fn handle_blank(state: &mut DocumentBuilder<'_>, source: &str) -> Result<(), SplError> {
    push_passthrough(state, source, PassthroughKind::Blank)
}

pub(super) fn handle_unrecognized(
    state: &mut DocumentBuilder<'_>,
    source: &str,
    reason: UnrecognizedReason,
) -> Result<(), SplError> {
    let (kind, message) = match reason {
        UnrecognizedReason::BrokenTimestamp => (
            WarningKind::InvalidTimestampLiteral,
            "行首的时间戳无法解析，该行已原样保留",
        ),
        UnrecognizedReason::UndeclaredPrefix => (
            WarningKind::UnrecognizedLineKind,
            "行首的括号既不是时间戳也不是已声明的翻译语言，该行已原样保留",
        ),
        UnrecognizedReason::TagWithTrailingText => (
            WarningKind::UnrecognizedLineKind,
            "标签之后还有其他内容，该行已原样保留",
        ),
        UnrecognizedReason::UntimedMarkers => (
            WarningKind::UnrecognizedLineKind,
            "没有行级时间戳的行中出现了时间标记，该行已原样保留",
        ),
    };
    state.warn(kind, message)?;
    push_passthrough(state, source, PassthroughKind::Unrecognized)
}

fn push_passthrough(
    state: &mut DocumentBuilder<'_>,
    source: &str,
    kind: PassthroughKind,
) -> Result<(), SplError> {
    let line_number = state.line_number;
    state.push_entry(LineEntry::Passthrough(Passthrough {
        kind,
        text: source.to_string(),
        line_number,
    }));
    state.current_line = None;
    Ok(())
}

/// 第一个两位或三位小数的时间戳决定整份文件的精度。
fn observe_precision<'t, 'a: 't>(
    state: &mut DocumentBuilder<'_>,
    tokens: impl Iterator<Item = &'t Token<'a>>,
) {
    if state.precision.is_some() {
        return;
    }
    for token in tokens.filter(|t| t.is_marker()) {
        if let Some(precision) =
            fraction_digits(token.content()).and_then(Precision::from_fraction_digits)
        {
            debug!(?precision, "确定文件精度");
            state.precision = Some(precision);
            if precision == Precision::Millisecond {
                state.timeline.dialect |= DialectFlags::MILLISECOND_PRECISION;
            }
            return;
        }
    }
}

