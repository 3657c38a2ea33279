//! # 对齐器接口
//!
//! 逐字时间通常来自外部的强制对齐工具（语音识别、音源分离等都不在本 crate 内）。
//! 本模块只定义跨越这一边界的数据：对齐器接收音频引用和只有行级时间的文档，
//! 返回 [`AlignmentPatch`]，再由 [`apply_alignment`] 写回文档。

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::{Warning, WarningKind},
    timestamp::Timestamp,
    types::{DialectFlags, Line, Span, Timeline, Word},
};

/// 对齐器使用的音频引用，例如文件路径或 URL。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AudioReference(pub String);

/// 对齐器给出的一个单词。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignedWord {
    /// 单词文本
    pub text: String,
    /// 绝对时间，对齐失败时为 `None`
    pub span: Option<Span>,
}

/// 一行歌词的对齐结果。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineAlignment {
    /// 目标歌词行在 [`Timeline::lyric_lines`] 中的序号（从 0 开始）
    pub line_index: usize,
    /// 按顺序排列的单词
    pub words: Vec<AlignedWord>,
}

/// 对齐器的输出。
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AlignmentPatch {
    pub lines: Vec<LineAlignment>,
}

/// 外部对齐器。
///
/// 输入通常由 [`Timeline::line_level_only`] 产生。
pub trait Aligner {
    /// 对齐失败时的错误类型。
    type Error: std::error::Error;

    /// 为 `timeline` 中的歌词行生成逐字时间。
    ///
    /// # Errors
    ///
    /// 由具体实现定义。
    fn align(
        &self,
        audio: &AudioReference,
        timeline: &Timeline,
    ) -> Result<AlignmentPatch, Self::Error>;
}

/// 把对齐结果写回文档。
///
/// 单词文本必须与该行 `raw_text` 按空白切分的结果一致，否则跳过该行并给出
/// `TextReconstructionMismatch` 警告。早于前一个单词的开始时间会被钳制。
/// 成功写入任何一行后，文档会带上 `WORD_TIMING` 特征。
pub fn apply_alignment(timeline: &mut Timeline, patch: &AlignmentPatch) -> Vec<Warning> {
    let mut warnings = Vec::new();
    let mut applied = 0usize;
    {
        let mut lines: Vec<&mut Line> = timeline.lyric_lines_mut().collect();
        for alignment in &patch.lines {
            let Some(line) = lines.get_mut(alignment.line_index) else {
                warnings.push(Warning::new(
                    WarningKind::TextReconstructionMismatch,
                    0,
                    format!("对齐结果指向不存在的第 {} 个歌词行", alignment.line_index + 1),
                ));
                continue;
            };

            if !line
                .raw_text
                .split_whitespace()
                .eq(alignment.words.iter().map(|w| w.text.as_str()))
            {
                warnings.push(Warning::new(
                    WarningKind::TextReconstructionMismatch,
                    0,
                    format!(
                        "第 {} 个歌词行的对齐单词与原文 {:?} 不一致，已跳过",
                        alignment.line_index + 1,
                        line.raw_text
                    ),
                ));
                continue;
            }

            line.words = aligned_words(line, &alignment.words, alignment.line_index, &mut warnings);
            applied += 1;
        }
    }

    if applied > 0 {
        timeline.dialect |= DialectFlags::WORD_TIMING;
    }
    debug!(applied, warnings = warnings.len(), "已应用对齐结果");
    warnings.extend(timeline.validate());
    warnings
}

fn aligned_words(
    line: &Line,
    aligned: &[AlignedWord],
    line_index: usize,
    warnings: &mut Vec<Warning>,
) -> Vec<Word> {
    let mut cursor = line.span.start;
    let mut words: Vec<Word> = aligned
        .iter()
        .map(|aligned_word| {
            let mut word = Word::new(aligned_word.text.clone(), Span::open(cursor));
            if let Some(span) = aligned_word.span {
                if span.start < cursor {
                    warnings.push(Warning::new(
                        WarningKind::NonMonotonicTimestamp,
                        0,
                        format!(
                            "第 {} 个歌词行中单词 {:?} 的开始时间 {} 早于 {cursor}，已钳制",
                            line_index + 1,
                            aligned_word.text,
                            span.start
                        ),
                    ));
                }
                let start = span.start.max(cursor);
                word.span = Span {
                    start,
                    end: span.end.map(|end| end.max(start)),
                    explicit_end: span.end.is_some(),
                };
                word.timed = true;
                cursor = start;
            }
            word
        })
        .collect();

    let line_end = line.span.end;
    for i in 0..words.len() {
        let next_start: Option<Timestamp> = words.get(i + 1).map(|w| w.span.start);
        let word = &mut words[i];
        match (word.span.end, next_start) {
            // 结束时间与下一个单词的开始重合时不需要单独的标记
            (Some(end), Some(next)) if end == next => word.span.explicit_end = false,
            (None, Some(next)) => word.span.end = Some(next),
            (None, None) => word.span.end = line_end,
            _ => {}
        }
    }
    words
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ParseOptions, parse_spl, serialize_spl};

    struct FixedAligner(AlignmentPatch);

    impl Aligner for FixedAligner {
        type Error = std::io::Error;

        fn align(
            &self,
            _audio: &AudioReference,
            _timeline: &Timeline,
        ) -> Result<AlignmentPatch, Self::Error> {
            Ok(self.0.clone())
        }
    }

    fn aligned(text: &str, start: u64, end: Option<u64>) -> AlignedWord {
        AlignedWord {
            text: text.to_string(),
            span: Some(Span {
                start: Timestamp(start),
                end: end.map(Timestamp),
                explicit_end: false,
            }),
        }
    }

    #[test]
    fn test_apply_alignment_produces_inline_markers() {
        let parsed = parse_spl(
            "[00:01.00]Hello world\n[00:04.00]next\n",
            &ParseOptions::default(),
        )
        .unwrap();
        let mut timeline = parsed.timeline.line_level_only();

        let aligner = FixedAligner(AlignmentPatch {
            lines: vec![LineAlignment {
                line_index: 0,
                words: vec![
                    aligned("Hello", 1000, Some(1500)),
                    aligned("world", 1500, Some(2500)),
                ],
            }],
        });
        let patch = aligner
            .align(&AudioReference("song.flac".into()), &timeline)
            .unwrap();
        let warnings = apply_alignment(&mut timeline, &patch);
        assert!(warnings.is_empty(), "{warnings:?}");

        assert_eq!(
            serialize_spl(&timeline).unwrap(),
            "[00:01.00]<00:01.00>Hello <00:01.50>world<00:02.50>\n[00:04.00]next\n"
        );
    }

    #[test]
    fn test_apply_alignment_skips_mismatched_text() {
        let mut timeline = parse_spl("[00:01.00]Hello world", &ParseOptions::default())
            .unwrap()
            .timeline;
        let before = timeline.clone();
        let patch = AlignmentPatch {
            lines: vec![
                LineAlignment {
                    line_index: 0,
                    words: vec![aligned("Goodbye", 1000, None)],
                },
                LineAlignment {
                    line_index: 3,
                    words: Vec::new(),
                },
            ],
        };
        let warnings = apply_alignment(&mut timeline, &patch);
        assert_eq!(warnings.len(), 2);
        assert!(
            warnings
                .iter()
                .all(|w| w.kind == WarningKind::TextReconstructionMismatch)
        );
        assert_eq!(timeline, before);
    }

    #[test]
    fn test_apply_alignment_clamps_and_inherits() {
        let mut timeline = parse_spl("[00:02.00]a b c[00:05.00]", &ParseOptions::default())
            .unwrap()
            .timeline;
        let patch = AlignmentPatch {
            lines: vec![LineAlignment {
                line_index: 0,
                words: vec![
                    aligned("a", 1000, None),
                    AlignedWord {
                        text: "b".into(),
                        span: None,
                    },
                    aligned("c", 3000, None),
                ],
            }],
        };
        let warnings = apply_alignment(&mut timeline, &patch);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind, WarningKind::NonMonotonicTimestamp);

        let line = timeline.lyric_lines().next().unwrap();
        let spans: Vec<(u64, Option<u64>, bool)> = line
            .words
            .iter()
            .map(|w| (w.span.start.0, w.span.end.map(|e| e.0), w.timed))
            .collect();
        assert_eq!(
            spans,
            vec![
                (2000, Some(2000), true),
                (2000, Some(3000), false),
                (3000, Some(5000), true),
            ]
        );
    }
}
