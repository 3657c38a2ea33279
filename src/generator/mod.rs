//! # SPL 歌词格式生成器
//!
//! 把 [`Timeline`] 写回 SPL 文本。对于解析时没有产生任何警告的输入，
//! 生成结果与原文逐字节相同。

mod line;
mod utils;

use std::fmt::Write;

use tracing::debug;

pub(crate) use self::line::{write_lyric_line, write_translation};
use crate::{
    error::SplError,
    metadata::MetadataTag,
    types::{DialectFlags, LineEntry, Timeline},
};

/// SPL 生成的主入口函数。
///
/// 标签按记录的位置穿插在行序列之间输出；翻译紧跟在所属歌词行之后；
/// 原样保留的行按原文输出。换行风格、BOM 与末尾换行均按解析时观察到的格式还原。
///
/// # 参数
/// * `timeline` - 要输出的文档。
///
/// # 返回
///
/// * `Ok(String)` - 生成的 SPL 文本。
///
/// # Errors
///
/// 仅在底层格式化失败时返回 [`SplError::Format`]。
pub fn serialize_spl(timeline: &Timeline) -> Result<String, SplError> {
    let precision = utils::output_precision(timeline);
    let inline = timeline.dialect.has_inline_timing();
    let eol = if timeline.dialect.contains(DialectFlags::CRLF_LINE_ENDINGS) {
        "\r\n"
    } else {
        "\n"
    };
    debug!(?precision, inline, "开始生成 SPL");

    let mut out = String::new();
    if timeline.dialect.contains(DialectFlags::BYTE_ORDER_MARK) {
        out.push('\u{feff}');
    }

    let mut tags: Vec<&MetadataTag> = timeline.tags.iter().collect();
    tags.sort_by_key(|tag| tag.position);
    let mut tags = tags.into_iter().peekable();

    for (index, entry) in timeline.lines.iter().enumerate() {
        while let Some(tag) = tags.next_if(|tag| tag.position <= index) {
            line::write_tag(&mut out, tag)?;
            out.push_str(eol);
        }

        match entry {
            LineEntry::Lyric(lyric) => {
                write_lyric_line(&mut out, lyric, precision, inline)?;
                out.push_str(eol);
                for translation in &lyric.translations {
                    write_translation(&mut out, lyric, translation, precision)?;
                    out.push_str(eol);
                }
            }
            LineEntry::Passthrough(passthrough) => {
                write!(out, "{}{eol}", passthrough.text)?;
            }
        }
    }

    for tag in tags {
        line::write_tag(&mut out, tag)?;
        out.push_str(eol);
    }

    if !timeline.dialect.contains(DialectFlags::FINAL_NEWLINE) && out.ends_with(eol) {
        out.truncate(out.len() - eol.len());
    }
    Ok(out)
}
