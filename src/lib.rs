//! # SPL Processor: Parser and Generator for Salt Player Lyrics
//!
//! This crate reads and writes SPL, the LRC-derived karaoke lyric format used by
//! Salt Player. SPL adds inline `<mm:ss.xx>` word and syllable markers, explicit
//! line end times, `[t1][t2]` repeated lines and several ways of attaching
//! translation lines to the LRC base.
//!
//! The main entry points are:
//! - [`parse_spl`]: Builds a [`Timeline`] from SPL text and collects non-fatal [`Warning`]s.
//! - [`serialize_spl`]: Writes a [`Timeline`] back to SPL text.
//! - [`active_word_at`], [`shift_all`], [`plain_lyrics`] and [`expand_repeats`]: Queries
//!   and transforms over a parsed document.
//!
//! Parsing is lenient. Lines that cannot be understood are kept verbatim, so any input
//! that parses without warnings serializes back to the exact same bytes.
//!
//! ## Examples
//!
//! ```rust
//! use spl_processor::{ParseOptions, parse_spl, serialize_spl};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let source = "[ti:Example]\n[00:01.00]<00:01.00>Hello <00:01.50>world[00:03.00]\n";
//!
//!     let parsed = parse_spl(source, &ParseOptions::default())?;
//!     assert!(parsed.warnings.is_empty());
//!
//!     let line = parsed.timeline.lyric_lines().next().unwrap();
//!     assert_eq!(line.words[1].text, "world");
//!     assert_eq!(line.words[1].span.start.as_millis(), 1500);
//!     assert_eq!(parsed.timeline.tag("ti"), Some("Example"));
//!
//!     assert_eq!(serialize_spl(&parsed.timeline)?, source);
//!     Ok(())
//! }
//! ```

pub mod align;
pub mod config;
pub mod error;
mod generator;
pub mod metadata;
mod parser;
pub mod query;
pub mod timestamp;
pub mod types;

pub use align::{AlignedWord, Aligner, AlignmentPatch, AudioReference, LineAlignment, apply_alignment};
pub use config::{DEFAULT_MAX_WARNINGS, ParseOptions, ParseOptionsBuilder};
pub use error::{SplError, Warning, WarningKind};
pub use generator::serialize_spl;
pub use metadata::{MetadataTag, TimingDeclaration};
pub use parser::{ParsedSpl, parse_spl, parse_spl_bytes};
pub use query::{LyricIndex, active_word_at, expand_repeats, plain_lyrics, shift_all};
pub use timestamp::{Precision, Timestamp};
pub use types::{
    DialectFlags, Line, LineEntry, Passthrough, PassthroughKind, Span, Syllable, Timeline,
    Translation, TranslationStyle, Word,
};
