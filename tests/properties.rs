//! Property-based tests for timestamps and whole-document shifting.

use proptest::prelude::*;
use spl_processor::{ParseOptions, Precision, Timestamp, parse_spl, serialize_spl, shift_all};

/// Centisecond-aligned times below 100 minutes.
fn centisecond_strategy() -> impl Strategy<Value = u64> {
    (0u64..600_000).prop_map(|cs| cs * 10)
}

/// A small word-timed document with strictly increasing times.
fn document_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec((1u64..200, "[a-z]{1,6}"), 1..8).prop_map(|steps| {
        let mut at = 1000u64;
        let mut out = String::new();
        for (step, word) in steps {
            let line_start = Timestamp(at);
            at += step * 10;
            out.push_str(&format!(
                "[{}]<{}>{word} <{}>{word}\n",
                line_start.format(Precision::Centisecond),
                line_start.format(Precision::Centisecond),
                Timestamp(at).format(Precision::Centisecond),
            ));
            at += 500;
        }
        out
    })
}

proptest! {
    #[test]
    fn test_format_then_parse_is_identity(ms in 0u64..10_000_000) {
        let text = Timestamp(ms).format(Precision::Millisecond);
        prop_assert_eq!(Timestamp::parse_literal(&text).unwrap(), Timestamp(ms));
    }

    #[test]
    fn test_centisecond_format_is_lossless_when_aligned(ms in centisecond_strategy()) {
        let text = Timestamp(ms).format(Precision::Centisecond);
        prop_assert_eq!(text.parse::<Timestamp>().unwrap(), Timestamp(ms));
    }

    #[test]
    fn test_generated_documents_round_trip(content in document_strategy()) {
        let parsed = parse_spl(&content, &ParseOptions::default()).unwrap();
        prop_assert!(parsed.warnings.is_empty(), "{:?}", parsed.warnings);
        prop_assert_eq!(serialize_spl(&parsed.timeline).unwrap(), content);
    }

    #[test]
    fn test_shift_then_unshift_is_identity(
        content in document_strategy(),
        delta in -1000i64..100_000,
    ) {
        let timeline = parse_spl(&content, &ParseOptions::default()).unwrap().timeline;
        let shifted = shift_all(&timeline, delta).unwrap();
        prop_assert_eq!(shift_all(&shifted, -delta).unwrap(), timeline);
    }
}
