use spl_processor::{
    DialectFlags, ParseOptions, ParseOptionsBuilder, SplError, Timestamp, TranslationStyle,
    WarningKind, active_word_at, expand_repeats, parse_spl, plain_lyrics, serialize_spl,
};

const WORD_TIMED: &str = include_str!("test_data/word_timed.spl");
const MESSY: &str = include_str!("test_data/messy.spl");
const MILLIS: &str = include_str!("test_data/millis.spl");

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, FmtSubscriber};
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

fn kinds(content: &str) -> Vec<WarningKind> {
    parse_spl(content, &ParseOptions::default())
        .unwrap()
        .warnings
        .into_iter()
        .map(|w| w.kind)
        .collect()
}

#[test]
fn test_clean_files_round_trip_exactly() {
    init_tracing();
    for (name, content) in [("word_timed", WORD_TIMED), ("millis", MILLIS)] {
        let parsed = parse_spl(content, &ParseOptions::default()).unwrap();
        assert!(parsed.warnings.is_empty(), "{name}: {:?}", parsed.warnings);
        assert_eq!(serialize_spl(&parsed.timeline).unwrap(), content, "{name}");
    }
}

#[test]
fn test_word_timed_fixture_structure() {
    let parsed = parse_spl(WORD_TIMED, &ParseOptions::default()).unwrap();
    let timeline = &parsed.timeline;

    assert_eq!(timeline.tag("ti"), Some("Example Song"));
    assert_eq!(timeline.tag("ar"), Some("also"));
    assert_eq!(timeline.tag_values("ar"), vec!["Someone", "also"]);

    let lines: Vec<_> = timeline.lyric_lines().collect();
    assert_eq!(lines.len(), 5);
    assert_eq!(lines[0].translations[0].style, TranslationStyle::LanguageTagged);
    assert_eq!(lines[1].translations[0].style, TranslationStyle::SameTimestamp);
    assert_eq!(lines[1].translations[0].text, "第二行");
    assert_eq!(lines[2].translations[0].style, TranslationStyle::Implicit);
    assert_eq!(lines[3].repeat_starts, vec![Timestamp(20_000)]);
    assert_eq!(lines[4].words[0].syllables.len(), 2);

    assert!(timeline.dialect.contains(
        DialectFlags::WORD_TIMING
            | DialectFlags::SYLLABLE_TIMING
            | DialectFlags::TRANSLATION_LINES
            | DialectFlags::EXPLICIT_LINE_ENDS
            | DialectFlags::REPEATED_LINE_STARTS
            | DialectFlags::FINAL_NEWLINE
    ));
    assert!(!timeline.dialect.contains(DialectFlags::MILLISECOND_PRECISION));
}

#[test]
fn test_millisecond_precision_is_kept() {
    let parsed = parse_spl(MILLIS, &ParseOptions::default()).unwrap();
    assert!(
        parsed
            .timeline
            .dialect
            .contains(DialectFlags::MILLISECOND_PRECISION)
    );
    let (_, word) = active_word_at(&parsed.timeline, Timestamp(12_998)).unwrap();
    assert_eq!(word.text, "tick");
    let (_, word) = active_word_at(&parsed.timeline, Timestamp(12_999)).unwrap();
    assert_eq!(word.text, "tock");
}

#[test]
fn test_crlf_and_bom_round_trip() {
    let content = "\u{feff}[ti:x]\r\n[00:01.00]a\r\n\r\n[00:02.00]b";
    let parsed = parse_spl(content, &ParseOptions::default()).unwrap();
    assert!(parsed.warnings.is_empty(), "{:?}", parsed.warnings);
    assert!(parsed.timeline.dialect.contains(
        DialectFlags::CRLF_LINE_ENDINGS | DialectFlags::BYTE_ORDER_MARK
    ));
    assert!(!parsed.timeline.dialect.contains(DialectFlags::FINAL_NEWLINE));
    assert_eq!(serialize_spl(&parsed.timeline).unwrap(), content);
}

#[test]
fn test_messy_file_warnings() {
    assert_eq!(
        kinds(MESSY),
        vec![
            WarningKind::NormalizedLayout,
            WarningKind::NormalizedLayout,
            WarningKind::MalformedMarkerBracket,
            WarningKind::UnrecognizedLineKind,
            WarningKind::NonMonotonicTimestamp,
        ]
    );
}

#[test]
fn test_formatting_reaches_a_fixed_point() {
    let options = ParseOptions::default();
    let once = serialize_spl(&parse_spl(MESSY, &options).unwrap().timeline).unwrap();
    let twice = serialize_spl(&parse_spl(&once, &options).unwrap().timeline).unwrap();
    assert_eq!(once, twice);
    assert!(once.contains("[00:01.00]indented line\n"));
    assert!(once.contains("[00:02.50]short minutes\n"));
    assert!(once.contains("[xx]undeclared prefix\n"));
    assert!(once.contains("[00:04.00]a <00:04.00>b\n"));
}

#[test]
fn test_malformed_marker_stays_in_text() {
    let parsed = parse_spl("[00:01.00]hello<00:02 world", &ParseOptions::default()).unwrap();
    let malformed: Vec<_> = parsed
        .warnings
        .iter()
        .filter(|w| w.kind == WarningKind::MalformedMarkerBracket)
        .collect();
    assert_eq!(malformed.len(), 1);
    assert_eq!(parsed.warnings.len(), 1);
    assert_eq!(plain_lyrics(&parsed.timeline), vec!["hello<00:02 world"]);
}

#[test]
fn test_too_many_warnings_is_fatal() {
    let content: String = (1..=20).map(|i| format!("[xx]junk {i}\n")).collect();
    let options = ParseOptionsBuilder::default()
        .max_warnings(10usize)
        .build()
        .unwrap();
    let err = parse_spl(&content, &options).unwrap_err();
    assert!(matches!(
        err,
        SplError::TooManyWarnings {
            limit: 10,
            line_number: 11
        }
    ));

    let relaxed = ParseOptionsBuilder::default()
        .max_warnings(20usize)
        .build()
        .unwrap();
    assert_eq!(parse_spl(&content, &relaxed).unwrap().warnings.len(), 20);
}

#[test]
fn test_expand_repeats_from_fixture() {
    let parsed = parse_spl(WORD_TIMED, &ParseOptions::default()).unwrap();
    let expanded = expand_repeats(&parsed.timeline);
    assert_eq!(expanded.len(), 6);
    let chorus = expanded
        .iter()
        .find(|line| line.span.start == Timestamp(20_000))
        .unwrap();
    let starts: Vec<u64> = chorus.words.iter().map(|w| w.span.start.as_millis()).collect();
    assert_eq!(starts, vec![20_000, 20_500, 21_000]);
}

#[test]
fn test_options_from_toml() {
    let options = ParseOptions::from_toml_str(
        "max_warnings = 3\nstrict_monotonicity = true\ntranslation_tag_keys = [\"lang\"]\n",
    )
    .unwrap();
    let err = parse_spl("[00:02.00]a <00:01.00>b", &options).unwrap_err();
    assert!(matches!(err, SplError::NonMonotonicTimestamp { .. }));

    let parsed = parse_spl("[lang:en]\n[00:01.00]你好\n[en]hello", &options).unwrap();
    assert!(parsed.warnings.is_empty(), "{:?}", parsed.warnings);
    assert_eq!(
        parsed.timeline.lyric_lines().next().unwrap().translations[0]
            .language
            .as_deref(),
        Some("en")
    );
}
