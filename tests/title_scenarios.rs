// Title inference scenarios over hand-built glyph runs
use std::sync::Arc;

use pdfshelf::config::TitleConfig;
use pdfshelf::title::{sanitize, Dictionary, Phrase, PhraseBuilder, TitleEngine, TitleRanker};
use pdfshelf::types::TextRun;
use rstest::{fixture, rstest};

fn run(text: &str, size: f64, x: f64, y: f64, w: f64) -> TextRun {
    TextRun::new(text, "F1", size, x, y, w)
}

#[fixture]
fn engine() -> TitleEngine {
    TitleEngine::with_defaults().unwrap()
}

fn engine_with(words: &[&str]) -> TitleEngine {
    let dict: Dictionary = words.iter().collect();
    TitleEngine::new(Arc::new(dict), &TitleConfig::default()).unwrap()
}

#[rstest]
fn no_runs_give_empty_title(engine: TitleEngine) {
    assert_eq!(engine.infer(&[]), "");
}

#[rstest]
fn heading_over_body_text(engine: TitleEngine) {
    let runs = vec![
        run("Design", 24.0, 0.0, 100.0, 40.0),
        run("of", 24.0, 45.0, 100.0, 15.0),
        run("Systems", 24.0, 65.0, 100.0, 45.0),
        run("Lorem ipsum dolor sit amet consectetur", 10.0, 0.0, 80.0, 200.0),
    ];
    let phrases = PhraseBuilder::default().build(&runs);
    assert_eq!(phrases.len(), 2);
    assert_eq!(phrases[0].font_size(), 24.0);
    assert_eq!(phrases[1].font_size(), 10.0);
    assert_eq!(engine.infer(&runs), "Design of Systems");
}

#[rstest]
fn kerning_sized_gaps_join_runs(engine: TitleEngine) {
    // gaps of 2.0 stay under the 3.84 word threshold at 24pt
    let runs = vec![
        run("Design", 24.0, 0.0, 100.0, 40.0),
        run("of", 24.0, 42.0, 100.0, 15.0),
        run("Systems", 24.0, 59.0, 100.0, 45.0),
    ];
    let phrases = PhraseBuilder::default().build(&runs);
    assert_eq!(phrases[0].render(80), "DesignofSystems");
    assert_eq!(engine.infer(&runs), "");
}

#[rstest]
fn line_break_inserts_separator(engine: TitleEngine) {
    let runs = vec![
        run("Introduction to", 20.0, 0.0, 700.0, 150.0),
        run("Distributed Systems", 20.0, 0.0, 676.0, 180.0),
    ];
    assert_eq!(engine.infer(&runs), "Introduction to Distributed Systems");
}

#[test]
fn short_candidate_without_runner_up_is_unchanged() {
    let phrases = PhraseBuilder::default().build(&[run("Hi", 30.0, 0.0, 0.0, 20.0)]);
    assert_eq!(TitleRanker::default().rank(phrases), "Hi");
}

#[rstest]
fn two_letter_candidate_has_no_tokens(engine: TitleEngine) {
    // "Hi" survives ranking but yields no 3+ letter token
    assert_eq!(engine.infer(&[run("Hi", 30.0, 0.0, 0.0, 20.0)]), "");
}

#[rstest]
fn drop_cap_falls_back_to_body(engine: TitleEngine) {
    let runs = vec![
        run("T", 60.0, 0.0, 700.0, 30.0),
        run("he analysis of design", 11.0, 31.0, 700.0, 120.0),
    ];
    assert_eq!(engine.infer(&runs), "he analysis of design");
}

#[rstest]
#[case::ascii("x ".repeat(100), "x ".repeat(40))]
#[case::multibyte("é".repeat(100), "é".repeat(80))]
#[case::cjk("設計".repeat(60), "設計".repeat(40))]
fn render_caps_at_eighty_chars(#[case] text: String, #[case] expected: String) {
    let phrase = Phrase::start(&run(&text, 20.0, 0.0, 0.0, 500.0), 0.16);
    let rendered = phrase.render(80);
    assert_eq!(rendered.chars().count(), 80);
    assert_eq!(rendered, expected);
}

#[test]
fn equal_sizes_keep_document_order() {
    let runs = vec![
        run("Alpha release notes", 14.0, 0.0, 700.0, 100.0),
        run("tiny", 6.0, 0.0, 650.0, 20.0),
        run("Beta release notes", 14.0, 0.0, 600.0, 100.0),
    ];
    let phrases = PhraseBuilder::default().build(&runs);
    assert_eq!(phrases.len(), 3);
    assert_eq!(TitleRanker::default().rank(phrases), "Alpha release notes");
}

#[rstest]
#[case::exactly_one_fifth("known qqq www zzz xxx", "known qqq www zzz xxx")]
#[case::just_below("known qqq www zzz xxx vvv", "")]
#[case::all_known("known known", "known known")]
fn dictionary_ratio_boundary(#[case] text: &str, #[case] expected: &str) {
    let engine = engine_with(&["known"]);
    assert_eq!(engine.infer(&[run(text, 20.0, 0.0, 0.0, 100.0)]), expected);
}

#[test]
fn custom_dictionary_is_used() {
    let engine = engine_with(&["zorblax"]);
    assert_eq!(engine.infer(&[run("Zorblax", 20.0, 0.0, 0.0, 60.0)]), "Zorblax");
    assert_eq!(engine.infer(&[run("Design", 20.0, 0.0, 0.0, 60.0)]), "");
}

// Deterministic pseudo-random sizes for the grouping property
fn sizes(seed: u64, n: usize) -> Vec<f64> {
    let mut state = seed;
    (0..n)
        .map(|_| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            8.0 + ((state >> 33) % 2400) as f64 / 100.0
        })
        .collect()
}

#[rstest]
#[case(1)]
#[case(7)]
#[case(42)]
#[case(1234)]
fn phrase_members_stay_within_tolerance_of_seed(#[case] seed: u64) {
    let sizes = sizes(seed, 60);
    let runs: Vec<TextRun> = sizes
        .iter()
        .enumerate()
        .map(|(i, size)| run(&format!("r{i:03}"), *size, i as f64 * 100.0, 0.0, 10.0))
        .collect();

    let phrases = PhraseBuilder::default().build(&runs);
    let mut seen = 0;
    for phrase in &phrases {
        for token in phrase.text().split_whitespace() {
            let index: usize = token[1..].parse().unwrap();
            assert!((sizes[index] - phrase.font_size()).abs() < 4.0);
            seen += 1;
        }
    }
    assert_eq!(seen, runs.len());
}

#[rstest]
#[case::plain(b"Systems".to_vec(), "Systems")]
#[case::truncated_tail(b"Caf\xc3".to_vec(), "Caf ")]
#[case::lone_continuation(b"\x80\x80ab".to_vec(), "  ab")]
#[case::control(b"a\tb\x00c".to_vec(), "a b c")]
#[case::multibyte("Über".as_bytes().to_vec(), "Über")]
#[case::unassigned("a\u{0378}b".as_bytes().to_vec(), "a b")]
#[case::noncharacter("a\u{FFFF}b".as_bytes().to_vec(), "a b")]
fn sanitizer_cases(#[case] raw: Vec<u8>, #[case] expected: &str) {
    assert_eq!(sanitize(&raw), expected);
}

#[test]
fn sanitizer_terminates_on_every_byte_pattern() {
    for seed in 0..64u64 {
        let raw: Vec<u8> = sizes(seed, 50).iter().map(|s| (*s * 10.0) as u8).collect();
        let out = sanitize(&raw);
        assert!(out.chars().count() <= raw.len());
        assert!(!out.is_empty());
    }
}
