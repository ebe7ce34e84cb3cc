//! End-to-end smoke test for termscan: build, archive, load, match.

use std::collections::BTreeSet;

use termscan::{Matcher, MatcherConfig, MatchStats, Mention};

const VOCABULARY: &[&str] = &[
    "acetaminophen",
    "aspirin",
    "benzene",
    "caffeine",
    "ethanol",
    "ibuprofen",
    "iron",
    "sodium chloride",
    "zinc oxide",
];

const TEXT: &str = "Patients took aspirins or ibuprofen with caffeine. \
                    No ironic effects; iron and zinc oxide levels were normal. \
                    Sodium chloride was not tested, but sodium chloride solutions were.";

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    println!("Running termscan smoke tests...\n");

    let expected = check_single();
    check_batched_archive(&expected);
    check_config();

    println!("\n✅ All smoke tests passed!");
}

fn sorted(found: impl IntoIterator<Item = Mention>) -> BTreeSet<Mention> {
    found.into_iter().collect()
}

fn check_single() -> BTreeSet<Mention> {
    let matcher = Matcher::from_terms(VOCABULARY);
    let mut stats = MatchStats::default();
    let found = sorted(matcher.match_text_with_stats(TEXT, &mut stats));

    let texts: Vec<&str> = found.iter().map(|m| m.text.as_str()).collect();
    assert_eq!(
        texts,
        vec![
            "aspirins",
            "ibuprofen",
            "caffeine",
            "iron",
            "zinc oxide",
            "sodium chloride",
        ]
    );
    for m in &found {
        assert_eq!(&TEXT[m.start..m.end], m.text);
    }
    println!("✓ Single automaton: {} mentions, {:?}", found.len(), stats);
    found
}

fn check_batched_archive(expected: &BTreeSet<Mention>) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vocabulary.tsar");

    let build = MatcherConfig {
        terms_per_automaton: 2,
        ..MatcherConfig::default()
    };
    let batched = Matcher::from_terms_batched(VOCABULARY, &build).unwrap();
    let written = batched.write_archive(&path).unwrap();
    assert_eq!(written, 5);
    println!("✓ Wrote {written} automata to {}", path.display());

    let load = MatcherConfig {
        piece_size: 2,
        ..MatcherConfig::default()
    };
    let loaded = Matcher::load(&path, &load).unwrap();
    assert_eq!(loaded.len(), 3);
    assert_eq!(&sorted(loaded.match_text(TEXT)), expected);
    println!(
        "✓ Loaded {} automata ({} bytes of tables), same mentions",
        loaded.len(),
        loaded.memory_usage()
    );
}

fn check_config() {
    let config = MatcherConfig::from_toml_str(
        r#"
        terms_per_automaton = 4

        [boundary]
        min_len = 5
        "#,
    )
    .unwrap();
    let matcher = Matcher::from_terms_batched(VOCABULARY, &config).unwrap();
    let found = sorted(matcher.match_text(TEXT));
    assert!(found.iter().all(|m| m.text != "iron"));
    assert_eq!(found.len(), 5);
    println!("✓ TOML configuration: min_len = {}", config.boundary.min_len);
}
