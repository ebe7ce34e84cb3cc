use super::*;
use crate::codec::{decode, encode};
use crate::config::MatcherConfig;
use crate::scanner::Matcher;
use proptest::prelude::*;
use std::collections::BTreeSet;

/// Strings worth probing for a term set: the terms, their prefixes, and
/// one-character extensions.
fn probes(terms: &BTreeSet<String>, extra: &[String]) -> Vec<String> {
    let mut out: Vec<String> = extra.to_vec();
    out.push(String::new());
    for term in terms {
        let chars: Vec<char> = term.chars().collect();
        for i in 0..=chars.len() {
            out.push(chars[..i].iter().collect());
        }
        out.push(format!("{term}s"));
        out.push(format!("{term}\u{10FFFF}"));
    }
    out
}

fn assert_same_tables<A: Dfa, B: Dfa>(a: &A, b: &B) {
    assert_eq!(a.state_count(), b.state_count());
    assert_eq!(a.initial_state(), b.initial_state());
    assert_eq!(a.break_points(), b.break_points());
    for s in 0..a.state_count() {
        let state = StateId::new(s);
        assert_eq!(a.is_accepting(state), b.is_accepting(state));
        for class in 0..a.break_points().len() {
            assert_eq!(a.step_class(state, class), b.step_class(state, class));
        }
    }
}

#[test]
fn test_build_determinize_flatten_pipeline() {
    let terms = ["acetone", "acetic acid", "benzene", "benzoic acid"];
    let automaton = DictionaryBuilder::build(terms);
    assert!(automaton.is_deterministic());

    let dense = RunForm::new(&automaton);
    let sparse = dense.compress();
    for term in terms {
        assert!(automaton.run(term));
        assert!(dense.run(term));
        assert!(sparse.run(term));
    }
    for other in ["acet", "benzoic", "acetic acids", ""] {
        assert!(!dense.run(other), "{other}");
        assert!(!sparse.run(other), "{other}");
    }
}

#[test]
fn test_incremental_builder_matches_batch_build() {
    let mut builder = DictionaryBuilder::new();
    for term in ["ethane", "ethanol", "methane", "methanol", "propane"] {
        builder.add(term).unwrap();
    }
    let incremental = RunForm::new(&builder.finish());
    let batch = build_run_form(["propane", "methanol", "ethane", "methane", "ethanol"]);
    assert_same_tables(&incremental, &batch);
}

#[test]
fn test_suffix_sharing_keeps_automaton_small() {
    let terms: Vec<String> = ["ol", "al", "one", "ane", "ene", "yne"]
        .iter()
        .flat_map(|suffix| ["meth", "eth", "prop", "but"].map(|stem| format!("{stem}{suffix}")))
        .collect();
    let form = build_run_form(&terms);
    let total_chars: usize = terms.iter().map(|t| t.chars().count()).sum();
    assert!(form.state_count() < total_chars / 3);
    for term in &terms {
        assert!(form.run(term));
    }
}

#[test]
fn test_restore_and_reflatten_is_stable() {
    let form = build_run_form(["chloroform", "chlorine", "chlorophyll"]);
    let restored = Automaton::from_dfa(&form);
    assert!(restored.is_deterministic());
    let again = RunForm::new(&restored);
    assert_same_tables(&form, &again);

    let from_sparse = RunForm::new(&AnyDfa::from(form.clone()).compress().to_automaton());
    assert_same_tables(&form, &from_sparse);
}

#[test]
fn test_union_of_union() {
    let a = build_run_form(["alpha"]);
    let b = build_run_form(["beta"]);
    let c = build_run_form(["gamma"]);
    let ab = unite(&[a, b]);
    let abc = unite(&[ab, c]);
    for term in ["alpha", "beta", "gamma"] {
        assert!(abc.run(term));
    }
    assert!(!abc.run("delta"));
    assert!(determinize(&Automaton::from_dfa(&abc)).is_deterministic());
}

fn term_set(pattern: &'static str, max: usize) -> impl Strategy<Value = BTreeSet<String>> {
    prop::collection::btree_set(pattern, 0..max)
}

proptest! {
    /// The built automaton accepts exactly its terms.
    #[test]
    fn prop_exact_language(
        terms in term_set("[a-cé ß-]{1,6}", 24),
        extra in prop::collection::vec("[a-dé ß-]{0,7}", 0..24),
    ) {
        let dense = build_run_form(&terms);
        let sparse = dense.compress();
        for probe in probes(&terms, &extra) {
            let expected = terms.contains(&probe);
            prop_assert_eq!(dense.run(&probe), expected, "dense {:?}", probe);
            prop_assert_eq!(sparse.run(&probe), expected, "sparse {:?}", probe);
        }
    }

    /// Compressed tables step exactly like the dense tables they came from.
    #[test]
    fn prop_compressed_matches_dense(terms in term_set("[a-fxyz0-9]{1,8}", 32)) {
        let dense = build_run_form(&terms);
        let sparse = CompressedRunForm::new(&dense);
        assert_same_tables(&dense, &sparse);
        assert_same_tables(&dense, &sparse.decompress());
    }

    /// Encoding and decoding preserves every transition.
    #[test]
    fn prop_codec_round_trip(terms in term_set("[a-eé]{1,8}", 24), compress in any::<bool>()) {
        let mut dfa = AnyDfa::from(build_run_form(&terms));
        if compress {
            dfa = dfa.compress();
        }
        let decoded = decode(&encode(&dfa).unwrap()).unwrap();
        prop_assert_eq!(decoded.kind(), dfa.kind());
        assert_same_tables(&dfa, &decoded);
    }

    /// Uniting two automata accepts exactly the union of their term sets.
    #[test]
    fn prop_union_language(
        a in term_set("[a-d]{1,5}", 16),
        b in term_set("[b-e]{1,5}", 16),
        extra in prop::collection::vec("[a-e]{0,6}", 0..16),
    ) {
        let united = unite(&[build_run_form(&a), build_run_form(&b)]);
        let all: BTreeSet<String> = a.union(&b).cloned().collect();
        for probe in probes(&all, &extra) {
            prop_assert_eq!(united.run(&probe), all.contains(&probe), "{:?}", probe);
        }
    }

    /// Batching and piece union never change the mentions found.
    #[test]
    fn prop_batching_transparency(
        terms in prop::collection::vec("[abcs]{1,5}", 0..24),
        text in "[abcs ,-]{0,48}",
        terms_per_automaton in 1usize..6,
        piece_size in 1usize..4,
        compress in any::<bool>(),
    ) {
        let single = Matcher::from_terms(&terms);
        let config = MatcherConfig {
            terms_per_automaton,
            piece_size,
            compress,
            ..MatcherConfig::default()
        };
        let batched = Matcher::from_terms_batched(&terms, &config).unwrap();
        prop_assert_eq!(single.match_text(&text), batched.match_text(&text));
    }
}
