//! Extraction Integration Tests
//!
//! End-to-end runs of the hierarchical extractor over small aligned
//! sentence pairs, plus property tests over random alignments.

use std::sync::Arc;

use proptest::prelude::*;
use thrax_core::{AppConfig, ExtractionError, GrammarKind, SkipReason, Span, Vocabulary};
use thrax_extractor::{HierarchicalRuleExtractor, LatticeBuilder, Rule, SpanTable};

fn extractor_with(config: &AppConfig) -> HierarchicalRuleExtractor {
    HierarchicalRuleExtractor::from_config(config, Arc::new(Vocabulary::new()), None).unwrap()
}

fn rendered(extractor: &HierarchicalRuleExtractor, rules: &[Rule]) -> Vec<String> {
    rules
        .iter()
        .map(|r| r.display(extractor.vocabulary()).to_string())
        .collect()
}

// =============================================================================
// Fixed scenarios
// =============================================================================

#[test]
fn test_phrase_rules_only() {
    let mut config = AppConfig::default();
    config.extraction.arity = 0;
    let mut extractor = extractor_with(&config);

    let rules = extractor.extract("a b ||| x y ||| 0-0 1-1").unwrap();
    assert_eq!(
        rendered(&extractor, &rules),
        vec![
            "[X] ||| a ||| x",
            "[X] ||| b ||| y",
            "[X] ||| a b ||| x y",
        ]
    );
    assert!(rules.iter().all(|r| r.num_nts() == 0));
}

#[test]
fn test_out_of_range_alignment_is_rejected() {
    let mut extractor = extractor_with(&AppConfig::default());

    let err = extractor.extract("a b ||| x y ||| 0-5").unwrap_err();
    assert!(matches!(
        err,
        ExtractionError::InconsistentAlignment {
            source_len: 2,
            target_len: 2,
            ..
        }
    ));
}

#[test]
fn test_huge_alignment_index_is_skipped() {
    let mut extractor = extractor_with(&AppConfig::default());
    let lines = [
        "a b ||| x y ||| 0-18446744073709551615",
        "a b ||| x y ||| 0-0 4000000000-1",
        "a ||| x ||| 0-0",
    ];

    let mut rules = Vec::new();
    let stats = extractor
        .extract_lines(lines, |rule| -> Result<(), std::convert::Infallible> {
            rules.push(rule);
            Ok(())
        })
        .unwrap();

    assert_eq!(stats.records, 3);
    assert_eq!(stats.extracted, 1);
    assert_eq!(stats.count(SkipReason::InconsistentAlignment), 2);
    assert_eq!(rendered(&extractor, &rules), vec!["[X] ||| a ||| x"]);
}

#[test]
fn test_loose_extraction_absorbs_unaligned_words() {
    let mut config = AppConfig::default();
    config.extraction.loose = true;
    let mut extractor = extractor_with(&config);

    let rules = extractor.extract("a b c ||| x y z ||| 0-0 2-2").unwrap();
    let rendered = rendered(&extractor, &rules);

    assert!(rendered.contains(&"[X] ||| a ||| x".to_string()));
    assert!(rendered.contains(&"[X] ||| a ||| x y".to_string()));
    assert!(rendered.contains(&"[X] ||| c ||| y z".to_string()));
    assert!(rendered.contains(&"[X] ||| a b ||| x y".to_string()));
}

#[test]
fn test_strict_extraction_skips_unaligned_boundaries() {
    let mut extractor = extractor_with(&AppConfig::default());

    let rules = extractor.extract("a b c ||| x y z ||| 0-0 2-2").unwrap();
    let rendered = rendered(&extractor, &rules);

    assert!(rendered.contains(&"[X] ||| a ||| x".to_string()));
    assert!(!rendered.contains(&"[X] ||| a ||| x y".to_string()));
    assert!(!rendered.contains(&"[X] ||| a b ||| x y".to_string()));
    assert!(rendered.contains(&"[X] ||| a b c ||| x y z".to_string()));
}

#[test]
fn test_samt_labels_and_dropped_nonterminals() {
    let mut config = AppConfig::default();
    config.labeling.grammar = GrammarKind::Samt;
    let table = SpanTable::new()
        .with_constituent(Span::new(0, 2), "S")
        .with_constituent(Span::new(0, 1), "NP");
    let builder: Arc<dyn LatticeBuilder> = Arc::new(table);

    let mut extractor =
        HierarchicalRuleExtractor::from_config(&config, Arc::new(Vocabulary::new()), Some(builder))
            .unwrap();
    let rules = extractor.extract("a b ||| x y ||| 0-0 1-1").unwrap();
    let rendered = rendered(&extractor, &rules);

    assert!(rendered.contains(&"[NP] ||| a ||| x".to_string()));
    assert!(rendered.contains(&"[S] ||| a b ||| x y".to_string()));
    assert!(rendered.contains(&"[S] ||| [NP,1] b ||| [NP,1] y".to_string()));
    // lexical rules fall back to the default label
    assert!(rendered.contains(&"[X] ||| b ||| y".to_string()));
    // [1,2) has no label, so a nonterminal over it is dropped
    assert!(!rendered.iter().any(|r| r.starts_with("[S] ||| a [")));
}

#[test]
fn test_samt_default_labels_for_nonterminals() {
    let mut config = AppConfig::default();
    config.labeling.grammar = GrammarKind::Samt;
    config.extraction.allow_nonlexical_x = true;
    let table = SpanTable::new().with_constituent(Span::new(0, 2), "S");
    let builder: Arc<dyn LatticeBuilder> = Arc::new(table);

    let mut extractor =
        HierarchicalRuleExtractor::from_config(&config, Arc::new(Vocabulary::new()), Some(builder))
            .unwrap();
    let rules = extractor.extract("a b ||| x y ||| 0-0 1-1").unwrap();
    let rendered = rendered(&extractor, &rules);

    assert!(rendered.contains(&"[S] ||| a [X,1] ||| x [X,1]".to_string()));
    assert!(rendered.contains(&"[S] ||| [X,1] b ||| [X,1] y".to_string()));
}

#[test]
fn test_manual_labels() {
    let mut config = AppConfig::default();
    config.labeling.grammar = GrammarKind::Manual;
    let mut extractor = extractor_with(&config);

    // spans in order: [0,1) [0,2) [1,2)
    let rules = extractor
        .extract("a b ||| x y ||| 0-0 1-1 ||| NP S VP")
        .unwrap();
    let rendered = rendered(&extractor, &rules);

    assert!(rendered.contains(&"[NP] ||| a ||| x".to_string()));
    assert!(rendered.contains(&"[VP] ||| b ||| y".to_string()));
    assert!(rendered.contains(&"[S] ||| a b ||| x y".to_string()));
    assert!(rendered.contains(&"[S] ||| a [VP,1] ||| x [VP,1]".to_string()));
    assert!(rendered.contains(&"[S] ||| [NP,1] b ||| [NP,1] y".to_string()));
}

#[test]
fn test_vocabulary_is_shared_across_sentences() {
    let vocab = Arc::new(Vocabulary::new());
    let mut first =
        HierarchicalRuleExtractor::from_config(&AppConfig::default(), Arc::clone(&vocab), None)
            .unwrap();
    let mut second =
        HierarchicalRuleExtractor::from_config(&AppConfig::default(), Arc::clone(&vocab), None)
            .unwrap();

    let a = first.extract("a ||| x ||| 0-0").unwrap();
    let b = second.extract("a ||| x ||| 0-0").unwrap();
    assert_eq!(a, b);
    assert_eq!(vocab.get("a"), Some(vocab.id("a")));
}

#[test]
fn test_json_records() {
    let mut config = AppConfig::default();
    config.extraction.arity = 0;
    let mut extractor = extractor_with(&config);

    let rules = extractor.extract("a b ||| x y ||| 0-0 1-1").unwrap();
    let record = rules[2].to_record(extractor.vocabulary());
    let json = serde_json::to_value(&record).unwrap();

    assert_eq!(json["lhs"], "X");
    assert_eq!(json["source"], serde_json::json!(["a", "b"]));
    assert_eq!(json["target"], serde_json::json!(["x", "y"]));
}

#[test]
fn test_overrides_drive_extraction() {
    let mut config = AppConfig::default();
    config.apply_override("thrax.arity=0").unwrap();
    config.apply_override("lexicality=2").unwrap();
    let mut extractor = extractor_with(&config);

    let rules = extractor.extract("a b ||| x y ||| 0-0 1-1").unwrap();
    assert_eq!(rendered(&extractor, &rules), vec!["[X] ||| a b ||| x y"]);
}

// =============================================================================
// Properties
// =============================================================================

/// A sentence pair record over `s0 s1 ...` / `t0 t1 ...` with a random,
/// non-empty alignment
fn arb_record() -> impl Strategy<Value = String> {
    (1usize..6, 1usize..6)
        .prop_flat_map(|(source_len, target_len)| {
            (
                Just(source_len),
                Just(target_len),
                prop::collection::vec((0..source_len, 0..target_len), 1..8),
            )
        })
        .prop_map(|(source_len, target_len, points)| {
            let source: Vec<String> = (0..source_len).map(|i| format!("s{}", i)).collect();
            let target: Vec<String> = (0..target_len).map(|j| format!("t{}", j)).collect();
            let alignment: Vec<String> =
                points.iter().map(|(i, j)| format!("{}-{}", i, j)).collect();
            format!(
                "{} ||| {} ||| {}",
                source.join(" "),
                target.join(" "),
                alignment.join(" ")
            )
        })
}

fn arb_config() -> impl Strategy<Value = AppConfig> {
    (
        (0usize..3, 0usize..3),
        (0usize..3, 1usize..6),
        2usize..5,
        any::<bool>(),
        any::<bool>(),
        any::<bool>(),
    )
        .prop_map(
            |(
                (arity, lexicality),
                (span_minimum, span_limit),
                initial_phrase_length,
                loose,
                adjacent_nts,
                allow_full_sentence_rules,
            )| {
                let mut config = AppConfig::default();
                config.extraction.arity = arity;
                config.extraction.lexicality = lexicality;
                config.extraction.rule_span_minimum = span_minimum;
                config.extraction.rule_span_limit = span_limit.max(span_minimum);
                config.extraction.initial_phrase_length = initial_phrase_length;
                config.extraction.loose = loose;
                config.extraction.adjacent_nts = adjacent_nts;
                config.extraction.allow_full_sentence_rules = allow_full_sentence_rules;
                config
            },
        )
}

proptest! {
    #[test]
    fn extracted_rules_respect_limits(line in arb_record(), config in arb_config()) {
        let mut extractor = extractor_with(&config);
        let rules = extractor.extract(&line).unwrap();
        let limits = extractor.limits().clone();
        let span_limit = limits.rule_span_limit.min(limits.initial_phrase_length);

        for rule in &rules {
            let rhs = rule.rhs().unwrap();
            prop_assert!(rhs.consistent_with(&rule.sentence().alignment));
            prop_assert!(rule.num_nts() <= limits.arity);
            prop_assert!(rule.aligned_words() >= limits.lexicality);
            prop_assert!(rule.lhs().is_some());
            for i in 0..rule.num_nts() {
                prop_assert!(rule.nt(i).is_some());
            }
            prop_assert!(rhs.source_len() >= limits.rule_span_minimum);
            prop_assert!(rhs.target_len() >= limits.rule_span_minimum);
            if !(limits.allow_full_sentence_rules && rule.is_full_sentence()) {
                prop_assert!(rhs.source_len() <= span_limit);
                prop_assert!(rhs.target_len() <= span_limit);
            }
        }
    }

    #[test]
    fn extraction_is_deterministic(line in arb_record(), config in arb_config()) {
        let mut first = extractor_with(&config);
        let mut second = extractor_with(&config);

        let first_rules = first.extract(&line).unwrap();
        let second_rules = second.extract(&line).unwrap();
        let a = rendered(&first, &first_rules);
        let b = rendered(&second, &second_rules);
        prop_assert_eq!(a, b);
    }

    #[test]
    fn strict_rules_have_aligned_boundaries(line in arb_record()) {
        let mut extractor = extractor_with(&AppConfig::default());
        let rules = extractor.extract(&line).unwrap();

        for rule in &rules {
            let alignment = &rule.sentence().alignment;
            let source = rule.source_span();
            let target = rule.target_span().unwrap();
            prop_assert!(alignment.source_is_aligned(source.start));
            prop_assert!(alignment.source_is_aligned(source.end - 1));
            prop_assert!(alignment.target_is_aligned(target.start));
            prop_assert!(alignment.target_is_aligned(target.end - 1));
        }
    }
}
