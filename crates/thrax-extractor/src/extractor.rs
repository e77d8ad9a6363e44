//! Hierarchical rule extraction
//!
//! Extraction for one sentence pair is a worklist search over partial
//! rules:
//!
//! ```text
//! record ── validate ── Alignment ── initial phrase pairs (per source start)
//!                                          │
//!          seed: one empty Rule per source start
//!                                          │
//!                                          v
//!   pop rule ── alignment variants ── well-formed? ── label variants ── output
//!      │
//!      └── push rule + terminal, rule + nonterminal(pp) for pp at append point
//! ```
//!
//! The append point of every pushed rule is strictly larger than its
//! parent's, so the search terminates once every rule has run off the end
//! of the source sentence.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use tracing::{debug, warn};

use thrax_core::{
    words, Alignment, AppConfig, ConfigError, ExtractionConfig, ExtractionError, InputConfig,
    InputRecord, PhrasePair, SentencePair, Side, Span, Vocabulary,
};

use crate::labeler::{LabelingInput, SpanLabeler};
use crate::metrics::ExtractionStats;
use crate::rule::{LabelId, Lex, Rule};
use crate::samt::LatticeBuilder;

/// Extracts Hiero-style SCFG rules from aligned sentence pairs
#[derive(Debug, Clone)]
pub struct HierarchicalRuleExtractor {
    limits: ExtractionConfig,
    input: InputConfig,
    labeler: SpanLabeler,
    vocab: Arc<Vocabulary>,
    default_label: LabelId,
}

impl HierarchicalRuleExtractor {
    /// Validate `config` and create an extractor with an explicit labeler
    pub fn new(
        config: &AppConfig,
        labeler: SpanLabeler,
        vocab: Arc<Vocabulary>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let default_label = vocab.id(&config.labeling.default_nt);
        Ok(Self {
            limits: config.extraction.clone(),
            input: config.input.clone(),
            labeler,
            vocab,
            default_label,
        })
    }

    /// Validate `config` and build the labeler it selects
    pub fn from_config(
        config: &AppConfig,
        vocab: Arc<Vocabulary>,
        lattice_builder: Option<Arc<dyn LatticeBuilder>>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let labeler = SpanLabeler::from_config(config, Arc::clone(&vocab), lattice_builder)?;
        Self::new(config, labeler, vocab)
    }

    pub fn vocabulary(&self) -> &Arc<Vocabulary> {
        &self.vocab
    }

    pub fn limits(&self) -> &ExtractionConfig {
        &self.limits
    }

    pub fn labeler(&self) -> &SpanLabeler {
        &self.labeler
    }

    /// Extract every rule licensed by one input record.
    ///
    /// Rules that are equal by yield but reached along different derivation
    /// paths are all returned.
    pub fn extract(&mut self, line: &str) -> Result<Vec<Rule>, ExtractionError> {
        let record = InputRecord::split(line, &self.input.delimiter);
        let sentence = Arc::new(self.prepare(&record)?);

        let phrases_by_start = self.initial_phrase_pairs(&sentence);

        let (source_text, target_text) = match (record.source(), record.target()) {
            (Some(s), Some(t)) if self.input.reverse => (t, s),
            (Some(s), Some(t)) => (s, t),
            _ => ("", ""),
        };
        self.labeler.set_input(&LabelingInput {
            source: source_text,
            target: target_text,
            labels: record.labels(),
            target_len: sentence.target_len(),
        });

        let queue: VecDeque<Rule> = (0..sentence.source_len())
            .map(|i| Rule::new(Arc::clone(&sentence), i, self.limits.arity))
            .collect();

        let rules = self.process_queue(queue, &phrases_by_start);
        debug!(
            "Extracted {} rules from sentence pair of lengths {}/{}",
            rules.len(),
            sentence.source_len(),
            sentence.target_len()
        );
        Ok(rules)
    }

    /// Run [`extract`](Self::extract) over many records, passing every rule
    /// to `sink`. Records that fail are logged and skipped.
    ///
    /// Lines are pulled one at a time. The first error returned by `sink`
    /// stops extraction and is returned as is.
    pub fn extract_lines<I, S, F, E>(&mut self, lines: I, mut sink: F) -> Result<ExtractionStats, E>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        F: FnMut(Rule) -> Result<(), E>,
    {
        let mut stats = ExtractionStats::default();
        for (number, line) in lines.into_iter().enumerate() {
            match self.extract(line.as_ref()) {
                Ok(rules) => {
                    stats.record_success(rules.len());
                    for rule in rules {
                        sink(rule)?;
                    }
                }
                Err(e) => {
                    debug!("Skipping record {}: {}", number + 1, e);
                    stats.record_failure(&e);
                }
            }
        }
        Ok(stats)
    }

    /// Tokenize, intern and align one record
    fn prepare(&self, record: &InputRecord<'_>) -> Result<SentencePair, ExtractionError> {
        let (Some(source_text), Some(target_text), Some(alignment_text)) =
            (record.source(), record.target(), record.alignment())
        else {
            return Err(ExtractionError::NotEnoughFields {
                found: record.len(),
            });
        };

        let source_words = words(source_text, self.input.source_is_parsed);
        if source_words.is_empty() {
            return Err(ExtractionError::EmptySentence { side: Side::Source });
        }
        let target_words = words(target_text, self.input.target_is_parsed);
        if target_words.is_empty() {
            return Err(ExtractionError::EmptySentence { side: Side::Target });
        }

        let mut source = self.vocab.ids(&source_words);
        let mut target = self.vocab.ids(&target_words);
        if self.input.reverse {
            std::mem::swap(&mut source, &mut target);
        }

        let alignment = Alignment::parse(alignment_text, self.input.reverse);
        if alignment.is_empty() {
            return Err(ExtractionError::EmptyAlignment);
        }
        if !alignment.consistent(source.len(), target.len()) {
            warn!(
                source = source_text,
                target = target_text,
                alignment = alignment_text,
                "Alignment out of bounds for sentence lengths {}/{}",
                source.len(),
                target.len()
            );
            return Err(ExtractionError::InconsistentAlignment {
                source_len: source.len(),
                target_len: target.len(),
                detail: alignment_text.to_string(),
            });
        }

        Ok(SentencePair::new(source, target, alignment))
    }

    // ------------------------------------------------------------------------
    // Search
    // ------------------------------------------------------------------------

    fn process_queue(
        &self,
        mut queue: VecDeque<Rule>,
        phrases_by_start: &[Vec<PhrasePair>],
    ) -> Vec<Rule> {
        let mut rules = Vec::new();
        while let Some(mut rule) = queue.pop_front() {
            // variants are copied before the well-formedness scan tags `rule`
            let variants = self.alignment_variants(&rule);
            if self.is_well_formed(&mut rule) {
                rules.extend(self.label_variants(&rule));
            }
            for mut variant in variants {
                if self.is_well_formed(&mut variant) {
                    rules.extend(self.label_variants(&variant));
                }
            }

            let Some(phrases) = phrases_by_start.get(rule.append_point()) else {
                continue;
            };

            if self.can_extend_with_terminal(&rule) {
                queue.push_back(rule.extended_with_terminal());
            }
            for pp in phrases {
                if self.can_extend_with_nonterminal(&rule, pp) {
                    queue.push_back(rule.extended_with_nonterminal(pp));
                }
            }
        }
        rules
    }

    fn can_extend_with_terminal(&self, rule: &Rule) -> bool {
        let limits = &self.limits;
        let source_start = rule.source_span().start;
        let consumed = rule.append_point() - source_start;

        (limits.allow_full_sentence_rules && source_start == 0)
            || (rule.num_nts() == 0 && consumed < limits.lex_source_words)
            || (rule.num_nts() + rule.num_terminals() < limits.nonlex_source_length
                && consumed < limits.rule_span_limit)
    }

    fn can_extend_with_nonterminal(&self, rule: &Rule, pp: &PhrasePair) -> bool {
        let limits = &self.limits;
        let source_start = rule.source_span().start;

        let too_long = pp.source_end - source_start > limits.rule_span_limit
            || rule
                .target_span()
                .is_some_and(|t| pp.target_end.saturating_sub(t.start) > limits.rule_span_limit);
        if too_long && !(limits.allow_full_sentence_rules && source_start == 0) {
            return false;
        }

        rule.num_nts() < limits.arity
            && rule.num_nts() + rule.num_terminals() < limits.lex_source_words
            && (!rule.source_ends_with_nt() || limits.adjacent_nts)
    }

    /// Check every structural constraint on a candidate rule.
    ///
    /// Uncovered, unaligned target words inside the rule's target span are
    /// tagged as terminals while scanning, so the rule's yields include them
    /// afterwards.
    pub(crate) fn is_well_formed(&self, rule: &mut Rule) -> bool {
        let limits = &self.limits;
        let Some(target) = rule.target_span() else {
            return false;
        };
        let source = rule.source_span();

        let mut target_terminals = 0;
        for j in target.start..target.end {
            if rule.target_lex()[j] == Lex::Absent {
                if rule.sentence().alignment.target_is_aligned(j) {
                    return false;
                }
                rule.tag_free_terminal(j);
            }
            if rule.target_lex()[j] == Lex::Terminal {
                target_terminals += 1;
                let links = rule.sentence().alignment.target_links(j);
                if links.iter().any(|&i| rule.source_lex()[i] != Lex::Terminal) {
                    return false;
                }
            }
        }

        let full_sentence = limits.allow_full_sentence_rules && rule.is_full_sentence();

        if rule.num_nts() > 0 {
            if rule.num_terminals() > limits.nonlex_source_words
                || rule.num_terminals() + rule.num_nts() > limits.nonlex_source_length
                || target_terminals > limits.nonlex_target_words
                || target_terminals + rule.num_nts() > limits.nonlex_target_length
            {
                return false;
            }
        } else if (rule.num_terminals() > limits.lex_source_words
            || target_terminals > limits.lex_target_words)
            && !full_sentence
        {
            return false;
        }

        if !limits.allow_abstract_rules && rule.num_terminals() == 0 && target_terminals == 0 {
            return false;
        }

        if target.len() < limits.rule_span_minimum || source.len() < limits.rule_span_minimum {
            return false;
        }

        let span_limit = limits.rule_span_limit.min(limits.initial_phrase_length);
        if (target.len() > span_limit || source.len() > span_limit) && !full_sentence {
            return false;
        }

        if !limits.loose {
            let alignment = &rule.sentence().alignment;
            if !alignment.source_is_aligned(source.start)
                || !alignment.source_is_aligned(source.end - 1)
                || !alignment.target_is_aligned(target.start)
                || !alignment.target_is_aligned(target.end - 1)
            {
                return false;
            }
        }

        let consistent = rule
            .rhs()
            .is_some_and(|rhs| rhs.consistent_with(&rule.sentence().alignment));
        consistent && rule.aligned_words() >= limits.lexicality
    }

    /// Copies of `rule` whose target boundaries are relaxed across unaligned
    /// target words. `rule` itself is not included.
    fn alignment_variants(&self, rule: &Rule) -> Vec<Rule> {
        if !self.limits.loose {
            return Vec::new();
        }
        let Some(target) = rule.target_span() else {
            return Vec::new();
        };
        let alignment = &rule.sentence().alignment;

        let mut loose_start = target.start;
        while loose_start > 0 && !alignment.target_is_aligned(loose_start - 1) {
            loose_start -= 1;
        }
        let mut loose_end = target.end;
        while loose_end < rule.sentence().target_len() && !alignment.target_is_aligned(loose_end) {
            loose_end += 1;
        }

        let mut variants: Vec<Rule> = (loose_start..target.start)
            .map(|i| {
                let mut variant = rule.clone();
                variant.relax_target(Span::new(i, target.end), i);
                variant
            })
            .collect();
        if loose_end == target.end {
            return variants;
        }

        let mut widened = Vec::new();
        for base in std::iter::once(rule).chain(variants.iter()) {
            let start = base.target_span().map_or(target.start, |t| t.start);
            for j in target.end + 1..=loose_end {
                let mut variant = base.clone();
                variant.relax_target(Span::new(start, j), j - 1);
                widened.push(variant);
            }
        }
        variants.extend(widened);
        variants
    }

    /// Fully labeled copies of a well-formed rule: the cross product of the
    /// labels for its left-hand side and for each nonterminal, in index order.
    pub(crate) fn label_variants(&self, rule: &Rule) -> Vec<Rule> {
        let allow_default = self.limits.allow_nonlexical_x;
        let Some(target) = rule.target_span() else {
            return Vec::new();
        };

        let mut lhs_labels = self.labeler.labels(target);
        if lhs_labels.is_empty() {
            if !allow_default && rule.num_nts() > 0 {
                return Vec::new();
            }
            lhs_labels = vec![self.default_label];
        }

        let mut base = rule.clone();
        base.clear_labels();
        let mut expanded: Vec<Rule> = lhs_labels
            .into_iter()
            .map(|lhs| {
                let mut labeled = base.clone();
                labeled.set_lhs(lhs);
                labeled
            })
            .collect();

        for index in 0..rule.num_nts() {
            let mut labels = rule
                .nt_span(index)
                .map(|span| self.labeler.labels(span))
                .unwrap_or_default();
            if labels.is_empty() {
                if !allow_default {
                    return Vec::new();
                }
                labels = vec![self.default_label];
            }

            let mut next = Vec::with_capacity(expanded.len() * labels.len());
            for partial in &expanded {
                for &label in &labels {
                    let mut labeled = partial.clone();
                    labeled.set_nt(index, label);
                    next.push(labeled);
                }
            }
            expanded = next;
        }

        let mut seen = HashSet::with_capacity(expanded.len());
        expanded.retain(|r| seen.insert(r.clone()));
        expanded
    }

    /// Consistent phrase pairs usable as nonterminals, indexed by source start
    pub(crate) fn initial_phrase_pairs(&self, sentence: &SentencePair) -> Vec<Vec<PhrasePair>> {
        let limits = &self.limits;
        let alignment = &sentence.alignment;
        let source_len = sentence.source_len();

        (0..source_len)
            .map(|i| {
                let max_len = (source_len - i).min(limits.initial_phrase_length);
                let mut pairs = Vec::new();
                for len in 1..=max_len {
                    if !limits.loose
                        && (!alignment.source_is_aligned(i)
                            || !alignment.source_is_aligned(i + len - 1))
                    {
                        continue;
                    }
                    pairs.extend(
                        PhrasePair::all_from_source(
                            alignment,
                            i,
                            i + len,
                            limits.loose,
                            sentence.target_len(),
                        )
                        .into_iter()
                        .filter(|pp| pp.target_len() <= limits.initial_phrase_length),
                    );
                }
                pairs
            })
            .collect()
    }
}
