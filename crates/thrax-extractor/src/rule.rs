//! Synchronous context-free rules under construction
//!
//! A [`Rule`] records which words of its sentence pair it covers and how:
//! every position is either outside the rule, a terminal, or part of the
//! k-th nonterminal. Rules grow append-only along the source side; each
//! extension returns a new value, so many partial rules can sit in the
//! extraction queue while sharing the sentence pair they came from.

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::Serialize;

use thrax_core::config::MAX_ARITY;
use thrax_core::{PhrasePair, SentencePair, Span, SymbolId, Vocabulary};

/// Interned nonterminal label
pub type LabelId = SymbolId;

/// Field delimiter used when rendering rules
pub const RULE_DELIMITER: &str = "|||";

/// How a sentence position participates in a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lex {
    /// Not covered by the rule
    Absent,
    /// Covered as a terminal symbol
    Terminal,
    /// Covered by the nonterminal with this 1-based co-index
    Nonterminal(u8),
}

/// One symbol of a rule's yield
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Symbol {
    Terminal(SymbolId),
    /// A labeled nonterminal; `label` is `None` until label expansion
    Nonterminal { label: Option<LabelId>, index: u8 },
}

/// A partial or complete SCFG rule extracted from one sentence pair
#[derive(Debug, Clone)]
pub struct Rule {
    sentence: Arc<SentencePair>,
    lhs: Option<LabelId>,
    nts: Vec<Option<LabelId>>,
    num_nts: usize,
    source_ends_with_nt: bool,
    append_point: usize,
    source_start: usize,
    source_end: usize,
    target: Option<Span>,
    source_lex: Vec<Lex>,
    target_lex: Vec<Lex>,
    aligned_words: usize,
    num_terminals: usize,
}

impl Rule {
    /// An empty rule anchored at source position `start`, with room for
    /// `arity` nonterminals. Arity is capped at [`MAX_ARITY`] since co-indices
    /// are stored in a `u8`.
    pub fn new(sentence: Arc<SentencePair>, start: usize, arity: usize) -> Self {
        let source_lex = vec![Lex::Absent; sentence.source_len()];
        let target_lex = vec![Lex::Absent; sentence.target_len()];
        Self {
            sentence,
            lhs: None,
            nts: vec![None; arity.min(MAX_ARITY)],
            num_nts: 0,
            source_ends_with_nt: false,
            append_point: start,
            source_start: start,
            source_end: start,
            target: None,
            source_lex,
            target_lex,
            aligned_words: 0,
            num_terminals: 0,
        }
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn sentence(&self) -> &SentencePair {
        &self.sentence
    }

    pub fn lhs(&self) -> Option<LabelId> {
        self.lhs
    }

    /// Label of the nonterminal at 0-based `index`
    pub fn nt(&self, index: usize) -> Option<LabelId> {
        self.nts.get(index).copied().flatten()
    }

    pub fn num_nts(&self) -> usize {
        self.num_nts
    }

    pub fn arity(&self) -> usize {
        self.nts.len()
    }

    /// Source-side terminal count
    pub fn num_terminals(&self) -> usize {
        self.num_terminals
    }

    /// Aligned source-side terminals
    pub fn aligned_words(&self) -> usize {
        self.aligned_words
    }

    /// Next unconsumed source position
    pub fn append_point(&self) -> usize {
        self.append_point
    }

    pub fn source_ends_with_nt(&self) -> bool {
        self.source_ends_with_nt
    }

    pub fn source_span(&self) -> Span {
        Span::new(self.source_start, self.source_end)
    }

    /// Target extent; `None` until some aligned content reaches the target side
    pub fn target_span(&self) -> Option<Span> {
        self.target
    }

    /// Both extents as a phrase pair
    pub fn rhs(&self) -> Option<PhrasePair> {
        self.target
            .map(|t| PhrasePair::new(self.source_start, self.source_end, t.start, t.end))
    }

    pub fn source_lex(&self) -> &[Lex] {
        &self.source_lex
    }

    pub fn target_lex(&self) -> &[Lex] {
        &self.target_lex
    }

    /// True when the rule covers both sentences completely
    pub fn is_full_sentence(&self) -> bool {
        self.source_start == 0
            && self.source_end == self.sentence.source_len()
            && self.target == Some(Span::new(0, self.sentence.target_len()))
    }

    // ------------------------------------------------------------------------
    // Extension
    // ------------------------------------------------------------------------

    /// A copy of this rule with the word at the append point added as a terminal.
    pub fn extended_with_terminal(&self) -> Self {
        let mut rule = self.clone();
        rule.extend_with_terminal();
        rule
    }

    /// A copy of this rule with a nonterminal spanning `pp` appended.
    ///
    /// `pp` must start at or before the append point on the source side, and
    /// the rule must have fewer than [`arity`](Self::arity) nonterminals.
    pub fn extended_with_nonterminal(&self, pp: &PhrasePair) -> Self {
        let mut rule = self.clone();
        rule.extend_with_nonterminal(pp);
        rule
    }

    fn extend_with_terminal(&mut self) {
        let position = self.append_point;
        self.source_lex[position] = Lex::Terminal;
        self.num_terminals += 1;
        self.source_ends_with_nt = false;

        let sentence = Arc::clone(&self.sentence);
        let links = sentence.alignment.source_links(position);
        if !links.is_empty() {
            for &j in links {
                self.target_lex[j] = Lex::Terminal;
                self.cover_target(Span::new(j, j + 1));
            }
            self.aligned_words += 1;
        }

        self.append_point += 1;
        self.source_end = self.append_point;
    }

    fn extend_with_nonterminal(&mut self, pp: &PhrasePair) {
        self.num_nts += 1;
        let tag = Lex::Nonterminal(u8::try_from(self.num_nts).unwrap_or(u8::MAX));
        while self.append_point < pp.source_end {
            self.source_lex[self.append_point] = tag;
            self.append_point += 1;
        }
        for j in pp.target_start..pp.target_end {
            self.target_lex[j] = tag;
        }
        self.source_end = pp.source_end;
        self.cover_target(pp.target_span());
        self.source_ends_with_nt = true;
    }

    fn cover_target(&mut self, span: Span) {
        self.target = Some(match self.target {
            Some(t) => Span::new(t.start.min(span.start), t.end.max(span.end)),
            None => span,
        });
    }

    // ------------------------------------------------------------------------
    // Crate-internal mutation used by the extractor
    // ------------------------------------------------------------------------

    pub(crate) fn set_lhs(&mut self, label: LabelId) {
        self.lhs = Some(label);
    }

    pub(crate) fn set_nt(&mut self, index: usize, label: LabelId) {
        self.nts[index] = Some(label);
    }

    pub(crate) fn clear_labels(&mut self) {
        self.lhs = None;
        self.nts.iter_mut().for_each(|nt| *nt = None);
    }

    /// Move the target boundary to `span`, tagging `tagged` as a terminal.
    pub(crate) fn relax_target(&mut self, span: Span, tagged: usize) {
        self.target = Some(span);
        self.target_lex[tagged] = Lex::Terminal;
    }

    /// Tag an uncovered target position inside the rule as a terminal.
    pub(crate) fn tag_free_terminal(&mut self, j: usize) {
        self.target_lex[j] = Lex::Terminal;
    }

    // ------------------------------------------------------------------------
    // Yields
    // ------------------------------------------------------------------------

    /// Source-side symbols in textual order; a nonterminal appears once per
    /// contiguous run.
    pub fn source_yield(&self) -> Vec<Symbol> {
        self.collect_yield(
            &self.source_lex,
            &self.sentence.source,
            self.source_span(),
        )
    }

    /// Target-side symbols in textual order
    pub fn target_yield(&self) -> Vec<Symbol> {
        match self.target {
            Some(span) => self.collect_yield(&self.target_lex, &self.sentence.target, span),
            None => Vec::new(),
        }
    }

    fn collect_yield(&self, lex: &[Lex], words: &[SymbolId], span: Span) -> Vec<Symbol> {
        let mut symbols = Vec::with_capacity(span.len());
        let mut last = None;
        for i in span.start..span.end {
            match lex[i] {
                Lex::Absent => {}
                Lex::Terminal => symbols.push(Symbol::Terminal(words[i])),
                Lex::Nonterminal(k) if last != Some(k) => {
                    last = Some(k);
                    symbols.push(Symbol::Nonterminal {
                        label: self.nt(k as usize - 1),
                        index: k,
                    });
                }
                Lex::Nonterminal(_) => {}
            }
        }
        symbols
    }

    /// Target span of the nonterminal at 0-based `index`
    pub fn nt_span(&self, index: usize) -> Option<Span> {
        if index >= self.num_nts {
            return None;
        }
        let target = self.target?;
        let Ok(tag) = u8::try_from(index + 1).map(Lex::Nonterminal) else {
            return None;
        };

        let mut start = None;
        for j in target.start..target.end {
            match (start, self.target_lex[j] == tag) {
                (None, true) => start = Some(j),
                (Some(s), false) => return Some(Span::new(s, j)),
                _ => {}
            }
        }
        start.map(|s| Span::new(s, target.end))
    }

    // ------------------------------------------------------------------------
    // Output
    // ------------------------------------------------------------------------

    /// Render as `[LHS] ||| source ||| target`
    pub fn display<'a>(&'a self, vocab: &'a Vocabulary) -> RuleDisplay<'a> {
        RuleDisplay { rule: self, vocab }
    }

    /// Serializable form with every symbol spelled out
    pub fn to_record(&self, vocab: &Vocabulary) -> RuleRecord {
        let render = |symbols: Vec<Symbol>| -> Vec<String> {
            symbols.into_iter().map(|s| symbol_text(s, vocab)).collect()
        };
        RuleRecord {
            lhs: label_text(self.lhs, vocab),
            source: render(self.source_yield()),
            target: render(self.target_yield()),
        }
    }
}

/// Yield symbol as it takes part in rule identity: nonterminals by label only
#[derive(PartialEq, Eq, Hash)]
enum IdentitySymbol {
    Terminal(SymbolId),
    Nonterminal(Option<LabelId>),
}

impl From<Symbol> for IdentitySymbol {
    fn from(symbol: Symbol) -> Self {
        match symbol {
            Symbol::Terminal(id) => Self::Terminal(id),
            Symbol::Nonterminal { label, .. } => Self::Nonterminal(label),
        }
    }
}

impl Rule {
    fn identity(&self) -> (Vec<IdentitySymbol>, Vec<IdentitySymbol>) {
        let strip = |symbols: Vec<Symbol>| -> Vec<IdentitySymbol> {
            symbols.into_iter().map(IdentitySymbol::from).collect()
        };
        (strip(self.source_yield()), strip(self.target_yield()))
    }
}

/// Rules are equal when they have the same left-hand side and yields of
/// terminals and nonterminal labels, regardless of which spans they were
/// extracted from. Co-indices only affect rendering.
impl PartialEq for Rule {
    fn eq(&self, other: &Self) -> bool {
        self.lhs == other.lhs && self.identity() == other.identity()
    }
}

impl Eq for Rule {}

impl Hash for Rule {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.lhs.hash(state);
        self.identity().hash(state);
    }
}

/// Serializable rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleRecord {
    pub lhs: String,
    pub source: Vec<String>,
    pub target: Vec<String>,
}

/// Display adapter returned by [`Rule::display`]
pub struct RuleDisplay<'a> {
    rule: &'a Rule,
    vocab: &'a Vocabulary,
}

impl std::fmt::Display for RuleDisplay<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", label_text(self.rule.lhs, self.vocab), RULE_DELIMITER)?;
        for symbol in self.rule.source_yield() {
            write!(f, " {}", symbol_text(symbol, self.vocab))?;
        }
        write!(f, " {}", RULE_DELIMITER)?;
        for symbol in self.rule.target_yield() {
            write!(f, " {}", symbol_text(symbol, self.vocab))?;
        }
        Ok(())
    }
}

fn label_text(label: Option<LabelId>, vocab: &Vocabulary) -> String {
    label
        .and_then(|id| vocab.word(id))
        .unwrap_or_else(|| "?".to_string())
}

fn symbol_text(symbol: Symbol, vocab: &Vocabulary) -> String {
    match symbol {
        Symbol::Terminal(id) => vocab.word(id).unwrap_or_else(|| format!("<{}>", id)),
        Symbol::Nonterminal { label, index } => format!("[{},{}]", label_text(label, vocab), index),
    }
}
