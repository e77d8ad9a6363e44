//! Syntax-augmented (SAMT) span labeling
//!
//! SAMT labels come from a lattice derived from a bracketed parse of the
//! target side. Converting trees into that lattice is the job of an
//! external [`LatticeBuilder`]; this module only defines the query
//! interface and the label selection policy on top of it.
//!
//! For a span the labeler tries, in order, and returns the first non-empty
//! result:
//! 1. constituent labels (`NP`)
//! 2. concatenations of two constituents (`DT+NN`)
//! 3. CCG-style labels, forward slash first (`S/VP`), then backslash (`S\NP`)
//! 4. concatenations of three constituents (`DT+JJ+NN`)

use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use thrax_core::{SamtConfig, Span, UnaryCategoryHandler, Vocabulary};

use crate::labeler::LabelingInput;
use crate::rule::LabelId;

/// Label queries over one parsed sentence
pub trait SyntaxLattice: Send + Sync {
    /// Constituents spanning exactly `span`; a unary chain is listed
    /// topmost first
    fn constituent_labels(&self, span: Span) -> Vec<String>;

    /// `A+B` labels for two adjacent constituents covering `span`
    fn concatenated_labels(&self, span: Span) -> Vec<String>;

    /// `A/B` labels: `span` is an `A` missing a `B` on its right
    fn forward_slash_labels(&self, span: Span) -> Vec<String>;

    /// `A\B` labels: `span` is an `A` missing a `B` on its left
    fn backward_slash_labels(&self, span: Span) -> Vec<String>;

    /// `A+B+C` labels for three adjacent constituents covering `span`
    fn double_concatenated_labels(&self, span: Span) -> Vec<String>;
}

/// Builds a lattice from the bracketed parse of one sentence
pub trait LatticeBuilder: Send + Sync {
    fn build(&self, parse: &str) -> thrax_core::Result<Arc<dyn SyntaxLattice>>;
}

// ============================================================================
// Span table
// ============================================================================

#[derive(Debug, Clone, Default)]
struct SpanEntry {
    constituents: Vec<String>,
    concatenations: Vec<String>,
    forward_slashes: Vec<String>,
    backward_slashes: Vec<String>,
    double_concatenations: Vec<String>,
}

/// In-memory lattice filled in span by span.
///
/// Used for precomputed label tables; as a [`LatticeBuilder`] it hands out
/// the same table for every sentence.
#[derive(Debug, Clone, Default)]
pub struct SpanTable {
    entries: HashMap<Span, SpanEntry>,
}

impl SpanTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_constituent(mut self, span: Span, label: impl Into<String>) -> Self {
        self.entry(span).constituents.push(label.into());
        self
    }

    pub fn with_concatenation(mut self, span: Span, label: impl Into<String>) -> Self {
        self.entry(span).concatenations.push(label.into());
        self
    }

    pub fn with_forward_slash(mut self, span: Span, label: impl Into<String>) -> Self {
        self.entry(span).forward_slashes.push(label.into());
        self
    }

    pub fn with_backward_slash(mut self, span: Span, label: impl Into<String>) -> Self {
        self.entry(span).backward_slashes.push(label.into());
        self
    }

    pub fn with_double_concatenation(mut self, span: Span, label: impl Into<String>) -> Self {
        self.entry(span).double_concatenations.push(label.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry(&mut self, span: Span) -> &mut SpanEntry {
        self.entries.entry(span).or_default()
    }

    fn lookup(&self, span: Span, select: fn(&SpanEntry) -> &Vec<String>) -> Vec<String> {
        self.entries.get(&span).map(select).cloned().unwrap_or_default()
    }
}

impl SyntaxLattice for SpanTable {
    fn constituent_labels(&self, span: Span) -> Vec<String> {
        self.lookup(span, |e| &e.constituents)
    }

    fn concatenated_labels(&self, span: Span) -> Vec<String> {
        self.lookup(span, |e| &e.concatenations)
    }

    fn forward_slash_labels(&self, span: Span) -> Vec<String> {
        self.lookup(span, |e| &e.forward_slashes)
    }

    fn backward_slash_labels(&self, span: Span) -> Vec<String> {
        self.lookup(span, |e| &e.backward_slashes)
    }

    fn double_concatenated_labels(&self, span: Span) -> Vec<String> {
        self.lookup(span, |e| &e.double_concatenations)
    }
}

impl LatticeBuilder for SpanTable {
    fn build(&self, _parse: &str) -> thrax_core::Result<Arc<dyn SyntaxLattice>> {
        Ok(Arc::new(self.clone()))
    }
}

// ============================================================================
// SAMT labeler
// ============================================================================

/// Labels spans from the current sentence's syntax lattice
#[derive(Clone)]
pub struct SamtLabeler {
    vocab: Arc<Vocabulary>,
    builder: Arc<dyn LatticeBuilder>,
    options: SamtConfig,
    lattice: Option<Arc<dyn SyntaxLattice>>,
}

impl std::fmt::Debug for SamtLabeler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SamtLabeler")
            .field("options", &self.options)
            .field("builder", &"<builder>")
            .field("has_lattice", &self.lattice.is_some())
            .finish()
    }
}

impl SamtLabeler {
    pub fn new(
        vocab: Arc<Vocabulary>,
        builder: Arc<dyn LatticeBuilder>,
        options: SamtConfig,
    ) -> Self {
        Self {
            vocab,
            builder,
            options,
            lattice: None,
        }
    }

    /// Build the lattice for this sentence's target-side parse. A builder
    /// failure leaves the labeler without a lattice, so every span is
    /// unlabeled.
    pub fn set_input(&mut self, input: &LabelingInput<'_>) {
        self.lattice = match self.builder.build(input.target) {
            Ok(lattice) => Some(lattice),
            Err(e) => {
                warn!("Failed to build syntax lattice, spans left unlabeled: {}", e);
                None
            }
        };
    }

    pub fn labels(&self, span: Span) -> Vec<LabelId> {
        let Some(lattice) = self.lattice.as_deref() else {
            return Vec::new();
        };
        self.select(lattice, span)
            .iter()
            .map(|label| self.vocab.id(label))
            .collect()
    }

    fn select(&self, lattice: &dyn SyntaxLattice, span: Span) -> Vec<String> {
        let options = &self.options;

        if options.allow_constituent {
            let chain = lattice.constituent_labels(span);
            let chosen = match options.unary_category_handler {
                UnaryCategoryHandler::All => chain,
                UnaryCategoryHandler::Top => chain.into_iter().take(1).collect(),
                UnaryCategoryHandler::Bottom => chain.into_iter().last().into_iter().collect(),
            };
            let chosen = capped(chosen, options.max_constituent_labels);
            if !chosen.is_empty() {
                return chosen;
            }
        }

        if options.allow_concat {
            let labels = capped(lattice.concatenated_labels(span), options.max_concat_labels);
            if !labels.is_empty() {
                return labels;
            }
        }

        if options.allow_ccg {
            let labels = capped(lattice.forward_slash_labels(span), options.max_ccg_labels);
            if !labels.is_empty() {
                return labels;
            }
            let labels = capped(lattice.backward_slash_labels(span), options.max_ccg_labels);
            if !labels.is_empty() {
                return labels;
            }
        }

        if options.allow_double_concat {
            let labels = capped(
                lattice.double_concatenated_labels(span),
                options.max_concat_labels,
            );
            if !labels.is_empty() {
                return labels;
            }
        }

        Vec::new()
    }
}

/// Deduplicate preserving order, then truncate to `cap`
fn capped(labels: Vec<String>, cap: Option<usize>) -> Vec<String> {
    let mut unique: Vec<String> = Vec::with_capacity(labels.len());
    for label in labels {
        if !unique.contains(&label) {
            unique.push(label);
        }
    }
    if let Some(cap) = cap {
        unique.truncate(cap);
    }
    unique
}
