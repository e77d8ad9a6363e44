//! Span labeling strategies
//!
//! A labeler assigns candidate nonterminal labels to target-side spans of
//! the current sentence pair. The strategy set is closed and chosen at
//! configuration time:
//! - Hiero: one default label everywhere
//! - Manual: labels precomputed per span and carried in the input record
//! - Samt: syntax-derived labels from a parse lattice (see [`crate::samt`])

use std::sync::Arc;

use thrax_core::{AppConfig, ConfigError, GrammarKind, Span, Vocabulary};

use crate::rule::LabelId;
use crate::samt::{LatticeBuilder, SamtLabeler};

/// Per-sentence context handed to a labeler before any label queries
#[derive(Debug, Clone, Copy, Default)]
pub struct LabelingInput<'a> {
    /// Source text as it appears in the record (after any reversal)
    pub source: &'a str,
    /// Target text as it appears in the record (after any reversal)
    pub target: &'a str,
    /// Manual label field, if present
    pub labels: Option<&'a str>,
    /// Number of target words
    pub target_len: usize,
}

/// Labeling strategy
#[derive(Debug, Clone)]
pub enum SpanLabeler {
    Hiero(HieroLabeler),
    Manual(ManualLabeler),
    Samt(SamtLabeler),
}

impl SpanLabeler {
    /// Build the labeler selected by `config.labeling.grammar`.
    ///
    /// SAMT labeling needs a lattice builder; without one this fails with
    /// [`ConfigError::MissingRequired`].
    pub fn from_config(
        config: &AppConfig,
        vocab: Arc<Vocabulary>,
        lattice_builder: Option<Arc<dyn LatticeBuilder>>,
    ) -> Result<Self, ConfigError> {
        let default_label = vocab.id(&config.labeling.default_nt);
        match config.labeling.grammar {
            GrammarKind::Hiero => Ok(Self::Hiero(HieroLabeler::new(default_label))),
            GrammarKind::Manual => Ok(Self::Manual(ManualLabeler::new(vocab, default_label))),
            GrammarKind::Samt => {
                let builder = lattice_builder.ok_or_else(|| {
                    ConfigError::MissingRequired("lattice builder for samt labeling".to_string())
                })?;
                Ok(Self::Samt(SamtLabeler::new(
                    vocab,
                    builder,
                    config.labeling.samt.clone(),
                )))
            }
        }
    }

    /// Prepare for label queries on a new sentence pair
    pub fn set_input(&mut self, input: &LabelingInput<'_>) {
        match self {
            Self::Hiero(_) => {}
            Self::Manual(labeler) => labeler.set_input(input),
            Self::Samt(labeler) => labeler.set_input(input),
        }
    }

    /// Candidate labels for a target span. Empty means no label is known.
    pub fn labels(&self, span: Span) -> Vec<LabelId> {
        match self {
            Self::Hiero(labeler) => labeler.labels(span),
            Self::Manual(labeler) => labeler.labels(span),
            Self::Samt(labeler) => labeler.labels(span),
        }
    }

    pub fn kind(&self) -> GrammarKind {
        match self {
            Self::Hiero(_) => GrammarKind::Hiero,
            Self::Manual(_) => GrammarKind::Manual,
            Self::Samt(_) => GrammarKind::Samt,
        }
    }
}

// ============================================================================
// Hiero
// ============================================================================

/// Labels every span with the default nonterminal
#[derive(Debug, Clone, Copy)]
pub struct HieroLabeler {
    label: LabelId,
}

impl HieroLabeler {
    pub fn new(label: LabelId) -> Self {
        Self { label }
    }

    pub fn labels(&self, _span: Span) -> Vec<LabelId> {
        vec![self.label]
    }
}

// ============================================================================
// Manual
// ============================================================================

/// Labels read from the fourth field of each record.
///
/// The field holds one label per target span, enumerated as
/// `(0,1) .. (0,L)`, then `(1,2) .. (1,L)`, and so on, for target length
/// `L`. `L` is recovered from the number of labels, which must be the
/// triangular number `L(L+1)/2`.
#[derive(Debug, Clone)]
pub struct ManualLabeler {
    vocab: Arc<Vocabulary>,
    default_label: LabelId,
    labels: Vec<LabelId>,
    sentence_length: usize,
}

impl ManualLabeler {
    pub fn new(vocab: Arc<Vocabulary>, default_label: LabelId) -> Self {
        Self {
            vocab,
            default_label,
            labels: Vec::new(),
            sentence_length: 0,
        }
    }

    pub fn set_input(&mut self, input: &LabelingInput<'_>) {
        let fields: Vec<&str> = input
            .labels
            .map(|field| field.split_whitespace().collect())
            .unwrap_or_default();
        self.labels = self.vocab.ids(&fields);
        self.sentence_length = Self::sentence_length(self.labels.len());
    }

    /// Label at the span's slot, or the default label when the slot is missing
    pub fn labels(&self, span: Span) -> Vec<LabelId> {
        let label = Self::label_index(span, self.sentence_length)
            .and_then(|idx| self.labels.get(idx).copied())
            .unwrap_or(self.default_label);
        vec![label]
    }

    /// Invert the triangular number `n = L(L+1)/2`
    pub fn sentence_length(num_labels: usize) -> usize {
        let root = ((1 + 8 * num_labels) as f64).sqrt() as usize;
        (root - 1) / 2
    }

    /// Flat position of `span` in the triangular enumeration for a sentence
    /// of `length` words
    pub fn label_index(span: Span, length: usize) -> Option<usize> {
        if span.is_empty() || span.end > length {
            return None;
        }
        // rows 0..start hold length, length - 1, ... entries
        let preceding: usize = (0..span.start).map(|row| length - row).sum();
        Some(preceding + span.len() - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::samt::SpanTable;

    #[test]
    fn test_hiero_constant_label() {
        let vocab = Arc::new(Vocabulary::new());
        let labeler =
            SpanLabeler::from_config(&AppConfig::default(), Arc::clone(&vocab), None).unwrap();
        let x = vocab.get("X").unwrap();

        assert_eq!(labeler.kind(), GrammarKind::Hiero);
        assert_eq!(labeler.labels(Span::new(0, 1)), vec![x]);
        assert_eq!(labeler.labels(Span::new(3, 17)), vec![x]);
    }

    #[test]
    fn test_sentence_length_from_label_count() {
        assert_eq!(ManualLabeler::sentence_length(0), 0);
        assert_eq!(ManualLabeler::sentence_length(1), 1);
        assert_eq!(ManualLabeler::sentence_length(3), 2);
        assert_eq!(ManualLabeler::sentence_length(6), 3);
        assert_eq!(ManualLabeler::sentence_length(55), 10);
    }

    #[test]
    fn test_label_index_enumeration() {
        // L = 3: (0,1) (0,2) (0,3) (1,2) (1,3) (2,3)
        assert_eq!(ManualLabeler::label_index(Span::new(0, 1), 3), Some(0));
        assert_eq!(ManualLabeler::label_index(Span::new(0, 3), 3), Some(2));
        assert_eq!(ManualLabeler::label_index(Span::new(1, 2), 3), Some(3));
        assert_eq!(ManualLabeler::label_index(Span::new(1, 3), 3), Some(4));
        assert_eq!(ManualLabeler::label_index(Span::new(2, 3), 3), Some(5));
        assert_eq!(ManualLabeler::label_index(Span::new(2, 4), 3), None);
        assert_eq!(ManualLabeler::label_index(Span::new(2, 2), 3), None);
    }

    #[test]
    fn test_manual_labels() {
        let vocab = Arc::new(Vocabulary::new());
        let default = vocab.id("X");
        let mut labeler = ManualLabeler::new(Arc::clone(&vocab), default);
        labeler.set_input(&LabelingInput {
            labels: Some("NP S VP"),
            target_len: 2,
            ..Default::default()
        });

        assert_eq!(labeler.labels(Span::new(0, 1)), vec![vocab.id("NP")]);
        assert_eq!(labeler.labels(Span::new(0, 2)), vec![vocab.id("S")]);
        assert_eq!(labeler.labels(Span::new(1, 2)), vec![vocab.id("VP")]);
        assert_eq!(labeler.labels(Span::new(1, 3)), vec![default]);
    }

    #[test]
    fn test_manual_missing_field_falls_back() {
        let vocab = Arc::new(Vocabulary::new());
        let default = vocab.id("X");
        let mut labeler = ManualLabeler::new(Arc::clone(&vocab), default);
        labeler.set_input(&LabelingInput::default());
        assert_eq!(labeler.labels(Span::new(0, 1)), vec![default]);
    }

    #[test]
    fn test_samt_requires_builder() {
        let mut config = AppConfig::default();
        config.labeling.grammar = GrammarKind::Samt;
        let vocab = Arc::new(Vocabulary::new());

        let result = SpanLabeler::from_config(&config, Arc::clone(&vocab), None);
        assert!(matches!(result, Err(ConfigError::MissingRequired(_))));

        let builder: Arc<dyn LatticeBuilder> = Arc::new(SpanTable::new());
        let labeler = SpanLabeler::from_config(&config, vocab, Some(builder)).unwrap();
        assert_eq!(labeler.kind(), GrammarKind::Samt);
    }
}
