//! Thrax Core - Shared datatypes for synchronous grammar extraction
//!
//! This crate defines the building blocks used by the rule extractor:
//! - Spans and phrase pairs with alignment-consistency checks
//! - Word alignments in Berkeley `i-j` format
//! - The symbol vocabulary (string <-> id interning)
//! - Input record splitting and tokenization
//! - Configuration management
//! - Common error types

pub mod alignment;
pub mod config;
pub mod input;
pub mod phrase;
pub mod vocabulary;

pub use alignment::Alignment;
pub use config::{
    AppConfig, ConfigError, ExtractionConfig, GrammarKind, InputConfig, LabelingConfig,
    LoggingConfig, SamtConfig, UnaryCategoryHandler,
};
pub use input::{words, InputRecord, SentencePair};
pub use phrase::{PhrasePair, Span};
pub use vocabulary::{SymbolId, Vocabulary};

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// One side of a sentence pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Source,
    Target,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Source => write!(f, "source"),
            Self::Target => write!(f, "target"),
        }
    }
}

/// Per-sentence extraction failures.
///
/// None of these are fatal to a batch: the offending sentence pair is
/// skipped and extraction continues with the next record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("Not enough fields in input record: expected at least 3, found {found}")]
    NotEnoughFields { found: usize },

    #[error("Empty sentence on the {side} side")]
    EmptySentence { side: Side },

    #[error("Empty alignment")]
    EmptyAlignment,

    #[error("Inconsistent alignment for sentence lengths {source_len}/{target_len}: {detail}")]
    InconsistentAlignment {
        source_len: usize,
        target_len: usize,
        detail: String,
    },
}

/// Why a record was skipped, without the record-specific payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NotEnoughFields,
    EmptySentence,
    EmptyAlignment,
    InconsistentAlignment,
}

impl ExtractionError {
    pub fn reason(&self) -> SkipReason {
        match self {
            Self::NotEnoughFields { .. } => SkipReason::NotEnoughFields,
            Self::EmptySentence { .. } => SkipReason::EmptySentence,
            Self::EmptyAlignment => SkipReason::EmptyAlignment,
            Self::InconsistentAlignment { .. } => SkipReason::InconsistentAlignment,
        }
    }
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotEnoughFields => write!(f, "not_enough_fields"),
            Self::EmptySentence => write!(f, "empty_sentence"),
            Self::EmptyAlignment => write!(f, "empty_alignment"),
            Self::InconsistentAlignment => write!(f, "inconsistent_alignment"),
        }
    }
}

/// Core error types for Thrax operations
#[derive(Error, Debug)]
pub enum ThraxError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Lattice construction failed: {0}")]
    Lattice(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ThraxError>;
