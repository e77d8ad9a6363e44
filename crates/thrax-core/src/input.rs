//! Input records
//!
//! One record per sentence pair:
//!
//! ```text
//! source-text ||| target-text ||| alignment ||| [manual-labels]
//! ```
//!
//! Either text field may be a bracketed parse tree, in which case only its
//! leaf yield is used for extraction.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::{Alignment, SymbolId};

/// Brackets, or runs of anything that is neither a bracket nor whitespace
static TREE_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(|\)|[^\s()]+").expect("valid regex"));

/// A delimiter-split input record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputRecord<'a> {
    fields: Vec<&'a str>,
}

impl<'a> InputRecord<'a> {
    pub const SOURCE: usize = 0;
    pub const TARGET: usize = 1;
    pub const ALIGNMENT: usize = 2;
    pub const LABELS: usize = 3;

    /// Split `line` on `delimiter`, trimming every field
    pub fn split(line: &'a str, delimiter: &str) -> Self {
        Self {
            fields: line.split(delimiter).map(str::trim).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field(&self, index: usize) -> Option<&'a str> {
        self.fields.get(index).copied()
    }

    pub fn source(&self) -> Option<&'a str> {
        self.field(Self::SOURCE)
    }

    pub fn target(&self) -> Option<&'a str> {
        self.field(Self::TARGET)
    }

    pub fn alignment(&self) -> Option<&'a str> {
        self.field(Self::ALIGNMENT)
    }

    /// Externally computed span labels, if the record carries them
    pub fn labels(&self) -> Option<&'a str> {
        self.field(Self::LABELS)
    }
}

/// Tokenize one side of a record.
///
/// Flat text is split on whitespace; a parsed side yields the leaves of its
/// bracketed tree.
pub fn words(text: &str, is_parsed: bool) -> Vec<String> {
    if is_parsed {
        leaf_yield(text)
    } else {
        text.split_whitespace().map(str::to_string).collect()
    }
}

/// Leaves of a bracketed tree such as `(S (NP (DT the) (NN cat)) (VP (VBZ sleeps)))`.
///
/// A token directly after an opening bracket is a node label; every other
/// non-bracket token is a leaf.
pub fn leaf_yield(tree: &str) -> Vec<String> {
    let mut leaves = Vec::new();
    let mut after_open = false;
    for token in TREE_TOKEN.find_iter(tree).map(|m| m.as_str()) {
        match token {
            "(" => after_open = true,
            ")" => after_open = false,
            _ if after_open => after_open = false,
            leaf => leaves.push(leaf.to_string()),
        }
    }
    leaves
}

/// Interned, immutable data for one sentence pair.
///
/// Shared by reference between every rule built from the pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentencePair {
    pub source: Vec<SymbolId>,
    pub target: Vec<SymbolId>,
    pub alignment: Alignment,
}

impl SentencePair {
    pub fn new(source: Vec<SymbolId>, target: Vec<SymbolId>, alignment: Alignment) -> Self {
        Self {
            source,
            target,
            alignment,
        }
    }

    pub fn source_len(&self) -> usize {
        self.source.len()
    }

    pub fn target_len(&self) -> usize {
        self.target.len()
    }
}
