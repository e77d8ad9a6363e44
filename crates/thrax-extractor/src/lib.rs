//! Thrax Extractor - Hierarchical SCFG rule extraction
//!
//! Extracts Hiero-style synchronous context-free grammar rules from
//! word-aligned sentence pairs, with pluggable nonterminal labeling.

pub mod extractor;
pub mod labeler;
pub mod metrics;
pub mod rule;
pub mod samt;

pub use extractor::HierarchicalRuleExtractor;
pub use labeler::{HieroLabeler, LabelingInput, ManualLabeler, SpanLabeler};
pub use metrics::ExtractionStats;
pub use rule::{LabelId, Lex, Rule, RuleDisplay, RuleRecord, Symbol, RULE_DELIMITER};
pub use samt::{LatticeBuilder, SamtLabeler, SpanTable, SyntaxLattice};
