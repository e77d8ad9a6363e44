//! Thrax Configuration Management
//!
//! Handles configuration from TOML files, environment variables and
//! `key=value` option overrides, with the classic extraction defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Largest supported arity; nonterminal co-indices are stored in a byte.
pub const MAX_ARITY: usize = u8::MAX as usize;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Rule extraction limits
    pub extraction: ExtractionConfig,

    /// Nonterminal labeling strategy
    pub labeling: LabelingConfig,

    /// Input record format
    pub input: InputConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(grammar) = std::env::var("THRAX_GRAMMAR") {
            config.labeling.grammar = grammar.parse()?;
        }
        if let Ok(label) = std::env::var("THRAX_DEFAULT_NT") {
            config.labeling.default_nt = label;
        }

        // Logging
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Ok(format) = std::env::var("LOG_FORMAT") {
            config.logging.json_format = format.eq_ignore_ascii_case("json");
        }

        Ok(config)
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })
    }

    /// Merge with environment variables (env takes precedence)
    pub fn with_env_override(mut self) -> Result<Self, ConfigError> {
        let env_config = Self::from_env()?;
        let defaults = Self::default();

        // Only override if env values differ from defaults
        if env_config.labeling.grammar != defaults.labeling.grammar {
            self.labeling.grammar = env_config.labeling.grammar;
        }
        if env_config.labeling.default_nt != defaults.labeling.default_nt {
            self.labeling.default_nt = env_config.labeling.default_nt;
        }
        if env_config.logging.level != defaults.logging.level {
            self.logging.level = env_config.logging.level;
        }
        if env_config.logging.json_format {
            self.logging.json_format = true;
        }

        Ok(self)
    }

    /// Set one option by its flat name, e.g. `arity` or `allow-nonlexical-x`.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let key = key.trim().trim_start_matches("thrax.");
        let raw_value = value;
        let value = value.trim();
        let extraction = &mut self.extraction;
        match key {
            "initial-phrase-length" => extraction.initial_phrase_length = parse_value(key, value)?,
            "nonlex-source-length" => extraction.nonlex_source_length = parse_value(key, value)?,
            "nonlex-source-words" => extraction.nonlex_source_words = parse_value(key, value)?,
            "nonlex-target-length" => extraction.nonlex_target_length = parse_value(key, value)?,
            "nonlex-target-words" => extraction.nonlex_target_words = parse_value(key, value)?,
            "arity" => extraction.arity = parse_value(key, value)?,
            "lexicality" => extraction.lexicality = parse_value(key, value)?,
            "adjacent-nts" => extraction.adjacent_nts = parse_value(key, value)?,
            "loose" => extraction.loose = parse_value(key, value)?,
            "allow-full-sentence-rules" => {
                extraction.allow_full_sentence_rules = parse_value(key, value)?
            }
            "allow-abstract-rules" => extraction.allow_abstract_rules = parse_value(key, value)?,
            "allow-nonlexical-x" => extraction.allow_nonlexical_x = parse_value(key, value)?,
            "rule-span-minimum" => extraction.rule_span_minimum = parse_value(key, value)?,
            "rule-span-limit" => extraction.rule_span_limit = parse_value(key, value)?,
            "lex-target-words" => extraction.lex_target_words = parse_value(key, value)?,
            "lex-source-words" => extraction.lex_source_words = parse_value(key, value)?,
            "grammar" => self.labeling.grammar = value.parse()?,
            "default-nt" => self.labeling.default_nt = value.to_string(),
            "unary-category-handler" => {
                self.labeling.samt.unary_category_handler = value.parse()?
            }
            "allow-double-concat" => {
                self.labeling.samt.allow_double_concat = parse_value(key, value)?
            }
            // whitespace delimiters such as a tab are kept as given
            "delimiter" if value.is_empty() => self.input.delimiter = raw_value.to_string(),
            "delimiter" => self.input.delimiter = value.to_string(),
            "source-is-parsed" => self.input.source_is_parsed = parse_value(key, value)?,
            "target-is-parsed" | "english-is-parsed" => {
                self.input.target_is_parsed = parse_value(key, value)?
            }
            "reverse" => self.input.reverse = parse_value(key, value)?,
            "log-level" => self.logging.level = value.to_string(),
            _ => return Err(ConfigError::UnknownOption(key.to_string())),
        }
        Ok(())
    }

    /// Apply a `key=value` override
    pub fn apply_override(&mut self, assignment: &str) -> Result<(), ConfigError> {
        let (key, value) = assignment
            .split_once('=')
            .ok_or_else(|| ConfigError::InvalidValue {
                key: assignment.to_string(),
                value: String::new(),
            })?;
        self.set(key, value)
    }

    /// Reject settings the extractor cannot honour
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.extraction.initial_phrase_length == 0 {
            return Err(ConfigError::InvalidValue {
                key: "initial-phrase-length".to_string(),
                value: "0".to_string(),
            });
        }
        if self.extraction.arity > MAX_ARITY {
            return Err(ConfigError::InvalidValue {
                key: "arity".to_string(),
                value: self.extraction.arity.to_string(),
            });
        }
        if self.extraction.rule_span_minimum > self.extraction.rule_span_limit {
            return Err(ConfigError::InvalidValue {
                key: "rule-span-minimum".to_string(),
                value: self.extraction.rule_span_minimum.to_string(),
            });
        }
        if self.input.delimiter.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "delimiter".to_string(),
                value: String::new(),
            });
        }
        if self.labeling.default_nt.trim().is_empty() {
            return Err(ConfigError::MissingRequired("default-nt".to_string()));
        }
        Ok(())
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

/// Limits and switches for the rule extraction search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ExtractionConfig {
    /// Maximum length of initial phrase pairs (either side)
    pub initial_phrase_length: usize,

    /// Maximum symbols on the source side of rules with nonterminals
    pub nonlex_source_length: usize,

    /// Maximum terminals on the source side of rules with nonterminals
    pub nonlex_source_words: usize,

    /// Maximum symbols on the target side of rules with nonterminals
    pub nonlex_target_length: usize,

    /// Maximum terminals on the target side of rules with nonterminals
    pub nonlex_target_words: usize,

    /// Maximum number of nonterminals per rule
    pub arity: usize,

    /// Minimum number of aligned terminals per rule
    pub lexicality: usize,

    /// Allow two nonterminals to be adjacent on the source side
    pub adjacent_nts: bool,

    /// Allow rule and phrase boundaries on unaligned words
    pub loose: bool,

    /// Exempt rules covering the whole sentence pair from span limits
    pub allow_full_sentence_rules: bool,

    /// Allow rules with no terminals on either side
    pub allow_abstract_rules: bool,

    /// Fall back to the default label when no label is known for a span
    pub allow_nonlexical_x: bool,

    /// Minimum span length of a rule (either side)
    pub rule_span_minimum: usize,

    /// Maximum span length of a rule (either side)
    pub rule_span_limit: usize,

    /// Maximum target terminals in purely lexical rules
    pub lex_target_words: usize,

    /// Maximum source terminals in purely lexical rules
    pub lex_source_words: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            initial_phrase_length: 10,
            nonlex_source_length: 5,
            nonlex_source_words: 5,
            nonlex_target_length: 5,
            nonlex_target_words: 5,
            arity: 2,
            lexicality: 1,
            adjacent_nts: false,
            loose: false,
            allow_full_sentence_rules: true,
            allow_abstract_rules: false,
            allow_nonlexical_x: false,
            rule_span_minimum: 0,
            rule_span_limit: 12,
            lex_target_words: 12,
            lex_source_words: 12,
        }
    }
}

/// Nonterminal labeling configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct LabelingConfig {
    /// Labeling strategy
    pub grammar: GrammarKind,

    /// Default nonterminal symbol
    pub default_nt: String,

    /// SAMT labeling options
    pub samt: SamtConfig,
}

impl Default for LabelingConfig {
    fn default() -> Self {
        Self {
            grammar: GrammarKind::Hiero,
            default_nt: "X".to_string(),
            samt: SamtConfig::default(),
        }
    }
}

/// Supported labeling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GrammarKind {
    /// Single default label everywhere
    Hiero,
    /// Labels supplied in the fourth input field
    Manual,
    /// Syntax-augmented labels from a parse lattice
    Samt,
}

impl std::str::FromStr for GrammarKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hiero" => Ok(Self::Hiero),
            "manual" => Ok(Self::Manual),
            "samt" => Ok(Self::Samt),
            _ => Err(ConfigError::InvalidValue {
                key: "grammar".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for GrammarKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hiero => write!(f, "hiero"),
            Self::Manual => write!(f, "manual"),
            Self::Samt => write!(f, "samt"),
        }
    }
}

/// Which labels of a unary chain a constituent contributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnaryCategoryHandler {
    All,
    Top,
    Bottom,
}

impl std::str::FromStr for UnaryCategoryHandler {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(Self::All),
            "top" => Ok(Self::Top),
            "bottom" => Ok(Self::Bottom),
            _ => Err(ConfigError::InvalidValue {
                key: "unary-category-handler".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// SAMT labeling options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SamtConfig {
    pub unary_category_handler: UnaryCategoryHandler,
    pub allow_constituent: bool,
    pub allow_concat: bool,
    pub allow_ccg: bool,
    pub allow_double_concat: bool,
    pub max_constituent_labels: Option<usize>,
    pub max_concat_labels: Option<usize>,
    pub max_ccg_labels: Option<usize>,
}

impl Default for SamtConfig {
    fn default() -> Self {
        Self {
            unary_category_handler: UnaryCategoryHandler::All,
            allow_constituent: true,
            allow_concat: true,
            allow_ccg: true,
            allow_double_concat: true,
            max_constituent_labels: None,
            max_concat_labels: None,
            max_ccg_labels: None,
        }
    }
}

/// Input record format
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct InputConfig {
    /// Field delimiter
    pub delimiter: String,

    /// Source side is a bracketed parse tree
    pub source_is_parsed: bool,

    /// Target side is a bracketed parse tree
    #[serde(alias = "english-is-parsed")]
    pub target_is_parsed: bool,

    /// Swap source and target before extraction
    pub reverse: bool,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            delimiter: "|||".to_string(),
            source_is_parsed: false,
            target_is_parsed: false,
            reverse: false,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,

    /// Include file/line in logs
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            include_location: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Unknown option: {0}")]
    UnknownOption(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}
