use thiserror::Error;

/// Location-tagged parser failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{line}:{column}: {message}")]
pub struct ParseError {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl ParseError {
    pub fn new(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            column,
            message: message.into(),
        }
    }
}

/// Errors surfaced by transformers, the engine and configuration loading.
///
/// A pass that finds no site is not an error; it is reported through
/// `Transformer::worked` returning false.
#[derive(Error, Debug)]
pub enum MutatorError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Random strings must have length 1 minimum, got {length}")]
    InvalidLength { length: usize },

    #[error("Synthesized snippet `{snippet}` does not fit the tree: {reason}")]
    StructuralMismatch { snippet: String, reason: String },

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Python grammar could not be loaded: {0}")]
    Grammar(#[from] tree_sitter::LanguageError),

    #[error("Invalid configuration file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MutatorError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}

pub type Result<T> = std::result::Result<T, MutatorError>;
