use std::path::PathBuf;
use thiserror::Error;

/// Failure to turn source text into a [`crate::Tree`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("{line}:{column}: unexpected {found}, expected {expected}")]
    Unexpected {
        line: usize,
        column: usize,
        found: String,
        expected: String,
    },

    #[error("{line}:{column}: unterminated {what}")]
    Unterminated {
        line: usize,
        column: usize,
        what: &'static str,
    },

    #[error("{line}:{column}: invalid character {ch:?}")]
    InvalidCharacter { line: usize, column: usize, ch: char },

    #[error("{line}:{column}: nesting deeper than {limit} levels")]
    TooDeep {
        line: usize,
        column: usize,
        limit: usize,
    },
}

/// Failure to serialize a tree back to text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PrintError {
    #[error("expected {expected}, found {found} node")]
    UnexpectedNode {
        expected: &'static str,
        found: &'static str,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("chunk size must be greater than zero")]
    ZeroChunkSize,

    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
