//! Transform configuration.
//!
//! The chunk bound is the only tunable. It is passed explicitly to
//! [`crate::transform`] rather than read from a global so tests can run the
//! same pipeline at any bound.

use crate::error::ConfigError;
use serde::Deserialize;
use std::path::Path;

/// Default maximum length, in literal units, of one chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransformConfig {
    pub chunk_size: usize,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl TransformConfig {
    pub fn with_chunk_size(chunk_size: usize) -> Result<Self, ConfigError> {
        let config = Self { chunk_size };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::ZeroChunkSize);
        }
        Ok(())
    }

    /// Parses and validates YAML such as `chunk_size: 64`.
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }
}
