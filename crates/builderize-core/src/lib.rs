//! Rewrites repeated Go string concatenation into `strings.Builder`
//! accumulation.
//!
//! The pipeline for one file is [`parse`], then [`transform`], then
//! [`print`]. Each stage works on a single owned [`Tree`]; nothing is shared
//! between files, so callers may run files in parallel.

pub mod ast;
pub mod config;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod printer;
pub mod transform;
pub mod walk;

// Pipeline entry points
pub use parser::parse;
pub use printer::print;
pub use transform::{transform, TransformReport};

// Core types
pub use ast::{Node, NodeId, Tree};
pub use config::{TransformConfig, DEFAULT_CHUNK_SIZE};
pub use error::{ConfigError, ParseError, PrintError};
