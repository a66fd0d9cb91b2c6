//! Command-line driver for `builderize-core`.

pub mod driver;

pub use driver::{collect_go_files, process_file, process_files, FileError, FileOutcome, Options, Summary};
