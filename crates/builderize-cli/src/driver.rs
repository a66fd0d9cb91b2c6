//! File discovery and per-file processing.

use builderize_core::{parse, print, transform, ParseError, PrintError, TransformConfig, TransformReport};
use rayon::prelude::*;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

/// Directories never entered while walking: Go's vendored dependencies and
/// test fixtures.
const SKIPPED_DIRS: &[&str] = &["vendor", "testdata"];

/// A failure confined to one file. The run continues with the others.
#[derive(Debug, Error)]
pub enum FileError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {path}:{source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    #[error("failed to print {path}: {source}")]
    Print {
        path: PathBuf,
        #[source]
        source: PrintError,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Input paths that cannot be enumerated. Fatal for the run.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("path does not exist: {0}")]
    Missing(PathBuf),

    #[error("failed to walk directory: {0}")]
    Walk(#[from] walkdir::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    Rewritten(TransformReport),
    /// Would have been rewritten, but this is a dry run.
    WouldRewrite(TransformReport),
    Unchanged,
}

#[derive(Debug, Clone, Copy)]
pub struct Options {
    pub config: TransformConfig,
    pub dry_run: bool,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub rewritten: usize,
    pub unchanged: usize,
    pub failed: usize,
}

impl Summary {
    fn record(mut self, result: &Result<FileOutcome, FileError>) -> Self {
        match result {
            Ok(FileOutcome::Rewritten(_) | FileOutcome::WouldRewrite(_)) => self.rewritten += 1,
            Ok(FileOutcome::Unchanged) => self.unchanged += 1,
            Err(_) => self.failed += 1,
        }
        self
    }

    fn merge(self, other: Self) -> Self {
        Self {
            rewritten: self.rewritten + other.rewritten,
            unchanged: self.unchanged + other.unchanged,
            failed: self.failed + other.failed,
        }
    }
}

/// Parses, transforms and prints one file, writing it back only when the
/// transform changed something. The output is fully built before the single
/// write, so a failure never leaves a partial file.
pub fn process_file(path: &Path, options: &Options) -> Result<FileOutcome, FileError> {
    let source = fs::read_to_string(path).map_err(|source| FileError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut tree = parse(&source).map_err(|source| FileError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    let report = transform(&mut tree, &options.config);
    if !report.changed() {
        debug!(path = %path.display(), "nothing to rewrite");
        return Ok(FileOutcome::Unchanged);
    }

    let output = print(&tree).map_err(|source| FileError::Print {
        path: path.to_path_buf(),
        source,
    })?;
    if options.dry_run {
        return Ok(FileOutcome::WouldRewrite(report));
    }
    fs::write(path, output).map_err(|source| FileError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(FileOutcome::Rewritten(report))
}

/// Processes `files` in parallel and reports each rewritten file on stdout.
pub fn process_files(files: &[PathBuf], options: &Options) -> Summary {
    files
        .par_iter()
        .map(|path| {
            let result = process_file(path, options);
            match &result {
                Ok(FileOutcome::Rewritten(report)) => {
                    info!(path = %path.display(), ?report, "rewrote file");
                    println!("Processed: {}", path.display());
                }
                Ok(FileOutcome::WouldRewrite(report)) => {
                    info!(path = %path.display(), ?report, "would rewrite file");
                    println!("Would rewrite: {}", path.display());
                }
                Ok(FileOutcome::Unchanged) => {}
                Err(err) => warn!("{err}"),
            }
            Summary::default().record(&result)
        })
        .reduce(Summary::default, Summary::merge)
}

/// Expands `paths` into the files to process. A file argument is taken as
/// is; a directory is walked for `.go` files, skipping hidden, `vendor` and
/// `testdata` directories below it.
pub fn collect_go_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>, CollectError> {
    let mut files = Vec::new();
    for path in paths {
        if !path.exists() {
            return Err(CollectError::Missing(path.clone()));
        }
        if path.is_file() {
            files.push(path.clone());
            continue;
        }
        let walker = WalkDir::new(path)
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_skipped_dir(entry));
        for entry in walker {
            let entry = entry?;
            if entry.file_type().is_file() && is_go_file(entry.path()) {
                files.push(entry.into_path());
            }
        }
    }
    files.sort();
    files.dedup();
    Ok(files)
}

fn is_skipped_dir(entry: &DirEntry) -> bool {
    if !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || SKIPPED_DIRS.contains(&name.as_ref())
}

fn is_go_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "go")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn options(dry_run: bool) -> Options {
        Options {
            config: TransformConfig::default(),
            dry_run,
        }
    }

    #[test]
    fn test_collect_skips_vendor_hidden_and_non_go() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        for sub in ["pkg", "vendor/dep", ".git", "pkg/testdata"] {
            fs::create_dir_all(root.join(sub)).unwrap();
        }
        for file in [
            "main.go",
            "README.md",
            "pkg/lib.go",
            "vendor/dep/dep.go",
            ".git/hooks.go",
            "pkg/testdata/fixture.go",
        ] {
            fs::write(root.join(file), "package p\n").unwrap();
        }

        let files = collect_go_files(&[root.to_path_buf()]).unwrap();
        assert_eq!(files, vec![root.join("main.go"), root.join("pkg/lib.go")]);
    }

    #[test]
    fn test_collect_missing_path_is_fatal() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.go");
        assert!(matches!(
            collect_go_files(&[missing]),
            Err(CollectError::Missing(_))
        ));
    }

    #[test]
    fn test_explicit_file_is_taken_as_is() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("script.txt");
        fs::write(&file, "package p\n").unwrap();
        assert_eq!(collect_go_files(&[file.clone()]).unwrap(), vec![file]);
    }

    #[test]
    fn test_process_file_rewrites_in_place() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.go");
        fs::write(&file, "package p\n\nfunc f(s string) string {\n\ts += \"x\"\n\treturn s\n}\n").unwrap();

        let outcome = process_file(&file, &options(false)).unwrap();
        assert!(matches!(outcome, FileOutcome::Rewritten(_)));
        let written = fs::read_to_string(&file).unwrap();
        assert!(written.contains("import \"strings\""));
        assert!(written.contains("sBuilder.WriteString(\"x\")"));
    }

    #[test]
    fn test_dry_run_leaves_file_alone() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.go");
        let source = "package p\n\nfunc f(s string) {\n\ts += \"x\"\n}\n";
        fs::write(&file, source).unwrap();

        let outcome = process_file(&file, &options(true)).unwrap();
        assert!(matches!(outcome, FileOutcome::WouldRewrite(_)));
        assert_eq!(fs::read_to_string(&file).unwrap(), source);
    }

    #[test]
    fn test_parse_error_is_per_file() {
        let dir = TempDir::new().unwrap();
        let bad = dir.path().join("bad.go");
        let good = dir.path().join("good.go");
        fs::write(&bad, "package p\nfunc {\n").unwrap();
        fs::write(&good, "package p\n\nfunc f(s string) {\n\ts += \"x\"\n}\n").unwrap();

        assert!(matches!(
            process_file(&bad, &options(false)),
            Err(FileError::Parse { .. })
        ));
        let summary = process_files(&[bad.clone(), good], &options(false));
        assert_eq!(
            summary,
            Summary {
                rewritten: 1,
                unchanged: 0,
                failed: 1
            }
        );
        assert_eq!(fs::read_to_string(&bad).unwrap(), "package p\nfunc {\n");
    }
}
