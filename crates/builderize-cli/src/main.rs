use anyhow::{Context, Result};
use builderize_cli::driver::{collect_go_files, process_files, Options};
use builderize_core::TransformConfig;
use clap::{ArgAction, Parser};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Room for the parser's deepest accepted nesting in unoptimized builds.
const WORKER_STACK_SIZE: usize = 16 * 1024 * 1024;

#[derive(Parser, Debug)]
#[command(
    name = "builderize",
    version,
    about = "Rewrite Go string concatenation into strings.Builder accumulation"
)]
struct Cli {
    /// Go files or directories to rewrite in place
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Maximum length of one string literal chunk
    #[arg(long)]
    chunk_size: Option<usize>,

    /// YAML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Report files that would change without writing them
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Number of worker threads
    #[arg(short = 'j', long)]
    jobs: Option<usize>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(&cli)?;
    debug!(?config, "loaded configuration");

    let mut pool = rayon::ThreadPoolBuilder::new().stack_size(WORKER_STACK_SIZE);
    if let Some(jobs) = cli.jobs {
        pool = pool.num_threads(jobs);
    }
    pool.build_global().context("failed to configure worker threads")?;

    let files = collect_go_files(&cli.paths)?;
    let options = Options {
        config,
        dry_run: cli.dry_run,
    };
    let summary = process_files(&files, &options);

    let verb = if cli.dry_run { "would rewrite" } else { "rewrote" };
    println!(
        "Done: {verb} {}, {} unchanged, {} failed",
        summary.rewritten, summary.unchanged, summary.failed
    );
    Ok(())
}

/// Defaults, then the config file, then flags.
fn load_config(cli: &Cli) -> Result<TransformConfig> {
    let mut config = match &cli.config {
        Some(path) => TransformConfig::from_file(path)
            .with_context(|| format!("invalid config {}", path.display()))?,
        None => TransformConfig::default(),
    };
    if let Some(chunk_size) = cli.chunk_size {
        config.chunk_size = chunk_size;
        config.validate().context("invalid --chunk-size")?;
    }
    Ok(config)
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
