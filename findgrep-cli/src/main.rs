use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use findgrep::{
    findgrep_with_stats, resolve_threads, ConfigOverrides, FindGrepConfig, FindResult, PathType,
    SearchOutput,
};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Find entries by name and grep their contents in one parallel walk
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Root directory (or single file) to search
    #[arg(default_value = ".")]
    root: PathBuf,

    /// Name pattern, matched against each entry's base name (repeatable)
    #[arg(short = 'p', long = "pattern")]
    find_patterns: Vec<String>,

    /// Content pattern, matched against each line of each file (repeatable)
    #[arg(short = 'g', long = "grep")]
    grep_patterns: Vec<String>,

    /// Number of worker threads (0 picks one per CPU)
    #[arg(short = 'j', long)]
    threads: Option<usize>,

    /// Use one worker per CPU
    #[arg(long)]
    parallel: bool,

    /// Include hidden (dot-prefixed) entries
    #[arg(long, overrides_with = "no_hidden")]
    hidden: bool,

    /// Skip hidden entries, even if the configuration includes them
    #[arg(long, overrides_with = "hidden")]
    no_hidden: bool,

    /// Report directories as well as files and symlinks
    #[arg(long, overrides_with = "files_only")]
    include_dirs: bool,

    /// Leave directories out, even if the configuration includes them
    #[arg(long, overrides_with = "include_dirs")]
    files_only: bool,

    /// Keep files without content matches
    #[arg(long, overrides_with = "filter_by_grep")]
    no_filter_by_grep: bool,

    /// Keep only files with content matches (the default)
    #[arg(long, overrides_with = "no_filter_by_grep")]
    filter_by_grep: bool,

    /// Read buffer size in bytes
    #[arg(long)]
    buffer_size: Option<usize>,

    /// Report entries that could not be read
    #[arg(long, overrides_with = "no_log_errors")]
    log_errors: bool,

    /// Do not report unreadable entries, even if the configuration does
    #[arg(long, overrides_with = "log_errors")]
    no_log_errors: bool,

    /// Log level when RUST_LOG is not set (error|warn|info|debug|trace)
    #[arg(long)]
    log_level: Option<String>,

    /// Configuration file, layered over the global and local ones
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print one JSON object per result
    #[arg(long)]
    json: bool,

    /// Print a summary of the run
    #[arg(short, long)]
    stats: bool,
}

/// `Some(true)` for `on`, `Some(false)` for `off`, `None` if neither was given
fn flag_pair(on: bool, off: bool) -> Option<bool> {
    match (on, off) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

impl Cli {
    /// The configuration values given explicitly on the command line
    fn overrides(&self) -> Result<ConfigOverrides> {
        let threads = if self.threads.is_some() || self.parallel {
            Some(resolve_threads(self.threads, self.parallel.then_some(true))?)
        } else {
            None
        };
        let non_empty = |patterns: &Vec<String>| (!patterns.is_empty()).then(|| patterns.clone());
        Ok(ConfigOverrides {
            threads,
            ignore_hidden_files: flag_pair(self.no_hidden, self.hidden),
            buffer_size: self.buffer_size,
            log_errors: flag_pair(self.log_errors, self.no_log_errors),
            only_files: flag_pair(self.files_only, self.include_dirs),
            filter_by_grep: flag_pair(self.filter_by_grep, self.no_filter_by_grep),
            find_patterns: non_empty(&self.find_patterns),
            grep_patterns: non_empty(&self.grep_patterns),
            log_level: self.log_level.clone(),
        })
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    // a subscriber may already be installed when embedded
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = FindGrepConfig::load_from(cli.config.as_deref())
        .context("Failed to load configuration")?
        .merge_with_cli(cli.overrides()?);
    init_logging(&config.log_level);
    debug!("Resolved configuration: {:?}", config);

    let start = Instant::now();
    let output = findgrep_with_stats(&cli.root, &config)
        .with_context(|| format!("Search in {} failed", cli.root.display()))?;
    let elapsed = start.elapsed();

    if cli.json {
        print_json(&output.results)?;
    } else {
        print_results(&output.results);
    }
    if cli.stats {
        print_stats(&output, elapsed, cli.json);
    }
    Ok(())
}

fn print_json(results: &[FindResult]) -> Result<()> {
    for result in results {
        println!("{}", serde_json::to_string(result)?);
    }
    Ok(())
}

fn print_results(results: &[FindResult]) {
    for result in results {
        let path = result.path.display().to_string();
        match result.path_type {
            PathType::File => println!("{}", path.blue()),
            PathType::Directory => println!("{}/", path.blue().bold()),
            other => println!("{} ({})", path.cyan(), other),
        }
        for m in &result.grep_results {
            println!("{}: {}", m.lineno.to_string().green(), m.matching_line);
        }
    }
}

fn print_stats(output: &SearchOutput, elapsed: Duration, to_stderr: bool) {
    let stats = &output.stats;
    let summary = format!(
        "Found {} matches in {} files ({} entries listed)\n\
         Visited {} entries in {} partitions, scanned {} files ({} bytes), \
         skipped {} binary files, absorbed {} errors ({} reported) in {}",
        output.total_matches(),
        output.files_with_matches(),
        output.results.len(),
        stats.entries_visited,
        stats.partitions,
        stats.files_scanned,
        stats.bytes_read,
        stats.binary_files_skipped,
        stats.errors_absorbed,
        output.diagnostics.len(),
        humantime::format_duration(Duration::from_millis(elapsed.as_millis() as u64)),
    );
    if to_stderr {
        eprintln!("{}", summary);
    } else {
        println!("\n{}", summary);
    }
}
