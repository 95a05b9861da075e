use config::{Config as ConfigBuilder, File};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use crate::errors::{SearchError, SearchResult};

/// Fully-resolved configuration for a single findgrep call.
///
/// # Configuration Locations
///
/// The configuration can be loaded from multiple locations, later ones
/// overriding earlier ones:
/// 1. Global `$HOME/.config/findgrep/config.yaml`
/// 2. Local `.findgrep.yaml` in the current directory
/// 3. Custom config file passed to [`FindGrepConfig::load_from`]
///
/// # Configuration Format
///
/// ```yaml
/// # Name patterns (regex, matched against the entry's base name)
/// find_patterns:
///   - "\\.rs$"
///
/// # Content patterns (regex, matched line by line)
/// grep_patterns:
///   - "TODO|FIXME"
///
/// # 1 = sequential, 0 = one worker per CPU, N = fixed pool
/// threads: 0
///
/// ignore_hidden_files: true
/// only_files: true
/// filter_by_grep: true
/// buffer_size: 8192
/// log_errors: false
/// log_level: "warn"
/// ```
///
/// Every field is optional; missing fields take the values of
/// [`FindGrepConfig::default`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FindGrepConfig {
    /// Worker count: 1 = sequential, 0 = auto-detect, N = fixed pool
    #[serde(default = "default_threads")]
    pub threads: usize,

    /// Skip dot-prefixed entries and everything below them
    #[serde(default = "default_true")]
    pub ignore_hidden_files: bool,

    /// Chunk size in bytes for content reads
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,

    /// Emit a diagnostic for every absorbed entry error
    #[serde(default)]
    pub log_errors: bool,

    /// Leave directories out of the results (they are still traversed)
    #[serde(default = "default_true")]
    pub only_files: bool,

    /// With content patterns, keep only files that produced a match
    #[serde(default = "default_true")]
    pub filter_by_grep: bool,

    /// Name patterns; empty matches every entry
    #[serde(default)]
    pub find_patterns: Vec<String>,

    /// Content patterns; empty disables content scanning
    #[serde(default)]
    pub grep_patterns: Vec<String>,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_threads() -> usize {
    1
}

fn default_true() -> bool {
    true
}

fn default_buffer_size() -> usize {
    1024
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for FindGrepConfig {
    fn default() -> Self {
        Self {
            threads: default_threads(),
            ignore_hidden_files: true,
            buffer_size: default_buffer_size(),
            log_errors: false,
            only_files: true,
            filter_by_grep: true,
            find_patterns: Vec::new(),
            grep_patterns: Vec::new(),
            log_level: default_log_level(),
        }
    }
}

/// Values given explicitly on the command line; `None` leaves the
/// configured value alone
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
    pub threads: Option<usize>,
    pub ignore_hidden_files: Option<bool>,
    pub buffer_size: Option<usize>,
    pub log_errors: Option<bool>,
    pub only_files: Option<bool>,
    pub filter_by_grep: Option<bool>,
    pub find_patterns: Option<Vec<String>>,
    pub grep_patterns: Option<Vec<String>>,
    pub log_level: Option<String>,
}

/// Degree of parallelism decoded from the `threads` integer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parallelism {
    Sequential,
    Auto,
    Fixed(NonZeroUsize),
}

impl Parallelism {
    pub fn from_threads(threads: usize) -> Self {
        match NonZeroUsize::new(threads) {
            None => Parallelism::Auto,
            Some(n) if n.get() == 1 => Parallelism::Sequential,
            Some(n) => Parallelism::Fixed(n),
        }
    }

    /// Number of OS threads this mode runs on
    pub fn worker_count(&self) -> usize {
        match self {
            Parallelism::Sequential => 1,
            Parallelism::Auto => num_cpus::get().max(1),
            Parallelism::Fixed(n) => n.get(),
        }
    }
}

impl FindGrepConfig {
    /// Loads configuration from the default locations
    pub fn load() -> SearchResult<Self> {
        Self::load_from(None)
    }

    /// Loads configuration from the default locations plus an optional
    /// explicit file. The explicit file must exist.
    pub fn load_from(config_path: Option<&Path>) -> SearchResult<Self> {
        let mut builder = ConfigBuilder::builder();

        let defaults = [
            dirs::config_dir().map(|p| p.join("findgrep/config.yaml")),
            Some(PathBuf::from(".findgrep.yaml")),
        ];
        for path in defaults.iter().flatten() {
            builder = builder.add_source(File::from(path.as_path()).required(false));
        }
        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(true));
        }

        builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| SearchError::config_error(e.to_string()))
    }

    /// Merges CLI values over configuration file values. Every value the
    /// command line set explicitly wins, even when it equals the default.
    pub fn merge_with_cli(mut self, cli: ConfigOverrides) -> Self {
        if let Some(find_patterns) = cli.find_patterns {
            self.find_patterns = find_patterns;
        }
        if let Some(grep_patterns) = cli.grep_patterns {
            self.grep_patterns = grep_patterns;
        }
        if let Some(threads) = cli.threads {
            self.threads = threads;
        }
        if let Some(ignore_hidden_files) = cli.ignore_hidden_files {
            self.ignore_hidden_files = ignore_hidden_files;
        }
        if let Some(buffer_size) = cli.buffer_size {
            self.buffer_size = buffer_size;
        }
        if let Some(log_errors) = cli.log_errors {
            self.log_errors = log_errors;
        }
        if let Some(only_files) = cli.only_files {
            self.only_files = only_files;
        }
        if let Some(filter_by_grep) = cli.filter_by_grep {
            self.filter_by_grep = filter_by_grep;
        }
        if let Some(log_level) = cli.log_level {
            self.log_level = log_level;
        }
        self
    }

    /// Rejects parameter values the engine cannot run with
    pub fn validate(&self) -> SearchResult<()> {
        if self.buffer_size == 0 {
            return Err(SearchError::config_error(
                "buffer_size must be greater than zero",
            ));
        }
        Ok(())
    }

    pub fn parallelism(&self) -> Parallelism {
        Parallelism::from_threads(self.threads)
    }
}

/// Resolves the `threads` / `parallel` pair a caller may supply.
///
/// Supplying both is contradictory. With neither the search is sequential;
/// `parallel = true` selects auto-detection.
pub fn resolve_threads(threads: Option<usize>, parallel: Option<bool>) -> SearchResult<usize> {
    match (threads, parallel) {
        (Some(_), Some(_)) => Err(SearchError::config_error(
            "Only specify one of threads or parallel",
        )),
        (Some(n), None) => Ok(n),
        (None, Some(true)) => Ok(0),
        (None, Some(false)) | (None, None) => Ok(1),
    }
}
