pub mod config;
pub mod errors;
pub mod metrics;
pub mod results;
pub mod search;

pub use config::{resolve_threads, ConfigOverrides, FindGrepConfig, Parallelism};
pub use errors::{ErrorKind, SearchError, SearchResult};
pub use metrics::{SearchMetrics, SearchStats};
pub use results::{FindResult, GrepResult, PathType, SearchOutput};
pub use search::{findgrep, findgrep_with_stats, Diagnostic, DiagnosticSink};
