use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{trace, warn};

use crate::errors::{ErrorKind, SearchError};
use crate::metrics::SearchMetrics;

/// A record of one absorbed entry error
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub path: PathBuf,
    #[serde(serialize_with = "serialize_kind")]
    pub kind: ErrorKind,
    pub message: String,
}

fn serialize_kind<S: serde::Serializer>(kind: &ErrorKind, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(kind.as_str())
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]: {}", self.path.display(), self.kind, self.message)
    }
}

/// Destination for diagnostics. Implementations are called from every
/// worker thread and must keep each diagnostic whole.
pub trait DiagnosticSink: Send + Sync {
    fn emit(&self, diagnostic: &Diagnostic);
}

/// Emits each diagnostic as a single structured `tracing` event
#[derive(Debug, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn emit(&self, diagnostic: &Diagnostic) {
        warn!(
            path = %diagnostic.path.display(),
            kind = %diagnostic.kind,
            error = %diagnostic.message,
            "Skipping entry"
        );
    }
}

/// Keeps diagnostics in memory, in the order they were emitted
#[derive(Debug, Default)]
pub struct MemorySink {
    diagnostics: Mutex<Vec<Diagnostic>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes and returns everything collected so far
    pub fn take(&self) -> Vec<Diagnostic> {
        let mut guard = self.diagnostics.lock().unwrap_or_else(|e| e.into_inner());
        std::mem::take(&mut *guard)
    }
}

impl DiagnosticSink for MemorySink {
    fn emit(&self, diagnostic: &Diagnostic) {
        self.diagnostics
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(diagnostic.clone());
    }
}

/// Central skip-and-report decision for recoverable failures.
///
/// Every failure handed to [`ErrorPolicy::absorb`] excludes its entry from
/// the results. Whether anything is reported depends on `log_errors`; the
/// traversal continues either way.
#[derive(Clone)]
pub struct ErrorPolicy {
    log_errors: bool,
    sinks: Vec<Arc<dyn DiagnosticSink>>,
    metrics: SearchMetrics,
}

impl ErrorPolicy {
    pub fn new(log_errors: bool, metrics: SearchMetrics) -> Self {
        Self {
            log_errors,
            sinks: Vec::new(),
            metrics,
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Records `err` for the entry at `path`
    pub fn absorb(&self, path: &Path, err: SearchError) {
        self.metrics.record_error();
        if !self.log_errors {
            trace!("Ignoring error at {}: {}", path.display(), err);
            return;
        }
        let diagnostic = Diagnostic {
            path: path.to_path_buf(),
            kind: err.kind(),
            message: err.to_string(),
        };
        for sink in &self.sinks {
            sink.emit(&diagnostic);
        }
    }
}

impl fmt::Debug for ErrorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorPolicy")
            .field("log_errors", &self.log_errors)
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_silent_policy_counts_but_reports_nothing() {
        let metrics = SearchMetrics::new();
        let sink = Arc::new(MemorySink::new());
        let policy = ErrorPolicy::new(false, metrics.clone()).with_sink(sink.clone());

        policy.absorb(Path::new("a"), SearchError::permission_denied("a"));

        assert!(sink.take().is_empty());
        assert_eq!(metrics.get_stats().errors_absorbed, 1);
    }

    #[test]
    fn test_logging_policy_emits_classified_diagnostic() {
        let sink = Arc::new(MemorySink::new());
        let policy = ErrorPolicy::new(true, SearchMetrics::new())
            .with_sink(sink.clone())
            .with_sink(Arc::new(TracingSink));

        policy.absorb(Path::new("locked"), SearchError::permission_denied("locked"));
        policy.absorb(Path::new("gone"), SearchError::file_not_found("gone"));

        let diagnostics = sink.take();
        assert_eq!(diagnostics.len(), 2);
        assert_eq!(diagnostics[0].path, PathBuf::from("locked"));
        assert_eq!(diagnostics[0].kind, ErrorKind::PermissionDenied);
        assert_eq!(diagnostics[0].message, "Permission denied: locked");
        assert_eq!(diagnostics[1].kind, ErrorKind::NotFound);
        assert_eq!(
            diagnostics[1].to_string(),
            "gone [not_found]: File not found: gone"
        );
    }

    #[test]
    fn test_concurrent_emits_stay_whole() {
        let sink = Arc::new(MemorySink::new());
        let policy = ErrorPolicy::new(true, SearchMetrics::new()).with_sink(sink.clone());

        thread::scope(|s| {
            for t in 0..8 {
                let policy = &policy;
                s.spawn(move || {
                    for i in 0..50 {
                        let path = format!("t{}/f{}", t, i);
                        policy.absorb(Path::new(&path), SearchError::file_not_found(&path));
                    }
                });
            }
        });

        let diagnostics = sink.take();
        assert_eq!(diagnostics.len(), 400);
        for d in &diagnostics {
            assert_eq!(d.message, format!("File not found: {}", d.path.display()));
        }
    }
}
