//! Error types for findgrep.
//!
//! Errors fall into two groups. Configuration and root errors are fatal: they
//! surface from [`crate::findgrep`] before any result is produced. Everything
//! else describes a single entry (a directory that could not be listed, a file
//! that could not be read) and is absorbed by the
//! [`ErrorPolicy`](crate::search::policy::ErrorPolicy) so the traversal keeps
//! going.
//!
//! ```rust,ignore
//! match findgrep(root, &config) {
//!     Ok(results) => // every reachable entry was evaluated,
//!     Err(SearchError::InvalidPattern { .. }) => // nothing was traversed,
//!     Err(SearchError::RootInaccessible { .. }) => // nothing was traversed,
//!     Err(e) => // other configuration problems
//! }
//! ```
use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for search operations
pub type SearchResult<T> = Result<T, SearchError>;

/// Errors that can occur during search operations
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),
    #[error("Invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        source: regex::Error,
    },
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Root path is inaccessible: {path}: {source}")]
    RootInaccessible { path: PathBuf, source: io::Error },
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Path is not valid UTF-8: {0}")]
    EncodingError(PathBuf),
}

/// Coarse classification of a [`SearchError`], used for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    PermissionDenied,
    NotFound,
    Io,
    Encoding,
    Configuration,
    RootInaccessible,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::PermissionDenied => "permission_denied",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Io => "io",
            ErrorKind::Encoding => "encoding",
            ErrorKind::Configuration => "configuration",
            ErrorKind::RootInaccessible => "root_inaccessible",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl SearchError {
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound(path.into())
    }

    pub fn permission_denied(path: impl Into<PathBuf>) -> Self {
        Self::PermissionDenied(path.into())
    }

    pub fn invalid_pattern(pattern: impl Into<String>, source: regex::Error) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            source,
        }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn root_inaccessible(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::RootInaccessible {
            path: path.into(),
            source,
        }
    }

    pub fn encoding_error(path: impl Into<PathBuf>) -> Self {
        Self::EncodingError(path.into())
    }

    /// Maps an I/O failure on `path` to the matching variant
    pub fn from_io(path: impl Into<PathBuf>, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::file_not_found(path),
            io::ErrorKind::PermissionDenied => Self::permission_denied(path),
            _ => Self::IoError(err),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            SearchError::FileNotFound(_) => ErrorKind::NotFound,
            SearchError::PermissionDenied(_) => ErrorKind::PermissionDenied,
            SearchError::InvalidPattern { .. } | SearchError::ConfigError(_) => {
                ErrorKind::Configuration
            }
            SearchError::RootInaccessible { .. } => ErrorKind::RootInaccessible,
            SearchError::IoError(_) => ErrorKind::Io,
            SearchError::EncodingError(_) => ErrorKind::Encoding,
        }
    }

    /// True for errors that abort the whole call rather than a single entry
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Configuration | ErrorKind::RootInaccessible
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn bad_regex() -> regex::Error {
        regex::Regex::new("(unclosed").unwrap_err()
    }

    #[test]
    fn test_error_creation() {
        let path = Path::new("test.txt");
        let err = SearchError::file_not_found(path);
        assert!(matches!(err, SearchError::FileNotFound(_)));

        let err = SearchError::permission_denied(path);
        assert!(matches!(err, SearchError::PermissionDenied(_)));

        let err = SearchError::invalid_pattern("(unclosed", bad_regex());
        assert!(matches!(err, SearchError::InvalidPattern { .. }));

        let err = SearchError::root_inaccessible(path, io::Error::from(io::ErrorKind::NotFound));
        assert!(matches!(err, SearchError::RootInaccessible { .. }));

        let err = SearchError::encoding_error(path);
        assert!(matches!(err, SearchError::EncodingError(_)));
    }

    #[test]
    fn test_error_messages() {
        let err = SearchError::config_error("buffer_size must be greater than zero");
        assert_eq!(
            err.to_string(),
            "Configuration error: buffer_size must be greater than zero"
        );

        let err = SearchError::file_not_found("test.txt");
        assert_eq!(err.to_string(), "File not found: test.txt");

        let err = SearchError::invalid_pattern("(unclosed", bad_regex());
        assert!(err.to_string().starts_with("Invalid pattern '(unclosed': "));
    }

    #[test]
    fn test_from_io_maps_kinds() {
        let err = SearchError::from_io("a", io::Error::from(io::ErrorKind::NotFound));
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = SearchError::from_io("a", io::Error::from(io::ErrorKind::PermissionDenied));
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);

        let err = SearchError::from_io("a", io::Error::from(io::ErrorKind::UnexpectedEof));
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_fatal_classification() {
        assert!(SearchError::config_error("x").is_fatal());
        assert!(SearchError::invalid_pattern("(", bad_regex()).is_fatal());
        assert!(
            SearchError::root_inaccessible("r", io::Error::from(io::ErrorKind::NotFound))
                .is_fatal()
        );
        assert!(!SearchError::permission_denied("p").is_fatal());
        assert!(!SearchError::encoding_error("p").is_fatal());
        assert_eq!(ErrorKind::PermissionDenied.to_string(), "permission_denied");
    }
}
