//! Result records produced by a findgrep call.
//!
//! Records are plain owned values. They are built once, when the evaluation
//! of an entry finishes, and never touched again: no file handle or borrowed
//! buffer outlives the scan that produced them. Both record types implement
//! `Serialize`, so a caller can hand them to any serde format as-is.
use serde::Serialize;
use std::fmt;
use std::fs::FileType;
use std::path::PathBuf;

use crate::metrics::SearchStats;
use crate::search::policy::Diagnostic;

/// A single content-pattern match
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GrepResult {
    /// The content pattern that fired
    pub pattern: String,
    /// The exact text the pattern matched
    pub matching_text: String,
    /// The full line containing the match, without its line terminator
    pub matching_line: String,
    /// 1-based line number
    pub lineno: u64,
}

/// Classification of a traversed entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PathType {
    File,
    Directory,
    Symlink,
    Other,
}

impl PathType {
    /// Classifies without following symlinks; `file_type` must come from
    /// `symlink_metadata` or an equivalent directory entry.
    pub fn from_file_type(file_type: FileType) -> Self {
        if file_type.is_symlink() {
            PathType::Symlink
        } else if file_type.is_dir() {
            PathType::Directory
        } else if file_type.is_file() {
            PathType::File
        } else {
            PathType::Other
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PathType::File => "file",
            PathType::Directory => "directory",
            PathType::Symlink => "symlink",
            PathType::Other => "other",
        }
    }
}

impl fmt::Display for PathType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A filesystem entry that survived name and content filtering
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FindResult {
    /// Path as traversed (the root joined with each component below it)
    pub path: PathBuf,
    pub path_type: PathType,
    /// Content matches, in line order; only ever non-empty for files and
    /// symlinks to files
    pub grep_results: Vec<GrepResult>,
}

impl FindResult {
    pub fn new(path: PathBuf, path_type: PathType, grep_results: Vec<GrepResult>) -> Self {
        Self {
            path,
            path_type,
            grep_results,
        }
    }

    pub fn file(path: PathBuf, grep_results: Vec<GrepResult>) -> Self {
        Self::new(path, PathType::File, grep_results)
    }

    /// A record for an entry that never undergoes content evaluation
    pub fn entry(path: PathBuf, path_type: PathType) -> Self {
        Self {
            path,
            path_type,
            grep_results: Vec::new(),
        }
    }
}

/// Everything a call produced: ordered results, counters and the
/// diagnostics recorded for absorbed errors
#[derive(Debug, Clone, Default)]
pub struct SearchOutput {
    pub results: Vec<FindResult>,
    pub stats: SearchStats,
    pub diagnostics: Vec<Diagnostic>,
}

impl SearchOutput {
    /// Total number of content matches across all results
    pub fn total_matches(&self) -> usize {
        self.results.iter().map(|r| r.grep_results.len()).sum()
    }

    /// Number of results that carry at least one content match
    pub fn files_with_matches(&self) -> usize {
        self.results
            .iter()
            .filter(|r| !r.grep_results.is_empty())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grep(lineno: u64, line: &str, text: &str) -> GrepResult {
        GrepResult {
            pattern: text.to_string(),
            matching_text: text.to_string(),
            matching_line: line.to_string(),
            lineno,
        }
    }

    #[test]
    fn test_entry_has_no_grep_results() {
        let result = FindResult::entry(PathBuf::from("some/dir"), PathType::Directory);
        assert_eq!(result.path_type, PathType::Directory);
        assert!(result.grep_results.is_empty());
    }

    #[test]
    fn test_path_type_tags() {
        assert_eq!(PathType::File.to_string(), "file");
        assert_eq!(PathType::Directory.to_string(), "directory");
        assert_eq!(PathType::Symlink.to_string(), "symlink");
        assert_eq!(PathType::Other.to_string(), "other");
    }

    #[test]
    fn test_serializes_as_raw_record() {
        let result = FindResult::file(
            PathBuf::from("a.txt"),
            vec![grep(3, "say foo here", "foo")],
        );
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["path"], "a.txt");
        assert_eq!(value["path_type"], "file");
        assert_eq!(value["grep_results"][0]["pattern"], "foo");
        assert_eq!(value["grep_results"][0]["matching_text"], "foo");
        assert_eq!(value["grep_results"][0]["matching_line"], "say foo here");
        assert_eq!(value["grep_results"][0]["lineno"], 3);
    }

    #[test]
    fn test_output_totals() {
        let output = SearchOutput {
            results: vec![
                FindResult::file(
                    PathBuf::from("a"),
                    vec![grep(1, "foo", "foo"), grep(2, "foo", "foo")],
                ),
                FindResult::file(PathBuf::from("b"), vec![]),
                FindResult::entry(PathBuf::from("c"), PathType::Directory),
            ],
            ..SearchOutput::default()
        };
        assert_eq!(output.total_matches(), 2);
        assert_eq!(output.files_with_matches(), 1);
    }
}
