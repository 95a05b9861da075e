use tracing::trace;

use super::matcher::PatternSet;
use super::processor::ScanOutcome;
use super::walker::WalkEntry;
use crate::results::{FindResult, PathType};

/// Final inclusion filter and order-preserving merge.
///
/// An entry is kept when its base name matches the name patterns (or there
/// are none) and, for entries with scannable content, when content
/// filtering does not reject it: content filtering only applies with
/// content patterns present and `filter_by_grep` set, and then requires at
/// least one match. Directories and symlinks that do not resolve to a file
/// are never content-filtered.
#[derive(Debug)]
pub struct ResultAggregator<'a> {
    names: &'a PatternSet,
    content_active: bool,
    filter_by_grep: bool,
}

impl<'a> ResultAggregator<'a> {
    pub fn new(names: &'a PatternSet, content_active: bool, filter_by_grep: bool) -> Self {
        Self {
            names,
            content_active,
            filter_by_grep,
        }
    }

    /// Name half of the filter; checked before any content is read
    pub fn admits_name(&self, entry: &WalkEntry) -> bool {
        self.names.matches_name(entry.name())
    }

    /// Builds the record for an entry whose name was admitted, or `None`
    /// if content filtering rejects it
    pub fn finalize(&self, entry: WalkEntry, outcome: ScanOutcome) -> Option<FindResult> {
        if entry.path_type != PathType::File && outcome == ScanOutcome::NotScanned {
            return Some(FindResult::entry(entry.path, entry.path_type));
        }
        let grep_results = outcome.into_grep_results();
        if self.content_active && self.filter_by_grep && grep_results.is_empty() {
            trace!("No content match in {}", entry.path.display());
            return None;
        }
        Some(FindResult::new(entry.path, entry.path_type, grep_results))
    }

    /// Concatenates partial sequences in partition order
    pub fn merge(&self, partials: Vec<Vec<FindResult>>) -> Vec<FindResult> {
        let total = partials.iter().map(Vec::len).sum();
        let mut results = Vec::with_capacity(total);
        for partial in partials {
            results.extend(partial);
        }
        results
    }
}
