use regex::Regex;
use tracing::debug;

use crate::errors::{SearchError, SearchResult};

/// Strategy for pattern matching
#[derive(Debug, Clone)]
pub enum MatchStrategy {
    /// Pattern without regex metacharacters, searched as a plain substring
    Simple(String),
    Regex(Regex),
}

#[derive(Debug, Clone)]
struct CompiledPattern {
    source: String,
    strategy: MatchStrategy,
}

/// One occurrence reported by [`PatternSet::scan`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternMatch {
    /// Index of the pattern in declaration order
    pub pattern_index: usize,
    pub start: usize,
    pub end: usize,
}

/// An ordered, compiled set of regular expressions.
///
/// A set is compiled once before traversal and then only read, so a single
/// instance is shared by reference between all workers. An empty set is the
/// "match everything" set for names and scans nothing for content.
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    patterns: Vec<CompiledPattern>,
}

impl PatternSet {
    /// Compiles every pattern, failing on the first invalid one
    pub fn new<I, S>(patterns: I) -> SearchResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut compiled = Vec::new();
        for pattern in patterns {
            let pattern = pattern.as_ref();
            let strategy = if Self::is_simple_pattern(pattern) {
                MatchStrategy::Simple(pattern.to_string())
            } else {
                MatchStrategy::Regex(
                    Regex::new(pattern).map_err(|e| SearchError::invalid_pattern(pattern, e))?,
                )
            };
            debug!("Compiled pattern '{}' as {:?}", pattern, strategy);
            compiled.push(CompiledPattern {
                source: pattern.to_string(),
                strategy,
            });
        }
        Ok(Self { patterns: compiled })
    }

    /// A pattern whose regex escaping is itself matches only literally
    fn is_simple_pattern(pattern: &str) -> bool {
        !pattern.is_empty() && regex::escape(pattern) == pattern
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// The source text of the pattern at `index`
    pub fn pattern(&self, index: usize) -> &str {
        &self.patterns[index].source
    }

    /// True if any pattern matches anywhere in `name`, or if the set is empty
    pub fn matches_name(&self, name: &str) -> bool {
        self.is_empty()
            || self.patterns.iter().any(|p| match &p.strategy {
                MatchStrategy::Simple(literal) => name.contains(literal.as_str()),
                MatchStrategy::Regex(regex) => regex.is_match(name),
            })
    }

    /// Every match of every pattern in `text`, ordered by start offset.
    /// Matches starting at the same offset keep pattern declaration order.
    pub fn scan(&self, text: &str) -> Vec<PatternMatch> {
        let mut matches = Vec::new();
        for (pattern_index, pattern) in self.patterns.iter().enumerate() {
            match &pattern.strategy {
                MatchStrategy::Simple(literal) => {
                    matches.extend(text.match_indices(literal.as_str()).map(|(start, m)| {
                        PatternMatch {
                            pattern_index,
                            start,
                            end: start + m.len(),
                        }
                    }));
                }
                MatchStrategy::Regex(regex) => {
                    matches.extend(regex.find_iter(text).map(|m| PatternMatch {
                        pattern_index,
                        start: m.start(),
                        end: m.end(),
                    }));
                }
            }
        }
        // stable: equal starts stay in pattern order
        matches.sort_by_key(|m| m.start);
        matches
    }
}
