use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use tracing::trace;

use super::matcher::PatternSet;
use crate::errors::{SearchError, SearchResult};
use crate::metrics::SearchMetrics;
use crate::results::GrepResult;

/// What a content scan concluded about one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// No content patterns were configured, the file was never opened
    NotScanned,
    /// The file was read to the end; holds every match found (maybe none)
    Scanned(Vec<GrepResult>),
    /// A NUL byte or invalid UTF-8 was found; the file counts as non-matching
    Binary,
}

impl ScanOutcome {
    /// The matches to attach to the file's result record
    pub fn into_grep_results(self) -> Vec<GrepResult> {
        match self {
            ScanOutcome::Scanned(results) => results,
            ScanOutcome::NotScanned | ScanOutcome::Binary => Vec::new(),
        }
    }
}

/// Streams a file through a [`PatternSet`] in fixed-size chunks.
///
/// Only the current chunk plus the unfinished tail of the previous one are
/// held in memory. A line that straddles a chunk boundary is carried over
/// and scanned once it is complete, so a match is never split or reported
/// twice.
#[derive(Debug)]
pub struct ContentScanner<'a> {
    patterns: &'a PatternSet,
    buffer_size: usize,
    metrics: &'a SearchMetrics,
}

impl<'a> ContentScanner<'a> {
    pub fn new(patterns: &'a PatternSet, buffer_size: usize, metrics: &'a SearchMetrics) -> Self {
        Self {
            patterns,
            buffer_size: buffer_size.max(1),
            metrics,
        }
    }

    /// Scans the file at `path`
    pub fn scan_file(&self, path: &Path) -> SearchResult<ScanOutcome> {
        if self.patterns.is_empty() {
            return Ok(ScanOutcome::NotScanned);
        }
        trace!("Scanning file: {}", path.display());
        let file = File::open(path).map_err(|e| SearchError::from_io(path, e))?;
        self.scan_reader(file, path)
    }

    /// Scans an already-open source; `path` only labels errors
    pub(crate) fn scan_reader<R: Read>(&self, mut reader: R, path: &Path) -> SearchResult<ScanOutcome> {
        if self.patterns.is_empty() {
            return Ok(ScanOutcome::NotScanned);
        }

        let mut chunk = vec![0u8; self.buffer_size];
        let mut pending: Vec<u8> = Vec::with_capacity(self.buffer_size);
        let mut results = Vec::new();
        let mut lineno: u64 = 0;
        let mut bytes_read: u64 = 0;

        loop {
            let n = match reader.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(SearchError::from_io(path, e)),
            };
            bytes_read += n as u64;

            let data = &chunk[..n];
            if data.contains(&0) {
                return Ok(self.binary(path, bytes_read));
            }

            // Bytes already in `pending` are known to hold no newline.
            let mut search_from = pending.len();
            pending.extend_from_slice(data);
            let mut consumed = 0;
            while let Some(pos) = pending[search_from..].iter().position(|&b| b == b'\n') {
                let line_end = search_from + pos;
                lineno += 1;
                if !self.scan_line(&pending[consumed..line_end], lineno, &mut results) {
                    return Ok(self.binary(path, bytes_read));
                }
                consumed = line_end + 1;
                search_from = consumed;
            }
            pending.drain(..consumed);
        }

        if !pending.is_empty() {
            lineno += 1;
            if !self.scan_line(&pending, lineno, &mut results) {
                return Ok(self.binary(path, bytes_read));
            }
        }

        self.metrics.record_scan(bytes_read);
        trace!(
            "Found {} matches in {} lines of {}",
            results.len(),
            lineno,
            path.display()
        );
        Ok(ScanOutcome::Scanned(results))
    }

    /// Scans one complete line. Returns false if the line is not valid UTF-8.
    fn scan_line(&self, raw: &[u8], lineno: u64, results: &mut Vec<GrepResult>) -> bool {
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
        let Ok(line) = std::str::from_utf8(raw) else {
            return false;
        };
        for m in self.patterns.scan(line) {
            results.push(GrepResult {
                pattern: self.patterns.pattern(m.pattern_index).to_string(),
                matching_text: line[m.start..m.end].to_string(),
                matching_line: line.to_string(),
                lineno,
            });
        }
        true
    }

    fn binary(&self, path: &Path, bytes_read: u64) -> ScanOutcome {
        trace!("Treating {} as binary", path.display());
        self.metrics.record_scan(bytes_read);
        self.metrics.record_binary_skip();
        ScanOutcome::Binary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use std::io::{Cursor, Write};
    use tempfile::tempdir;

    /// Hands out at most `step` bytes per read to force many short reads
    struct Trickle<R> {
        inner: R,
        step: usize,
    }

    impl<R: Read> Read for Trickle<R> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let len = buf.len().min(self.step);
            self.inner.read(&mut buf[..len])
        }
    }

    fn scan_str(patterns: &PatternSet, buffer_size: usize, content: &str) -> ScanOutcome {
        let metrics = SearchMetrics::new();
        let scanner = ContentScanner::new(patterns, buffer_size, &metrics);
        scanner
            .scan_reader(Cursor::new(content.as_bytes().to_vec()), Path::new("mem"))
            .unwrap()
    }

    #[test]
    fn test_empty_pattern_set_does_not_scan() {
        let patterns = PatternSet::new(Vec::<String>::new()).unwrap();
        let metrics = SearchMetrics::new();
        let scanner = ContentScanner::new(&patterns, 16, &metrics);
        let outcome = scanner.scan_file(Path::new("/definitely/not/here")).unwrap();
        assert_eq!(outcome, ScanOutcome::NotScanned);
        assert_eq!(metrics.get_stats().files_scanned, 0);
    }

    #[test]
    fn test_reports_every_occurrence_with_line_numbers() {
        let patterns = PatternSet::new(["foo"]).unwrap();
        let outcome = scan_str(&patterns, 1024, "foo\nbar\nfoo and foo\r\n");
        let results = outcome.into_grep_results();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].lineno, 1);
        assert_eq!(results[0].matching_line, "foo");
        assert_eq!(results[1].lineno, 3);
        assert_eq!(results[2].lineno, 3);
        assert_eq!(results[2].matching_line, "foo and foo");
        for r in &results {
            assert_eq!(r.matching_text, "foo");
            assert!(r.matching_line.contains(&r.matching_text));
        }
    }

    #[test]
    fn test_scanned_without_hits_is_distinct() {
        let patterns = PatternSet::new(["zzz"]).unwrap();
        let outcome = scan_str(&patterns, 1024, "foo\n");
        assert_eq!(outcome, ScanOutcome::Scanned(vec![]));
    }

    #[test]
    fn test_match_straddling_chunk_boundary() {
        let patterns = PatternSet::new([r"needle\d+"]).unwrap();
        // buffer of 8 splits "needle42" across reads
        let content = "abcdeneedle42 tail\nxx needle7\n";
        let results = scan_str(&patterns, 8, content).into_grep_results();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].matching_text, "needle42");
        assert_eq!(results[0].matching_line, "abcdeneedle42 tail");
        assert_eq!(results[0].lineno, 1);
        assert_eq!(results[1].matching_text, "needle7");
        assert_eq!(results[1].lineno, 2);
    }

    #[test]
    fn test_short_reads_match_single_read() {
        let patterns = PatternSet::new(["pattern_split", "Line"]).unwrap();
        let mut content = String::new();
        for i in 0..200 {
            content.push_str(&format!("Line {} with pattern_split", i));
            if i % 3 == 0 {
                content.push_str(" extra text to vary line length");
            }
            content.push('\n');
        }

        let whole = scan_str(&patterns, 1 << 16, &content);

        let metrics = SearchMetrics::new();
        let scanner = ContentScanner::new(&patterns, 64, &metrics);
        let trickled = scanner
            .scan_reader(
                Trickle {
                    inner: Cursor::new(content.clone().into_bytes()),
                    step: 7,
                },
                Path::new("mem"),
            )
            .unwrap();

        assert_eq!(whole, trickled);
        assert_eq!(whole.into_grep_results().len(), 400);
    }

    #[test]
    fn test_file_exactly_buffer_size() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("exact.txt");
        // 16 bytes, no trailing newline
        fs::write(&path, "0123456789ab foo").unwrap();

        let patterns = PatternSet::new(["foo"]).unwrap();
        let metrics = SearchMetrics::new();
        let scanner = ContentScanner::new(&patterns, 16, &metrics);
        let results = scanner.scan_file(&path).unwrap().into_grep_results();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].lineno, 1);
        assert_eq!(results[0].matching_line, "0123456789ab foo");
        assert_eq!(metrics.get_stats().bytes_read, 16);
    }

    #[test]
    fn test_multibyte_char_split_across_chunks() {
        let patterns = PatternSet::new(["héllo"]).unwrap();
        let results = scan_str(&patterns, 2, "ahéllo\n").into_grep_results();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].matching_text, "héllo");
    }

    #[test]
    fn test_binary_file_is_non_matching() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("blob.bin");
        let mut file = File::create(&path).unwrap();
        file.write_all(b"foo\n\x00\x01foo\n").unwrap();

        let patterns = PatternSet::new(["foo"]).unwrap();
        let metrics = SearchMetrics::new();
        let scanner = ContentScanner::new(&patterns, 1024, &metrics);
        let outcome = scanner.scan_file(&path).unwrap();
        assert_eq!(outcome, ScanOutcome::Binary);
        assert!(outcome.into_grep_results().is_empty());
        assert_eq!(metrics.get_stats().binary_files_skipped, 1);
    }

    #[test]
    fn test_invalid_utf8_is_non_matching() {
        let patterns = PatternSet::new(["foo"]).unwrap();
        let metrics = SearchMetrics::new();
        let scanner = ContentScanner::new(&patterns, 1024, &metrics);
        let outcome = scanner
            .scan_reader(Cursor::new(b"foo\n\xff\xfe foo\n".to_vec()), Path::new("mem"))
            .unwrap();
        assert_eq!(outcome, ScanOutcome::Binary);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempdir().unwrap();
        let patterns = PatternSet::new(["foo"]).unwrap();
        let metrics = SearchMetrics::new();
        let scanner = ContentScanner::new(&patterns, 1024, &metrics);
        let err = scanner.scan_file(&dir.path().join("gone.txt")).unwrap_err();
        assert!(matches!(err, SearchError::FileNotFound(_)));
    }
}
