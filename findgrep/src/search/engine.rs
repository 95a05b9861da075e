use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use super::aggregator::ResultAggregator;
use super::matcher::PatternSet;
use super::policy::{ErrorPolicy, MemorySink, TracingSink};
use super::processor::{ContentScanner, ScanOutcome};
use super::scheduler::WorkScheduler;
use super::walker::{WalkEntry, Walker};
use crate::config::FindGrepConfig;
use crate::errors::SearchResult;
use crate::metrics::SearchMetrics;
use crate::results::{FindResult, SearchOutput};

/// Walks `path` and returns every entry that passes the name and content
/// filters, in depth-first order with siblings sorted by name.
///
/// The order does not depend on `config.threads`. Only configuration
/// errors, invalid patterns and an inaccessible root fail the call; any
/// other failure just drops the affected entry.
pub fn findgrep(path: impl AsRef<Path>, config: &FindGrepConfig) -> SearchResult<Vec<FindResult>> {
    findgrep_with_stats(path, config).map(|output| output.results)
}

/// Like [`findgrep`], but also returns the run's counters and the
/// diagnostics reported while `log_errors` was on.
pub fn findgrep_with_stats(
    path: impl AsRef<Path>,
    config: &FindGrepConfig,
) -> SearchResult<SearchOutput> {
    let root = path.as_ref();
    let start = Instant::now();
    config.validate()?;
    info!(
        "Starting search in {} with find patterns {:?} and grep patterns {:?}",
        root.display(),
        config.find_patterns,
        config.grep_patterns
    );

    let names = PatternSet::new(&config.find_patterns)?;
    let contents = PatternSet::new(&config.grep_patterns)?;

    let metrics = SearchMetrics::new();
    let collector = Arc::new(MemorySink::new());
    let policy = ErrorPolicy::new(config.log_errors, metrics.clone())
        .with_sink(Arc::new(TracingSink))
        .with_sink(collector.clone());

    let walker = Walker::new(config.ignore_hidden_files, config.only_files);
    let scheduler = WorkScheduler::new(config.parallelism());

    let mut partitions = walker.partitions(root, &policy)?;
    if scheduler.is_parallel() {
        partitions = walker.split(partitions, scheduler.target_partitions(), &policy);
    }
    metrics.record_partitions(partitions.len() as u64);

    let scanner = ContentScanner::new(&contents, config.buffer_size, &metrics);
    let aggregator = ResultAggregator::new(&names, !contents.is_empty(), config.filter_by_grep);

    let partials = scheduler.run(&partitions, |partition| {
        let mut found = Vec::new();
        walker.walk_partition(partition, &policy, |entry| {
            if let Some(result) = evaluate(entry, &aggregator, &scanner, &policy, &metrics) {
                found.push(result);
            }
        });
        found
    })?;

    let results = aggregator.merge(partials);
    metrics.log_stats();

    let output = SearchOutput {
        results,
        stats: metrics.get_stats(),
        diagnostics: collector.take(),
    };
    info!(
        "Search complete in {:?}. Found {} entries, {} matches in {} files",
        start.elapsed(),
        output.results.len(),
        output.total_matches(),
        output.files_with_matches()
    );
    Ok(output)
}

/// Decides the fate of one walked entry
fn evaluate(
    entry: WalkEntry,
    aggregator: &ResultAggregator<'_>,
    scanner: &ContentScanner<'_>,
    policy: &ErrorPolicy,
    metrics: &SearchMetrics,
) -> Option<FindResult> {
    metrics.record_entry();
    if !aggregator.admits_name(&entry) {
        return None;
    }

    let outcome = if entry.is_scannable() {
        match scanner.scan_file(&entry.path) {
            Ok(outcome) => outcome,
            Err(err) => {
                debug!("Dropping unreadable file {}", entry.path.display());
                policy.absorb(&entry.path, err);
                return None;
            }
        }
    } else {
        ScanOutcome::NotScanned
    };

    aggregator.finalize(entry, outcome)
}
