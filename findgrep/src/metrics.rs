use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Counters shared by every worker of a single call
#[derive(Debug, Clone)]
pub struct SearchMetrics {
    entries_visited: Arc<AtomicU64>,
    files_scanned: Arc<AtomicU64>,
    bytes_read: Arc<AtomicU64>,
    binary_files_skipped: Arc<AtomicU64>,
    errors_absorbed: Arc<AtomicU64>,
    partitions: Arc<AtomicU64>,
}

impl SearchMetrics {
    pub fn new() -> Self {
        Self {
            entries_visited: Arc::new(AtomicU64::new(0)),
            files_scanned: Arc::new(AtomicU64::new(0)),
            bytes_read: Arc::new(AtomicU64::new(0)),
            binary_files_skipped: Arc::new(AtomicU64::new(0)),
            errors_absorbed: Arc::new(AtomicU64::new(0)),
            partitions: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn record_entry(&self) {
        self.entries_visited.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a completed content scan and the bytes it read
    pub fn record_scan(&self, bytes: u64) {
        self.files_scanned.fetch_add(1, Ordering::Relaxed);
        let total = self.bytes_read.fetch_add(bytes, Ordering::Relaxed) + bytes;
        debug!("Scanned {} bytes, total: {} bytes", bytes, total);
    }

    pub fn record_binary_skip(&self) {
        self.binary_files_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors_absorbed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_partitions(&self, count: u64) {
        self.partitions.fetch_add(count, Ordering::Relaxed);
    }

    pub fn get_stats(&self) -> SearchStats {
        SearchStats {
            entries_visited: self.entries_visited.load(Ordering::Relaxed),
            files_scanned: self.files_scanned.load(Ordering::Relaxed),
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
            binary_files_skipped: self.binary_files_skipped.load(Ordering::Relaxed),
            errors_absorbed: self.errors_absorbed.load(Ordering::Relaxed),
            partitions: self.partitions.load(Ordering::Relaxed),
        }
    }

    pub fn log_stats(&self) {
        let stats = self.get_stats();
        info!(
            "Search stats:\n\
             Entries visited: {}\n\
             Files scanned: {} ({} bytes)\n\
             Binary files skipped: {}\n\
             Errors absorbed: {}\n\
             Partitions: {}",
            stats.entries_visited,
            stats.files_scanned,
            stats.bytes_read,
            stats.binary_files_skipped,
            stats.errors_absorbed,
            stats.partitions
        );
    }
}

impl Default for SearchMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of [`SearchMetrics`] at the end of a call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchStats {
    pub entries_visited: u64,
    pub files_scanned: u64,
    pub bytes_read: u64,
    pub binary_files_skipped: u64,
    pub errors_absorbed: u64,
    pub partitions: u64,
}
