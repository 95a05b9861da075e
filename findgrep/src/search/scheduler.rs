use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use tracing::debug;

use crate::config::Parallelism;
use crate::errors::{SearchError, SearchResult};

/// Partitions handed to the pool per worker, to balance uneven subtrees
const PARTITIONS_PER_WORKER: usize = 4;

/// Runs per-partition work sequentially or on a dedicated thread pool.
///
/// Output always comes back indexed by partition, never by completion:
/// rayon's indexed `collect` writes each partial result into the slot of
/// the partition that produced it, so the caller sees the same sequence for
/// every degree of parallelism.
#[derive(Debug, Clone, Copy)]
pub struct WorkScheduler {
    parallelism: Parallelism,
}

impl WorkScheduler {
    pub fn new(parallelism: Parallelism) -> Self {
        Self { parallelism }
    }

    pub fn is_parallel(&self) -> bool {
        self.parallelism != Parallelism::Sequential
    }

    /// How many partitions the walk should be split into for this pool
    pub fn target_partitions(&self) -> usize {
        if self.is_parallel() {
            self.parallelism.worker_count() * PARTITIONS_PER_WORKER
        } else {
            1
        }
    }

    /// Applies `work` to every partition and returns the partial results in
    /// partition order. Blocks until every partition is done.
    pub fn run<P, T, F>(&self, partitions: &[P], work: F) -> SearchResult<Vec<T>>
    where
        P: Sync,
        T: Send,
        F: Fn(&P) -> T + Sync + Send,
    {
        if !self.is_parallel() {
            debug!("Processing {} partitions sequentially", partitions.len());
            return Ok(partitions.iter().map(work).collect());
        }

        let workers = self.parallelism.worker_count();
        debug!(
            "Processing {} partitions on {} workers",
            partitions.len(),
            workers
        );
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("findgrep-worker-{}", i))
            .build()
            .map_err(|e| SearchError::config_error(format!("Failed to start worker pool: {}", e)))?;

        Ok(pool.install(|| partitions.par_iter().map(work).collect()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::num::NonZeroUsize;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_results_follow_partition_order() {
        let partitions: Vec<u64> = (0..32).collect();
        let expected: Vec<u64> = partitions.iter().map(|p| p * 10).collect();

        for parallelism in [
            Parallelism::Sequential,
            Parallelism::Auto,
            Parallelism::Fixed(NonZeroUsize::new(4).unwrap()),
        ] {
            let scheduler = WorkScheduler::new(parallelism);
            // early partitions finish last
            let results = scheduler
                .run(&partitions, |p| {
                    thread::sleep(Duration::from_millis(32 - p));
                    p * 10
                })
                .unwrap();
            assert_eq!(results, expected);
        }
    }

    #[test]
    fn test_fixed_pool_uses_named_workers() {
        let scheduler = WorkScheduler::new(Parallelism::Fixed(NonZeroUsize::new(2).unwrap()));
        let names = scheduler
            .run(&[(), ()], |_| thread::current().name().map(str::to_string))
            .unwrap();
        for name in names {
            assert!(name.unwrap().starts_with("findgrep-worker-"));
        }
    }

    #[test]
    fn test_target_partitions() {
        assert_eq!(WorkScheduler::new(Parallelism::Sequential).target_partitions(), 1);
        let fixed = WorkScheduler::new(Parallelism::Fixed(NonZeroUsize::new(3).unwrap()));
        assert!(fixed.is_parallel());
        assert_eq!(fixed.target_partitions(), 12);
    }
}
