//! The find+grep pipeline.
//!
//! [`walker`] turns the root into ordered partitions, [`scheduler`] runs them
//! sequentially or on a thread pool, [`processor`] scans file contents,
//! [`policy`] absorbs per-entry failures, and [`aggregator`] filters and
//! merges the per-partition output. [`engine`] wires them together.
pub mod aggregator;
pub mod engine;
pub mod matcher;
pub mod policy;
pub mod processor;
pub mod scheduler;
pub mod walker;

pub use aggregator::ResultAggregator;
pub use engine::{findgrep, findgrep_with_stats};
pub use matcher::{MatchStrategy, PatternMatch, PatternSet};
pub use policy::{Diagnostic, DiagnosticSink, ErrorPolicy, MemorySink, TracingSink};
pub use processor::{ContentScanner, ScanOutcome};
pub use scheduler::WorkScheduler;
pub use walker::{Partition, WalkEntry, Walker};
