pub mod assembler;
pub mod data_merger;
pub mod integrity_checker;
pub mod parallel_processor;

pub use assembler::{FoldOutcome, TimeSeriesAssembler};
pub use data_merger::DataMerger;
pub use integrity_checker::{IntegrityChecker, IntegrityReport, SeriesQuality};
pub use parallel_processor::{BatchResult, CancellationFlag, HourFileLoader, ParallelProcessor};
