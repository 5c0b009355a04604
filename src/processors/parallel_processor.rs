use crate::archive::inspector::{ArchiveEntry, Partition};
use crate::archive::processor::ArchiveProcessor;
use crate::error::{ProcessingError, Result};
use crate::models::{FileOutcome, FileStatus, HourBatch, RunSummary, StationCatalog, TimeSeries};
use crate::processors::assembler::{FoldOutcome, TimeSeriesAssembler};
use crate::utils::constants::{
    DEFAULT_IO_TIMEOUT_SECS, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_BACKOFF_MS,
};
use crate::utils::progress::ProgressReporter;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Shared stop signal. Workers check it between files.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Blocking read and parse of one hourly archive.
pub trait HourFileLoader: Send + Sync + 'static {
    fn load(&self, entry: &ArchiveEntry) -> Result<HourBatch>;
}

impl HourFileLoader for ArchiveProcessor {
    fn load(&self, entry: &ArchiveEntry) -> Result<HourBatch> {
        self.process(entry)
    }
}

#[derive(Debug, Default)]
pub struct BatchResult {
    /// Completed station-days, ordered by date then station.
    pub series: Vec<TimeSeries>,
    pub summary: RunSummary,
}

/// Runs station-day partitions concurrently.
///
/// At most `max_workers` partitions are in flight. A partition is folded by
/// the one task that owns it, so assemblers are never shared. Each file read
/// runs on the blocking pool under a timeout; transient failures are retried
/// with a fixed backoff, format errors are not.
pub struct ParallelProcessor<L: HourFileLoader = ArchiveProcessor> {
    loader: Arc<L>,
    catalog: Arc<StationCatalog>,
    max_workers: usize,
    io_timeout: Duration,
    max_retries: u32,
    retry_backoff: Duration,
    cancellation: CancellationFlag,
}

impl<L: HourFileLoader> ParallelProcessor<L> {
    pub fn new(loader: L, catalog: Arc<StationCatalog>, max_workers: usize) -> Self {
        Self {
            loader: Arc::new(loader),
            catalog,
            max_workers: max_workers.max(1),
            io_timeout: Duration::from_secs(DEFAULT_IO_TIMEOUT_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_backoff: Duration::from_millis(DEFAULT_RETRY_BACKOFF_MS),
            cancellation: CancellationFlag::new(),
        }
    }

    pub fn with_io_timeout(mut self, timeout: Duration) -> Self {
        self.io_timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    pub fn with_cancellation(mut self, cancellation: CancellationFlag) -> Self {
        self.cancellation = cancellation;
        self
    }

    pub fn cancellation(&self) -> CancellationFlag {
        self.cancellation.clone()
    }

    pub async fn process_partitions(
        &self,
        partitions: Vec<Partition>,
        progress: Option<&ProgressReporter>,
    ) -> Result<BatchResult> {
        let total = partitions.len();
        info!(
            "Processing {} station-days with {} workers",
            total, self.max_workers
        );

        let worker = Arc::new(PartitionWorker {
            loader: Arc::clone(&self.loader),
            catalog: Arc::clone(&self.catalog),
            io_timeout: self.io_timeout,
            max_retries: self.max_retries,
            retry_backoff: self.retry_backoff,
            cancellation: self.cancellation.clone(),
        });

        let semaphore = Arc::new(Semaphore::new(self.max_workers));
        let mut tasks = JoinSet::new();
        let mut result = BatchResult::default();

        for partition in partitions {
            if self.cancellation.is_cancelled() {
                result.summary.extend(cancelled(&partition.entries));
                continue;
            }

            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .map_err(|e| ProcessingError::Config(format!("worker pool closed: {}", e)))?;
            let worker = Arc::clone(&worker);
            let entries = partition.entries.clone();

            tasks.spawn(async move {
                let _permit = permit;
                isolate(entries, async move { worker.run(partition).await }).await
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((series, outcomes)) => {
                    if let Some(series) = series {
                        result.series.push(series);
                    }
                    result.summary.extend(outcomes);
                }
                Err(e) => warn!("Partition task failed: {}", e),
            }

            if let Some(p) = progress {
                p.increment(1);
            }
        }

        result
            .series
            .sort_by(|a, b| a.day.date().cmp(&b.day.date()).then_with(|| a.station().cmp(b.station())));
        result.summary.sort();

        if self.cancellation.is_cancelled() {
            warn!(
                "Run cancelled: {} files not processed",
                result.summary.cancelled_count()
            );
        }

        Ok(result)
    }
}

struct PartitionWorker<L> {
    loader: Arc<L>,
    catalog: Arc<StationCatalog>,
    io_timeout: Duration,
    max_retries: u32,
    retry_backoff: Duration,
    cancellation: CancellationFlag,
}

impl<L: HourFileLoader> PartitionWorker<L> {
    async fn run(&self, partition: Partition) -> (Option<TimeSeries>, Vec<FileOutcome>) {
        let Partition { day, entries } = partition;
        let mut outcomes = Vec::with_capacity(entries.len());

        let mut assembler = match TimeSeriesAssembler::from_catalog(day.clone(), &self.catalog) {
            Ok(assembler) => assembler,
            Err(e) => {
                warn!("Skipping {}: {}", day, e);
                let skipped = entries
                    .iter()
                    .map(|entry| FileOutcome::skipped(entry.path.clone(), Some(entry.key.clone()), &e));
                return (None, skipped.collect());
            }
        };

        for (index, entry) in entries.iter().enumerate() {
            if self.cancellation.is_cancelled() {
                debug!("{} cancelled after {} files", day, index);
                outcomes.extend(cancelled(&entries[index..]));
                return (None, outcomes);
            }

            let (loaded, attempts) = self.load_with_retry(entry).await;
            let outcome = match loaded.and_then(|batch| fold(&mut assembler, &batch).map(|s| (s, batch))) {
                Ok((status, batch)) => FileOutcome {
                    path: entry.path.clone(),
                    key: Some(batch.key),
                    status,
                    attempts,
                    flagged_lines: batch.line_errors,
                },
                Err(e) => {
                    warn!("Skipping {}: {}", entry.path.display(), e);
                    FileOutcome::skipped(entry.path.clone(), Some(entry.key.clone()), &e)
                        .with_attempts(attempts)
                }
            };
            outcomes.push(outcome);
        }

        (Some(assembler.finish()), outcomes)
    }

    async fn load_with_retry(&self, entry: &ArchiveEntry) -> (Result<HourBatch>, u32) {
        let mut attempts = 0;

        loop {
            attempts += 1;
            let loader = Arc::clone(&self.loader);
            let task_entry = entry.clone();
            let task = tokio::task::spawn_blocking(move || loader.load(&task_entry));

            let result = match tokio::time::timeout(self.io_timeout, task).await {
                Ok(Ok(result)) => result,
                Ok(Err(join_error)) => Err(ProcessingError::TaskJoin(join_error)),
                Err(_) => Err(ProcessingError::Timeout {
                    seconds: self.io_timeout.as_secs(),
                }),
            };

            match result {
                Err(e)
                    if e.is_transient()
                        && attempts <= self.max_retries
                        && !self.cancellation.is_cancelled() =>
                {
                    warn!(
                        "{} failed (attempt {}), retrying: {}",
                        entry.path.display(),
                        attempts,
                        e
                    );
                    tokio::time::sleep(self.retry_backoff).await;
                }
                other => return (other, attempts),
            }
        }
    }
}

/// Run one partition on its own task. A panic there costs only that
/// partition: its files are reported as skipped and the batch goes on.
async fn isolate<F>(entries: Vec<ArchiveEntry>, work: F) -> (Option<TimeSeries>, Vec<FileOutcome>)
where
    F: Future<Output = (Option<TimeSeries>, Vec<FileOutcome>)> + Send + 'static,
{
    match tokio::spawn(work).await {
        Ok(result) => result,
        Err(join_error) => {
            let error = ProcessingError::TaskJoin(join_error);
            warn!("Partition of {} files failed: {}", entries.len(), error);
            let outcomes = entries
                .into_iter()
                .map(|entry| FileOutcome::skipped(entry.path, Some(entry.key), &error))
                .collect();
            (None, outcomes)
        }
    }
}

fn fold(assembler: &mut TimeSeriesAssembler, batch: &HourBatch) -> Result<FileStatus> {
    let duplicates = match assembler.fold(batch)? {
        FoldOutcome::Folded { duplicates, .. } => duplicates,
        FoldOutcome::AlreadyFolded => 0,
    };

    Ok(FileStatus::Processed {
        samples: batch.records.len(),
        out_of_range: batch.out_of_range_count(),
        duplicates,
    })
}

fn cancelled(entries: &[ArchiveEntry]) -> Vec<FileOutcome> {
    entries
        .iter()
        .map(|e| FileOutcome::cancelled(e.path.clone(), Some(e.key.clone())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FileKey, Header, ParsedRecord, Sample, StationDay};
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::Mutex;

    /// Serves synthetic hours; `failures` holds how many transient errors
    /// each hour returns before succeeding.
    struct FakeLoader {
        failures: Mutex<HashMap<u8, u32>>,
        permanent: Vec<u8>,
        cancel_on: Option<(u8, CancellationFlag)>,
    }

    impl FakeLoader {
        fn new() -> Self {
            Self {
                failures: Mutex::new(HashMap::new()),
                permanent: vec![],
                cancel_on: None,
            }
        }
    }

    impl HourFileLoader for FakeLoader {
        fn load(&self, entry: &ArchiveEntry) -> Result<HourBatch> {
            let hour = entry.key.hour;

            if let Some((at, flag)) = &self.cancel_on {
                if *at == hour {
                    flag.cancel();
                }
            }

            if self.permanent.contains(&hour) {
                return Err(ProcessingError::HeaderFormat {
                    reason: "column header has 8 tokens".to_string(),
                });
            }

            let mut failures = self.failures.lock().unwrap();
            if let Some(left) = failures.get_mut(&hour) {
                if *left > 0 {
                    *left -= 1;
                    return Err(ProcessingError::Io(std::io::Error::new(
                        std::io::ErrorKind::UnexpectedEof,
                        "truncated read",
                    )));
                }
            }

            let records = (0..60)
                .map(|s| ParsedRecord {
                    sample: Sample {
                        hour,
                        minute: 0,
                        second: s,
                        horizontal: 1.0,
                        declination: 2.0,
                        vertical: 3.0,
                        temp1: 20.0,
                        temp2: 20.0,
                    },
                    valid: true,
                })
                .collect();

            Ok(HourBatch {
                key: entry.key.clone(),
                header: Header {
                    station_name: "SJC".to_string(),
                    equipment: None,
                    day_of_year: None,
                    channel_labels: vec![],
                    column_tokens: vec![],
                    units: None,
                },
                records,
                line_errors: vec![],
            })
        }
    }

    fn partition(station: &str, hours: &[u8]) -> Partition {
        let entries = hours
            .iter()
            .map(|&hour| ArchiveEntry {
                path: PathBuf::from(format!("{}001{:02}.zip", station, hour)),
                key: FileKey {
                    station: station.to_string(),
                    day_of_year: 1,
                    hour,
                    year: Some(2024),
                },
            })
            .collect();

        Partition {
            day: StationDay::new(station, 2024, 1).unwrap(),
            entries,
        }
    }

    fn processor(loader: FakeLoader) -> ParallelProcessor<FakeLoader> {
        ParallelProcessor::new(loader, Arc::new(StationCatalog::builtin()), 2)
            .with_retry_backoff(Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_processes_all_partitions() -> Result<()> {
        let result = processor(FakeLoader::new())
            .process_partitions(vec![partition("sjc", &[0, 1]), partition("cba", &[0])], None)
            .await?;

        assert_eq!(result.series.len(), 2);
        assert_eq!(result.series[0].station(), "cba");
        assert_eq!(result.series[1].observed_count(), 120);
        assert_eq!(result.summary.processed().count(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_panicking_partition_is_contained() {
        let day = partition("sjc", &[0, 1]);
        let work = async move {
            if !day.is_empty() {
                panic!("fold failed");
            }
            (None::<TimeSeries>, Vec::<FileOutcome>::new())
        };

        let (series, outcomes) = isolate(partition("sjc", &[0, 1]).entries, work).await;

        assert!(series.is_none());
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(FileOutcome::is_skipped));
        match &outcomes[0].status {
            FileStatus::Skipped { kind, .. } => assert_eq!(kind, "Internal"),
            other => panic!("unexpected status {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_transient_failure_is_retried() -> Result<()> {
        let loader = FakeLoader::new();
        loader.failures.lock().unwrap().insert(0, 2);

        let result = processor(loader)
            .with_max_retries(2)
            .process_partitions(vec![partition("sjc", &[0])], None)
            .await?;

        let outcome = &result.summary.outcomes[0];
        assert!(outcome.is_processed());
        assert_eq!(outcome.attempts, 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_retries_are_bounded() -> Result<()> {
        let loader = FakeLoader::new();
        loader.failures.lock().unwrap().insert(0, 5);

        let result = processor(loader)
            .with_max_retries(1)
            .process_partitions(vec![partition("sjc", &[0, 1])], None)
            .await?;

        let outcome = &result.summary.outcomes[0];
        assert!(outcome.is_skipped());
        assert_eq!(outcome.attempts, 2);
        // The rest of the day still assembles.
        assert_eq!(result.series[0].observed_count(), 60);
        Ok(())
    }

    #[tokio::test]
    async fn test_format_errors_are_not_retried() -> Result<()> {
        let mut loader = FakeLoader::new();
        loader.permanent.push(1);

        let result = processor(loader)
            .process_partitions(vec![partition("sjc", &[0, 1, 2])], None)
            .await?;

        let skipped: Vec<_> = result.summary.skipped().collect();
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].attempts, 1);
        match &skipped[0].status {
            FileStatus::Skipped { kind, .. } => assert_eq!(kind, "HeaderFormat"),
            other => panic!("unexpected status {:?}", other),
        }
        assert_eq!(result.series[0].observed_count(), 120);
        Ok(())
    }

    #[tokio::test]
    async fn test_cancellation_drops_partial_series() -> Result<()> {
        let flag = CancellationFlag::new();
        let mut loader = FakeLoader::new();
        loader.cancel_on = Some((1, flag.clone()));

        let result = ParallelProcessor::new(loader, Arc::new(StationCatalog::builtin()), 1)
            .with_cancellation(flag)
            .process_partitions(vec![partition("sjc", &[0, 1, 2, 3]), partition("vss", &[0])], None)
            .await?;

        assert!(result.series.is_empty());
        assert_eq!(result.summary.processed().count(), 2);
        assert_eq!(result.summary.cancelled_count(), 3);
        Ok(())
    }
}
