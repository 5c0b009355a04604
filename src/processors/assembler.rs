use crate::error::{ProcessingError, Result};
use crate::models::{
    DuplicateSample, FileKey, HourBatch, Slot, StationCatalog, StationDay, StationMetadata,
    TimeSeries, SECONDS_PER_DAY,
};
use std::collections::HashSet;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FoldOutcome {
    Folded { placed: usize, duplicates: usize },
    /// The same file was folded before; nothing changed.
    AlreadyFolded,
}

/// Builds one station-day series from hour batches.
///
/// The first sample seen for a second wins. Later ones for the same second,
/// from the same file or another, are recorded as duplicates and never
/// overwrite it.
#[derive(Debug)]
pub struct TimeSeriesAssembler {
    series: TimeSeries,
    folded: HashSet<FileKey>,
    /// Index into `series.sources` of the file that filled each slot.
    origins: Vec<Option<u16>>,
}

impl TimeSeriesAssembler {
    pub fn new(day: StationDay, station: &StationMetadata) -> Result<Self> {
        if station.code != day.station() {
            return Err(ProcessingError::BatchMismatch {
                expected: day.to_string(),
                found: station.code.clone(),
            });
        }

        Ok(Self {
            series: TimeSeries::empty(day, station),
            folded: HashSet::new(),
            origins: vec![None; SECONDS_PER_DAY],
        })
    }

    pub fn from_catalog(day: StationDay, catalog: &StationCatalog) -> Result<Self> {
        let station = catalog.lookup(day.station())?;
        Self::new(day, station)
    }

    pub fn day(&self) -> &StationDay {
        &self.series.day
    }

    pub fn series(&self) -> &TimeSeries {
        &self.series
    }

    pub fn fold(&mut self, batch: &HourBatch) -> Result<FoldOutcome> {
        let belongs = batch
            .key
            .station_day()
            .map_or(false, |day| day == self.series.day);
        if !belongs {
            return Err(ProcessingError::BatchMismatch {
                expected: self.series.day.to_string(),
                found: batch.key.to_string(),
            });
        }

        if !self.folded.insert(batch.key.clone()) {
            debug!("{} already folded into {}", batch.key, self.series.day);
            return Ok(FoldOutcome::AlreadyFolded);
        }

        let source = self.series.sources.len() as u16;
        self.series.sources.push(batch.key.clone());
        let source_name = batch.key.to_string();

        let mut placed = 0;
        let mut duplicates = 0;

        for record in &batch.records {
            let slot = record.sample.time().slot();
            if slot >= self.series.len() {
                warn!(
                    "{}: sample time {} is outside the day, ignored",
                    source_name,
                    record.sample.time()
                );
                continue;
            }
            let current = self.series.slots()[slot];
            match current {
                Slot::Missing => {
                    self.series.slots_mut()[slot] = Slot::Observed(*record);
                    self.origins[slot] = Some(source);
                    placed += 1;
                }
                Slot::Observed(_) => {
                    let kept_from = self.origins[slot]
                        .and_then(|i| self.series.sources.get(usize::from(i)))
                        .map(|key| key.to_string())
                        .unwrap_or_default();

                    let duplicate = DuplicateSample {
                        time: record.sample.time(),
                        kept_from,
                        rejected_from: source_name.clone(),
                        rejected: record.sample,
                    };
                    warn!("{}", duplicate.to_error(self.series.station()));
                    self.series.duplicates.push(duplicate);
                    duplicates += 1;
                }
            }
        }

        Ok(FoldOutcome::Folded { placed, duplicates })
    }

    pub fn finish(self) -> TimeSeries {
        self.series
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Header, ParsedRecord, Sample};
    use pretty_assertions::assert_eq;

    fn sample(hour: u8, minute: u8, second: u8, horizontal: f64) -> ParsedRecord {
        ParsedRecord {
            sample: Sample {
                hour,
                minute,
                second,
                horizontal,
                declination: 0.0,
                vertical: 0.0,
                temp1: 20.0,
                temp2: 20.0,
            },
            valid: true,
        }
    }

    fn batch(hour: u8, records: Vec<ParsedRecord>) -> HourBatch {
        HourBatch {
            key: FileKey {
                station: "cba".to_string(),
                day_of_year: 1,
                hour,
                year: Some(2023),
            },
            header: Header {
                station_name: "CUIABA".to_string(),
                equipment: None,
                day_of_year: Some(1),
                channel_labels: vec![],
                column_tokens: vec![],
                units: None,
            },
            records,
            line_errors: vec![],
        }
    }

    fn full_hour(hour: u8) -> HourBatch {
        let records = (0..3600)
            .map(|i| sample(hour, (i / 60) as u8, (i % 60) as u8, i as f64))
            .collect();
        batch(hour, records)
    }

    fn assembler() -> TimeSeriesAssembler {
        let catalog = StationCatalog::builtin();
        TimeSeriesAssembler::from_catalog(StationDay::new("cba", 2023, 1).unwrap(), &catalog)
            .unwrap()
    }

    #[test]
    fn test_full_day_has_no_gaps() -> Result<()> {
        let mut assembler = assembler();
        for hour in 0..24 {
            assembler.fold(&full_hour(hour))?;
        }
        let series = assembler.finish();

        assert_eq!(series.len(), SECONDS_PER_DAY);
        assert_eq!(series.observed_count(), SECONDS_PER_DAY);
        assert!(series.gap_report().is_empty());
        assert!(series.duplicates.is_empty());
        assert_eq!(series.sources.len(), 24);
        Ok(())
    }

    #[test]
    fn test_sample_outside_day_is_ignored() -> Result<()> {
        let mut assembler = assembler();
        let outcome = assembler.fold(&batch(0, vec![sample(24, 0, 0, 1.0), sample(0, 0, 0, 2.0)]))?;

        assert_eq!(outcome, FoldOutcome::Folded { placed: 1, duplicates: 0 });
        assert_eq!(assembler.series().observed_count(), 1);
        Ok(())
    }

    #[test]
    fn test_duplicate_across_batches_keeps_first() -> Result<()> {
        let mut assembler = assembler();
        let first = batch(12, vec![sample(12, 0, 0, 1.0)]);
        let second = batch(13, vec![sample(12, 0, 0, 2.0)]);

        assembler.fold(&first)?;
        let outcome = assembler.fold(&second)?;
        let series = assembler.finish();

        assert_eq!(outcome, FoldOutcome::Folded { placed: 0, duplicates: 1 });
        assert_eq!(series.duplicates.len(), 1);
        assert_eq!(series.duplicates[0].kept_from, "cba00112.23s");
        assert_eq!(series.duplicates[0].rejected_from, "cba00113.23s");
        assert_eq!(series.duplicates[0].rejected.horizontal, 2.0);

        let noon = crate::models::SampleTime::new(12, 0, 0).unwrap();
        assert_eq!(series.slot(noon).sample().map(|s| s.horizontal), Some(1.0));
        Ok(())
    }

    #[test]
    fn test_duplicate_within_one_file() -> Result<()> {
        let mut assembler = assembler();
        let outcome = assembler.fold(&batch(3, vec![sample(3, 0, 0, 1.0), sample(3, 0, 0, 9.0)]))?;

        assert_eq!(outcome, FoldOutcome::Folded { placed: 1, duplicates: 1 });
        assert_eq!(assembler.series().duplicates[0].kept_from, "cba00103.23s");
        Ok(())
    }

    #[test]
    fn test_refold_is_noop() -> Result<()> {
        let mut assembler = assembler();
        let hour = full_hour(0);

        assembler.fold(&hour)?;
        assert_eq!(assembler.fold(&hour)?, FoldOutcome::AlreadyFolded);
        assert!(assembler.series().duplicates.is_empty());
        assert_eq!(assembler.series().observed_count(), 3600);
        Ok(())
    }

    #[test]
    fn test_batch_for_other_day_is_rejected() {
        let mut assembler = assembler();
        let mut other = full_hour(0);
        other.key.day_of_year = 2;

        assert!(matches!(
            assembler.fold(&other),
            Err(ProcessingError::BatchMismatch { .. })
        ));

        let mut no_year = full_hour(0);
        no_year.key.year = None;
        assert!(assembler.fold(&no_year).is_err());
    }

    #[test]
    fn test_missing_hour_is_one_gap() -> Result<()> {
        let mut assembler = assembler();
        for hour in (0..24).filter(|h| *h != 5) {
            assembler.fold(&full_hour(hour))?;
        }
        let gaps = assembler.finish().gap_report();

        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps[0].length, 3600);
        assert_eq!(gaps[0].start.format("%H:%M:%S").to_string(), "05:00:00");
        assert_eq!(gaps[0].end.format("%H:%M:%S").to_string(), "05:59:59");
        Ok(())
    }
}
