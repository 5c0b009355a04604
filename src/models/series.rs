use crate::error::ProcessingError;
use crate::models::file_key::{FileKey, StationDay};
use crate::models::header::Header;
use crate::models::sample::{ParsedRecord, Sample, SampleTime, SECONDS_PER_DAY};
use crate::models::station::StationMetadata;
use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Everything parsed out of one hour-file.
#[derive(Debug, Clone)]
pub struct HourBatch {
    pub key: FileKey,
    pub header: Header,
    pub records: Vec<ParsedRecord>,
    pub line_errors: Vec<LineError>,
}

impl HourBatch {
    pub fn out_of_range_count(&self) -> usize {
        self.records.iter().filter(|r| !r.valid).count()
    }
}

/// A data line rejected by the record parser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineError {
    pub line: usize,
    pub reason: String,
}

impl LineError {
    pub fn from_error(line: usize, error: &ProcessingError) -> Self {
        let reason = match error {
            ProcessingError::RecordFormat { reason, .. } => reason.clone(),
            other => other.to_string(),
        };
        Self { line, reason }
    }

    pub fn to_error(&self) -> ProcessingError {
        ProcessingError::RecordFormat {
            line: self.line,
            reason: self.reason.clone(),
        }
    }
}

/// One second of a daily series. Missing is explicit, never a zero value.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum Slot {
    #[default]
    Missing,
    Observed(ParsedRecord),
}

impl Slot {
    pub fn is_missing(&self) -> bool {
        matches!(self, Slot::Missing)
    }

    pub fn record(&self) -> Option<&ParsedRecord> {
        match self {
            Slot::Observed(record) => Some(record),
            Slot::Missing => None,
        }
    }

    pub fn sample(&self) -> Option<&Sample> {
        self.record().map(|r| &r.sample)
    }
}

/// A contiguous run of missing seconds, both ends inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GapInterval {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub length: usize,
}

/// A second that arrived more than once. The first-seen value stays in the
/// series; this records the one that was turned away.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateSample {
    pub time: SampleTime,
    pub kept_from: String,
    pub rejected_from: String,
    pub rejected: Sample,
}

impl DuplicateSample {
    pub fn to_error(&self, station: &str) -> ProcessingError {
        ProcessingError::DuplicateSample {
            station: station.to_string(),
            time: self.time.to_string(),
            source_file: self.rejected_from.clone(),
        }
    }
}

/// A station's day at one-second resolution: always 86400 slots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    pub day: StationDay,
    pub latitude: f64,
    pub longitude: f64,
    pub active: bool,
    slots: Vec<Slot>,
    pub duplicates: Vec<DuplicateSample>,
    pub sources: Vec<FileKey>,
}

impl TimeSeries {
    pub fn empty(day: StationDay, station: &StationMetadata) -> Self {
        Self {
            day,
            latitude: station.latitude,
            longitude: station.longitude,
            active: station.active,
            slots: vec![Slot::Missing; SECONDS_PER_DAY],
            duplicates: Vec::new(),
            sources: Vec::new(),
        }
    }

    pub fn station(&self) -> &str {
        self.day.station()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observed_count() == 0
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub(crate) fn slots_mut(&mut self) -> &mut [Slot] {
        &mut self.slots
    }

    pub fn slot(&self, time: SampleTime) -> &Slot {
        &self.slots[time.slot()]
    }

    pub fn timestamp(&self, index: usize) -> NaiveDateTime {
        self.day.start() + Duration::seconds(index as i64)
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDateTime, &Slot)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .map(move |(i, slot)| (self.timestamp(i), slot))
    }

    pub fn observed_count(&self) -> usize {
        self.slots.iter().filter(|s| !s.is_missing()).count()
    }

    pub fn missing_count(&self) -> usize {
        self.slots.len() - self.observed_count()
    }

    pub fn out_of_range_count(&self) -> usize {
        self.slots
            .iter()
            .filter_map(Slot::record)
            .filter(|r| !r.valid)
            .count()
    }

    /// Fraction of the day with an observed sample.
    pub fn coverage(&self) -> f64 {
        self.observed_count() as f64 / SECONDS_PER_DAY as f64
    }

    /// Missing runs in time order.
    pub fn gap_report(&self) -> Vec<GapInterval> {
        let mut gaps = Vec::new();
        let mut run_start: Option<usize> = None;

        for (i, slot) in self.slots.iter().enumerate() {
            if slot.is_missing() {
                run_start.get_or_insert(i);
            } else if let Some(start) = run_start.take() {
                gaps.push(self.gap(start, i - 1));
            }
        }

        if let Some(start) = run_start {
            gaps.push(self.gap(start, self.slots.len() - 1));
        }

        gaps
    }

    fn gap(&self, start: usize, end: usize) -> GapInterval {
        GapInterval {
            start: self.timestamp(start),
            end: self.timestamp(end),
            length: end - start + 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(hour: u8, minute: u8, second: u8) -> ParsedRecord {
        ParsedRecord {
            sample: Sample {
                hour,
                minute,
                second,
                horizontal: 1.0,
                declination: 2.0,
                vertical: 3.0,
                temp1: 20.0,
                temp2: 21.0,
            },
            valid: true,
        }
    }

    fn series() -> TimeSeries {
        let station = StationMetadata::new("sjc", -45.96, -23.21, true);
        TimeSeries::empty(StationDay::new("sjc", 2023, 1).unwrap(), &station)
    }

    #[test]
    fn test_empty_series_is_one_gap() {
        let series = series();

        assert_eq!(series.len(), SECONDS_PER_DAY);
        assert_eq!(series.missing_count(), SECONDS_PER_DAY);

        let gaps = series.gap_report();
        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps[0].length, SECONDS_PER_DAY);
        assert_eq!(
            gaps[0].end,
            NaiveDate::from_ymd_opt(2023, 1, 1)
                .unwrap()
                .and_hms_opt(23, 59, 59)
                .unwrap()
        );
    }

    #[test]
    fn test_gap_report_runs() {
        let mut series = series();
        for slot in series.slots_mut().iter_mut() {
            *slot = Slot::Observed(record(0, 0, 0));
        }
        series.slots_mut()[10] = Slot::Missing;
        series.slots_mut()[11] = Slot::Missing;
        series.slots_mut()[SECONDS_PER_DAY - 1] = Slot::Missing;

        let gaps = series.gap_report();
        assert_eq!(gaps.len(), 2);
        assert_eq!(gaps[0].length, 2);
        assert_eq!(gaps[0].start.format("%H:%M:%S").to_string(), "00:00:10");
        assert_eq!(gaps[0].end.format("%H:%M:%S").to_string(), "00:00:11");
        assert_eq!(gaps[1].length, 1);
        assert_eq!(gaps[1].start.format("%H:%M:%S").to_string(), "23:59:59");
    }

    #[test]
    fn test_slot_accessors() {
        let mut series = series();
        let noon = SampleTime::new(12, 0, 0).unwrap();
        series.slots_mut()[noon.slot()] = Slot::Observed(record(12, 0, 0));

        assert_eq!(series.slot(noon).sample().map(|s| s.hour), Some(12));
        assert!(series.slot(SampleTime::new(12, 0, 1).unwrap()).is_missing());
        assert_eq!(series.observed_count(), 1);
    }
}
