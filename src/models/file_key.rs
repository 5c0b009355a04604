use crate::error::{ProcessingError, Result};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maps the two-digit year of an inner file name to a full year. Values at or
/// above the threshold belong to the 1900s, values below it to the 2000s.
///
/// There is no default: the archive does not say which century a suffix
/// belongs to, so every caller has to choose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CenturyPivot(u8);

impl CenturyPivot {
    /// `threshold` may be 0 (everything is 19xx) up to 100 (everything is 20xx).
    pub fn new(threshold: u8) -> Result<Self> {
        if threshold > 100 {
            return Err(ProcessingError::Config(format!(
                "Century pivot must be between 0 and 100, got {}",
                threshold
            )));
        }
        Ok(Self(threshold))
    }

    pub fn threshold(&self) -> u8 {
        self.0
    }

    pub fn resolve(&self, two_digit_year: u8) -> i32 {
        let yy = i32::from(two_digit_year % 100);
        if two_digit_year >= self.0 {
            1900 + yy
        } else {
            2000 + yy
        }
    }
}

/// Identity of one hour-file, derived from its name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileKey {
    pub station: String,
    pub day_of_year: u16,
    pub hour: u8,
    /// Known from the inner member name or from the archive directory layout.
    pub year: Option<i32>,
}

impl FileKey {
    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    /// `STNDOYHH` without extension.
    pub fn stem(&self) -> String {
        format!("{}{:03}{:02}", self.station, self.day_of_year, self.hour)
    }

    pub fn archive_name(&self) -> String {
        format!("{}.zip", self.stem())
    }

    /// `STNDOYHH.YYs`; only available once the year is known.
    pub fn member_name(&self) -> Option<String> {
        self.year
            .map(|year| format!("{}.{:02}s", self.stem(), year.rem_euclid(100)))
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.year
            .and_then(|year| NaiveDate::from_yo_opt(year, u32::from(self.day_of_year)))
    }

    pub fn station_day(&self) -> Option<StationDay> {
        let year = self.year?;
        StationDay::new(&self.station, year, self.day_of_year).ok()
    }
}

impl fmt::Display for FileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.member_name() {
            Some(member) => write!(f, "{}", member),
            None => write!(f, "{}", self.archive_name()),
        }
    }
}

/// Partition key: one station on one UTC day.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StationDay {
    station: String,
    year: i32,
    day_of_year: u16,
}

impl StationDay {
    pub fn new(station: &str, year: i32, day_of_year: u16) -> Result<Self> {
        if NaiveDate::from_yo_opt(year, u32::from(day_of_year)).is_none() {
            return Err(ProcessingError::InvalidName {
                name: format!("{}{:03}", station, day_of_year),
                reason: format!("day {} does not exist in {}", day_of_year, year),
            });
        }

        Ok(Self {
            station: station.to_lowercase(),
            year,
            day_of_year,
        })
    }

    pub fn station(&self) -> &str {
        &self.station
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn day_of_year(&self) -> u16 {
        self.day_of_year
    }

    pub fn date(&self) -> NaiveDate {
        NaiveDate::from_yo_opt(self.year, u32::from(self.day_of_year))
            .unwrap_or(NaiveDate::MIN)
    }

    pub fn start(&self) -> NaiveDateTime {
        self.date().and_hms_opt(0, 0, 0).unwrap_or_default()
    }
}

impl fmt::Display for StationDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.station, self.date())
    }
}
