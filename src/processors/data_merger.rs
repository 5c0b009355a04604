use crate::error::{ProcessingError, Result};
use crate::models::{MergedDay, MergedFrame, Slot, TimeSeries, SECONDS_PER_DAY};
use chrono::Duration;
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// Aligns station series of one day on the shared one-second timeline.
///
/// Every reading in a frame comes from its own station's series; nothing is
/// interpolated or borrowed across stations.
pub struct DataMerger {
    strict: bool,
    required_stations: BTreeSet<String>,
}

impl DataMerger {
    pub fn new() -> Self {
        Self {
            strict: false,
            required_stations: BTreeSet::new(),
        }
    }

    /// In strict mode a required station with no series fails the merge.
    /// Otherwise it is carried as missing in every frame.
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_required_stations<I, S>(mut self, stations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.required_stations = stations
            .into_iter()
            .map(|s| s.as_ref().trim().to_lowercase())
            .collect();
        self
    }

    pub fn merge(&self, series: &[TimeSeries]) -> Result<MergedDay> {
        let mut by_station: BTreeMap<&str, &TimeSeries> = BTreeMap::new();
        for s in series {
            if by_station.insert(s.station(), s).is_some() {
                return Err(ProcessingError::DataMerge(format!(
                    "station {} appears more than once",
                    s.station()
                )));
            }
        }

        let missing: Vec<String> = self
            .required_stations
            .iter()
            .filter(|code| !by_station.contains_key(code.as_str()))
            .cloned()
            .collect();

        if !missing.is_empty() {
            if self.strict {
                return Err(ProcessingError::StationSetMismatch { missing });
            }
            warn!(
                "Required stations absent, reported as missing: {}",
                missing.join(", ")
            );
        }

        let first = series
            .first()
            .ok_or_else(|| ProcessingError::DataMerge("no series to merge".to_string()))?;
        let date = first.day.date();

        if let Some(other) = series.iter().find(|s| s.day.date() != date) {
            return Err(ProcessingError::DataMerge(format!(
                "cannot merge {} with {}",
                first.day, other.day
            )));
        }

        let stations: Vec<String> = by_station
            .keys()
            .map(|s| s.to_string())
            .chain(missing)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let start = first.day.start();
        let frames: Vec<MergedFrame> = (0..SECONDS_PER_DAY)
            .into_par_iter()
            .map(|i| MergedFrame {
                timestamp: start + Duration::seconds(i as i64),
                readings: stations
                    .iter()
                    .map(|code| {
                        let slot = by_station
                            .get(code.as_str())
                            .map(|s| s.slots()[i])
                            .unwrap_or(Slot::Missing);
                        (code.clone(), slot)
                    })
                    .collect(),
            })
            .collect();

        debug!("Merged {} stations for {}", stations.len(), date);

        Ok(MergedDay {
            date,
            stations,
            frames,
        })
    }
}

impl Default for DataMerger {
    fn default() -> Self {
        Self::new()
    }
}
